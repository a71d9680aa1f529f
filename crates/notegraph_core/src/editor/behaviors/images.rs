//! Image insertion from dropped files and pasted image URLs.
//!
//! Dropped image files are uploaded through the editor's configured
//! uploader first, then inserted as image blocks pointing at the returned
//! urls; the media service behind the uploader owns the plan-tier ceiling
//! and the in-flight guard. Pasted plain text that looks like an image URL
//! becomes an image block directly.

use super::{Behavior, Outcome, PasteData, PastedFile};
use crate::editor::Editor;
use crate::model::document::{Element, ElementKind, Node, Text};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://\S+\.(png|jpe?g|gif|webp|svg)(\?\S*)?$").expect("valid image regex")
});

static IMAGE_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|webp|svg)$").expect("valid image file regex"));

pub struct ImagePaste;

impl ImagePaste {
    /// Uploads each image file and inserts one image block per stored url.
    /// Non-image files fall through to the rest of the chain.
    fn insert_files(&self, editor: &mut Editor, files: &[PastedFile]) -> Outcome {
        let images: Vec<&PastedFile> = files
            .iter()
            .filter(|file| IMAGE_FILE_RE.is_match(&file.name))
            .collect();
        if images.is_empty() {
            return Outcome::Pass;
        }
        let Some(uploader) = editor.uploader() else {
            warn!("event=image_drop module=editor status=error error_code=no_uploader");
            return Outcome::Handled;
        };

        let mut blocks = Vec::new();
        for file in images {
            match uploader.upload(&file.name, &file.bytes) {
                Ok(url) => blocks.push(Node::Element(Element::new(
                    ElementKind::Image { url, caption: None },
                    vec![Node::Text(Text::default())],
                ))),
                Err(err) => warn!(
                    "event=image_drop module=editor status=error name={} error={err}",
                    file.name
                ),
            }
        }
        if !blocks.is_empty() {
            editor.insert_block_fragment(blocks);
        }
        Outcome::Handled
    }
}

impl Behavior for ImagePaste {
    fn name(&self) -> &'static str {
        "images"
    }

    fn on_insert_data(&self, editor: &mut Editor, data: &PasteData) -> Outcome {
        if !data.files.is_empty() {
            return self.insert_files(editor, &data.files);
        }
        if data.fragment_json.is_some() || data.html.is_some() {
            return Outcome::Pass;
        }
        let Some(text) = data.text.as_deref().map(str::trim) else {
            return Outcome::Pass;
        };
        if !IMAGE_URL_RE.is_match(text) {
            return Outcome::Pass;
        }
        let image = Element::new(
            ElementKind::Image {
                url: text.to_string(),
                caption: None,
            },
            vec![Node::Text(Text::default())],
        );
        editor.insert_block_fragment(vec![Node::Element(image)]);
        Outcome::Handled
    }
}

#[cfg(test)]
mod tests {
    use crate::editor::behaviors::{PasteData, PastedFile};
    use crate::editor::Editor;
    use crate::model::document::{Document, Element, ElementKind, Node, Point};
    use crate::service::media::{ImageUploader, MediaError};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordingUploader {
        names: RefCell<Vec<String>>,
    }

    impl ImageUploader for RecordingUploader {
        fn upload(&self, name: &str, _bytes: &[u8]) -> Result<String, MediaError> {
            self.names.borrow_mut().push(name.to_string());
            Ok(format!("https://cdn.test/{name}"))
        }
    }

    fn editor_with_uploader() -> (Editor, Rc<RecordingUploader>) {
        let doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::text("pic:")],
        ))]);
        let mut editor = Editor::new(doc);
        editor.select(Point::new(vec![0, 0], 4));
        let uploader = Rc::new(RecordingUploader {
            names: RefCell::new(Vec::new()),
        });
        editor.set_uploader(Rc::clone(&uploader) as Rc<dyn ImageUploader>);
        (editor, uploader)
    }

    #[test]
    fn pasted_image_url_inserts_image_block() {
        let doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::text("pic:")],
        ))]);
        let mut editor = Editor::new(doc);
        editor.select(Point::new(vec![0, 0], 4));
        editor.insert_data(&PasteData::plain("https://cdn.example.com/cat.png"));

        assert_eq!(editor.doc.children.len(), 2);
        let image = editor.doc.children[1].as_element().expect("image");
        assert!(matches!(image.kind, ElementKind::Image { .. }));
        assert!(image.id.is_some());
    }

    #[test]
    fn plain_url_is_not_treated_as_image() {
        let doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::text("")],
        ))]);
        let mut editor = Editor::new(doc);
        editor.select(Point::new(vec![0, 0], 0));
        editor.insert_data(&PasteData::plain("https://example.com/page"));
        // Handled by link detection instead.
        assert_eq!(editor.doc.children.len(), 1);
    }

    #[test]
    fn dropped_image_file_uploads_then_inserts_block() {
        let (mut editor, uploader) = editor_with_uploader();
        editor.insert_data(&PasteData::files(vec![PastedFile {
            name: "cat.png".into(),
            bytes: vec![0u8; 16],
        }]));

        assert_eq!(uploader.names.borrow().as_slice(), ["cat.png"]);
        assert_eq!(editor.doc.children.len(), 2);
        let image = editor.doc.children[1].as_element().expect("image");
        match &image.kind {
            ElementKind::Image { url, .. } => assert_eq!(url, "https://cdn.test/cat.png"),
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn each_dropped_image_gets_its_own_block() {
        let (mut editor, uploader) = editor_with_uploader();
        editor.insert_data(&PasteData::files(vec![
            PastedFile {
                name: "a.png".into(),
                bytes: vec![1],
            },
            PastedFile {
                name: "b.jpg".into(),
                bytes: vec![2],
            },
        ]));

        assert_eq!(uploader.names.borrow().len(), 2);
        assert_eq!(editor.doc.children.len(), 3);
    }

    #[test]
    fn non_image_file_drop_passes_through_unchanged() {
        let (mut editor, uploader) = editor_with_uploader();
        editor.insert_data(&PasteData::files(vec![PastedFile {
            name: "notes.pdf".into(),
            bytes: vec![0u8; 16],
        }]));

        assert!(uploader.names.borrow().is_empty());
        assert_eq!(editor.doc.children.len(), 1);
    }

    #[test]
    fn file_drop_without_uploader_is_a_noop() {
        let doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::text("pic:")],
        ))]);
        let mut editor = Editor::new(doc);
        editor.select(Point::new(vec![0, 0], 4));
        editor.insert_data(&PasteData::files(vec![PastedFile {
            name: "cat.png".into(),
            bytes: vec![0u8; 16],
        }]));
        assert_eq!(editor.doc.children.len(), 1);
    }
}
