use notegraph_core::service::MediaError;
use notegraph_core::{
    Document, Editor, Element, ElementKind, ImageUploader, MediaService, Node, ObjectStorage,
    PasteData, PastedFile, PlanTier, Point,
};
use std::cell::RefCell;
use std::rc::Rc;

fn paragraph(id: &str, text: &str) -> Node {
    Node::Element(Element::with_id(
        id,
        ElementKind::Paragraph,
        vec![Node::text(text)],
    ))
}

#[test]
fn typing_completes_a_block_reference_shorthand() {
    let doc = Document::new(vec![paragraph("p1", "Hello ((p1)")]);
    let mut editor = Editor::new(doc);
    editor.select(Point::new(vec![0, 0], 11));
    editor.insert_text(")");

    let block = editor.doc.children[0].as_element().unwrap();
    assert_eq!(
        block.children[0].as_text().map(|leaf| leaf.text.as_str()),
        Some("Hello ")
    );
    let reference = block.children[1].as_element().unwrap();
    assert_eq!(
        reference.kind,
        ElementKind::BlockReference {
            block_id: "p1".into()
        }
    );
}

#[test]
fn enter_at_end_of_heading_starts_a_fresh_paragraph() {
    let doc = Document::new(vec![Node::Element(Element::with_id(
        "h1",
        ElementKind::HeadingOne,
        vec![Node::text("Title")],
    ))]);
    let mut editor = Editor::new(doc);
    editor.select(Point::new(vec![0, 0], 5));
    editor.insert_break();

    assert_eq!(editor.doc.children.len(), 2);
    let next = editor.doc.children[1].as_element().unwrap();
    assert_eq!(next.kind, ElementKind::Paragraph);
    assert_eq!(editor.doc.children[1].plain_text(), "");
    assert_eq!(editor.selection, Some(Point::new(vec![1, 0], 0)));
}

#[test]
fn backspace_at_start_of_quote_demotes_it_to_paragraph() {
    let doc = Document::new(vec![Node::Element(Element::with_id(
        "q1",
        ElementKind::Blockquote,
        vec![Node::text("quoted")],
    ))]);
    let mut editor = Editor::new(doc);
    editor.select(Point::new(vec![0, 0], 0));
    editor.delete_backward();

    let block = editor.doc.children[0].as_element().unwrap();
    assert_eq!(block.kind, ElementKind::Paragraph);
    assert_eq!(editor.doc.children[0].plain_text(), "quoted");
}

#[test]
fn typed_url_becomes_a_link_when_the_space_lands() {
    let doc = Document::new(vec![paragraph("p1", "visit www.example.com")]);
    let mut editor = Editor::new(doc);
    editor.select(Point::new(vec![0, 0], 21));
    editor.insert_text(" ");

    let block = editor.doc.children[0].as_element().unwrap();
    let link = block
        .children
        .iter()
        .find_map(Node::as_element)
        .expect("link element");
    assert_eq!(
        link.kind,
        ElementKind::ExternalLink {
            url: "www.example.com".into()
        }
    );
    assert!(editor.doc.children[0].plain_text().ends_with(' '));
}

#[test]
fn pasting_an_image_url_inserts_an_image_block() {
    let doc = Document::new(vec![paragraph("p1", "pics:")]);
    let mut editor = Editor::new(doc);
    editor.select(Point::new(vec![0, 0], 5));
    editor.insert_data(&PasteData::plain("https://cdn.test/shot.png"));

    let image = editor.doc.children[1].as_element().unwrap();
    assert!(matches!(
        &image.kind,
        ElementKind::Image { url, .. } if url == "https://cdn.test/shot.png"
    ));
}

struct BucketStorage;

impl ObjectStorage for BucketStorage {
    fn upload(&mut self, key: &str, _bytes: &[u8]) -> Result<String, MediaError> {
        Ok(format!("https://bucket.test/{key}"))
    }
}

#[test]
fn dropped_image_file_uploads_and_inserts_the_stored_url() {
    let media = Rc::new(RefCell::new(MediaService::new(
        BucketStorage,
        PlanTier::Basic,
    )));
    let doc = Document::new(vec![paragraph("p1", "pics:")]);
    let mut editor = Editor::new(doc);
    editor.set_uploader(Rc::clone(&media) as Rc<dyn ImageUploader>);
    editor.select(Point::new(vec![0, 0], 5));
    editor.insert_data(&PasteData::files(vec![PastedFile {
        name: "shot.png".into(),
        bytes: vec![0u8; 32],
    }]));

    let image = editor.doc.children[1].as_element().unwrap();
    assert!(matches!(
        &image.kind,
        ElementKind::Image { url, .. } if url == "https://bucket.test/shot.png"
    ));
}

#[test]
fn oversized_dropped_file_is_skipped_without_touching_the_document() {
    let media = Rc::new(RefCell::new(MediaService::new(
        BucketStorage,
        PlanTier::Basic,
    )));
    let doc = Document::new(vec![paragraph("p1", "pics:")]);
    let mut editor = Editor::new(doc.clone());
    editor.set_uploader(Rc::clone(&media) as Rc<dyn ImageUploader>);
    editor.select(Point::new(vec![0, 0], 5));
    let too_big = (PlanTier::Basic.max_upload_bytes() + 1) as usize;
    editor.insert_data(&PasteData::files(vec![PastedFile {
        name: "huge.png".into(),
        bytes: vec![0u8; too_big],
    }]));

    assert_eq!(editor.doc, doc);
}

#[test]
fn pasted_fragment_wins_over_html_and_text() {
    let doc = Document::new(vec![paragraph("p1", "x")]);
    let mut editor = Editor::new(doc);
    editor.select(Point::new(vec![0, 0], 1));
    let data = PasteData {
        fragment_json: Some(
            r#"[{"type":"code-block","children":[{"text":"let a = 1;"}]}]"#.to_string(),
        ),
        html: Some("<p>ignored</p>".to_string()),
        text: Some("ignored".to_string()),
        ..PasteData::default()
    };
    editor.insert_data(&data);

    let pasted = editor.doc.children[1].as_element().unwrap();
    assert_eq!(pasted.kind, ElementKind::CodeBlock);
    assert_eq!(editor.doc.children[1].plain_text(), "let a = 1;");
}

#[test]
fn an_edit_against_a_stale_path_is_a_no_op() {
    let doc = Document::new(vec![paragraph("p1", "still here")]);
    let mut editor = Editor::new(doc.clone());
    editor.select(Point::new(vec![4, 0], 2));
    editor.insert_text("x");
    editor.delete_backward();
    editor.insert_break();

    assert_eq!(editor.doc, doc);
}
