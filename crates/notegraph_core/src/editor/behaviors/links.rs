//! External link detection.
//!
//! Typing whitespace after a URL-shaped token wraps the token as a link
//! element; pasting a bare URL inserts a link at the cursor. Also claims
//! inline classification for external and note links.

use super::{Behavior, Outcome, PasteData};
use crate::editor::Editor;
use crate::model::document::{Element, ElementKind, Node};
use once_cell::sync::Lazy;
use regex::Regex;

static TRAILING_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\S+)$").expect("valid token regex"));
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?://\S+\.\S{2,}|www\.\S+\.\S{2,})$").expect("valid url regex")
});

pub struct LinkDetection;

impl Behavior for LinkDetection {
    fn name(&self) -> &'static str {
        "links"
    }

    fn is_inline(&self, kind: &ElementKind) -> Option<bool> {
        match kind {
            ElementKind::ExternalLink { .. } | ElementKind::NoteLink { .. } => Some(true),
            _ => None,
        }
    }

    fn on_insert_text(&self, editor: &mut Editor, text: &str) -> Outcome {
        if !text.chars().all(char::is_whitespace) || text.is_empty() {
            return Outcome::Pass;
        }
        let Some((point, before)) = editor.text_before_cursor() else {
            return Outcome::Pass;
        };
        let Some(token) = TRAILING_TOKEN_RE
            .captures(&before)
            .and_then(|caps| caps.get(1))
        else {
            return Outcome::Pass;
        };
        if !URL_RE.is_match(token.as_str()) {
            return Outcome::Pass;
        }

        let start = token.start();
        let url = token.as_str().to_string();
        if editor
            .apply_delete_text(&point.path, start, point.offset - start)
            .is_err()
        {
            return Outcome::Pass;
        }
        if let Some(selection) = editor.selection.as_mut() {
            selection.offset = start;
        }
        editor.insert_inline(Element::new(
            ElementKind::ExternalLink { url: url.clone() },
            vec![Node::text(url)],
        ));
        // Decline so the typed whitespace still lands after the link.
        Outcome::Pass
    }

    fn on_insert_data(&self, editor: &mut Editor, data: &PasteData) -> Outcome {
        if data.fragment_json.is_some() || data.html.is_some() {
            return Outcome::Pass;
        }
        let Some(text) = data.text.as_deref().map(str::trim) else {
            return Outcome::Pass;
        };
        if !URL_RE.is_match(text) || editor.selection.is_none() {
            return Outcome::Pass;
        }
        editor.insert_inline(Element::new(
            ElementKind::ExternalLink {
                url: text.to_string(),
            },
            vec![Node::text(text)],
        ));
        Outcome::Handled
    }
}

#[cfg(test)]
mod tests {
    use crate::editor::behaviors::PasteData;
    use crate::editor::Editor;
    use crate::model::document::{Document, Element, ElementKind, Node, Point};

    fn doc_with(text: &str) -> Document {
        Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::text(text)],
        ))])
    }

    #[test]
    fn space_after_url_wraps_token_as_link() {
        let mut editor = Editor::new(doc_with("see https://example.com"));
        editor.select(Point::new(vec![0, 0], 23));
        editor.insert_text(" ");

        let paragraph = editor.doc.children[0].as_element().expect("paragraph");
        let link = paragraph
            .children
            .iter()
            .find_map(Node::as_element)
            .expect("link element");
        assert_eq!(
            link.kind,
            ElementKind::ExternalLink {
                url: "https://example.com".into()
            }
        );
        assert_eq!(link.rendered_text(), "https://example.com");
        // The typed space still landed after the link.
        assert_eq!(editor.doc.children[0].plain_text(), "see https://example.com ");
    }

    #[test]
    fn space_after_ordinary_word_stays_plain() {
        let mut editor = Editor::new(doc_with("hello"));
        editor.select(Point::new(vec![0, 0], 5));
        editor.insert_text(" ");
        let paragraph = editor.doc.children[0].as_element().expect("paragraph");
        assert!(paragraph.children.iter().all(|c| matches!(c, Node::Text(_))));
    }

    #[test]
    fn pasted_url_becomes_link_element() {
        let mut editor = Editor::new(doc_with("x"));
        editor.select(Point::new(vec![0, 0], 1));
        editor.insert_data(&PasteData::plain("https://notes.example.org/graph"));
        let paragraph = editor.doc.children[0].as_element().expect("paragraph");
        assert!(paragraph
            .children
            .iter()
            .any(|child| child.as_element().is_some_and(
                |e| matches!(e.kind, ElementKind::ExternalLink { .. })
            )));
    }
}
