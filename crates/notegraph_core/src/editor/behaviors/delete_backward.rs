//! Backspace-at-block-start conversion.
//!
//! At the start of a non-paragraph block, backspace converts the block back
//! to a paragraph instead of merging it into the previous block. List items
//! first leave their container (splitting multi-item lists) and only become
//! paragraphs once no list ancestor remains.

use super::{extract_list_item, inside_list, Behavior, Outcome};
use crate::editor::ops::NodePatch;
use crate::editor::{first_leaf_point, Editor};
use crate::model::document::ElementKind;

pub struct BlockDeleteBackward;

impl Behavior for BlockDeleteBackward {
    fn name(&self) -> &'static str {
        "delete-backward"
    }

    fn on_delete_backward(&self, editor: &mut Editor) -> Outcome {
        let Some(point) = editor.selection.clone() else {
            return Outcome::Pass;
        };
        if !editor.at_block_start(&point) {
            return Outcome::Pass;
        }
        let Some((block_path, block)) = editor.doc.enclosing_block(&point.path) else {
            return Outcome::Pass;
        };
        let kind = block.kind.clone();
        if matches!(kind, ElementKind::Paragraph) || kind.is_void() {
            return Outcome::Pass;
        }

        if kind == ElementKind::ListItem {
            let Some((&item_index, container_path)) = block_path.split_last() else {
                return Outcome::Pass;
            };
            let Some(item_path) = extract_list_item(editor, container_path, item_index) else {
                return Outcome::Pass;
            };
            if !inside_list(editor, &item_path) {
                let _ = editor.apply_set_properties(&item_path, NodePatch::Kind(ElementKind::Paragraph));
            }
            editor.selection = first_leaf_point(&editor.doc, &item_path);
            return Outcome::Handled;
        }

        let _ = editor.apply_set_properties(&block_path, NodePatch::Kind(ElementKind::Paragraph));
        editor.selection = Some(point);
        Outcome::Handled
    }
}

#[cfg(test)]
mod tests {
    use crate::editor::Editor;
    use crate::model::document::{Document, Element, ElementKind, Node, Point};

    #[test]
    fn heading_converts_to_paragraph_instead_of_merging() {
        let doc = Document::new(vec![
            Node::Element(Element::with_id(
                "p1",
                ElementKind::Paragraph,
                vec![Node::text("above")],
            )),
            Node::Element(Element::with_id(
                "h1",
                ElementKind::HeadingOne,
                vec![Node::text("title")],
            )),
        ]);
        let mut editor = Editor::new(doc);
        editor.select(Point::new(vec![1, 0], 0));
        editor.delete_backward();

        assert_eq!(editor.doc.children.len(), 2);
        let demoted = editor.doc.children[1].as_element().expect("block");
        assert_eq!(demoted.kind, ElementKind::Paragraph);
        assert_eq!(demoted.id.as_deref(), Some("h1"));
    }

    #[test]
    fn list_item_leaves_list_and_becomes_paragraph() {
        let doc = Document::new(vec![Node::Element(Element {
            id: None,
            kind: ElementKind::BulletedList,
            children: vec![
                Node::Element(Element::with_id(
                    "li1",
                    ElementKind::ListItem,
                    vec![Node::text("first")],
                )),
                Node::Element(Element::with_id(
                    "li2",
                    ElementKind::ListItem,
                    vec![Node::text("second")],
                )),
            ],
        })]);
        let mut editor = Editor::new(doc);
        editor.select(Point::new(vec![0, 0, 0], 0));
        editor.delete_backward();

        // First item extracted as a paragraph; the second keeps its list.
        let first = editor.doc.children[0].as_element().expect("paragraph");
        assert_eq!(first.kind, ElementKind::Paragraph);
        assert_eq!(first.id.as_deref(), Some("li1"));
        let rest = editor.doc.children[1].as_element().expect("list");
        assert!(rest.kind.is_list_container());
        assert_eq!(rest.children.len(), 1);
    }

    #[test]
    fn mid_block_backspace_still_deletes_a_char() {
        let doc = Document::new(vec![Node::Element(Element::with_id(
            "h1",
            ElementKind::HeadingTwo,
            vec![Node::text("ab")],
        ))]);
        let mut editor = Editor::new(doc);
        editor.select(Point::new(vec![0, 0], 2));
        editor.delete_backward();
        assert_eq!(editor.doc.children[0].plain_text(), "a");
        let block = editor.doc.children[0].as_element().expect("block");
        assert_eq!(block.kind, ElementKind::HeadingTwo);
    }
}
