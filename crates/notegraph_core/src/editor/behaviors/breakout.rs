//! Enter-key breakout from structured blocks.
//!
//! List items leave their container as paragraphs; at a block edge a fresh
//! paragraph sibling is created instead of splitting the block's own kind.
//! Mid-block enter delegates to the default split, after hopping the cursor
//! out of a trailing inline so no empty inline survives the split point.

use super::{extract_list_item, inside_list, Behavior, Outcome};
use crate::editor::ops::NodePatch;
use crate::editor::{first_leaf_point, Editor};
use crate::model::document::{Element, ElementKind, Node, Point};

pub struct BlockBreakout;

impl Behavior for BlockBreakout {
    fn name(&self) -> &'static str {
        "block-breakout"
    }

    fn on_insert_break(&self, editor: &mut Editor) -> Outcome {
        let Some(point) = editor.selection.clone() else {
            return Outcome::Pass;
        };
        let Some((block_path, block)) = editor.doc.enclosing_block(&point.path) else {
            return Outcome::Pass;
        };
        let kind = block.kind.clone();

        if kind == ElementKind::ListItem {
            let Some((&item_index, container_path)) = block_path.split_last() else {
                return Outcome::Pass;
            };
            let Some(item_path) = extract_list_item(editor, container_path, item_index) else {
                return Outcome::Pass;
            };
            if !inside_list(editor, &item_path) {
                let _ =
                    editor.apply_set_properties(&item_path, NodePatch::Kind(ElementKind::Paragraph));
            }
            editor.selection = first_leaf_point(&editor.doc, &item_path);
            return Outcome::Handled;
        }

        if editor.at_block_end(&point) {
            let mut after = block_path.clone();
            if let Some(index) = after.last_mut() {
                *index += 1;
            }
            if editor
                .apply_insert_node(&after, Node::Element(Element::empty_paragraph()))
                .is_ok()
            {
                editor.selection = first_leaf_point(&editor.doc, &after);
            }
            return Outcome::Handled;
        }

        if editor.at_block_start(&point) {
            // Empty paragraph above; the cursor follows the content block.
            if editor
                .apply_insert_node(&block_path, Node::Element(Element::empty_paragraph()))
                .is_ok()
            {
                let mut shifted = block_path.clone();
                if let Some(index) = shifted.last_mut() {
                    *index += 1;
                }
                editor.selection = first_leaf_point(&editor.doc, &shifted);
            }
            return Outcome::Handled;
        }

        // Mid-block: if the cursor sits at the end of an inline element's
        // last leaf, collapse to the following leaf first so the default
        // split cannot strand an empty inline.
        if let Some((&leaf_index, inline_path)) = point.path.split_last() {
            let parent_is_inline = !inline_path.is_empty()
                && editor
                    .doc
                    .node_at(inline_path)
                    .and_then(Node::as_element)
                    .is_some_and(|element| editor.is_inline(&element.kind));
            if parent_is_inline {
                let at_inline_end = editor
                    .doc
                    .node_at(inline_path)
                    .and_then(Node::as_element)
                    .is_some_and(|element| {
                        leaf_index + 1 == element.children.len()
                            && editor
                                .doc
                                .node_at(&point.path)
                                .and_then(Node::as_text)
                                .is_some_and(|leaf| leaf.text.len() == point.offset)
                    });
                if at_inline_end {
                    let mut next = inline_path.to_vec();
                    if let Some(index) = next.last_mut() {
                        *index += 1;
                    }
                    editor.selection = Some(Point::new(next, 0));
                }
            }
        }
        Outcome::Pass
    }
}
