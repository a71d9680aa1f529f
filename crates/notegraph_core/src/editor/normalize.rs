//! Fixed-point normalization of document trees.
//!
//! # Responsibility
//! - Repair invariant violations after every edit: empty inline elements,
//!   marked-but-empty leaves, missing ids, malformed list containers.
//! - Reach a fixed point before control returns to the caller, so no caller
//!   ever observes a transiently invalid tree.
//!
//! # Invariants
//! - Each pass step applies exactly one corrective transform, then re-scans
//!   from the affected node's parent rather than the whole tree.
//! - Normalization is idempotent: a second run is a no-op.

use crate::model::document::{new_node_id, Document, Element, ElementKind, Node, Path, Text};
use log::warn;
use std::collections::VecDeque;

/// Upper bound on corrective transforms per normalization run. A healthy
/// edit needs a handful; hitting the cap means a fix-up rule oscillates.
const MAX_FIXES: usize = 10_000;

/// Normalizes the whole document to a fixed point.
///
/// Used after deserializing external content (paste import, store reads).
/// Edits go through [`normalize_from`] with targeted seed paths instead.
pub fn normalize_document(doc: &mut Document) {
    let seeds: Vec<Path> = doc.walk().map(|(path, _)| path).collect();
    normalize_from(doc, seeds);
}

/// Normalizes starting from the given dirty paths.
///
/// Every applied fix re-queues the affected node's parent and that parent's
/// immediate children, so repairs cascade without a full-tree scan.
pub fn normalize_from(doc: &mut Document, seeds: Vec<Path>) {
    let mut queue: VecDeque<Path> = VecDeque::new();
    // Root-level structure is always worth one look.
    queue.push_back(Vec::new());
    for seed in seeds {
        queue.push_back(seed);
    }

    let mut fixes = 0usize;
    while let Some(path) = queue.pop_front() {
        if !apply_fix_at(doc, &path) {
            continue;
        }
        fixes += 1;
        if fixes >= MAX_FIXES {
            warn!("event=normalize module=editor status=error error_code=fix_cap_reached");
            return;
        }

        let parent: Path = match path.split_last() {
            Some((_, rest)) => rest.to_vec(),
            None => Vec::new(),
        };
        requeue_around(doc, &parent, &mut queue);
        queue.push_back(path);
    }
}

fn requeue_around(doc: &Document, parent: &[usize], queue: &mut VecDeque<Path>) {
    queue.push_back(parent.to_vec());
    let child_count = if parent.is_empty() {
        doc.children.len()
    } else {
        doc.node_at(parent)
            .and_then(Node::as_element)
            .map_or(0, |element| element.children.len())
    };
    for index in 0..child_count {
        let mut child = parent.to_vec();
        child.push(index);
        queue.push_back(child);
    }
}

/// Applies at most one corrective transform at `path`. Returns whether a
/// fix was applied.
fn apply_fix_at(doc: &mut Document, path: &[usize]) -> bool {
    if path.is_empty() {
        return fix_root(doc);
    }
    match doc.node_at(path) {
        // The node was removed by an earlier fix; nothing to repair.
        None => false,
        Some(Node::Element(_)) => fix_element(doc, path),
        Some(Node::Text(_)) => match doc.node_at_mut(path) {
            Some(Node::Text(leaf)) => fix_text_leaf(leaf),
            _ => false,
        },
    }
}

/// Root children must be elements, and a document is never left with no
/// block at all; a stray text leaf gets re-paragraphized.
fn fix_root(doc: &mut Document) -> bool {
    if doc.children.is_empty() {
        doc.children.push(Node::Element(Element::empty_paragraph()));
        return true;
    }
    for index in 0..doc.children.len() {
        if matches!(doc.children[index], Node::Text(_)) {
            let leaf = doc.children.remove(index);
            doc.children.insert(
                index,
                Node::Element(Element::new(ElementKind::Paragraph, vec![leaf])),
            );
            return true;
        }
    }
    false
}

/// Marks on a zero-length leaf are cleared so no dangling empty-but-marked
/// runs survive an edit.
fn fix_text_leaf(leaf: &mut Text) -> bool {
    if leaf.text.is_empty() && leaf.has_any_mark() {
        leaf.clear_marks();
        return true;
    }
    false
}

fn fix_element(doc: &mut Document, path: &[usize]) -> bool {
    let Some(element) = doc.node_at_mut(path).and_then(Node::as_element_mut) else {
        return false;
    };

    // Ids are assigned exactly once; list containers never get one.
    if element.id.is_none() && !element.kind.is_list_container() {
        element.id = Some(new_node_id());
        return true;
    }

    if element.kind.is_inline() {
        return fix_inline(doc, path);
    }
    if element.kind.is_list_container() {
        return fix_list_container(doc, path);
    }

    // Every element keeps at least one text child so a cursor can land.
    let Some(element) = doc.node_at_mut(path).and_then(Node::as_element_mut) else {
        return false;
    };
    if element.children.is_empty() {
        element.children.push(Node::Text(Text::default()));
        return true;
    }
    false
}

/// Inline elements hold only text and must render non-empty text; violators
/// are unwrapped back into plain text.
fn fix_inline(doc: &mut Document, path: &[usize]) -> bool {
    let Some(element) = doc.node_at(path).and_then(Node::as_element) else {
        return false;
    };

    if element.rendered_text().is_empty() {
        let _ = super::ops::unwrap_node(doc, path);
        return true;
    }

    let offending_child = element
        .children
        .iter()
        .position(|child| matches!(child, Node::Element(_)));
    if let Some(index) = offending_child {
        let mut child_path = path.to_vec();
        child_path.push(index);
        let _ = super::ops::unwrap_node(doc, &child_path);
        return true;
    }

    let Some(element) = doc.node_at_mut(path).and_then(Node::as_element_mut) else {
        return false;
    };
    if element.children.is_empty() {
        element.children.push(Node::Text(Text::default()));
        return true;
    }
    false
}

enum ListFix {
    RemoveEmpty,
    /// Splice a directly nested container's items up one level.
    UnwrapNested(usize),
    /// Promote a block child to a list item, keeping its id.
    Convert(usize),
    /// Wrap a loose leaf or inline child in a fresh list item.
    Wrap(usize),
}

/// List containers hold only list items; anything else is repaired in
/// place (converted, wrapped, or spliced out).
fn fix_list_container(doc: &mut Document, path: &[usize]) -> bool {
    let fix = {
        let Some(element) = doc.node_at(path).and_then(Node::as_element) else {
            return false;
        };
        if element.children.is_empty() {
            Some(ListFix::RemoveEmpty)
        } else {
            element
                .children
                .iter()
                .enumerate()
                .find_map(|(index, child)| match child {
                    Node::Element(child) if child.kind == ElementKind::ListItem => None,
                    Node::Element(child) if child.kind.is_list_container() => {
                        Some(ListFix::UnwrapNested(index))
                    }
                    Node::Element(child) if child.kind.is_block() => Some(ListFix::Convert(index)),
                    Node::Element(_) | Node::Text(_) => Some(ListFix::Wrap(index)),
                })
        }
    };

    match fix {
        None => false,
        Some(ListFix::RemoveEmpty) => {
            let _ = super::ops::remove_node(doc, path);
            true
        }
        Some(ListFix::UnwrapNested(index)) => {
            let mut child_path = path.to_vec();
            child_path.push(index);
            let _ = super::ops::unwrap_node(doc, &child_path);
            true
        }
        Some(ListFix::Convert(index)) => {
            if let Some(child) = doc
                .node_at_mut(path)
                .and_then(Node::as_element_mut)
                .and_then(|element| element.children.get_mut(index))
                .and_then(Node::as_element_mut)
            {
                child.kind = ElementKind::ListItem;
            }
            true
        }
        Some(ListFix::Wrap(index)) => {
            if let Some(element) = doc.node_at_mut(path).and_then(Node::as_element_mut) {
                let loose = element.children.remove(index);
                element.children.insert(
                    index,
                    Node::Element(Element::new(ElementKind::ListItem, vec![loose])),
                );
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_document, normalize_from};
    use crate::model::document::{Document, Element, ElementKind, Node, Text};

    fn note_link(title: &str, children: Vec<Node>) -> Element {
        Element::with_id(
            "l1",
            ElementKind::NoteLink {
                note_id: "n1".into(),
                note_title: title.into(),
                custom_text: None,
            },
            children,
        )
    }

    #[test]
    fn empty_inline_is_unwrapped_into_plain_text() {
        let mut doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![
                Node::text("before "),
                Node::Element(note_link("", vec![Node::Text(Text::default())])),
                Node::text(" after"),
            ],
        ))]);
        normalize_document(&mut doc);

        let paragraph = doc.children[0].as_element().expect("paragraph");
        assert!(paragraph
            .children
            .iter()
            .all(|child| matches!(child, Node::Text(_))));
        assert_eq!(doc.children[0].plain_text(), "before  after");
    }

    #[test]
    fn non_empty_note_link_survives() {
        let mut doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![
                Node::text("see "),
                Node::Element(note_link("Target", vec![Node::Text(Text::default())])),
            ],
        ))]);
        normalize_document(&mut doc);
        let paragraph = doc.children[0].as_element().expect("paragraph");
        assert_eq!(paragraph.children.len(), 2);
    }

    #[test]
    fn marks_on_empty_leaf_are_cleared() {
        let mut marked = Text::default();
        marked.bold = true;
        marked.italic = true;
        let mut doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::Text(marked)],
        ))]);
        normalize_document(&mut doc);

        let leaf = doc.children[0]
            .as_element()
            .and_then(|e| e.children[0].as_text())
            .expect("leaf");
        assert!(!leaf.has_any_mark());
    }

    #[test]
    fn missing_ids_are_assigned_once() {
        let mut doc = Document::new(vec![Node::Element(Element {
            id: None,
            kind: ElementKind::Paragraph,
            children: vec![Node::text("x")],
        })]);
        normalize_document(&mut doc);
        let first_id = doc.children[0]
            .as_element()
            .and_then(|e| e.id.clone())
            .expect("id assigned");

        normalize_document(&mut doc);
        let second_id = doc.children[0]
            .as_element()
            .and_then(|e| e.id.clone())
            .expect("id kept");
        assert_eq!(first_id, second_id);
    }

    #[test]
    fn list_container_children_are_repaired() {
        let mut doc = Document::new(vec![Node::Element(Element {
            id: None,
            kind: ElementKind::BulletedList,
            children: vec![
                Node::Element(Element::with_id(
                    "p1",
                    ElementKind::Paragraph,
                    vec![Node::text("promoted")],
                )),
                Node::text("loose"),
            ],
        })]);
        normalize_document(&mut doc);

        let list = doc.children[0].as_element().expect("list");
        assert!(list.id.is_none());
        assert!(list
            .children
            .iter()
            .all(|child| child.as_element().is_some_and(|e| e.kind == ElementKind::ListItem)));
    }

    #[test]
    fn empty_list_container_is_removed() {
        let mut doc = Document::new(vec![
            Node::Element(Element {
                id: None,
                kind: ElementKind::NumberedList,
                children: Vec::new(),
            }),
            Node::Element(Element::with_id(
                "p1",
                ElementKind::Paragraph,
                vec![Node::text("keep")],
            )),
        ]);
        normalize_document(&mut doc);
        assert_eq!(doc.children.len(), 1);
        assert_eq!(doc.children[0].plain_text(), "keep");
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut doc = Document::new(vec![
            Node::text("root leaf"),
            Node::Element(Element {
                id: None,
                kind: ElementKind::BulletedList,
                children: vec![Node::text("loose")],
            }),
            Node::Element(Element::with_id(
                "p1",
                ElementKind::Paragraph,
                vec![Node::Element(note_link("", vec![Node::Text(Text::default())]))],
            )),
        ]);
        normalize_document(&mut doc);
        let once = doc.clone();
        normalize_document(&mut doc);
        assert_eq!(doc, once);
    }

    #[test]
    fn targeted_normalize_repairs_seeded_region() {
        let mut doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::Element(note_link("", vec![Node::Text(Text::default())]))],
        ))]);
        normalize_from(&mut doc, vec![vec![0, 0]]);
        let paragraph = doc.children[0].as_element().expect("paragraph");
        assert!(paragraph
            .children
            .iter()
            .all(|child| matches!(child, Node::Text(_))));
    }
}
