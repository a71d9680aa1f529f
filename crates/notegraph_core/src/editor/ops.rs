//! Low-level tree edit operations.
//!
//! # Responsibility
//! - Implement the path-addressed edit primitives the behavior pipeline
//!   builds on: insert, remove, patch, move, wrap/unwrap, split, merge and
//!   text edits.
//! - Keep every operation bounds-checked so a stale path is an error, never
//!   a corrupted tree.
//!
//! # Invariants
//! - An operation either applies cleanly or leaves the document unchanged.
//! - Every element entering the tree without an id (and not a list
//!   container) receives a fresh id before the operation returns.

use crate::model::document::{new_node_id, Document, Element, ElementKind, Mark, Node, Path, Point};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for edit operations.
pub type EditResult<T> = Result<T, EditError>;

/// Errors from path-addressed edit primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Path does not resolve to a node (or a valid insertion slot).
    InvalidPath(Path),
    /// Text offset is out of range or not on a character boundary.
    InvalidOffset { path: Path, offset: usize },
    /// Operation requires an element node at this path.
    NotAnElement(Path),
    /// Operation requires a text leaf at this path.
    NotAText(Path),
    /// Sibling range for wrapping is empty or out of bounds.
    InvalidRange { start: usize, end: usize },
    /// Nodes at and before this path cannot be merged.
    CannotMerge(Path),
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(path) => write!(f, "no node at path {path:?}"),
            Self::InvalidOffset { path, offset } => {
                write!(f, "invalid text offset {offset} at path {path:?}")
            }
            Self::NotAnElement(path) => write!(f, "node at {path:?} is not an element"),
            Self::NotAText(path) => write!(f, "node at {path:?} is not a text leaf"),
            Self::InvalidRange { start, end } => {
                write!(f, "invalid sibling range {start}..={end}")
            }
            Self::CannotMerge(path) => write!(f, "cannot merge node at {path:?}"),
        }
    }
}

impl Error for EditError {}

/// Assigns fresh ids to every id-less, non-list-container element in the
/// subtree. Existing ids are never touched.
pub fn ensure_ids(node: &mut Node) {
    if let Node::Element(element) = node {
        if element.id.is_none() && !element.kind.is_list_container() {
            element.id = Some(new_node_id());
        }
        for child in &mut element.children {
            ensure_ids(child);
        }
    }
}

fn siblings_for_slot<'doc>(
    doc: &'doc mut Document,
    path: &[usize],
) -> EditResult<(&'doc mut Vec<Node>, usize)> {
    let Some((&index, parent)) = path.split_last() else {
        return Err(EditError::InvalidPath(path.to_vec()));
    };
    let siblings = if parent.is_empty() {
        &mut doc.children
    } else {
        match doc.node_at_mut(parent) {
            Some(Node::Element(element)) => &mut element.children,
            Some(Node::Text(_)) => return Err(EditError::NotAnElement(parent.to_vec())),
            None => return Err(EditError::InvalidPath(path.to_vec())),
        }
    };
    Ok((siblings, index))
}

/// Inserts `node` so that it ends up at `path`.
///
/// The final path segment may equal the current child count (append slot).
pub fn insert_node(doc: &mut Document, path: &[usize], mut node: Node) -> EditResult<()> {
    ensure_ids(&mut node);
    let (siblings, index) = siblings_for_slot(doc, path)?;
    if index > siblings.len() {
        return Err(EditError::InvalidPath(path.to_vec()));
    }
    siblings.insert(index, node);
    Ok(())
}

/// Removes and returns the node at `path`.
pub fn remove_node(doc: &mut Document, path: &[usize]) -> EditResult<Node> {
    let (siblings, index) = siblings_for_slot(doc, path)?;
    if index >= siblings.len() {
        return Err(EditError::InvalidPath(path.to_vec()));
    }
    Ok(siblings.remove(index))
}

/// Property patch applied by [`set_node_properties`].
///
/// Ids are deliberately not patchable: they are assigned once at insertion
/// and stay immutable for the node's lifetime.
#[derive(Debug, Clone)]
pub enum NodePatch {
    /// Replace the element kind, keeping id and children.
    Kind(ElementKind),
    /// Toggle one mark on a text leaf.
    Mark { mark: Mark, on: bool },
}

/// Applies a property patch to the node at `path`.
pub fn set_node_properties(doc: &mut Document, path: &[usize], patch: NodePatch) -> EditResult<()> {
    let node = doc
        .node_at_mut(path)
        .ok_or_else(|| EditError::InvalidPath(path.to_vec()))?;
    match patch {
        NodePatch::Kind(kind) => {
            let element = node
                .as_element_mut()
                .ok_or_else(|| EditError::NotAnElement(path.to_vec()))?;
            element.kind = kind;
            Ok(())
        }
        NodePatch::Mark { mark, on } => {
            let leaf = node
                .as_text_mut()
                .ok_or_else(|| EditError::NotAText(path.to_vec()))?;
            leaf.set_mark(mark, on);
            Ok(())
        }
    }
}

/// Moves the node at `from` to `to`.
///
/// `to` is interpreted against the tree after removal, so moving within one
/// parent toward a later index must account for the removed slot.
pub fn move_node(doc: &mut Document, from: &[usize], to: &[usize]) -> EditResult<()> {
    let node = remove_node(doc, from)?;
    if let Err(err) = insert_node(doc, to, node.clone()) {
        // Put the node back so a bad destination cannot lose content.
        let _ = insert_node(doc, from, node);
        return Err(err);
    }
    Ok(())
}

/// Wraps the sibling range `start..=end` under `parent_path` in a new
/// element of `kind`.
pub fn wrap_nodes(
    doc: &mut Document,
    parent_path: &[usize],
    start: usize,
    end: usize,
    kind: ElementKind,
) -> EditResult<()> {
    let children = if parent_path.is_empty() {
        &mut doc.children
    } else {
        match doc.node_at_mut(parent_path) {
            Some(Node::Element(element)) => &mut element.children,
            Some(Node::Text(_)) => return Err(EditError::NotAnElement(parent_path.to_vec())),
            None => return Err(EditError::InvalidPath(parent_path.to_vec())),
        }
    };
    if start > end || end >= children.len() {
        return Err(EditError::InvalidRange { start, end });
    }
    let wrapped: Vec<Node> = children.drain(start..=end).collect();
    children.insert(start, Node::Element(Element::new(kind, wrapped)));
    Ok(())
}

/// Replaces the element at `path` with its own children.
pub fn unwrap_node(doc: &mut Document, path: &[usize]) -> EditResult<()> {
    let (siblings, index) = siblings_for_slot(doc, path)?;
    if index >= siblings.len() {
        return Err(EditError::InvalidPath(path.to_vec()));
    }
    let Node::Element(element) = siblings.remove(index) else {
        return Err(EditError::NotAnElement(path.to_vec()));
    };
    siblings.splice(index..index, element.children);
    Ok(())
}

/// Unwraps every element matched by `matcher`, deepest-last order so earlier
/// splices cannot invalidate pending paths.
pub fn unwrap_nodes(doc: &mut Document, matcher: impl Fn(&Element) -> bool) -> EditResult<usize> {
    let mut targets: Vec<Path> = doc
        .walk()
        .filter(|(_, node)| node.as_element().is_some_and(&matcher))
        .map(|(path, _)| path)
        .collect();
    targets.reverse();
    let count = targets.len();
    for path in targets {
        unwrap_node(doc, &path)?;
    }
    Ok(count)
}

/// Splits the block enclosing `point` into two sibling blocks.
///
/// Content before the point stays in place; the remainder moves into a new
/// sibling of the same kind (fresh id) inserted directly after. Returns the
/// new block's path.
pub fn split_node(doc: &mut Document, point: &Point) -> EditResult<Path> {
    let (block_path, _) = doc
        .enclosing_block(&point.path)
        .ok_or_else(|| EditError::InvalidPath(point.path.clone()))?;
    if block_path.len() >= point.path.len() {
        return Err(EditError::NotAText(point.path.clone()));
    }

    let relative = point.path[block_path.len()..].to_vec();
    let block = doc
        .node_at_mut(&block_path)
        .and_then(Node::as_element_mut)
        .ok_or_else(|| EditError::InvalidPath(block_path.clone()))?;
    let kind = block.kind.clone();
    let tail = split_children(&mut block.children, &relative, point.offset, &point.path)?;

    let mut sibling_path = block_path;
    let last = sibling_path
        .last_mut()
        .ok_or_else(|| EditError::InvalidPath(point.path.clone()))?;
    *last += 1;
    insert_node(
        doc,
        &sibling_path,
        Node::Element(Element::new(kind, tail)),
    )?;
    Ok(sibling_path)
}

fn split_children(
    children: &mut Vec<Node>,
    relative: &[usize],
    offset: usize,
    full_path: &[usize],
) -> EditResult<Vec<Node>> {
    let Some((&index, rest)) = relative.split_first() else {
        return Err(EditError::InvalidPath(full_path.to_vec()));
    };
    if index >= children.len() {
        return Err(EditError::InvalidPath(full_path.to_vec()));
    }

    if rest.is_empty() {
        let leaf = children[index]
            .as_text_mut()
            .ok_or_else(|| EditError::NotAText(full_path.to_vec()))?;
        if offset > leaf.text.len() || !leaf.text.is_char_boundary(offset) {
            return Err(EditError::InvalidOffset {
                path: full_path.to_vec(),
                offset,
            });
        }
        let mut tail_leaf = leaf.clone();
        tail_leaf.text = leaf.text.split_off(offset);
        let mut moved: Vec<Node> = children.drain(index + 1..).collect();
        moved.insert(0, Node::Text(tail_leaf));
        Ok(moved)
    } else {
        let element = children[index]
            .as_element_mut()
            .ok_or_else(|| EditError::NotAnElement(full_path.to_vec()))?;
        let kind = element.kind.clone();
        let inner = split_children(&mut element.children, rest, offset, full_path)?;
        let mut moved: Vec<Node> = children.drain(index + 1..).collect();
        moved.insert(0, Node::Element(Element::new(kind, inner)));
        Ok(moved)
    }
}

/// Merges the node at `path` into its previous sibling.
///
/// Elements of matching shape append children; text leaves with identical
/// marks concatenate. Anything else is a [`EditError::CannotMerge`].
pub fn merge_node(doc: &mut Document, path: &[usize]) -> EditResult<()> {
    let Some((&index, _)) = path.split_last() else {
        return Err(EditError::InvalidPath(path.to_vec()));
    };
    if index == 0 {
        return Err(EditError::CannotMerge(path.to_vec()));
    }
    let mut previous_path = path.to_vec();
    if let Some(last) = previous_path.last_mut() {
        *last -= 1;
    }

    // Compatibility is checked before any mutation so a refused merge
    // leaves the tree untouched.
    let compatible = match (doc.node_at(&previous_path), doc.node_at(path)) {
        (Some(Node::Element(_)), Some(Node::Element(_))) => true,
        (Some(Node::Text(previous)), Some(Node::Text(current))) => {
            previous.mark_key() == current.mark_key()
        }
        (Some(_), Some(_)) => false,
        _ => return Err(EditError::InvalidPath(path.to_vec())),
    };
    if !compatible {
        return Err(EditError::CannotMerge(path.to_vec()));
    }

    let node = remove_node(doc, path)?;
    let Some(previous) = doc.node_at_mut(&previous_path) else {
        return Err(EditError::InvalidPath(previous_path));
    };
    match (previous, node) {
        (Node::Element(target), Node::Element(source)) => {
            target.children.extend(source.children);
        }
        (Node::Text(target), Node::Text(source)) => {
            target.text.push_str(&source.text);
        }
        _ => {}
    }
    Ok(())
}

/// Removes `len` bytes of text at `offset` in the leaf at `path`.
pub fn delete_text(doc: &mut Document, path: &[usize], offset: usize, len: usize) -> EditResult<()> {
    let leaf = match doc.node_at_mut(path) {
        Some(Node::Text(leaf)) => leaf,
        Some(Node::Element(_)) => return Err(EditError::NotAText(path.to_vec())),
        None => return Err(EditError::InvalidPath(path.to_vec())),
    };
    let end = offset.checked_add(len).unwrap_or(usize::MAX);
    if end > leaf.text.len()
        || !leaf.text.is_char_boundary(offset)
        || !leaf.text.is_char_boundary(end)
    {
        return Err(EditError::InvalidOffset {
            path: path.to_vec(),
            offset,
        });
    }
    leaf.text.replace_range(offset..end, "");
    Ok(())
}

/// Inserts `text` at `point` in an existing leaf.
pub fn insert_text(doc: &mut Document, point: &Point, text: &str) -> EditResult<()> {
    let leaf = match doc.node_at_mut(&point.path) {
        Some(Node::Text(leaf)) => leaf,
        Some(Node::Element(_)) => return Err(EditError::NotAText(point.path.clone())),
        None => return Err(EditError::InvalidPath(point.path.clone())),
    };
    if point.offset > leaf.text.len() || !leaf.text.is_char_boundary(point.offset) {
        return Err(EditError::InvalidOffset {
            path: point.path.clone(),
            offset: point.offset,
        });
    }
    leaf.text.insert_str(point.offset, text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        delete_text, insert_node, merge_node, move_node, remove_node, set_node_properties,
        split_node, unwrap_node, unwrap_nodes, wrap_nodes, EditError, NodePatch,
    };
    use crate::model::document::{Document, Element, ElementKind, Mark, Node, Point};

    fn paragraph(id: &str, text: &str) -> Node {
        Node::Element(Element::with_id(
            id,
            ElementKind::Paragraph,
            vec![Node::text(text)],
        ))
    }

    #[test]
    fn insert_node_assigns_missing_ids_recursively() {
        let mut doc = Document::new(vec![paragraph("p1", "one")]);
        let block = Node::Element(Element {
            id: None,
            kind: ElementKind::Blockquote,
            children: vec![Node::Element(Element {
                id: None,
                kind: ElementKind::Paragraph,
                children: vec![Node::text("quoted")],
            })],
        });
        insert_node(&mut doc, &[1], block).expect("insert should succeed");

        let quote = doc.children[1].as_element().expect("quote element");
        assert!(quote.id.is_some());
        assert!(quote.children[0].as_element().expect("inner").id.is_some());
    }

    #[test]
    fn insert_node_rejects_out_of_range_slot() {
        let mut doc = Document::new(vec![paragraph("p1", "one")]);
        let err = insert_node(&mut doc, &[5], paragraph("p2", "x")).unwrap_err();
        assert!(matches!(err, EditError::InvalidPath(_)));
        assert_eq!(doc.children.len(), 1);
    }

    #[test]
    fn split_node_divides_leaf_and_moves_tail() {
        let mut doc = Document::new(vec![paragraph("p1", "hello world")]);
        let new_path = split_node(&mut doc, &Point::new(vec![0, 0], 5)).expect("split");
        assert_eq!(new_path, vec![1]);
        assert_eq!(doc.children[0].plain_text(), "hello");
        assert_eq!(doc.children[1].plain_text(), " world");
        // The tail block is a fresh element with its own id.
        let first_id = doc.children[0].as_element().and_then(|e| e.id.clone());
        let second_id = doc.children[1].as_element().and_then(|e| e.id.clone());
        assert_eq!(first_id.as_deref(), Some("p1"));
        assert!(second_id.is_some());
        assert_ne!(first_id, second_id);
    }

    #[test]
    fn split_node_rejects_non_boundary_offset() {
        let mut doc = Document::new(vec![paragraph("p1", "héllo")]);
        // Offset 2 lands inside the two-byte `é`.
        let err = split_node(&mut doc, &Point::new(vec![0, 0], 2)).unwrap_err();
        assert!(matches!(err, EditError::InvalidOffset { .. }));
        assert_eq!(doc.children[0].plain_text(), "héllo");
    }

    #[test]
    fn merge_node_concatenates_compatible_leaves() {
        let mut doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::text("ab"), Node::text("cd")],
        ))]);
        merge_node(&mut doc, &[0, 1]).expect("merge");
        assert_eq!(doc.children[0].plain_text(), "abcd");
    }

    #[test]
    fn merge_node_refuses_mark_mismatch_without_losing_content() {
        let mut doc = Document::new(vec![Node::Element(Element::with_id(
            "p1",
            ElementKind::Paragraph,
            vec![Node::text("ab"), Node::text("cd")],
        ))]);
        set_node_properties(
            &mut doc,
            &[0, 1],
            NodePatch::Mark {
                mark: Mark::Bold,
                on: true,
            },
        )
        .expect("mark");
        let err = merge_node(&mut doc, &[0, 1]).unwrap_err();
        assert!(matches!(err, EditError::CannotMerge(_)));
        assert_eq!(doc.children[0].plain_text(), "abcd");
    }

    #[test]
    fn move_node_destination_counts_post_removal_slots() {
        let mut doc = Document::new(vec![
            paragraph("p1", "a"),
            paragraph("p2", "b"),
            paragraph("p3", "c"),
        ]);
        // After removing [0] the siblings are [b, c], so slot 2 is the end.
        move_node(&mut doc, &[0], &[2]).expect("move");
        let texts: Vec<String> = doc.children.iter().map(Node::plain_text).collect();
        assert_eq!(texts, ["b", "c", "a"]);
    }

    #[test]
    fn move_node_restores_source_when_destination_is_invalid() {
        let mut doc = Document::new(vec![
            paragraph("p1", "a"),
            paragraph("p2", "b"),
            paragraph("p3", "c"),
        ]);
        let err = move_node(&mut doc, &[0], &[7]).unwrap_err();
        assert!(matches!(err, EditError::InvalidPath(_)));
        let texts: Vec<String> = doc.children.iter().map(Node::plain_text).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert_eq!(
            doc.children[0].as_element().and_then(|e| e.id.as_deref()),
            Some("p1")
        );
    }

    #[test]
    fn wrap_and_unwrap_round_trip_sibling_range() {
        let mut doc = Document::new(vec![paragraph("p1", "a"), paragraph("p2", "b")]);
        wrap_nodes(&mut doc, &[], 0, 1, ElementKind::Blockquote).expect("wrap");
        assert_eq!(doc.children.len(), 1);
        unwrap_node(&mut doc, &[0]).expect("unwrap");
        assert_eq!(doc.children.len(), 2);
        assert_eq!(doc.children[0].plain_text(), "a");
    }

    #[test]
    fn unwrap_nodes_matcher_handles_multiple_targets() {
        let mut doc = Document::new(vec![
            Node::Element(Element {
                id: None,
                kind: ElementKind::BulletedList,
                children: vec![paragraph("li1", "one")],
            }),
            Node::Element(Element {
                id: None,
                kind: ElementKind::BulletedList,
                children: vec![paragraph("li2", "two")],
            }),
        ]);
        let count =
            unwrap_nodes(&mut doc, |element| element.kind.is_list_container()).expect("unwrap");
        assert_eq!(count, 2);
        assert_eq!(doc.children.len(), 2);
        assert!(doc
            .children
            .iter()
            .all(|node| node.as_element().is_some_and(|e| !e.kind.is_list_container())));
    }

    #[test]
    fn delete_text_is_bounds_checked() {
        let mut doc = Document::new(vec![paragraph("p1", "hello")]);
        delete_text(&mut doc, &[0, 0], 0, 2).expect("delete");
        assert_eq!(doc.children[0].plain_text(), "llo");
        let err = delete_text(&mut doc, &[0, 0], 2, 9).unwrap_err();
        assert!(matches!(err, EditError::InvalidOffset { .. }));
    }

    #[test]
    fn remove_node_returns_subtree() {
        let mut doc = Document::new(vec![paragraph("p1", "a"), paragraph("p2", "b")]);
        let removed = remove_node(&mut doc, &[0]).expect("remove");
        assert_eq!(removed.plain_text(), "a");
        assert_eq!(doc.children.len(), 1);
    }
}
