//! Ordered editing behaviors layered over the base operations.
//!
//! # Responsibility
//! - Define the behavior interface: operation hooks plus inline/void
//!   classification predicates.
//! - Compose the standard chain. Later-registered behaviors execute their
//!   override first and may delegate down by returning [`Outcome::Pass`].
//!
//! # Invariants
//! - Behaviors are stateless; any side-effectful collaborator (uploads,
//!   persistence) lives in the service layer.
//! - A behavior that cannot apply cleanly declines instead of corrupting
//!   the tree.

pub mod autoformat;
pub mod breakout;
pub mod delete_backward;
pub mod html_import;
pub mod images;
pub mod links;

use super::Editor;
use crate::model::document::{ElementKind, Node, Path};
use std::rc::Rc;

/// Whether a behavior consumed the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Pass,
}

/// One file carried by a drop or paste event.
#[derive(Debug, Clone, Default)]
pub struct PastedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Clipboard payload for a paste or drop. Files take precedence, then the
/// editor's own serialization, then HTML, then plain text.
#[derive(Debug, Clone, Default)]
pub struct PasteData {
    /// JSON array of nodes in the document's own wire form.
    pub fragment_json: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
    /// File list from a drop event.
    pub files: Vec<PastedFile>,
}

impl PasteData {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            ..Self::default()
        }
    }

    pub fn files(files: Vec<PastedFile>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }
}

/// One editing behavior: a named subset of operation overrides.
pub trait Behavior {
    fn name(&self) -> &'static str;

    fn on_insert_text(&self, _editor: &mut Editor, _text: &str) -> Outcome {
        Outcome::Pass
    }

    fn on_insert_break(&self, _editor: &mut Editor) -> Outcome {
        Outcome::Pass
    }

    fn on_delete_backward(&self, _editor: &mut Editor) -> Outcome {
        Outcome::Pass
    }

    fn on_insert_data(&self, _editor: &mut Editor, _data: &PasteData) -> Outcome {
        Outcome::Pass
    }

    /// `Some(answer)` claims the classification; `None` delegates.
    fn is_inline(&self, _kind: &ElementKind) -> Option<bool> {
        None
    }

    fn is_void(&self, _kind: &ElementKind) -> Option<bool> {
        None
    }
}

/// Declares the fixed inline and void element sets consumed by the rest of
/// the chain, including the rule that tags and note links are inline.
pub struct ElementPolicy;

impl Behavior for ElementPolicy {
    fn name(&self) -> &'static str {
        "policy"
    }

    fn is_inline(&self, kind: &ElementKind) -> Option<bool> {
        Some(matches!(
            kind,
            ElementKind::ExternalLink { .. }
                | ElementKind::NoteLink { .. }
                | ElementKind::Tag { .. }
                | ElementKind::BlockReference { .. }
        ))
    }

    fn is_void(&self, kind: &ElementKind) -> Option<bool> {
        Some(matches!(
            kind,
            ElementKind::NoteLink { .. }
                | ElementKind::Tag { .. }
                | ElementKind::ThematicBreak
                | ElementKind::Image { .. }
                | ElementKind::BlockReference { .. }
        ))
    }
}

/// The standard chain in registration order. Execution order is the
/// reverse: HTML import and autoformat see events before the structural
/// behaviors, which see them before the base implementation.
pub fn default_chain() -> Rc<[Rc<dyn Behavior>]> {
    let chain: Vec<Rc<dyn Behavior>> = vec![
        Rc::new(ElementPolicy),
        Rc::new(delete_backward::BlockDeleteBackward),
        Rc::new(breakout::BlockBreakout),
        Rc::new(links::LinkDetection),
        Rc::new(images::ImagePaste),
        Rc::new(autoformat::Autoformat),
        Rc::new(html_import::HtmlImport),
    ];
    chain.into()
}

/// Extracts one item out of a list container, splitting the container so
/// sibling items keep their list.
///
/// Returns the extracted item's new path (a sibling of the container).
pub(crate) fn extract_list_item(
    editor: &mut Editor,
    container_path: &[usize],
    item_index: usize,
) -> Option<Path> {
    let container = editor
        .doc
        .node_at_mut(container_path)
        .and_then(Node::as_element_mut)?;
    if !container.kind.is_list_container() || item_index >= container.children.len() {
        return None;
    }
    let container_kind = container.kind.clone();
    let trailing: Vec<Node> = container.children.drain(item_index + 1..).collect();
    let item = container.children.remove(item_index);
    let container_emptied = container.children.is_empty();

    let Some((&container_index, parent)) = container_path.split_last() else {
        return None;
    };
    let mut item_path = parent.to_vec();
    if container_emptied {
        // The item takes the container's slot so paths stay stable.
        editor.apply_remove_node(container_path).ok()?;
        item_path.push(container_index);
    } else {
        item_path.push(container_index + 1);
    }
    editor.apply_insert_node(&item_path, item).ok()?;

    if !trailing.is_empty() {
        let mut rest_path = parent.to_vec();
        rest_path.push(item_path[item_path.len() - 1] + 1);
        let rest = Node::Element(crate::model::document::Element {
            id: None,
            kind: container_kind,
            children: trailing,
        });
        let _ = editor.apply_insert_node(&rest_path, rest);
    }
    editor.mark_dirty(container_path);
    Some(item_path)
}

/// Whether any ancestor on `path` is a list container.
pub(crate) fn inside_list(editor: &Editor, path: &[usize]) -> bool {
    (1..path.len()).any(|cut| {
        editor
            .doc
            .node_at(&path[..cut])
            .and_then(Node::as_element)
            .is_some_and(|element| element.kind.is_list_container())
    })
}
