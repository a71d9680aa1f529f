//! Note and block backlink resolution.

use crate::model::document::{Element, ElementKind, Node, Path};
use crate::model::note::{Note, NoteId};
use serde::Serialize;

/// All links from one note to a target note, with a snippet per match.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBacklinks {
    pub note_id: NoteId,
    pub title: String,
    /// Rendered text of the nearest enclosing block, one per link.
    pub matches: Vec<String>,
}

/// One block reference found in a note, addressable by path.
#[derive(Debug, Clone, Serialize)]
pub struct BlockMatch {
    pub path: Path,
    pub element: Element,
}

/// All references from one note to a target block.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockBacklinks {
    pub note_id: NoteId,
    pub title: String,
    pub matches: Vec<BlockMatch>,
}

/// Collects, per note, every note link pointing at `target` whose rendered
/// text is non-empty. Notes without a match produce no entry; the result
/// carries no particular order.
pub fn resolve_note_backlinks(notes: &[Note], target: &str) -> Vec<NoteBacklinks> {
    let mut results = Vec::new();
    for note in notes {
        let mut matches = Vec::new();
        for (path, node) in note.content.walk() {
            let Some(element) = node.as_element() else {
                continue;
            };
            let ElementKind::NoteLink { note_id, .. } = &element.kind else {
                continue;
            };
            if note_id != target || element.rendered_text().is_empty() {
                continue;
            }
            let snippet = note
                .content
                .enclosing_block(&path)
                .map(|(block_path, _)| {
                    note.content
                        .node_at(&block_path)
                        .map(Node::plain_text)
                        .unwrap_or_default()
                })
                .unwrap_or_default();
            matches.push(snippet);
        }
        if !matches.is_empty() {
            results.push(NoteBacklinks {
                note_id: note.id.clone(),
                title: note.title.clone(),
                matches,
            });
        }
    }
    results
}

/// Collects, per note, every block reference pointing at `block_id`.
pub fn resolve_block_backlinks(notes: &[Note], block_id: &str) -> Vec<BlockBacklinks> {
    let mut results = Vec::new();
    for note in notes {
        let mut matches = Vec::new();
        for (path, node) in note.content.walk() {
            let Some(element) = node.as_element() else {
                continue;
            };
            if matches!(&element.kind, ElementKind::BlockReference { block_id: id } if id == block_id)
            {
                matches.push(BlockMatch {
                    path,
                    element: element.clone(),
                });
            }
        }
        if !matches.is_empty() {
            results.push(BlockBacklinks {
                note_id: note.id.clone(),
                title: note.title.clone(),
                matches,
            });
        }
    }
    results
}

/// Converts every block reference to `block_id` in `doc` into a paragraph,
/// keeping children untouched. Returns how many references were rewritten.
///
/// Run against each affected note when the target block is deleted so no
/// dangling reference survives.
pub fn strip_block_references(doc: &mut crate::model::document::Document, block_id: &str) -> usize {
    let mut rewritten = 0;
    let targets: Vec<Path> = doc
        .walk()
        .filter(|(_, node)| {
            node.as_element().is_some_and(|element| {
                matches!(&element.kind, ElementKind::BlockReference { block_id: id } if id == block_id)
            })
        })
        .map(|(path, _)| path)
        .collect();
    for path in targets {
        if let Some(element) = doc.node_at_mut(&path).and_then(Node::as_element_mut) {
            element.kind = ElementKind::Paragraph;
            rewritten += 1;
        }
    }
    rewritten
}
