//! Block and tag indexes with skim-based fuzzy scoring.

use crate::model::document::{ElementKind, Node, NodeId, Path};
use crate::model::note::{Note, NoteId};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Worst acceptable score; `0.0` is an exact match.
pub const SCORE_THRESHOLD: f64 = 0.1;

/// One indexable block: the innermost block element on its branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBlock {
    pub id: Option<NodeId>,
    pub text: String,
    pub path: Path,
    pub note_id: NoteId,
    pub note_title: String,
}

/// A scored index entry. Lower is better.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a, T> {
    pub score: f64,
    pub entry: &'a T,
}

#[derive(Default)]
pub struct BlockIndex {
    entries: Vec<IndexedBlock>,
    matcher: SkimMatcherV2,
}

impl BlockIndex {
    /// Flattens every note into its lowest-level blocks. A block with a
    /// nested block descendant (a quote wrapping paragraphs, a list item
    /// wrapping anything block-shaped) is skipped in favor of the nested
    /// blocks themselves.
    pub fn build(notes: &[Note]) -> Self {
        let mut entries = Vec::new();
        for note in notes {
            for (path, node) in note.content.walk() {
                let Some(element) = node.as_element() else {
                    continue;
                };
                if !element.kind.is_block() || has_block_descendant(&element.children) {
                    continue;
                }
                entries.push(IndexedBlock {
                    id: element.id.clone(),
                    text: node.plain_text(),
                    path,
                    note_id: note.id.clone(),
                    note_title: note.title.clone(),
                });
            }
        }
        Self {
            entries,
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scores every entry against `query`, keeping matches under the
    /// threshold, ordered ascending. `None` means unbounded.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<SearchHit<'_, IndexedBlock>> {
        ranked(&self.matcher, self.entries.iter(), |entry| &entry.text, query, limit)
    }
}

#[derive(Default)]
pub struct TagIndex {
    names: Vec<String>,
    matcher: SkimMatcherV2,
}

impl TagIndex {
    /// Collects the de-duplicated tag names across the collection,
    /// preserving first-seen order.
    pub fn build(notes: &[Note]) -> Self {
        let mut names: Vec<String> = Vec::new();
        for note in notes {
            for (_, node) in note.content.walk() {
                let Some(element) = node.as_element() else {
                    continue;
                };
                if let ElementKind::Tag { name } = &element.kind {
                    if !names.iter().any(|known| known == name) {
                        names.push(name.clone());
                    }
                }
            }
        }
        Self {
            names,
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<SearchHit<'_, String>> {
        ranked(&self.matcher, self.names.iter(), |name| name, query, limit)
    }
}

/// Any block-shaped element anywhere under `children`.
fn has_block_descendant(children: &[Node]) -> bool {
    children.iter().any(|child| match child {
        Node::Element(element) => {
            element.kind.is_block()
                || element.kind.is_list_container()
                || has_block_descendant(&element.children)
        }
        Node::Text(_) => false,
    })
}

fn ranked<'a, T, I, F>(
    matcher: &SkimMatcherV2,
    entries: I,
    text_of: F,
    query: &str,
    limit: Option<usize>,
) -> Vec<SearchHit<'a, T>>
where
    I: Iterator<Item = &'a T>,
    F: Fn(&T) -> &str,
{
    if query.trim().is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<SearchHit<'a, T>> = entries
        .filter_map(|entry| {
            score_query(matcher, text_of(entry), query).map(|score| SearchHit { score, entry })
        })
        .filter(|hit| hit.score <= SCORE_THRESHOLD)
        .collect();
    hits.sort_by(|a, b| a.score.total_cmp(&b.score));
    if let Some(limit) = limit {
        hits.truncate(limit);
    }
    hits
}

/// Token-order-insensitive scoring: every query token must fuzzy-match the
/// text, each normalized against a perfect self-match, averaged. `0.0` is
/// exact, anything past the threshold is treated as no match upstream.
fn score_query(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<f64> {
    let haystack = text.to_lowercase();
    let mut total = 0.0;
    let mut tokens = 0usize;
    for token in query.to_lowercase().split_whitespace() {
        let raw = matcher.fuzzy_match(&haystack, token)?;
        let perfect = matcher.fuzzy_match(token, token)?.max(1);
        total += (1.0 - raw as f64 / perfect as f64).clamp(0.0, 1.0);
        tokens += 1;
    }
    if tokens == 0 {
        return None;
    }
    Some(total / tokens as f64)
}
