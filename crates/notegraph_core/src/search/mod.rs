//! Fuzzy search over the note collection.
//!
//! # Responsibility
//! - Flatten documents into indexable block and tag entries.
//! - Score queries against entries with a tight similarity threshold.
//! - Coalesce rebuild requests behind a quiet-period debounce so indexing
//!   cost is bounded by quiet periods, not keystrokes.
//!
//! # Invariants
//! - Indexes are rebuilt wholesale from a snapshot; a built index never
//!   changes afterwards.
//! - Scores are `0.0..=1.0` with `0.0` meaning an exact match; results are
//!   ordered ascending.

pub mod debounce;
pub mod index;

pub use debounce::Debouncer;
pub use index::{BlockIndex, IndexedBlock, SearchHit, TagIndex, SCORE_THRESHOLD};

use crate::model::note::Note;
use log::debug;

/// Pairs the two indexes with the rebuild debounce. `note_changed` is called
/// on every mutation; `poll` performs the rebuild once the quiet period has
/// elapsed.
pub struct SearchIndexer {
    blocks: BlockIndex,
    tags: TagIndex,
    debouncer: Debouncer,
}

impl SearchIndexer {
    pub fn new() -> Self {
        Self {
            blocks: BlockIndex::default(),
            tags: TagIndex::default(),
            debouncer: Debouncer::new(debounce::REBUILD_WINDOW_MS),
        }
    }

    /// Schedules a rebuild, superseding any pending one.
    pub fn note_changed(&mut self, now_ms: u64) {
        self.debouncer.schedule(now_ms);
    }

    /// Rebuilds both indexes if a scheduled rebuild has come due. Returns
    /// whether a rebuild ran; a `true` return is also the caller's cue to
    /// refresh views derived from the same snapshot, such as backlinks.
    pub fn poll(&mut self, now_ms: u64, notes: &[Note]) -> bool {
        if !self.debouncer.take_due(now_ms) {
            return false;
        }
        self.rebuild(notes);
        true
    }

    /// Unconditional rebuild from a snapshot.
    pub fn rebuild(&mut self, notes: &[Note]) {
        self.blocks = BlockIndex::build(notes);
        self.tags = TagIndex::build(notes);
        debug!(
            "event=search_rebuild module=search status=ok blocks={} tags={}",
            self.blocks.len(),
            self.tags.len()
        );
    }

    pub fn blocks(&self) -> &BlockIndex {
        &self.blocks
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }
}

impl Default for SearchIndexer {
    fn default() -> Self {
        Self::new()
    }
}
