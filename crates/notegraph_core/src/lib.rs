//! Core domain logic for NoteGraph: a rich-text note model with
//! wiki-style links, backlink resolution and fuzzy search.
//! This crate is the single source of truth for document invariants.

pub mod editor;
pub mod graph;
pub mod logging;
pub mod model;
pub mod search;
pub mod service;
pub mod store;

pub use editor::behaviors::{Behavior, Outcome, PasteData, PastedFile};
pub use editor::Editor;
pub use graph::{
    compute_graph_data, resolve_block_backlinks, resolve_note_backlinks, strip_block_references,
    BlockBacklinks, GraphData, NoteBacklinks,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{Document, Element, ElementKind, Mark, Node, Point, Text};
pub use model::note::{Note, NoteId, Visibility};
pub use search::{BlockIndex, Debouncer, IndexedBlock, SearchIndexer, TagIndex};
pub use service::{ImageUploader, MediaService, NoteService, ObjectStorage, PlanTier};
pub use store::{MemoryStore, RecordStore, SqliteStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
