//! Reference resolution over a note-collection snapshot.
//!
//! # Responsibility
//! - Resolve which notes link to a given note and which blocks reference a
//!   given block id.
//! - Derive the link graph consumed by graph views.
//! - Rewrite dangling block references when their target block disappears.
//!
//! # Invariants
//! - Resolution is read-only over the snapshot it is handed; it never
//!   mutates notes.
//! - Only [`strip_block_references`] mutates, and only the single document
//!   it is given.

pub mod backlinks;
pub mod graph_view;

pub use backlinks::{
    resolve_block_backlinks, resolve_note_backlinks, strip_block_references, BlockBacklinks,
    BlockMatch, NoteBacklinks,
};
pub use graph_view::{compute_graph_data, GraphData, GraphEdge, GraphNode};
