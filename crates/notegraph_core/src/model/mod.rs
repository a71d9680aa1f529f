//! Domain model for rich-text note documents.
//!
//! # Responsibility
//! - Define the canonical document tree shared by editing, resolving and
//!   indexing code.
//! - Keep one serialization shape for persistence and clipboard transport.
//!
//! # Invariants
//! - Every non-list-container element carries a stable `NodeId`.
//! - Trees serialize to the nested JSON form and round-trip identically.

pub mod document;
pub mod note;
