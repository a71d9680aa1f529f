//! Note persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the record-store contract the service layer mutates through.
//! - Isolate SQLite query and serialization details from orchestration.
//!
//! # Invariants
//! - `upsert` replaces the whole record; there are no partial writes.
//! - Readers get point-in-time data; a returned note never changes under
//!   the caller.

use crate::model::note::{Note, NoteId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{open_store, open_store_in_memory, SqliteStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Serialization(serde_json::Error),
    NotFound(NoteId),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "content serialization failed: {err}"),
            Self::NotFound(id) => write!(f, "note `{id}` not found"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidData(message) => write!(f, "{message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Keyed note persistence. The service layer is the only writer; resolvers
/// and indexes read whole-collection snapshots via `list_all`.
pub trait RecordStore {
    fn get(&self, id: &str) -> StoreResult<Option<Note>>;
    fn list_all(&self) -> StoreResult<Vec<Note>>;
    fn upsert(&mut self, note: &Note) -> StoreResult<()>;
    /// Deleting an unknown id is an error, not a silent no-op.
    fn delete(&mut self, id: &str) -> StoreResult<()>;
}
