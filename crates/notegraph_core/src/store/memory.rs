//! In-memory store built on copy-on-write snapshots.
//!
//! Every mutation produces a fresh map behind a new `Arc`; a snapshot taken
//! before the write keeps observing the old collection. Resolvers and the
//! search indexer read a snapshot and never see a half-applied update.

use super::{RecordStore, StoreError, StoreResult};
use crate::model::note::{Note, NoteId};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Arc<BTreeMap<NoteId, Note>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current immutable collection snapshot.
    pub fn snapshot(&self) -> Arc<BTreeMap<NoteId, Note>> {
        Arc::clone(&self.snapshot)
    }

    fn with_map(&mut self, mutate: impl FnOnce(&mut BTreeMap<NoteId, Note>)) {
        let mut next = (*self.snapshot).clone();
        mutate(&mut next);
        self.snapshot = Arc::new(next);
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: &str) -> StoreResult<Option<Note>> {
        Ok(self.snapshot.get(id).cloned())
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        Ok(self.snapshot.values().cloned().collect())
    }

    fn upsert(&mut self, note: &Note) -> StoreResult<()> {
        self.with_map(|map| {
            map.insert(note.id.clone(), note.clone());
        });
        Ok(())
    }

    fn delete(&mut self, id: &str) -> StoreResult<()> {
        if !self.snapshot.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.with_map(|map| {
            map.remove(id);
        });
        Ok(())
    }
}
