//! Note use-case service.
//!
//! # Responsibility
//! - Provide note create/get/update/rename/delete APIs over a record store.
//! - Replace note content wholesale and keep it normalized.
//! - Cascade block deletions: rewrite every reference to the deleted block
//!   across the whole collection.
//!
//! # Invariants
//! - `update_note` uses full content replacement semantics.
//! - Stored content is always normalized.
//! - Cleanup updates each affected note once; per-note persistence calls
//!   are independent and a failed write does not roll back earlier ones.

use crate::editor::normalize::normalize_document;
use crate::editor::ops;
use crate::graph::strip_block_references;
use crate::model::document::{Document, Path};
use crate::model::note::{Note, NoteId};
use crate::store::{RecordStore, StoreError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Target block id does not exist in the named note.
    BlockNotFound { note_id: NoteId, block_id: String },
    /// Persistence-layer failure.
    Store(StoreError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::BlockNotFound { note_id, block_id } => {
                write!(f, "block `{block_id}` not found in note {note_id}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for NoteServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Outcome of a cascading block-reference cleanup.
///
/// Persistence is at-least-once, not atomic across notes: `failed` notes
/// keep their rewritten content in memory only and are reported rather than
/// rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// How many block references were rewritten in total.
    pub rewritten: usize,
    /// Notes whose rewritten content was persisted.
    pub updated: Vec<NoteId>,
    /// Notes whose persistence write failed.
    pub failed: Vec<NoteId>,
}

/// Note service facade over a record store.
pub struct NoteService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> NoteService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an empty note owned by `owner`.
    pub fn create_note(
        &mut self,
        title: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<Note, NoteServiceError> {
        let note = Note::new(title, owner);
        self.store.upsert(&note)?;
        info!(
            "event=note_create module=service status=ok note_id={}",
            note.id
        );
        Ok(note)
    }

    pub fn get_note(&self, id: &str) -> Result<Note, NoteServiceError> {
        self.store
            .get(id)?
            .ok_or_else(|| NoteServiceError::NoteNotFound(id.to_string()))
    }

    pub fn list_notes(&self) -> Result<Vec<Note>, NoteServiceError> {
        Ok(self.store.list_all()?)
    }

    /// Replaces the note's content wholesale, normalizing before persisting.
    pub fn update_note(
        &mut self,
        id: &str,
        mut content: Document,
    ) -> Result<Note, NoteServiceError> {
        let mut note = self.get_note(id)?;
        normalize_document(&mut content);
        note.content = content;
        note.touch();
        self.store.upsert(&note)?;
        Ok(note)
    }

    pub fn rename_note(&mut self, id: &str, title: impl Into<String>) -> Result<Note, NoteServiceError> {
        let mut note = self.get_note(id)?;
        note.title = title.into();
        note.touch();
        self.store.upsert(&note)?;
        Ok(note)
    }

    pub fn delete_note(&mut self, id: &str) -> Result<(), NoteServiceError> {
        self.store.delete(id)?;
        info!("event=note_delete module=service status=ok note_id={id}");
        Ok(())
    }

    /// Deletes the block carrying `block_id` from its note, then rewrites
    /// every reference to it across the collection into a plain paragraph.
    ///
    /// Each affected note is visited once and persisted independently; see
    /// [`CleanupReport`] for the partial-failure contract.
    pub fn delete_block(
        &mut self,
        note_id: &str,
        block_id: &str,
    ) -> Result<CleanupReport, NoteServiceError> {
        let mut origin = self.get_note(note_id)?;
        let Some(block_path) = find_block(&origin.content, block_id) else {
            return Err(NoteServiceError::BlockNotFound {
                note_id: note_id.to_string(),
                block_id: block_id.to_string(),
            });
        };
        if let Err(err) = ops::remove_node(&mut origin.content, &block_path) {
            warn!(
                "event=block_delete module=service status=error note_id={note_id} block_id={block_id} error={err}"
            );
            return Err(NoteServiceError::BlockNotFound {
                note_id: note_id.to_string(),
                block_id: block_id.to_string(),
            });
        }

        let mut report = CleanupReport::default();
        // The origin note also sheds any self-references before saving.
        report.rewritten += strip_block_references(&mut origin.content, block_id);
        normalize_document(&mut origin.content);
        origin.touch();
        self.store.upsert(&origin)?;
        report.updated.push(origin.id.clone());

        let others = self.store.list_all()?;
        for mut note in others {
            if note.id == origin.id {
                continue;
            }
            let rewritten = strip_block_references(&mut note.content, block_id);
            if rewritten == 0 {
                continue;
            }
            report.rewritten += rewritten;
            normalize_document(&mut note.content);
            note.touch();
            match self.store.upsert(&note) {
                Ok(()) => report.updated.push(note.id.clone()),
                Err(err) => {
                    error!(
                        "event=block_cleanup module=service status=error note_id={} block_id={block_id} error={err}",
                        note.id
                    );
                    report.failed.push(note.id.clone());
                }
            }
        }

        info!(
            "event=block_cleanup module=service status=ok block_id={block_id} rewritten={} updated={} failed={}",
            report.rewritten,
            report.updated.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

fn find_block(doc: &Document, block_id: &str) -> Option<Path> {
    doc.walk().find_map(|(path, node)| {
        let element = node.as_element()?;
        if element.id.as_deref() == Some(block_id) && element.kind.is_block() {
            Some(path)
        } else {
            None
        }
    })
}
