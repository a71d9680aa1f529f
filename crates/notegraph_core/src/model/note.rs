//! Note record: a document plus ownership and lifecycle metadata.
//!
//! # Invariants
//! - `id` is stable for the note's lifetime and never reused.
//! - `content` is replaced wholesale on save; nodes are never shared across
//!   notes.

use crate::model::document::Document;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable note identifier, string-keyed like element ids.
pub type NoteId = String;

/// Who may read a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
}

/// One note: title, content tree and ownership metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: Document,
    pub owner: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds, bumped on every content or title change.
    pub updated_at: i64,
    pub visibility: Visibility,
}

impl Note {
    /// Creates a note with a fresh id and a single empty paragraph.
    pub fn new(title: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = epoch_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: Document::empty(),
            owner: owner.into(),
            created_at: now,
            updated_at: now,
            visibility: Visibility::Private,
        }
    }

    /// Marks the note as modified now.
    pub fn touch(&mut self) {
        self.updated_at = epoch_millis();
    }
}

pub(crate) fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
