//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store access into use-case level APIs.
//! - Keep callers decoupled from storage and upload details.

pub mod media;
pub mod note_service;

pub use media::{ImageUploader, MediaError, MediaService, ObjectStorage, PlanTier};
pub use note_service::{CleanupReport, NoteService, NoteServiceError};
