//! Clinical text collaborator.

use crate::pathway::ClinicalNoteSpec;
use chrono::{DateTime, Utc};
use hl7::ClinicalNote;

/// Error type returned by [`NoteGenerator`] implementations.
pub type NoteError = Box<dyn std::error::Error + Send + Sync>;

/// Produces free-text notes and clinical documents.
pub trait NoteGenerator {
    /// Notes attached to a result when the pathway supplies none. May be empty.
    fn random_notes_for_result(&self) -> Vec<String>;

    /// Builds a clinical note for `spec`.
    ///
    /// When `existing` is given the returned note is its next revision: the implementation is
    /// responsible for carrying over the existing contents and appending the new ones. The
    /// engine stores the returned note as is.
    fn random_document_for_clinical_note(
        &self,
        spec: &ClinicalNoteSpec,
        existing: Option<&ClinicalNote>,
        at: DateTime<Utc>,
    ) -> Result<ClinicalNote, NoteError>;
}
