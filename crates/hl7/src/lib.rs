//! HL7v2 wire boundary for the lab message simulator.
//!
//! This crate provides the **domain message model** and the **encoder** that renders it as
//! pipe/caret-delimited HL7v2 text:
//! - order, result and clinical-note structures produced by the lifecycle engine
//! - patient, visit and header structures supplied by callers
//! - per-segment renderers and per-message-type assemblers
//!
//! This crate focuses on:
//! - delimiter escaping and repeated-field handling
//! - date formatting in a configurable target time zone
//! - fixed segment order per (message type, trigger event)
//!
//! Transport framing (for example MLLP) is not handled here; callers receive the message text.

pub mod datetime;
pub mod encoding;
pub mod messages;
pub mod model;
pub mod segments;

pub use encoding::Delimiters;
pub use messages::{AdtEvent, Hl7Encoder, Hl7Message, MessageType, ResultTrigger};
pub use model::{
    Address, Allergy, AssociatedParty, ClinicalNote, ClinicalNoteContent, DiagnosisOrProcedure,
    Doctor, Document, HeaderInfo, LabResult, Order, PatientInfo, PatientLocation, Person,
    PrimaryFacility, ValueType, DIAGNOSTIC_SERV_ID_MDOC,
};

pub use labsim_types::{CodedElement, NullTime};

/// Errors returned by the `hl7` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum Hl7Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("found time with non-UTC location: {0}")]
    NonUtcTime(String),

    #[error("no local midnight on {0} in the target time zone")]
    MissingLocalMidnight(chrono::NaiveDate),

    #[error("cannot build {segment} segment: {source}")]
    Segment {
        segment: &'static str,
        #[source]
        source: Box<Hl7Error>,
    },
}

impl Hl7Error {
    /// Wraps an error raised while rendering the named segment.
    pub fn segment(segment: &'static str, source: Hl7Error) -> Self {
        Self::Segment {
            segment,
            source: Box::new(source),
        }
    }
}

/// Type alias for Results that can fail with an [`Hl7Error`].
pub type Hl7Result<T> = Result<T, Hl7Error>;
