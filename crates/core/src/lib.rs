//! # labsim core
//!
//! Order and result lifecycle engine for the lab message simulator.
//!
//! This crate creates orders, reports results against them and revises clinical documents:
//! - derives order and result statuses from the configured vocabulary
//! - fabricates or validates values against reference ranges
//! - merges new results into previously reported orders
//!
//! The orders it returns are the `hl7` crate's model and are rendered by [`hl7::Hl7Encoder`].
//!
//! **No delivery concerns**: scheduling pathway steps, persistence and message transport belong
//! to the caller.

pub mod config;
pub mod constants;
pub mod doctors;
pub mod error;
pub mod generator;
pub mod ids;
pub mod notes;
pub mod order_profile;
pub mod pathway;
pub mod reference_range;

pub use config::MessageConfig;
pub use doctors::{DoctorRegistry, Doctors};
pub use error::{OrderError, OrderResult};
pub use generator::OrderGenerator;
pub use ids::{IdGenerator, SequenceIdGenerator};
pub use notes::{NoteError, NoteGenerator};
pub use order_profile::{OrderProfile, OrderProfileLookup, OrderProfiles, TestType};
pub use pathway::{
    ClinicalNoteSpec, DateRequest, FlagRequest, OrderSpec, ResultSpec, ResultsSpec, ValueRequest,
};
pub use reference_range::{Classification, RangeError, ReferenceRange, Zone};
