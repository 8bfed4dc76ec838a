//! Requests handed to the lifecycle engine by the pathway runner.
//!
//! Responsibilities:
//! - Describe what a step of a pathway asks for: an order, a set of results, a clinical note
//! - Turn the sentinel strings of hand-written pathways into typed requests
//!
//! Notes:
//! - `None` status overrides mean "derive it"; an empty string counts as no override
//! - A result with no value requests a random value inside the reference range

use crate::constants::{
    ABNORMAL_HIGH, ABNORMAL_LOW, DEFAULT, EMPTY, HIGH, LOW, MIDNIGHT, NORMAL,
};
use crate::reference_range::Zone;
use chrono::Duration;

/// Request to place a new order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderSpec {
    /// Profile name, or [`crate::constants::RANDOM`] for any known profile.
    pub order_profile: String,
    pub order_status: Option<String>,
}

/// Request to report results for an order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultsSpec {
    pub order_profile: String,
    /// Empty means one random normal result per test in the profile.
    pub results: Vec<ResultSpec>,
    pub collected_date_time: DateRequest,
    pub received_in_lab_date_time: DateRequest,
    pub order_status: Option<String>,
    pub result_status: Option<String>,
}

/// One requested result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSpec {
    /// Test code used when the order profile is unknown. Defaults to the test name.
    pub id: String,
    pub test_name: String,
    pub value: ValueRequest,
    pub unit: String,
    /// Overrides the profile's reference range when non-empty.
    pub reference_range: String,
    pub abnormal_flag: FlagRequest,
    pub result_status: Option<String>,
    /// `Some` replaces the generated notes, including with an empty list.
    pub notes: Option<Vec<String>>,
    pub observation_date_time_offset: Option<Duration>,
}

impl ResultSpec {
    /// A request for a random normal value of `test_name`.
    pub fn random(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            ..Self::default()
        }
    }
}

/// Request for a clinical document or a revision of one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClinicalNoteSpec {
    pub content_type: String,
    pub document_id: String,
    pub document_title: String,
    pub document_type: String,
}

// ============================================================================
// Sentinel requests
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueRequest {
    Literal(String),
    Empty,
    Random(Zone),
}

impl Default for ValueRequest {
    fn default() -> Self {
        Self::Random(Zone::Normal)
    }
}

impl From<&str> for ValueRequest {
    fn from(value: &str) -> Self {
        match value.trim() {
            "" | NORMAL => Self::Random(Zone::Normal),
            ABNORMAL_HIGH => Self::Random(Zone::AbnormalHigh),
            ABNORMAL_LOW => Self::Random(Zone::AbnormalLow),
            EMPTY => Self::Empty,
            _ => Self::Literal(value.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateRequest {
    /// Keep the order's existing time, else use the report time.
    #[default]
    Default,
    Empty,
    Midnight,
}

impl From<&str> for DateRequest {
    fn from(value: &str) -> Self {
        match value.trim() {
            EMPTY => Self::Empty,
            MIDNIGHT => Self::Midnight,
            _ => Self::Default,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FlagRequest {
    /// Compare the value against the reference range.
    #[default]
    Compute,
    High,
    Low,
    Normal,
    /// Sent verbatim.
    Literal(String),
}

impl From<&str> for FlagRequest {
    fn from(value: &str) -> Self {
        match value.trim() {
            "" | DEFAULT => Self::Compute,
            HIGH => Self::High,
            LOW => Self::Low,
            NORMAL => Self::Normal,
            _ => Self::Literal(value.to_string()),
        }
    }
}
