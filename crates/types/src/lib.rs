//! Shared value types for the lab message simulator.
//!
//! These types are used both by the order lifecycle engine and by the HL7 encoder, so they live
//! in their own crate with no knowledge of either.

use chrono::{DateTime, Duration, FixedOffset, TimeZone};

/// A coded or free-text identity, such as an order profile or a test.
///
/// Any of the fields may be empty. A profile that is not known to the reference data is carried
/// as `{id: name, text: name}` with no coding system.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CodedElement {
    pub id: String,
    pub text: String,
    pub coding_system: String,
    pub alternate_text: String,
}

impl CodedElement {
    /// Creates a coded element with an identifier, display text and coding system.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        coding_system: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            coding_system: coding_system.into(),
            alternate_text: String::new(),
        }
    }

    /// Creates an uncoded element whose identifier and text are both `name`.
    pub fn uncoded(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            text: name,
            ..Self::default()
        }
    }

    /// Returns a copy of this element with `alternate_text` set.
    pub fn with_alternate_text(mut self, alternate_text: impl Into<String>) -> Self {
        self.alternate_text = alternate_text.into();
        self
    }
}

/// A timestamp that may be absent, present, or present but rendered as local midnight.
///
/// The midnight state keeps the stored instant; the encoder decides which calendar day it falls
/// on in the target time zone and renders 00:00 of that day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NullTime {
    #[default]
    Invalid,
    Valid(DateTime<FixedOffset>),
    Midnight(DateTime<FixedOffset>),
}

impl NullTime {
    /// An absent timestamp. Renders as an empty field.
    pub fn invalid() -> Self {
        Self::Invalid
    }

    /// A present timestamp rendered as a full date-time.
    pub fn valid<Tz: TimeZone>(t: DateTime<Tz>) -> Self {
        Self::Valid(t.fixed_offset())
    }

    /// A present timestamp rendered as midnight of its local calendar day.
    pub fn midnight<Tz: TimeZone>(t: DateTime<Tz>) -> Self {
        Self::Midnight(t.fixed_offset())
    }

    /// Returns `true` for both the valid and the midnight states.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    pub fn is_midnight(&self) -> bool {
        matches!(self, Self::Midnight(_))
    }

    /// Returns the stored instant, if any.
    pub fn time(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Invalid => None,
            Self::Valid(t) | Self::Midnight(t) => Some(*t),
        }
    }

    /// Returns a valid timestamp `offset` after this one, or an invalid one if this is absent.
    ///
    /// A midnight-tagged input yields a plain valid timestamp: the offset is applied to the
    /// stored instant and the midnight rendering is not carried over.
    pub fn offset_by(&self, offset: Duration) -> Self {
        match self.time() {
            Some(t) => Self::Valid(t + offset),
            None => Self::Invalid,
        }
    }
}
