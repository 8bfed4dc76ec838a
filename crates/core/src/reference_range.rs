//! Reference-range parsing, classification and sampling.
//!
//! Two textual grammars are recognised:
//! - a simple numeric interval, `"<low> - <high>"` (spaces around the dash are optional)
//! - a compound comparator range, `"<=X^^<=Y"`, carrying one comparison per side
//!
//! Compound ranges are kept for display only: they never classify a value and cannot be sampled.

use rand::Rng;
use std::fmt;

/// Number of draws per precision step before sampling moves to the next decimal place.
const DRAWS_PER_PRECISION: usize = 16;

/// Extra decimal places sampling may use when the range's own precision has no room.
const MAX_EXTRA_PRECISION: usize = 6;

/// Multiplier of the high bound giving the upper limit for abnormal-high values.
const ABNORMAL_HIGH_FACTOR: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("malformed reference range {0:?}")]
    Malformed(String),
    #[error("reference range {0:?} is not a numeric interval")]
    NotNumeric(String),
    #[error("no value can be sampled {zone} reference range {range:?}")]
    EmptyZone { zone: Zone, range: String },
}

/// Where a value sits relative to a reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Normal,
    AboveHigh,
    BelowLow,
    /// The range has no numeric bounds to compare against.
    Unknown,
}

/// The part of a reference range a random value is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Strictly between the low and high bounds.
    Normal,
    /// Strictly between the high bound and ten times the high bound.
    AbnormalHigh,
    /// Strictly between zero and the low bound.
    AbnormalLow,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "inside",
            Self::AbnormalHigh => "above",
            Self::AbnormalLow => "below",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
        }
    }
}

/// One side of a compound range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub comparator: Comparator,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceRange {
    Simple {
        low: f64,
        high: f64,
        /// Largest number of decimal places written in either bound.
        precision: usize,
    },
    Compound {
        low: Comparison,
        high: Comparison,
    },
}

impl ReferenceRange {
    /// Parses range text.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::Malformed`] if the text matches neither grammar, or if the low
    /// bound of a simple range is greater than the high bound.
    pub fn parse(text: &str) -> Result<Self, RangeError> {
        let trimmed = text.trim();
        let malformed = || RangeError::Malformed(text.to_string());

        if let Some((low, high)) = trimmed.split_once("^^") {
            return Ok(Self::Compound {
                low: parse_comparison(low).ok_or_else(malformed)?,
                high: parse_comparison(high).ok_or_else(malformed)?,
            });
        }

        let (low, high) = split_interval(trimmed).ok_or_else(malformed)?;
        let (low_value, high_value) = (parse_number(low), parse_number(high));
        match (low_value, high_value) {
            (Some(low_value), Some(high_value)) if low_value <= high_value => Ok(Self::Simple {
                low: low_value,
                high: high_value,
                precision: decimals(low).max(decimals(high)),
            }),
            _ => Err(malformed()),
        }
    }

    /// Classifies `value` against this range. Values equal to a bound are normal.
    pub fn classify(&self, value: f64) -> Classification {
        match self {
            Self::Simple { low, high, .. } => {
                if value > *high {
                    Classification::AboveHigh
                } else if value < *low {
                    Classification::BelowLow
                } else {
                    Classification::Normal
                }
            }
            Self::Compound { .. } => Classification::Unknown,
        }
    }

    /// Draws a uniformly distributed value strictly inside `zone` and formats it.
    ///
    /// Values are written with the range's own precision when that leaves room strictly inside
    /// the zone; otherwise one more decimal place is tried, and so on.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::NotNumeric`] for a compound range and [`RangeError::EmptyZone`]
    /// if the zone contains no representable value (for example a zero-width range).
    pub fn sample<R>(&self, zone: Zone, rng: &mut R) -> Result<String, RangeError>
    where
        R: Rng + ?Sized,
    {
        let (low, high, precision) = match self {
            Self::Simple {
                low,
                high,
                precision,
            } => (*low, *high, *precision),
            Self::Compound { .. } => return Err(RangeError::NotNumeric(self.to_string())),
        };
        let (from, to) = match zone {
            Zone::Normal => (low, high),
            Zone::AbnormalHigh => (high, high * ABNORMAL_HIGH_FACTOR),
            Zone::AbnormalLow => (0.0, low),
        };
        let empty = || RangeError::EmptyZone {
            zone,
            range: self.to_string(),
        };
        if from >= to || !(to - from).is_finite() {
            return Err(empty());
        }

        for digits in precision..=precision + MAX_EXTRA_PRECISION {
            for _ in 0..DRAWS_PER_PRECISION {
                let drawn: f64 = rng.gen_range(from..to);
                let text = format!("{drawn:.digits$}");
                match text.parse::<f64>() {
                    Ok(rounded) if from < rounded && rounded < to => return Ok(text),
                    _ => continue,
                }
            }
        }
        Err(empty())
    }

    /// Returns `true` for a simple numeric interval.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Simple { .. })
    }
}

impl fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple {
                low,
                high,
                precision,
            } => {
                let digits = *precision;
                write!(f, "{low:.digits$} - {high:.digits$}")
            }
            Self::Compound { low, high } => write!(
                f,
                "{}{}^^{}{}",
                low.comparator.as_str(),
                low.value,
                high.comparator.as_str(),
                high.value
            ),
        }
    }
}

/// Splits `"<low> - <high>"` at the dash separating two numbers. A leading minus sign belongs to
/// the low bound.
fn split_interval(text: &str) -> Option<(&str, &str)> {
    text.char_indices()
        .filter(|(i, c)| *i > 0 && *c == '-')
        .map(|(i, _)| (text[..i].trim(), text[i + 1..].trim()))
        .find(|(low, high)| parse_number(low).is_some() && parse_number(high).is_some())
}

fn parse_comparison(text: &str) -> Option<Comparison> {
    let text = text.trim();
    // Two-character operators first so `<=` is not read as `<` followed by `=...`.
    let (comparator, rest) = [
        (Comparator::LessOrEqual, "<="),
        (Comparator::GreaterOrEqual, ">="),
        (Comparator::Less, "<"),
        (Comparator::Greater, ">"),
    ]
    .into_iter()
    .find_map(|(comparator, op)| text.strip_prefix(op).map(|rest| (comparator, rest)))?;
    let value = parse_number(rest)?;
    Some(Comparison { comparator, value })
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn decimals(number: &str) -> usize {
    number
        .trim()
        .split_once('.')
        .map_or(0, |(_, fraction)| {
            fraction.chars().take_while(char::is_ascii_digit).count()
        })
}
