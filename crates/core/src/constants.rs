//! Sentinel strings understood in pathway requests.
//!
//! Pathway files are written by hand, so requests carry these plain strings in place of a
//! literal value, date or flag. The typed request enums in [`crate::pathway`] parse them.

/// Order profile: pick any known profile at random.
pub const RANDOM: &str = "RANDOM";

/// Value or date: send an empty field.
pub const EMPTY: &str = "EMPTY";

/// Date: render as midnight of the local calendar day.
pub const MIDNIGHT: &str = "MIDNIGHT";

/// Value: a random value inside the reference range.
pub const NORMAL: &str = "NORMAL";

/// Value: a random value above the reference range.
pub const ABNORMAL_HIGH: &str = "ABNORMAL_HIGH";

/// Value: a random value below the reference range.
pub const ABNORMAL_LOW: &str = "ABNORMAL_LOW";

/// Abnormal flag: compute it from the value and the reference range.
pub const DEFAULT: &str = "DEFAULT";

/// Abnormal flag: the configured above-high-normal flag.
pub const HIGH: &str = "HIGH";

/// Abnormal flag: the configured below-low-normal flag.
pub const LOW: &str = "LOW";
