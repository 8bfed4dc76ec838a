//! HL7 date formatting.
//!
//! All timestamps handed to the encoder must be UTC-anchored; the encoder converts them to the
//! target time zone and renders `YYYYMMDDHHMMSS`.

use crate::{Hl7Error, Hl7Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use labsim_types::NullTime;
use std::fmt::Display;

const HL7_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Formats a plain UTC timestamp in the target time zone.
pub fn format_time<Tz>(t: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    t.with_timezone(tz).format(HL7_DATE_FORMAT).to_string()
}

/// Formats a [`NullTime`] in the target time zone.
///
/// # Returns
///
/// An empty string for an invalid time. A midnight-tagged time renders as 00:00 of the calendar
/// day it falls on in `tz`.
///
/// # Errors
///
/// Returns [`Hl7Error::NonUtcTime`] if the stored instant carries a non-zero UTC offset, and
/// [`Hl7Error::MissingLocalMidnight`] if `tz` has no representable start for that day.
pub fn format_null_time<Tz>(nt: &NullTime, tz: &Tz) -> Hl7Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (t, midnight) = match nt {
        NullTime::Invalid => return Ok(String::new()),
        NullTime::Valid(t) => (t, false),
        NullTime::Midnight(t) => (t, true),
    };
    if t.offset().local_minus_utc() != 0 {
        return Err(Hl7Error::NonUtcTime(t.to_rfc3339()));
    }

    let local = t.with_timezone(tz);
    if !midnight {
        return Ok(local.format(HL7_DATE_FORMAT).to_string());
    }

    let day = local.date_naive();
    let start = day
        .and_hms_opt(0, 0, 0)
        .ok_or(Hl7Error::MissingLocalMidnight(day))?;
    // A DST gap at midnight moves the start of the day to the first instant after the gap.
    let midnight = tz
        .from_local_datetime(&start)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(start + Duration::hours(1))).earliest())
        .ok_or(Hl7Error::MissingLocalMidnight(day))?;
    Ok(midnight.format(HL7_DATE_FORMAT).to_string())
}
