//! Lenient clock and date parsing shared by the extraction strategies.
//!
//! The portal renders times in several shapes ("2:30 PM", "14:30",
//! "12/27/2025 6:00 AM"). Rather than guessing per call site, parsing
//! tries a fixed, ordered list of formats and fails with a
//! distinguishable error when none match.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Clock formats tried in order. 12-hour forms come first because the
/// portal prefers them; `%I`/`%H` both accept unpadded hours.
const CLOCK_FORMATS: &[&str] = &["%I:%M %p", "%I:%M:%S %p", "%H:%M", "%H:%M:%S"];

/// Date+time formats tried in order, `M/D/YYYY` date part throughout.
const DATE_TIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Time parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    /// The input matched none of the supported formats.
    #[error("unrecognized time: {input:?}")]
    Unrecognized { input: String },
}

/// Parses a bare clock string ("2:30 PM", "14:30").
pub fn parse_clock(input: &str) -> Result<NaiveTime, TimeParseError> {
    let trimmed = input.trim();
    CLOCK_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| TimeParseError::Unrecognized {
            input: input.to_string(),
        })
}

/// Parses a combined date+time string ("12/27/2025 6:00 AM").
pub fn parse_date_time(input: &str) -> Result<NaiveDateTime, TimeParseError> {
    let trimmed = input.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| TimeParseError::Unrecognized {
            input: input.to_string(),
        })
}

/// Returns true when the input parses as either a bare clock or a
/// date+time under any supported format.
#[must_use]
pub fn is_recognized(input: &str) -> bool {
    parse_clock(input).is_ok() || parse_date_time(input).is_ok()
}

/// Renders a time as `H:MM AM/PM` with no leading zero, the display
/// shape used everywhere downstream.
#[must_use]
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Parses an `H:MM` duration token (schedule block lengths).
#[must_use]
pub fn parse_hmm(input: &str) -> Option<Duration> {
    let (hours, minutes) = input.trim().split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    Some(Duration::hours(hours) + Duration::minutes(minutes))
}
