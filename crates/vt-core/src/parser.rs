//! Line-grammar parser for schedule text.
//!
//! Turns a raw blob of rendered page text into candidate schedule
//! entries. The portal gives us no stable markup, so the grammar works
//! on visible text lines of the shape:
//!
//! ```text
//! 12/27/2025 12:45 PM   Assigned Work Activities   2K-Games-Email-EN_3057328   1:50
//! ```
//!
//! date+time token, arbitrary filler, an activity label, and a trailing
//! `H:MM` duration. Parsing never fails: lines that do not match are
//! skipped.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::timeparse;

/// Strict grammar for browser-rendered schedule lines: date+time,
/// non-greedy filler, activity token (optionally `_<digits>` suffixed),
/// trailing `H:MM` duration.
static SCHEDULE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,2}/\d{1,2}/\d{4}\s+\d{1,2}:\d{2}\s*(?:AM|PM))\s+.*?\s+([A-Za-z0-9\-_]+(?:_[0-9]+)?)\s+(\d{1,2}:\d{2})",
    )
    .expect("schedule line regex is valid")
});

/// Loose grammar for the manual override file: clock time plus free-text
/// activity, no date and no duration.
static MANUAL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}\s*(?:AM|PM))\s+([A-Za-z\s\-]+)")
        .expect("manual line regex is valid")
});

/// A candidate schedule entry before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    /// Display time, `H:MM AM/PM` where the source allowed it.
    pub time: String,
    pub activity: String,
    /// Block length as an `H:MM` token, when the source carried one.
    pub duration: Option<String>,
}

/// Scans browser-rendered text for schedule lines dated `today`.
///
/// Lines whose date token does not match `today` (zero-padded or
/// unpadded) are dropped; duplicate `(time, activity)` pairs keep the
/// first occurrence. Output order follows the input text.
#[must_use]
pub fn scan_page_text(text: &str, today: NaiveDate) -> Vec<RawItem> {
    let padded = today.format("%m/%d/%Y").to_string();
    let unpadded = format!("{}/{}/{}", today.month(), today.day(), today.year());

    let mut items = Vec::new();
    let mut seen = HashSet::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        for caps in SCHEDULE_LINE_RE.captures_iter(line) {
            let stamp = &caps[1];
            if !stamp.contains(&padded) && !stamp.contains(&unpadded) {
                continue;
            }

            // Strip the date down to the display clock; keep the raw
            // token if it somehow fails to re-parse.
            let time = timeparse::parse_date_time(stamp).map_or_else(
                |_| stamp.to_string(),
                |dt| timeparse::format_clock(dt.time()),
            );
            let activity = caps[2].trim().to_string();

            if seen.insert((time.clone(), activity.clone())) {
                items.push(RawItem {
                    time,
                    activity,
                    duration: Some(caps[3].to_string()),
                });
            }
        }
    }

    tracing::debug!(count = items.len(), "scanned page text");
    items
}

/// Scans a manual override file under the loose grammar.
#[must_use]
pub fn scan_manual_text(text: &str) -> Vec<RawItem> {
    MANUAL_LINE_RE
        .captures_iter(text)
        .map(|caps| RawItem {
            time: caps[1].to_string(),
            activity: caps[2].trim().to_string(),
            duration: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const PAGE: &str = "\
My Schedule\n\
12/27/2025 6:00 AM\tAssigned Work Activities \tPhone-Support-EN_1122334\t2:00\n\
12/27/2025 12:45 PM\tAssigned Work Activities \tEmail-EN_3057328\t1:50\n\
12/28/2025 6:00 AM\tAssigned Work Activities \tPhone-Support-EN_1122334\t2:00\n\
Some unrelated footer text\n";

    #[test]
    fn extracts_matching_lines_for_today() {
        let items = scan_page_text(PAGE, day(2025, 12, 27));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].time, "6:00 AM");
        assert_eq!(items[0].activity, "Phone-Support-EN_1122334");
        assert_eq!(items[0].duration.as_deref(), Some("2:00"));
        assert_eq!(items[1].time, "12:45 PM");
        assert_eq!(items[1].activity, "Email-EN_3057328");
    }

    #[test]
    fn drops_lines_for_other_dates() {
        let items = scan_page_text(PAGE, day(2025, 12, 28));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].time, "6:00 AM");
    }

    #[test]
    fn matches_unpadded_dates() {
        let text = "1/3/2025 9:15 AM\tAssigned\tChat-EN_42\t0:45\n";
        let items = scan_page_text(text, day(2025, 1, 3));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].time, "9:15 AM");
    }

    #[test]
    fn suppresses_duplicate_time_activity_pairs() {
        let text = "\
12/27/2025 6:00 AM x Phone_1 2:00\n\
12/27/2025 6:00 AM y Phone_1 2:00\n";
        let items = scan_page_text(text, day(2025, 12, 27));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn never_panics_on_arbitrary_text() {
        for text in ["", "\0\0\0", "::::", "13/45/99999 99:99 XM junk 9:99", "日本語のテキスト"] {
            let _ = scan_page_text(text, day(2025, 12, 27));
        }
    }

    #[test]
    fn output_satisfies_the_grammar() {
        let items = scan_page_text(PAGE, day(2025, 12, 27));
        for item in items {
            assert!(
                item.activity
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            );
            let duration = item.duration.unwrap();
            assert!(crate::timeparse::parse_hmm(&duration).is_some(), "{duration}");
        }
    }

    #[test]
    fn manual_grammar_takes_free_text_activities() {
        let text = "9:00 AM Phone Support\n12:30 PM Lunch\n2:00 PM Email - Tier Two\n";
        let items = scan_manual_text(text);
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].time, "12:30 PM");
        assert_eq!(items[1].activity, "Lunch");
        assert_eq!(items[2].activity, "Email - Tier Two");
        assert!(items.iter().all(|i| i.duration.is_none()));
    }
}
