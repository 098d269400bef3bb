//! Normalized schedule items and the passes that produce them.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::parser::RawItem;
use crate::timeparse;

/// How far in the past an item may sit before it is assumed to belong
/// to tomorrow. Overnight shifts render yesterday-evening blocks on the
/// same page as tomorrow-morning ones.
const NEXT_DAY_THRESHOLD: Duration = Duration::hours(12);

/// One schedule entry for the reference day.
///
/// Items are rebuilt wholesale on every extraction pass and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleItem {
    /// Display time, e.g. `2:30 PM`.
    pub time: String,
    pub activity: String,
    /// Block length as an `H:MM` token, when the source carried one.
    pub duration: Option<String>,
    /// Start anchored to the reference date, before any day-boundary
    /// correction.
    pub datetime: NaiveDateTime,
}

impl ScheduleItem {
    /// The item's start corrected for the day boundary: a start more
    /// than 12 hours in the past relative to `now` is taken to mean
    /// tomorrow.
    #[must_use]
    pub fn datetime_from(&self, now: NaiveDateTime) -> NaiveDateTime {
        if now.signed_duration_since(self.datetime) > NEXT_DAY_THRESHOLD {
            self.datetime + Duration::days(1)
        } else {
            self.datetime
        }
    }
}

/// Resolves a display time that may be either a bare clock or a full
/// date+time (the table strategy passes cell text through verbatim).
fn resolve_clock(time: &str) -> Option<NaiveTime> {
    timeparse::parse_clock(time)
        .or_else(|_| timeparse::parse_date_time(time).map(|dt| dt.time()))
        .ok()
}

/// Normalizes raw parser output into the schedule for `today`:
/// unparseable times are dropped, duplicate `(time, activity)` pairs
/// keep their first occurrence, and the result is stably sorted by
/// resolved start. Feeding the output back in yields the same list.
#[must_use]
pub fn normalize(raw: Vec<RawItem>, today: NaiveDate) -> Vec<ScheduleItem> {
    let mut seen = HashSet::new();
    let mut items: Vec<ScheduleItem> = raw
        .into_iter()
        .filter_map(|item| {
            let Some(clock) = resolve_clock(&item.time) else {
                tracing::debug!(time = %item.time, "dropping item with unparseable time");
                return None;
            };
            if !seen.insert((item.time.clone(), item.activity.clone())) {
                return None;
            }
            Some(ScheduleItem {
                time: item.time,
                activity: item.activity,
                duration: item.duration,
                datetime: today.and_time(clock),
            })
        })
        .collect();

    items.sort_by_key(|item| item.datetime);
    items
}

/// The first item still ahead of `now` after day-boundary correction.
#[must_use]
pub fn next_activity(items: &[ScheduleItem], now: NaiveDateTime) -> Option<&ScheduleItem> {
    items.iter().find(|item| item.datetime_from(now) > now)
}

/// When the schedule ends: the last item's corrected start plus its
/// block length, if it carries one.
#[must_use]
pub fn shift_end(items: &[ScheduleItem], now: NaiveDateTime) -> Option<NaiveDateTime> {
    let last = items.last()?;
    let length = timeparse::parse_hmm(last.duration.as_deref()?)?;
    Some(last.datetime_from(now) + length)
}
