//! Persistent stats store for tickets and input activity.
//!
//! Provides the durable ledger behind the pacing and reporting
//! surfaces: an append-only ticket log plus per-day activity
//! aggregates, persisted as one JSON file.
//!
//! # File format
//!
//! ```json
//! {
//!   "tickets": [{"timestamp": "2025-12-27T09:13:05.123456", "has_reply": true}],
//!   "activity": {"2025-12-27": {"keys": 4210, "clicks": 732, "duration": 3540.0}}
//! }
//! ```
//!
//! Timestamps are naive local instants in ISO 8601; activity is keyed
//! by local calendar date. Two legacy shapes are tolerated on read:
//! tickets stored as bare timestamp strings (upgraded to
//! `has_reply: true`), and extra derived fields inside day records
//! (ignored, and not written back).
//!
//! # Durability model
//!
//! The whole file is loaded at startup and rewritten on every
//! mutation. Data volume is a single user's tickets, so this stays
//! trivially cheap; a crash loses at most the one unpersisted update.
//! A corrupt or unreadable file means "start empty", never a fatal
//! error.
//!
//! # Ticket counting
//!
//! Every ticket-count metric here counts reply tickets only. The
//! predecessor tool disagreed with itself on this (its derived per-day
//! `cph` counted all tickets while every live query counted replies);
//! one policy had to win. See DESIGN.md.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vt_core::activity::ActivitySink;

/// Default stats file name, kept for compatibility with existing data.
pub const STATS_FILE_NAME: &str = "ticket_stats.json";

/// Sessions younger than this report zero CPH instead of exploding.
const MIN_SESSION_HOURS: f64 = 0.01;

/// Store errors. Reads never produce these; only persistence does.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode stats file: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One completed ticket. Append-only; never edited after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub timestamp: NaiveDateTime,
    #[serde(default = "default_true")]
    pub has_reply: bool,
}

const fn default_true() -> bool {
    true
}

/// Input-activity totals for one calendar day. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DayActivity {
    #[serde(default)]
    pub keys: u64,
    #[serde(default)]
    pub clicks: u64,
    /// Tracked seconds.
    #[serde(default)]
    pub duration: f64,
}

/// Reporting window for activity totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Today,
    Week,
    Month,
}

/// Series bucketing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Day,
    Week,
}

impl Bucket {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            _ => Err(format!("invalid bucket: {s}")),
        }
    }
}

/// Derived metric for aggregate series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Reply tickets per bucket.
    Volume,
    /// Tickets per tracked hour.
    Cph,
    /// Average handle time in minutes per ticket.
    Aht,
    /// Keys per tracked minute.
    Kpm,
    /// Clicks per tracked minute.
    Cpm,
}

impl Metric {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Cph => "cph",
            Self::Aht => "aht",
            Self::Kpm => "kpm",
            Self::Cpm => "cpm",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volume" => Ok(Self::Volume),
            "cph" => Ok(Self::Cph),
            "aht" => Ok(Self::Aht),
            "kpm" => Ok(Self::Kpm),
            "cpm" => Ok(Self::Cpm),
            _ => Err(format!("invalid metric: {s}")),
        }
    }
}

/// One labelled point in an aggregate series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Axis label, `Mon 23` for day buckets and `Wk 46` for weeks.
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Default, Serialize)]
struct StatsData {
    tickets: Vec<Ticket>,
    activity: BTreeMap<NaiveDate, DayActivity>,
}

/// Read-side shape, tolerant of the legacy ticket encoding.
#[derive(Deserialize)]
struct RawStats {
    #[serde(default)]
    tickets: Vec<TicketRecord>,
    #[serde(default)]
    activity: BTreeMap<NaiveDate, DayActivity>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TicketRecord {
    Entry(Ticket),
    Legacy(String),
}

impl RawStats {
    fn normalize(self) -> StatsData {
        let tickets = self
            .tickets
            .into_iter()
            .filter_map(|record| match record {
                TicketRecord::Entry(ticket) => Some(ticket),
                TicketRecord::Legacy(raw) => match raw.parse() {
                    Ok(timestamp) => Some(Ticket {
                        timestamp,
                        has_reply: true,
                    }),
                    Err(err) => {
                        tracing::warn!(%raw, %err, "dropping unparseable legacy ticket");
                        None
                    }
                },
            })
            .collect();
        StatsData {
            tickets,
            activity: self.activity,
        }
    }
}

/// The persistent stats store: sole owner and single writer of its
/// file.
pub struct StatsStore {
    path: PathBuf,
    data: StatsData,
}

impl StatsStore {
    /// Opens the store, loading any existing data. Never fails: a
    /// missing, unreadable, or corrupt file starts an empty store.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = load(&path);
        tracing::debug!(
            path = %path.display(),
            tickets = data.tickets.len(),
            days = data.activity.len(),
            "stats store opened"
        );
        Self { path, data }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========== Mutations ==========

    /// Appends a ticket stamped with the current local time and
    /// persists. Returns the timestamp used.
    pub fn log_ticket(&mut self, has_reply: bool) -> Result<NaiveDateTime, StoreError> {
        self.log_ticket_at(Local::now().naive_local(), has_reply)
    }

    /// [`Self::log_ticket`] with an explicit instant.
    pub fn log_ticket_at(
        &mut self,
        timestamp: NaiveDateTime,
        has_reply: bool,
    ) -> Result<NaiveDateTime, StoreError> {
        self.data.tickets.push(Ticket {
            timestamp,
            has_reply,
        });
        self.persist()?;
        Ok(timestamp)
    }

    /// Adds an activity delta into today's record, creating it on the
    /// day's first activity, and persists.
    pub fn record_activity(
        &mut self,
        keys: u64,
        clicks: u64,
        duration_seconds: f64,
    ) -> Result<(), StoreError> {
        self.record_activity_at(Local::now().date_naive(), keys, clicks, duration_seconds)
    }

    /// [`Self::record_activity`] with an explicit date.
    pub fn record_activity_at(
        &mut self,
        date: NaiveDate,
        keys: u64,
        clicks: u64,
        duration_seconds: f64,
    ) -> Result<(), StoreError> {
        let day = self.data.activity.entry(date).or_default();
        day.keys += keys;
        day.clicks += clicks;
        day.duration += duration_seconds;
        self.persist()
    }

    // ========== Queries ==========

    /// Tickets in the inclusive range, in append order.
    #[must_use]
    pub fn tickets_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<Ticket> {
        self.data
            .tickets
            .iter()
            .filter(|t| t.timestamp >= start && t.timestamp <= end)
            .copied()
            .collect()
    }

    /// Reply tickets per calendar date.
    #[must_use]
    pub fn daily_reply_counts(&self) -> BTreeMap<NaiveDate, u64> {
        let mut counts = BTreeMap::new();
        for ticket in self.data.tickets.iter().filter(|t| t.has_reply) {
            *counts.entry(ticket.timestamp.date()).or_default() += 1;
        }
        counts
    }

    /// When the first ticket of `today` was logged, reply or not.
    #[must_use]
    pub fn first_ticket_today(&self, today: NaiveDate) -> Option<NaiveDateTime> {
        self.data
            .tickets
            .iter()
            .filter(|t| t.timestamp.date() == today)
            .map(|t| t.timestamp)
            .min()
    }

    /// Reply tickets per elapsed hour since `session_start`. Zero for
    /// sessions under about 36 seconds.
    #[must_use]
    pub fn session_cph(&self, session_start: NaiveDateTime, now: NaiveDateTime) -> f64 {
        let hours = seconds_between(session_start, now) / 3600.0;
        if hours < MIN_SESSION_HOURS {
            return 0.0;
        }
        let count = self
            .data
            .tickets
            .iter()
            .filter(|t| t.has_reply && t.timestamp >= session_start)
            .count();
        round2(to_f64(count as u64) / hours)
    }

    /// Average reply tickets per day, over days that logged any.
    #[must_use]
    pub fn average_tickets_per_day(&self) -> f64 {
        let daily = self.daily_reply_counts();
        if daily.is_empty() {
            return 0.0;
        }
        let total: u64 = daily.values().sum();
        round1(to_f64(total) / to_f64(daily.len() as u64))
    }

    /// Reply tickets logged since Monday 00:00 of `now`'s week.
    #[must_use]
    pub fn week_to_date(&self, now: NaiveDateTime) -> u64 {
        self.reply_tickets_since(week_start(now.date()).and_hms_opt(0, 0, 0).unwrap())
    }

    /// Reply tickets logged since the first of `now`'s month.
    #[must_use]
    pub fn month_to_date(&self, now: NaiveDateTime) -> u64 {
        self.reply_tickets_since(month_start(now.date()).and_hms_opt(0, 0, 0).unwrap())
    }

    fn reply_tickets_since(&self, start: NaiveDateTime) -> u64 {
        self.data
            .tickets
            .iter()
            .filter(|t| t.has_reply && t.timestamp >= start)
            .count() as u64
    }

    /// Activity totals for the period containing `today`.
    #[must_use]
    pub fn activity_totals(&self, period: StatsPeriod, today: NaiveDate) -> DayActivity {
        match period {
            StatsPeriod::Today => self.data.activity.get(&today).copied().unwrap_or_default(),
            StatsPeriod::Week => self.sum_activity_since(week_start(today)),
            StatsPeriod::Month => self.sum_activity_since(month_start(today)),
        }
    }

    fn sum_activity_since(&self, start: NaiveDate) -> DayActivity {
        let mut total = DayActivity::default();
        for (_, day) in self.data.activity.range(start..) {
            total.keys += day.keys;
            total.clicks += day.clicks;
            total.duration += day.duration;
        }
        total
    }

    /// Average keys per tracked minute over a period; zero under one
    /// minute of tracked time.
    #[must_use]
    pub fn average_kpm(&self, period: StatsPeriod, today: NaiveDate) -> u64 {
        let totals = self.activity_totals(period, today);
        per_minute(totals.keys, totals.duration)
    }

    /// Average clicks per tracked minute over a period.
    #[must_use]
    pub fn average_cpm(&self, period: StatsPeriod, today: NaiveDate) -> u64 {
        let totals = self.activity_totals(period, today);
        per_minute(totals.clicks, totals.duration)
    }

    /// Reply-ticket counts for the trailing `days` days, zero-filled,
    /// oldest first.
    #[must_use]
    pub fn daily_volume(&self, days: u32, today: NaiveDate) -> Vec<(NaiveDate, u64)> {
        let counts = self.daily_reply_counts();
        (0..days)
            .rev()
            .map(|back| {
                let date = today - Duration::days(i64::from(back));
                (date, counts.get(&date).copied().unwrap_or(0))
            })
            .collect()
    }

    /// Aggregate series over an inclusive date range.
    ///
    /// Buckets are generated for every date in the range (so gaps show
    /// as zero), labelled `Mon 23` for days and `Wk 46` for ISO weeks.
    #[must_use]
    pub fn series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        bucket: Bucket,
        metric: Metric,
    ) -> Vec<SeriesPoint> {
        let mut keys: Vec<String> = Vec::new();
        let mut labels: HashMap<String, String> = HashMap::new();
        let mut date = start;
        while date <= end {
            let key = bucket_key(date, bucket);
            if !labels.contains_key(&key) {
                labels.insert(key.clone(), bucket_label(date, bucket));
                keys.push(key);
            }
            date += Duration::days(1);
        }

        let mut tickets: HashMap<String, u64> = HashMap::new();
        for ticket in self.data.tickets.iter().filter(|t| t.has_reply) {
            let date = ticket.timestamp.date();
            if date < start || date > end {
                continue;
            }
            *tickets.entry(bucket_key(date, bucket)).or_default() += 1;
        }

        let mut totals: HashMap<String, DayActivity> = HashMap::new();
        for (date, day) in self.data.activity.range(start..=end) {
            let entry = totals.entry(bucket_key(*date, bucket)).or_default();
            entry.keys += day.keys;
            entry.clicks += day.clicks;
            entry.duration += day.duration;
        }

        keys.iter()
            .map(|key| {
                let ticket_count = tickets.get(key).copied().unwrap_or(0);
                let activity = totals.get(key).copied().unwrap_or_default();
                SeriesPoint {
                    label: labels[key].clone(),
                    value: metric_value(metric, ticket_count, activity),
                }
            })
            .collect()
    }

    /// The trailing `count` buckets ending at `today`.
    #[must_use]
    pub fn recent_series(
        &self,
        bucket: Bucket,
        metric: Metric,
        count: u32,
        today: NaiveDate,
    ) -> Vec<SeriesPoint> {
        let back = match bucket {
            Bucket::Day => i64::from(count.saturating_sub(1)),
            Bucket::Week => 7 * i64::from(count.saturating_sub(1)),
        };
        self.series(today - Duration::days(back), today, bucket, metric)
    }

    // ========== Persistence ==========

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl ActivitySink for StatsStore {
    type Error = StoreError;

    fn record_activity(
        &mut self,
        keys: u64,
        clicks: u64,
        duration_seconds: f64,
    ) -> Result<(), StoreError> {
        Self::record_activity(self, keys, clicks, duration_seconds)
    }
}

fn load(path: &Path) -> StatsData {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<RawStats>(&contents) {
            Ok(raw) => raw.normalize(),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "stats file corrupt, starting empty");
                StatsData::default()
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => StatsData::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "stats file unreadable, starting empty");
            StatsData::default()
        }
    }
}

fn metric_value(metric: Metric, ticket_count: u64, activity: DayActivity) -> f64 {
    match metric {
        Metric::Volume => to_f64(ticket_count),
        Metric::Cph => {
            let hours = activity.duration / 3600.0;
            if hours > 0.1 {
                round1(to_f64(ticket_count) / hours)
            } else {
                0.0
            }
        }
        Metric::Aht => {
            if ticket_count > 0 {
                round1(activity.duration / 60.0 / to_f64(ticket_count))
            } else {
                0.0
            }
        }
        Metric::Kpm => per_minute_f64(activity.keys, activity.duration),
        Metric::Cpm => per_minute_f64(activity.clicks, activity.duration),
    }
}

fn per_minute_f64(count: u64, duration_seconds: f64) -> f64 {
    let minutes = duration_seconds / 60.0;
    if minutes > 1.0 {
        round1(to_f64(count) / minutes)
    } else {
        0.0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn per_minute(count: u64, duration_seconds: f64) -> u64 {
    let minutes = duration_seconds / 60.0;
    if minutes < 1.0 {
        return 0;
    }
    (to_f64(count) / minutes) as u64
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap()
}

fn bucket_key(date: NaiveDate, bucket: Bucket) -> String {
    match bucket {
        Bucket::Day => date.format("%Y-%m-%d").to_string(),
        Bucket::Week => {
            let iso = date.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
    }
}

fn bucket_label(date: NaiveDate, bucket: Bucket) -> String {
    match bucket {
        Bucket::Day => date.format("%a %d").to_string(),
        Bucket::Week => format!("Wk {}", date.iso_week().week()),
    }
}

fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    end.signed_duration_since(start)
        .to_std()
        .map_or(0.0, |d| d.as_secs_f64())
}

#[allow(clippy::cast_precision_loss)]
const fn to_f64(value: u64) -> f64 {
    value as f64
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, s).unwrap()
    }

    fn temp_store() -> (tempfile::TempDir, StatsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::open(dir.path().join(STATS_FILE_NAME));
        (dir, store)
    }

    #[test]
    fn missing_file_starts_empty() {
        let (_dir, store) = temp_store();
        assert!(store.daily_reply_counts().is_empty());
        assert_eq!(store.first_ticket_today(day(2025, 12, 27)), None);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATS_FILE_NAME);
        fs::write(&path, "{not json at all").unwrap();
        let store = StatsStore::open(&path);
        assert!(store.daily_reply_counts().is_empty());
    }

    #[test]
    fn tickets_round_trip_through_the_file() {
        let (dir, mut store) = temp_store();
        let stamp = at(day(2025, 12, 27), 9, 0, 0);
        store.log_ticket_at(stamp, true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 27), 9, 30, 0), false).unwrap();

        let reopened = StatsStore::open(dir.path().join(STATS_FILE_NAME));
        let tickets =
            reopened.tickets_between(at(day(2025, 12, 27), 0, 0, 0), at(day(2025, 12, 27), 23, 59, 59));
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].timestamp, stamp);
        assert!(tickets[0].has_reply);
        assert!(!tickets[1].has_reply);
    }

    #[test]
    fn legacy_ticket_strings_are_upgraded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATS_FILE_NAME);
        fs::write(
            &path,
            r#"{
                "tickets": [
                    "2025-12-26T14:05:00.123456",
                    {"timestamp": "2025-12-27T09:00:00", "has_reply": false},
                    {"timestamp": "2025-12-27T10:00:00"}
                ],
                "activity": {
                    "2025-12-27": {"keys": 100, "clicks": 20, "duration": 600.0, "cph": 4.0, "ticket_count": 9}
                }
            }"#,
        )
        .unwrap();

        let store = StatsStore::open(&path);
        let tickets = store.tickets_between(
            at(day(2025, 12, 26), 0, 0, 0),
            at(day(2025, 12, 28), 0, 0, 0),
        );
        assert_eq!(tickets.len(), 3);
        // Bare strings read as reply tickets; a missing flag defaults true.
        assert!(tickets[0].has_reply);
        assert!(!tickets[1].has_reply);
        assert!(tickets[2].has_reply);

        // Legacy derived fields inside day records are ignored.
        let totals = store.activity_totals(StatsPeriod::Today, day(2025, 12, 27));
        assert_eq!(totals.keys, 100);
        assert_eq!(totals.clicks, 20);
    }

    #[test]
    fn activity_accumulates_and_persists() {
        let (dir, mut store) = temp_store();
        let date = day(2025, 12, 27);
        store.record_activity_at(date, 100, 10, 60.0).unwrap();
        store.record_activity_at(date, 50, 5, 60.0).unwrap();
        store.record_activity_at(day(2025, 12, 28), 7, 1, 30.0).unwrap();

        let reopened = StatsStore::open(dir.path().join(STATS_FILE_NAME));
        let totals = reopened.activity_totals(StatsPeriod::Today, date);
        assert_eq!(totals.keys, 150);
        assert_eq!(totals.clicks, 15);
        assert!((totals.duration - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn session_cph_counts_reply_tickets_per_hour() {
        let (_dir, mut store) = temp_store();
        let start = at(day(2025, 12, 27), 9, 0, 0);
        for minutes in [10, 20, 40] {
            store.log_ticket_at(start + Duration::minutes(minutes), true).unwrap();
        }
        store.log_ticket_at(start + Duration::minutes(30), false).unwrap();
        // A ticket from before the session does not count.
        store.log_ticket_at(start - Duration::hours(1), true).unwrap();

        let cph = store.session_cph(start, start + Duration::hours(1));
        assert!((cph - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn session_cph_is_zero_for_young_sessions() {
        let (_dir, mut store) = temp_store();
        let start = at(day(2025, 12, 27), 9, 0, 0);
        store.log_ticket_at(start + Duration::seconds(5), true).unwrap();
        assert!(store.session_cph(start, start + Duration::seconds(10)).abs() < f64::EPSILON);
    }

    #[test]
    fn week_and_month_to_date_count_replies_only() {
        let (_dir, mut store) = temp_store();
        // 2025-12-27 is a Saturday; its week starts Monday 2025-12-22.
        store.log_ticket_at(at(day(2025, 12, 22), 8, 0, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 24), 8, 0, 0), false).unwrap();
        store.log_ticket_at(at(day(2025, 12, 21), 8, 0, 0), true).unwrap(); // prior week
        store.log_ticket_at(at(day(2025, 12, 1), 8, 0, 0), true).unwrap(); // same month

        let now = at(day(2025, 12, 27), 12, 0, 0);
        assert_eq!(store.week_to_date(now), 1);
        assert_eq!(store.month_to_date(now), 3);
    }

    #[test]
    fn first_ticket_today_ignores_other_days() {
        let (_dir, mut store) = temp_store();
        store.log_ticket_at(at(day(2025, 12, 26), 23, 50, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 27), 9, 15, 0), false).unwrap();
        store.log_ticket_at(at(day(2025, 12, 27), 8, 5, 0), true).unwrap();

        assert_eq!(
            store.first_ticket_today(day(2025, 12, 27)),
            Some(at(day(2025, 12, 27), 8, 5, 0))
        );
    }

    #[test]
    fn average_tickets_per_day_spans_active_days() {
        let (_dir, mut store) = temp_store();
        store.log_ticket_at(at(day(2025, 12, 26), 9, 0, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 26), 10, 0, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 27), 9, 0, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 27), 9, 5, 0), false).unwrap();

        assert!((store.average_tickets_per_day() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn average_kpm_needs_a_minute_of_data() {
        let (_dir, mut store) = temp_store();
        let date = day(2025, 12, 27);
        store.record_activity_at(date, 90, 30, 30.0).unwrap();
        assert_eq!(store.average_kpm(StatsPeriod::Today, date), 0);

        store.record_activity_at(date, 90, 30, 90.0).unwrap();
        // 180 keys over 2 minutes.
        assert_eq!(store.average_kpm(StatsPeriod::Today, date), 90);
        assert_eq!(store.average_cpm(StatsPeriod::Today, date), 30);
    }

    #[test]
    fn daily_volume_is_zero_filled() {
        let (_dir, mut store) = temp_store();
        store.log_ticket_at(at(day(2025, 12, 26), 9, 0, 0), true).unwrap();

        let volume = store.daily_volume(3, day(2025, 12, 27));
        assert_eq!(
            volume,
            vec![
                (day(2025, 12, 25), 0),
                (day(2025, 12, 26), 1),
                (day(2025, 12, 27), 0),
            ]
        );
    }

    #[test]
    fn cph_series_counts_replies_over_tracked_hours() {
        let (_dir, mut store) = temp_store();
        let date = day(2025, 12, 27);
        // Three reply tickets and one without, inside one tracked hour.
        for minutes in [10, 20, 40] {
            store
                .log_ticket_at(at(date, 9, 0, 0) + Duration::minutes(minutes), true)
                .unwrap();
        }
        store.log_ticket_at(at(date, 9, 30, 0), false).unwrap();
        store.record_activity_at(date, 1000, 100, 3600.0).unwrap();

        let series = store.series(date, date, Bucket::Day, Metric::Cph);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "Sat 27");
        assert!((series[0].value - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cph_series_is_zero_under_six_tracked_minutes() {
        let (_dir, mut store) = temp_store();
        let date = day(2025, 12, 27);
        store.log_ticket_at(at(date, 9, 10, 0), true).unwrap();
        store.record_activity_at(date, 10, 1, 300.0).unwrap();

        let series = store.series(date, date, Bucket::Day, Metric::Cph);
        assert!(series[0].value.abs() < f64::EPSILON);
    }

    #[test]
    fn aht_series_is_minutes_per_ticket() {
        let (_dir, mut store) = temp_store();
        let date = day(2025, 12, 27);
        store.log_ticket_at(at(date, 9, 10, 0), true).unwrap();
        store.log_ticket_at(at(date, 10, 10, 0), true).unwrap();
        store.record_activity_at(date, 0, 0, 3600.0).unwrap();

        let series = store.series(date, date, Bucket::Day, Metric::Aht);
        assert!((series[0].value - 30.0).abs() < f64::EPSILON);

        // No tickets: zero, not a division error.
        let empty = store.series(day(2025, 12, 26), day(2025, 12, 26), Bucket::Day, Metric::Aht);
        assert!(empty[0].value.abs() < f64::EPSILON);
    }

    #[test]
    fn volume_series_zero_fills_gap_days() {
        let (_dir, mut store) = temp_store();
        store.log_ticket_at(at(day(2025, 12, 25), 9, 0, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 27), 9, 0, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 27), 10, 0, 0), false).unwrap();

        let series = store.series(day(2025, 12, 25), day(2025, 12, 27), Bucket::Day, Metric::Volume);
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn weekly_series_buckets_by_iso_week() {
        let (_dir, mut store) = temp_store();
        // ISO week 51 of 2025: Dec 15-21. Week 52: Dec 22-28.
        store.log_ticket_at(at(day(2025, 12, 20), 9, 0, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 23), 9, 0, 0), true).unwrap();
        store.log_ticket_at(at(day(2025, 12, 24), 9, 0, 0), true).unwrap();

        let series = store.recent_series(Bucket::Week, Metric::Volume, 2, day(2025, 12, 27));
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "Wk 51");
        assert_eq!(series[1].label, "Wk 52");
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn kpm_series_uses_tracked_minutes() {
        let (_dir, mut store) = temp_store();
        let date = day(2025, 12, 27);
        store.record_activity_at(date, 600, 120, 600.0).unwrap();

        let kpm = store.series(date, date, Bucket::Day, Metric::Kpm);
        assert!((kpm[0].value - 60.0).abs() < f64::EPSILON);
        let cpm = store.series(date, date, Bucket::Day, Metric::Cpm);
        assert!((cpm[0].value - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn metric_and_bucket_parse_from_strings() {
        assert_eq!("cph".parse::<Metric>().unwrap(), Metric::Cph);
        assert_eq!("volume".parse::<Metric>().unwrap(), Metric::Volume);
        assert!("throughput".parse::<Metric>().is_err());
        assert_eq!("week".parse::<Bucket>().unwrap(), Bucket::Week);
        assert!("month".parse::<Bucket>().is_err());
        assert_eq!(Metric::Aht.to_string(), "aht");
        assert_eq!(Bucket::Day.to_string(), "day");
    }
}
