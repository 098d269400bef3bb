//! Input-activity accounting.
//!
//! Tracks key presses and mouse clicks from a capture thread while a
//! UI polls rates and a background flusher drains deltas into the
//! stats store. All shared state sits behind one mutex with short
//! critical sections; persistence always happens outside the lock so
//! the capture thread never waits on disk I/O.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Length of the "current rate" window.
const ROLLING_WINDOW: Duration = Duration::from_secs(60);

/// Below this much session time the averages report zero instead of
/// exploding.
const MIN_SESSION_SECS: f64 = 0.6;

/// Counters accumulated since the last flush, plus how long they cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityDelta {
    pub keys: u64,
    pub clicks: u64,
    pub duration_seconds: f64,
}

/// Destination for flushed deltas. Implemented by the stats store.
pub trait ActivitySink {
    type Error: std::error::Error;

    fn record_activity(
        &mut self,
        keys: u64,
        clicks: u64,
        duration_seconds: f64,
    ) -> Result<(), Self::Error>;
}

struct TrackerState {
    session_keys: u64,
    session_clicks: u64,
    /// Anchor for elapsed-session computation in this process run.
    session_anchor: Instant,
    /// Session time carried over from a restored same-day run; added to
    /// the anchor's elapsed time so averages stay continuous.
    carried: Duration,
    key_window: VecDeque<Instant>,
    click_window: VecDeque<Instant>,
    delta_keys: u64,
    delta_clicks: u64,
    last_flush: Instant,
}

impl TrackerState {
    fn new(now: Instant) -> Self {
        Self {
            session_keys: 0,
            session_clicks: 0,
            session_anchor: now,
            carried: Duration::ZERO,
            key_window: VecDeque::new(),
            click_window: VecDeque::new(),
            delta_keys: 0,
            delta_clicks: 0,
            last_flush: now,
        }
    }

    fn session_elapsed(&self, now: Instant) -> Duration {
        self.carried + now.saturating_duration_since(self.session_anchor)
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn average_per_minute(&self, count: u64, now: Instant) -> u64 {
        let secs = self.session_elapsed(now).as_secs_f64();
        if secs < MIN_SESSION_SECS {
            return 0;
        }
        (count as f64 / (secs / 60.0)) as u64
    }
}

/// Thread-safe key/click accounting shared between the capture thread,
/// the periodic flusher, and any number of readers. Cloning hands out
/// another handle to the same counters.
#[derive(Clone)]
pub struct ActivityTracker {
    inner: Arc<Mutex<TrackerState>>,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerState::new(Instant::now()))),
        }
    }

    /// Counter updates cannot leave the state half-written, so a
    /// poisoned lock is still usable.
    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restores session baselines from a prior same-day run. Must be
    /// called before the capture thread starts producing events.
    ///
    /// When `duration_seconds` is positive the session start is
    /// back-dated by exactly that much, so average rates continue from
    /// the earlier run instead of resetting.
    pub fn restore(&self, keys: u64, clicks: u64, duration_seconds: f64) {
        let mut state = self.state();
        state.session_keys = keys;
        state.session_clicks = clicks;
        state.session_anchor = Instant::now();
        state.carried = if duration_seconds > 0.0 {
            Duration::from_secs_f64(duration_seconds)
        } else {
            Duration::ZERO
        };
    }

    pub fn record_key(&self) {
        self.record_key_at(Instant::now());
    }

    pub fn record_click(&self) {
        self.record_click_at(Instant::now());
    }

    fn record_key_at(&self, now: Instant) {
        let mut state = self.state();
        state.session_keys += 1;
        state.delta_keys += 1;
        state.key_window.push_back(now);
    }

    fn record_click_at(&self, now: Instant) {
        let mut state = self.state();
        state.session_clicks += 1;
        state.delta_clicks += 1;
        state.click_window.push_back(now);
    }

    /// Key presses in the trailing 60 seconds (an exact count, not an
    /// extrapolated rate).
    #[must_use]
    pub fn current_kpm(&self) -> usize {
        self.current_kpm_at(Instant::now())
    }

    /// Clicks in the trailing 60 seconds.
    #[must_use]
    pub fn current_cpm(&self) -> usize {
        self.current_cpm_at(Instant::now())
    }

    fn current_kpm_at(&self, now: Instant) -> usize {
        let mut state = self.state();
        prune(&mut state.key_window, now);
        state.key_window.len()
    }

    fn current_cpm_at(&self, now: Instant) -> usize {
        let mut state = self.state();
        prune(&mut state.click_window, now);
        state.click_window.len()
    }

    /// Average keys per minute over the whole session.
    #[must_use]
    pub fn session_kpm(&self) -> u64 {
        self.session_kpm_at(Instant::now())
    }

    /// Average clicks per minute over the whole session.
    #[must_use]
    pub fn session_cpm(&self) -> u64 {
        self.session_cpm_at(Instant::now())
    }

    fn session_kpm_at(&self, now: Instant) -> u64 {
        let state = self.state();
        state.average_per_minute(state.session_keys, now)
    }

    fn session_cpm_at(&self, now: Instant) -> u64 {
        let state = self.state();
        state.average_per_minute(state.session_clicks, now)
    }

    /// Cumulative `(keys, clicks)` since session start.
    #[must_use]
    pub fn session_totals(&self) -> (u64, u64) {
        let state = self.state();
        (state.session_keys, state.session_clicks)
    }

    /// Atomically reads and zeroes the pending deltas, advancing the
    /// flush watermark. Returns `None` when there was no activity; the
    /// watermark still advances so the next delta covers the right
    /// span.
    pub fn take_deltas(&self) -> Option<ActivityDelta> {
        self.take_deltas_at(Instant::now())
    }

    fn take_deltas_at(&self, now: Instant) -> Option<ActivityDelta> {
        let mut state = self.state();
        let duration_seconds = now
            .saturating_duration_since(state.last_flush)
            .as_secs_f64();
        state.last_flush = now;

        let keys = std::mem::take(&mut state.delta_keys);
        let clicks = std::mem::take(&mut state.delta_clicks);
        drop(state);

        if keys == 0 && clicks == 0 {
            return None;
        }
        Some(ActivityDelta {
            keys,
            clicks,
            duration_seconds,
        })
    }

    /// Drains pending deltas into the sink, outside the lock. Returns
    /// whether anything was written.
    pub fn flush_into<S: ActivitySink>(&self, sink: &mut S) -> Result<bool, S::Error> {
        match self.take_deltas() {
            Some(delta) => {
                sink.record_activity(delta.keys, delta.clicks, delta.duration_seconds)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant) {
    let Some(cutoff) = now.checked_sub(ROLLING_WINDOW) else {
        return;
    };
    while window.front().is_some_and(|stamp| *stamp < cutoff) {
        window.pop_front();
    }
}
