//! Ticket-pacing countdown state machine.
//!
//! Budgets `3600 / target_cph` seconds per ticket and counts down once
//! per second while running. Past zero the timer holds in an overrun
//! state rather than going further negative; completing a ticket always
//! restarts the clock, paused or not.

use chrono::{Duration, NaiveDateTime};

/// Sentinel for "the zero-crossing alert already fired this overrun".
const OVERRUN_SENTINEL: i64 = -1;

/// Observable timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingStatus {
    /// Not ticking; remaining budget preserved.
    Idle,
    /// Counting down.
    Running,
    /// Budget exhausted; the clock holds at zero until the next ticket.
    Overrun,
}

/// Per-ticket countdown driven by one-second ticks and explicit
/// start/pause/complete actions. Historical metrics live in the stats
/// store; this only owns the countdown.
#[derive(Debug, Clone)]
pub struct PacingTimer {
    target_cph: f64,
    seconds_per_ticket: i64,
    remaining_seconds: i64,
    running: bool,
    current_ticket_start: Option<NaiveDateTime>,
}

impl PacingTimer {
    /// Builds an idle timer for the given target rate. `target_cph`
    /// must be positive.
    #[must_use]
    pub fn new(target_cph: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let seconds_per_ticket = (3600.0 / target_cph) as i64;
        Self {
            target_cph,
            seconds_per_ticket,
            remaining_seconds: seconds_per_ticket,
            running: false,
            current_ticket_start: None,
        }
    }

    #[must_use]
    pub const fn target_cph(&self) -> f64 {
        self.target_cph
    }

    #[must_use]
    pub const fn seconds_per_ticket(&self) -> i64 {
        self.seconds_per_ticket
    }

    /// Remaining budget, clamped at zero for display.
    #[must_use]
    pub const fn remaining_seconds(&self) -> i64 {
        if self.remaining_seconds < 0 {
            0
        } else {
            self.remaining_seconds
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn status(&self) -> PacingStatus {
        if !self.running {
            PacingStatus::Idle
        } else if self.remaining_seconds <= 0 {
            PacingStatus::Overrun
        } else {
            PacingStatus::Running
        }
    }

    /// Time spent on the current ticket so far.
    #[must_use]
    pub fn elapsed(&self, now: NaiveDateTime) -> Option<Duration> {
        self.current_ticket_start
            .map(|start| now.signed_duration_since(start))
    }

    /// Start/pause toggle. Pausing preserves both the remaining budget
    /// and the ticket start stamp; the first-ever start stamps it.
    pub fn toggle(&mut self, now: NaiveDateTime) {
        if self.running {
            self.running = false;
        } else {
            self.running = true;
            if self.current_ticket_start.is_none() {
                self.current_ticket_start = Some(now);
            }
        }
    }

    /// Completes the current ticket: full budget back on the clock, a
    /// fresh start stamp, and the timer forced to running regardless of
    /// its prior state. Persisting the ticket is the caller's move (the
    /// stats store is that file's single writer).
    pub fn complete_ticket(&mut self, now: NaiveDateTime) {
        self.remaining_seconds = self.seconds_per_ticket;
        self.current_ticket_start = Some(now);
        self.running = true;
    }

    /// One-second tick. Returns `true` exactly once per overrun entry,
    /// on the tick where the exhausted budget is first observed; that
    /// edge is the caller's cue for the audible/visual alert.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
            false
        } else if self.remaining_seconds == 0 {
            self.remaining_seconds = OVERRUN_SENTINEL;
            true
        } else {
            false
        }
    }
}

/// Renders seconds as `MM:SS` for countdown display, clamping below
/// zero.
#[must_use]
pub fn format_mmss(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
