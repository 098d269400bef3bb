//! Core domain logic for the Verint shift tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Schedule extraction: pulling today's shift activities out of an
//!   unreliable portal page via layered fallback strategies
//! - Input accounting: thread-safe key/click counters with a rolling
//!   window and incremental persistence deltas
//! - Pacing: the per-ticket countdown state machine
//! - The background worker that keeps the schedule fresh without
//!   blocking an interactive surface

pub mod activity;
pub mod extract;
pub mod pacing;
pub mod parser;
pub mod reminder;
pub mod schedule;
pub mod timeparse;
pub mod worker;

pub use activity::{ActivityDelta, ActivitySink, ActivityTracker};
pub use extract::{FrameContent, PageDriver, PageError, ScheduleExtractor, SessionProbe};
pub use pacing::{PacingStatus, PacingTimer};
pub use parser::RawItem;
pub use reminder::{Reminder, ReminderLedger};
pub use schedule::ScheduleItem;
pub use worker::{Command, RefreshGate, WorkerEvent, WorkerHandle};
