//! Track command: the long-running loop.
//!
//! Wires the schedule worker, the reminder ledger, the pacing timer,
//! and the input-activity flusher together around one stats store.
//! The console stands in for the widget UI: single-letter commands
//! complete tickets, pause the pacer, and request refreshes.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;

use vt_core::activity::ActivityTracker;
use vt_core::extract::ScheduleExtractor;
use vt_core::pacing::{self, PacingStatus, PacingTimer};
use vt_core::reminder::ReminderLedger;
use vt_core::schedule::ScheduleItem;
use vt_core::worker::{self, RefreshGate, WorkerEvent};
use vt_store::{StatsPeriod, StatsStore};

use super::schedule::write_schedule;
use crate::Config;
use crate::page::OfflinePage;

/// Delta flush cadence; one more flush always happens on shutdown.
const FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Main loop granularity.
const LOOP_TICK: Duration = Duration::from_millis(100);

/// How often the reminder ledger is consulted.
const REMINDER_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Console commands accepted while tracking.
enum UiCommand {
    CompleteTicket { has_reply: bool },
    Toggle,
    Refresh,
    LoginDone,
    Quit,
}

fn parse_command(line: &str) -> Option<UiCommand> {
    match line.trim() {
        "t" | "ticket" => Some(UiCommand::CompleteTicket { has_reply: true }),
        "n" | "no-reply" => Some(UiCommand::CompleteTicket { has_reply: false }),
        "p" | "pause" | "resume" => Some(UiCommand::Toggle),
        "r" | "refresh" => Some(UiCommand::Refresh),
        "l" | "login-done" => Some(UiCommand::LoginDone),
        "q" | "quit" => Some(UiCommand::Quit),
        _ => None,
    }
}

pub fn run(config: &Config, file: Option<PathBuf>, page_text: Option<PathBuf>) -> Result<()> {
    let store = StatsStore::open(&config.stats_path);
    let now = Local::now().naive_local();
    let today = now.date();

    // Same-day restore: the session started at today's first ticket,
    // and input baselines continue from today's activity record.
    let session_start = store.first_ticket_today(today).unwrap_or(now);
    let tracker = ActivityTracker::new();
    let today_totals = store.activity_totals(StatsPeriod::Today, today);
    if today_totals.duration > 0.0 {
        tracker.restore(today_totals.keys, today_totals.clicks, today_totals.duration);
        tracing::info!(
            keys = today_totals.keys,
            clicks = today_totals.clicks,
            "restored today's input baselines"
        );
    }

    let manual_path = file.or_else(|| {
        config
            .use_manual_file
            .then(|| config.manual_schedule_path.clone())
    });
    let extractor = manual_path.map_or_else(ScheduleExtractor::new, ScheduleExtractor::with_manual_file);

    let page = OfflinePage::new(page_text);
    let mut worker = worker::spawn(page, extractor, config.verint_url.clone())
        .context("failed to spawn schedule worker")?;

    let (console_tx, console_rx) = mpsc::channel();
    spawn_console_reader(console_tx)?;

    let shared_store = Arc::new(Mutex::new(store));
    let (flush_stop_tx, flush_stop_rx) = mpsc::channel::<()>();
    let flusher = spawn_flusher(tracker.clone(), Arc::clone(&shared_store), flush_stop_rx)?;

    let mut pacer = PacingTimer::new(config.target_cph);
    let mut ledger = ReminderLedger::new(config.notification_minutes_before);
    let mut gate = RefreshGate::default();
    let mut schedule_items: Vec<ScheduleItem> = Vec::new();
    let check_interval = Duration::from_secs(config.check_interval_seconds.max(1));

    let mut last_tick = Instant::now();
    let mut last_auto_refresh = Instant::now();
    let mut last_reminder_check = Instant::now();

    println!(
        "Tracking at {} CPH ({} per ticket). Commands: [t]icket, [n]o-reply, [p]ause, [r]efresh, [l]ogin-done, [q]uit.",
        pacer.target_cph(),
        pacing::format_mmss(pacer.seconds_per_ticket())
    );

    'main: loop {
        // Worker events fully replace the previous schedule.
        while let Ok(event) = worker.events().try_recv() {
            match event {
                WorkerEvent::Status(text) => println!("{text}"),
                WorkerEvent::Schedule(items) => {
                    let mut stdout = std::io::stdout();
                    let _ = write_schedule(&mut stdout, &items, Local::now().naive_local());
                    schedule_items = items;
                }
                WorkerEvent::Error(text) => eprintln!("worker error: {text}"),
                WorkerEvent::LoginRequired => {
                    println!("Manual login required: finish in the browser, then type 'l'.");
                }
                WorkerEvent::Stopped => break 'main,
            }
        }

        while let Ok(line) = console_rx.try_recv() {
            match parse_command(&line) {
                Some(UiCommand::CompleteTicket { has_reply }) => {
                    complete_ticket(&shared_store, &mut pacer, session_start, has_reply);
                }
                Some(UiCommand::Toggle) => {
                    pacer.toggle(Local::now().naive_local());
                    match pacer.status() {
                        PacingStatus::Idle => println!(
                            "Paused with {} remaining.",
                            pacing::format_mmss(pacer.remaining_seconds())
                        ),
                        _ => println!("Running."),
                    }
                }
                Some(UiCommand::Refresh) => {
                    if gate.try_request() {
                        worker.refresh();
                    } else {
                        println!("Refresh request ignored (rate limit).");
                    }
                }
                Some(UiCommand::LoginDone) => worker.login_complete(),
                Some(UiCommand::Quit) => {
                    worker.stop();
                }
                None => {
                    if !line.trim().is_empty() {
                        println!("Unknown command: {line}");
                    }
                }
            }
        }

        // One-second pacing cadence, catching up after sleep.
        while last_tick.elapsed() >= Duration::from_secs(1) {
            last_tick += Duration::from_secs(1);
            if pacer.tick() {
                // Terminal bell; richer alerting belongs to the widget.
                print!("\x07");
                println!(
                    "Ticket budget exhausted ({} per ticket).",
                    pacing::format_mmss(pacer.seconds_per_ticket())
                );
            }
        }

        if last_auto_refresh.elapsed() >= check_interval {
            last_auto_refresh = Instant::now();
            if gate.try_request() {
                worker.refresh();
            }
        }

        if last_reminder_check.elapsed() >= REMINDER_CHECK_INTERVAL {
            last_reminder_check = Instant::now();
            for reminder in ledger.due(&schedule_items, Local::now().naive_local()) {
                print!("\x07");
                println!(
                    "Upcoming change: {} in {} minute(s) (at {}).",
                    reminder.activity, reminder.minutes_until, reminder.time
                );
            }
        }

        thread::sleep(LOOP_TICK);
    }

    // Shutdown: closing the stop channel makes the flusher run its
    // final flush before exiting.
    drop(flush_stop_tx);
    let _ = flusher.join();
    worker.stop();

    let store = shared_store.lock().unwrap_or_else(PoisonError::into_inner);
    println!(
        "Session CPH: {:.2}",
        store.session_cph(session_start, Local::now().naive_local())
    );
    let (keys, clicks) = tracker.session_totals();
    println!("Session input: {keys} keys, {clicks} clicks.");
    Ok(())
}

fn complete_ticket(
    store: &Arc<Mutex<StatsStore>>,
    pacer: &mut PacingTimer,
    session_start: chrono::NaiveDateTime,
    has_reply: bool,
) {
    let now = Local::now().naive_local();
    let cph = {
        let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = store.log_ticket(has_reply) {
            eprintln!("failed to persist ticket: {err}");
            return;
        }
        store.session_cph(session_start, now)
    };

    // Completion always restarts the clock, paused or not.
    pacer.complete_ticket(now);
    println!(
        "Ticket logged. {} on the clock. Session CPH: {cph:.2}",
        pacing::format_mmss(pacer.remaining_seconds())
    );
}

fn spawn_console_reader(tx: Sender<String>) -> Result<()> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn console thread")?;
    Ok(())
}

fn spawn_flusher(
    tracker: ActivityTracker,
    store: Arc<Mutex<StatsStore>>,
    stop: Receiver<()>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("activity-flusher".to_string())
        .spawn(move || {
            loop {
                let stopping =
                    !matches!(stop.recv_timeout(FLUSH_INTERVAL), Err(RecvTimeoutError::Timeout));
                flush(&tracker, &store);
                if stopping {
                    break;
                }
            }
        })
        .context("failed to spawn flusher thread")
}

fn flush(tracker: &ActivityTracker, store: &Arc<Mutex<StatsStore>>) {
    let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
    match tracker.flush_into(&mut *store) {
        Ok(wrote) => {
            if wrote {
                tracing::debug!("flushed activity deltas");
            }
        }
        Err(err) => tracing::error!(%err, "failed to persist activity delta"),
    }
}
