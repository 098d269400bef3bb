//! Background schedule worker.
//!
//! Browser operations are slow and occasionally hang, so extraction
//! runs on its own thread and talks to the interactive surface over two
//! channels: commands in, events out. The worker handles one command at
//! a time and checks for a stop between operations; cancellation is
//! cooperative, so an in-flight page call finishes before shutdown.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Local;

use crate::extract::{PageDriver, ScheduleExtractor, SessionProbe, probe_session};
use crate::schedule::ScheduleItem;

/// How often the worker polls its command channel.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default minimum spacing between refresh requests, bounding load on
/// the portal.
pub const DEFAULT_REFRESH_SPACING: Duration = Duration::from_secs(15);

/// Commands accepted by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Re-extract the schedule.
    Refresh,
    /// The user finished logging in manually; verify and continue.
    LoginComplete,
    /// Shut down at the next poll point.
    Stop,
}

/// Events emitted by the worker. Every `Schedule` emission fully
/// replaces the previous list; `Stopped` is always the final event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Status(String),
    Schedule(Vec<ScheduleItem>),
    Error(String),
    LoginRequired,
    Stopped,
}

/// Owner-side handle: command senders plus the event receiver.
pub struct WorkerHandle {
    commands: Sender<Command>,
    events: Receiver<WorkerEvent>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Requests a schedule refresh. Callers should gate requests
    /// through a [`RefreshGate`] first.
    pub fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh);
    }

    /// Reports that the manual login step finished.
    pub fn login_complete(&self) {
        let _ = self.commands.send(Command::LoginComplete);
    }

    /// The event stream. Poll with `try_recv` or block with
    /// `recv_timeout`; a `Stopped` event means the worker is gone.
    #[must_use]
    pub const fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Sends a stop and waits for the worker thread to finish.
    /// Remaining events (ending in `Stopped`) stay readable afterwards.
    pub fn stop(&mut self) {
        let _ = self.commands.send(Command::Stop);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns the worker thread around a page driver.
pub fn spawn<P>(
    mut page: P,
    extractor: ScheduleExtractor,
    url: String,
) -> std::io::Result<WorkerHandle>
where
    P: PageDriver + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();

    let join = thread::Builder::new()
        .name("schedule-worker".to_string())
        .spawn(move || {
            run(&mut page, &extractor, &url, &command_rx, &event_tx);
            let _ = event_tx.send(WorkerEvent::Stopped);
            tracing::debug!("schedule worker stopped");
        })?;

    Ok(WorkerHandle {
        commands: command_tx,
        events: event_rx,
        join: Some(join),
    })
}

fn run(
    page: &mut dyn PageDriver,
    extractor: &ScheduleExtractor,
    url: &str,
    commands: &Receiver<Command>,
    events: &Sender<WorkerEvent>,
) {
    let status = |text: &str| {
        let _ = events.send(WorkerEvent::Status(text.to_string()));
    };

    // Manual-file mode never opens a portal session.
    if !extractor.is_manual() {
        status("Connecting to the schedule portal...");
        match probe_session(page, url) {
            Ok(SessionProbe::SignedIn) => {}
            Ok(SessionProbe::LoginRequired) => {
                if !await_login(page, url, commands, events) {
                    return;
                }
            }
            Err(err) => {
                // Startup failure is critical: report and terminate so
                // the owner can release resources deterministically.
                let _ = events.send(WorkerEvent::Error(format!("startup failed: {err}")));
                return;
            }
        }
        status("Connected.");
    }

    fetch(page, extractor, url, events);

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Command::Refresh) => fetch(page, extractor, url, events),
            // Already signed in; nothing to verify.
            Ok(Command::LoginComplete) => {}
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Waits for the user to finish the manual login step, re-probing after
/// each confirmation. Returns `false` when the worker should terminate.
fn await_login(
    page: &mut dyn PageDriver,
    url: &str,
    commands: &Receiver<Command>,
    events: &Sender<WorkerEvent>,
) -> bool {
    let _ = events.send(WorkerEvent::LoginRequired);

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => return false,
            Ok(Command::LoginComplete) => {
                let _ = events.send(WorkerEvent::Status("Verifying login...".to_string()));
                match probe_session(page, url) {
                    Ok(SessionProbe::SignedIn) => return true,
                    Ok(SessionProbe::LoginRequired) => {
                        let _ = events.send(WorkerEvent::LoginRequired);
                    }
                    Err(err) => {
                        let _ =
                            events.send(WorkerEvent::Error(format!("login check failed: {err}")));
                        return false;
                    }
                }
            }
            // Not signed in yet; a refresh would only re-read the wall.
            Ok(Command::Refresh) => {}
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

fn fetch(
    page: &mut dyn PageDriver,
    extractor: &ScheduleExtractor,
    url: &str,
    events: &Sender<WorkerEvent>,
) {
    let _ = events.send(WorkerEvent::Status("Fetching schedule...".to_string()));

    // Re-navigate so the page content is current; a failure here is
    // recoverable and the worker keeps running.
    if !extractor.is_manual() && !url.trim().is_empty() {
        if let Err(err) = page.navigate(url) {
            let _ = events.send(WorkerEvent::Error(format!("refresh failed: {err}")));
            return;
        }
    }

    let items = extractor.extract(page, Local::now().date_naive());
    let _ = events.send(WorkerEvent::Schedule(items));
}

/// Client-side rate limit on refresh requests.
#[derive(Debug)]
pub struct RefreshGate {
    min_spacing: Duration,
    last: Option<Instant>,
}

impl RefreshGate {
    #[must_use]
    pub const fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last: None,
        }
    }

    /// Returns whether a refresh may be requested now, recording the
    /// request time when it may.
    pub fn try_request(&mut self) -> bool {
        self.try_request_at(Instant::now())
    }

    fn try_request_at(&mut self, now: Instant) -> bool {
        if self
            .last
            .is_some_and(|last| now.saturating_duration_since(last) < self.min_spacing)
        {
            tracing::debug!("refresh request ignored (rate limit)");
            return false;
        }
        self.last = Some(now);
        true
    }
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_SPACING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use crate::extract::{FrameContent, PageError};

    const SCHEDULE_TEXT_TODAY: &str = "schedule placeholder";

    /// Page whose visible text can be swapped mid-test and which can be
    /// told to fail navigation.
    #[derive(Clone, Default)]
    struct FakePage {
        text: Arc<Mutex<String>>,
        fail_navigation: bool,
    }

    impl FakePage {
        fn new(text: &str) -> Self {
            Self {
                text: Arc::new(Mutex::new(text.to_string())),
                fail_navigation: false,
            }
        }

        fn set_text(&self, text: &str) {
            *self.text.lock().unwrap() = text.to_string();
        }
    }

    impl PageDriver for FakePage {
        fn navigate(&mut self, _url: &str) -> Result<(), PageError> {
            if self.fail_navigation {
                return Err(PageError::Navigation("browser crashed".to_string()));
            }
            Ok(())
        }

        fn table_rows(&mut self) -> Result<Vec<Vec<String>>, PageError> {
            Ok(Vec::new())
        }

        fn visible_text(&mut self) -> Result<String, PageError> {
            Ok(self.text.lock().unwrap().clone())
        }

        fn frames(&mut self) -> Result<Vec<FrameContent>, PageError> {
            Ok(Vec::new())
        }
    }

    fn drain_until(
        handle: &WorkerHandle,
        mut pred: impl FnMut(&WorkerEvent) -> bool,
    ) -> Vec<WorkerEvent> {
        let mut seen = Vec::new();
        loop {
            let event = handle
                .events()
                .recv_timeout(Duration::from_secs(5))
                .expect("worker event");
            let done = pred(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    #[test]
    fn emits_initial_schedule_then_stops_cleanly() {
        let page = FakePage::new(SCHEDULE_TEXT_TODAY);
        let mut handle = spawn(page, ScheduleExtractor::new(), String::new()).unwrap();

        let seen = drain_until(&handle, |e| matches!(e, WorkerEvent::Schedule(_)));
        assert!(
            seen.iter()
                .any(|e| matches!(e, WorkerEvent::Status(s) if s == "Connected."))
        );

        handle.stop();
        let seen = drain_until(&handle, |e| matches!(e, WorkerEvent::Stopped));
        assert!(matches!(seen.last(), Some(WorkerEvent::Stopped)));
    }

    #[test]
    fn refresh_replaces_the_schedule() {
        let page = FakePage::new(SCHEDULE_TEXT_TODAY);
        let mut handle = spawn(page, ScheduleExtractor::new(), String::new()).unwrap();
        drain_until(&handle, |e| matches!(e, WorkerEvent::Schedule(_)));

        handle.refresh();
        let seen = drain_until(&handle, |e| matches!(e, WorkerEvent::Schedule(_)));
        assert!(
            seen.iter()
                .any(|e| matches!(e, WorkerEvent::Schedule(items) if items.is_empty()))
        );
        handle.stop();
    }

    #[test]
    fn login_wall_waits_for_confirmation() {
        let page = FakePage::new("Username\nPassword\nSign in");
        let handle_page = page.clone();
        let mut handle = spawn(
            page,
            ScheduleExtractor::new(),
            "https://portal.example".to_string(),
        )
        .unwrap();

        drain_until(&handle, |e| matches!(e, WorkerEvent::LoginRequired));

        // Confirming while still on the wall re-prompts.
        handle.login_complete();
        drain_until(&handle, |e| matches!(e, WorkerEvent::LoginRequired));

        // After a successful login the worker proceeds to fetch.
        handle_page.set_text("My Schedule");
        handle.login_complete();
        drain_until(&handle, |e| matches!(e, WorkerEvent::Schedule(_)));
        handle.stop();
    }

    #[test]
    fn startup_navigation_failure_is_fatal() {
        let page = FakePage {
            fail_navigation: true,
            ..FakePage::new("")
        };
        let mut handle = spawn(
            page,
            ScheduleExtractor::new(),
            "https://portal.example".to_string(),
        )
        .unwrap();

        let seen = drain_until(&handle, |e| matches!(e, WorkerEvent::Stopped));
        assert!(seen.iter().any(|e| matches!(e, WorkerEvent::Error(_))));
        assert!(matches!(seen.last(), Some(WorkerEvent::Stopped)));
        handle.stop();
    }

    #[test]
    fn refresh_gate_enforces_spacing() {
        let mut gate = RefreshGate::new(Duration::from_secs(15));
        let t0 = Instant::now();
        assert!(gate.try_request_at(t0));
        assert!(!gate.try_request_at(t0 + Duration::from_secs(5)));
        assert!(!gate.try_request_at(t0 + Duration::from_secs(14)));
        assert!(gate.try_request_at(t0 + Duration::from_secs(15)));
    }
}
