//! Schedule extraction against a live (or canned) portal page.
//!
//! The portal's markup drifts, so extraction layers three strategies in
//! order and takes the first that yields anything: a structured table
//! scan, a regex pass over the page's visible text, and a per-frame
//! text pass. A configured manual override file bypasses the page
//! entirely. Strategy failures are never fatal; the engine's worst case
//! is an empty schedule.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rayon::prelude::*;
use thiserror::Error;

use crate::parser::{self, RawItem};
use crate::schedule::{self, ScheduleItem};
use crate::timeparse;

/// Frames shorter than this are treated as chrome, not content.
const MIN_FRAME_TEXT_LEN: usize = 100;

/// Substrings of visible text that indicate a login page.
const LOGIN_MARKERS: &[&str] = &["password", "sign in", "log in"];

/// Errors surfaced by a [`PageDriver`] implementation.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("page content unavailable: {0}")]
    Content(String),
}

/// Rendered text of one embedded frame.
#[derive(Debug, Clone)]
pub struct FrameContent {
    /// Detached frames linger in the frame list after navigation; they
    /// carry no usable content.
    pub detached: bool,
    pub text: String,
}

/// The injected browser capability.
///
/// Extraction needs exactly four operations from whatever drives the
/// page; everything else about the browser stays with the embedding
/// application. Tests substitute a canned implementation.
pub trait PageDriver {
    /// Navigates (or re-navigates) to the given URL.
    fn navigate(&mut self, url: &str) -> Result<(), PageError>;

    /// Cell texts of every table row on the page.
    fn table_rows(&mut self) -> Result<Vec<Vec<String>>, PageError>;

    /// Visible rendered text of the document.
    fn visible_text(&mut self) -> Result<String, PageError>;

    /// Every embedded frame with its rendered text.
    fn frames(&mut self) -> Result<Vec<FrameContent>, PageError>;
}

/// Whether a navigation landed on the schedule or on a login wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProbe {
    SignedIn,
    LoginRequired,
}

/// Navigates to `url` (when non-empty) and sniffs the visible text for
/// login markers. An ambiguous page is reported as signed in: the
/// portal offers no reliable signed-in marker, and a wrong guess here
/// only costs one empty extraction pass.
pub fn probe_session(page: &mut dyn PageDriver, url: &str) -> Result<SessionProbe, PageError> {
    if !url.trim().is_empty() {
        page.navigate(url)?;
    }
    let text = page.visible_text()?.to_lowercase();
    if LOGIN_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Ok(SessionProbe::LoginRequired);
    }
    Ok(SessionProbe::SignedIn)
}

/// The extraction strategies, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Table,
    Text,
    Frames,
}

impl Strategy {
    const ORDER: [Self; 3] = [Self::Table, Self::Text, Self::Frames];

    const fn name(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Text => "text",
            Self::Frames => "frames",
        }
    }

    fn attempt(
        self,
        page: &mut dyn PageDriver,
        today: NaiveDate,
    ) -> Result<Vec<RawItem>, PageError> {
        match self {
            Self::Table => table_items(page),
            Self::Text => {
                let text = page.visible_text()?;
                Ok(parser::scan_page_text(&text, today))
            }
            Self::Frames => frame_items(page, today),
        }
    }
}

/// Structured pass: rows with at least three cells are read as
/// `[time, _, activity, ..]`, keeping rows whose first cell parses as a
/// time under the lenient formats.
fn table_items(page: &mut dyn PageDriver) -> Result<Vec<RawItem>, PageError> {
    let rows = page.table_rows()?;
    tracing::debug!(rows = rows.len(), "table strategy scanning rows");

    let items = rows
        .iter()
        .filter(|cells| cells.len() >= 3)
        .filter_map(|cells| {
            let time = cells[0].trim();
            if !timeparse::is_recognized(time) {
                return None;
            }
            Some(RawItem {
                time: time.to_string(),
                activity: cells[2].trim().to_string(),
                duration: None,
            })
        })
        .collect();
    Ok(items)
}

/// Frame pass: unlike the others this aggregates hits across every
/// attached frame with enough text to be content.
fn frame_items(page: &mut dyn PageDriver, today: NaiveDate) -> Result<Vec<RawItem>, PageError> {
    let frames = page.frames()?;
    tracing::debug!(frames = frames.len(), "frame strategy scanning frames");

    let texts: Vec<String> = frames
        .into_iter()
        .filter(|frame| !frame.detached && frame.text.len() >= MIN_FRAME_TEXT_LEN)
        .map(|frame| frame.text)
        .collect();

    let items = texts
        .par_iter()
        .map(|text| parser::scan_page_text(text, today))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    Ok(items)
}

/// Orchestrates the strategies against a page, or a manual override
/// file when one is configured.
#[derive(Debug, Clone, Default)]
pub struct ScheduleExtractor {
    manual_file: Option<PathBuf>,
}

impl ScheduleExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self { manual_file: None }
    }

    /// Manual override mode: the schedule is read from a local file
    /// under the loose grammar and the page is never consulted.
    #[must_use]
    pub const fn with_manual_file(path: PathBuf) -> Self {
        Self {
            manual_file: Some(path),
        }
    }

    #[must_use]
    pub const fn is_manual(&self) -> bool {
        self.manual_file.is_some()
    }

    /// Produces the best-effort schedule for `today`.
    ///
    /// Strategies run in order until one yields items; the winning
    /// list is normalized (anchored, deduped, sorted). All failures
    /// are logged and swallowed: the engine returns an empty list
    /// rather than an error.
    #[must_use]
    pub fn extract(&self, page: &mut dyn PageDriver, today: NaiveDate) -> Vec<ScheduleItem> {
        if let Some(path) = &self.manual_file {
            return schedule::normalize(manual_items(path), today);
        }

        for strategy in Strategy::ORDER {
            match strategy.attempt(page, today) {
                Ok(items) if !items.is_empty() => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        count = items.len(),
                        "extraction strategy succeeded"
                    );
                    return schedule::normalize(items, today);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(strategy = strategy.name(), %err, "extraction strategy failed");
                }
            }
        }
        Vec::new()
    }
}

fn manual_items(path: &Path) -> Vec<RawItem> {
    match fs::read_to_string(path) {
        Ok(contents) => parser::scan_manual_text(&contents),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "manual schedule file unreadable");
            Vec::new()
        }
    }
}
