//! Schedule command: run the extraction pipeline against an offline
//! source and print the result.
//!
//! Useful for checking a manual override file, and for debugging the
//! line grammar against a saved copy of the portal page without
//! logging in again.

use std::io::Write;
use std::path::Path;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDateTime};

use vt_core::extract::ScheduleExtractor;
use vt_core::schedule::{self, ScheduleItem};
use vt_core::timeparse;

use crate::Config;
use crate::page::OfflinePage;

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    file: Option<&Path>,
    page_text: Option<&Path>,
) -> Result<()> {
    let manual = file.or_else(|| {
        config
            .use_manual_file
            .then(|| config.manual_schedule_path.as_path())
    });

    let (extractor, mut page) = if let Some(path) = manual {
        (
            ScheduleExtractor::with_manual_file(path.to_path_buf()),
            OfflinePage::new(None),
        )
    } else if let Some(path) = page_text {
        (
            ScheduleExtractor::new(),
            OfflinePage::new(Some(path.to_path_buf())),
        )
    } else {
        bail!("no offline schedule source: pass --file or --page-text, or set use_manual_file");
    };

    let now = Local::now().naive_local();
    let items = extractor.extract(&mut page, now.date());
    write_schedule(writer, &items, now)?;
    Ok(())
}

/// Renders a schedule list with next-activity and shift-end summary
/// lines. Shared with the tracking loop.
pub fn write_schedule<W: Write>(
    writer: &mut W,
    items: &[ScheduleItem],
    now: NaiveDateTime,
) -> Result<()> {
    if items.is_empty() {
        writeln!(writer, "No schedule found.")?;
        return Ok(());
    }

    for item in items {
        match &item.duration {
            Some(duration) => {
                writeln!(writer, "{:>8}  {}  ({duration})", item.time, item.activity)?;
            }
            None => writeln!(writer, "{:>8}  {}", item.time, item.activity)?,
        }
    }

    if let Some(next) = schedule::next_activity(items, now) {
        writeln!(writer, "Next: {} at {}", next.activity, next.time)?;
    }
    if let Some(end) = schedule::shift_end(items, now) {
        writeln!(writer, "Shift end: {}", timeparse::format_clock(end.time()))?;
    }
    Ok(())
}
