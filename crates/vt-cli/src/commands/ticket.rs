//! Ticket command: log a completed ticket and show the session rate.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;

use vt_core::timeparse;
use vt_store::StatsStore;

pub fn run<W: Write>(writer: &mut W, store: &mut StatsStore, no_reply: bool) -> Result<()> {
    let timestamp = store
        .log_ticket(!no_reply)
        .context("failed to persist ticket")?;

    let now = Local::now().naive_local();
    // The session starts at today's first ticket, which may well be
    // the one just logged.
    let session_start = store.first_ticket_today(now.date()).unwrap_or(timestamp);
    let cph = store.session_cph(session_start, now);

    writeln!(
        writer,
        "Ticket logged at {}{}.",
        timeparse::format_clock(timestamp.time()),
        if no_reply { " (no reply)" } else { "" }
    )?;
    writeln!(writer, "Session CPH: {cph:.2}")?;
    Ok(())
}
