//! Status command: today's numbers at a glance.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;

use vt_core::timeparse;
use vt_store::{StatsPeriod, StatsStore};

use super::report::format_duration;

pub fn run<W: Write>(writer: &mut W, store: &StatsStore, now: NaiveDateTime) -> Result<()> {
    let today = now.date();

    writeln!(writer, "Shift tracker status")?;
    writeln!(writer, "Stats file: {}", store.path().display())?;

    match store.first_ticket_today(today) {
        Some(first) => {
            writeln!(
                writer,
                "First ticket: {} | Session CPH: {:.2}",
                timeparse::format_clock(first.time()),
                store.session_cph(first, now)
            )?;
        }
        None => writeln!(writer, "No tickets logged today.")?,
    }

    let today_replies = store
        .daily_reply_counts()
        .get(&today)
        .copied()
        .unwrap_or(0);
    writeln!(
        writer,
        "Replies: {today_replies} today | {} this week | {} this month",
        store.week_to_date(now),
        store.month_to_date(now)
    )?;

    let totals = store.activity_totals(StatsPeriod::Today, today);
    writeln!(
        writer,
        "Input today: {} keys, {} clicks over {}",
        totals.keys,
        totals.clicks,
        format_duration(totals.duration)
    )?;
    writeln!(
        writer,
        "Weekly averages: {} KPM, {} CPM",
        store.average_kpm(StatsPeriod::Week, today),
        store.average_cpm(StatsPeriod::Week, today)
    )?;
    writeln!(
        writer,
        "Daily average: {:.1} tickets across active days",
        store.average_tickets_per_day()
    )?;

    Ok(())
}
