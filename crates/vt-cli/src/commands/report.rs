//! Report command: trailing aggregate series as a bar chart or JSON.

use std::io::Write;

use anyhow::{Result, anyhow};
use chrono::Local;

use vt_store::{Bucket, Metric, StatsStore};

pub fn run<W: Write>(
    writer: &mut W,
    store: &StatsStore,
    metric: &str,
    weekly: bool,
    count: u32,
    json: bool,
) -> Result<()> {
    let metric: Metric = metric.parse().map_err(|err: String| anyhow!(err))?;
    let bucket = if weekly { Bucket::Week } else { Bucket::Day };
    let series = store.recent_series(bucket, metric, count, Local::now().date_naive());

    if json {
        serde_json::to_writer_pretty(&mut *writer, &series)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "{metric} per {bucket} (last {count})")?;
    let max = series.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    for point in &series {
        writeln!(
            writer,
            "{:>8}  {}  {}",
            point.label,
            bar(point.value, max),
            format_value(point.value)
        )?;
    }
    Ok(())
}

/// Generates a 10-character bar. Values under 5% of the maximum get a
/// single block for visibility.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value / max;
    let filled = if ratio < 0.05 && value > 0.0 {
        1
    } else {
        ((ratio * 10.0).round().min(10.0)) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Whole numbers print bare, everything else with one decimal.
#[allow(clippy::cast_possible_truncation)]
fn format_value(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}

/// Formats tracked seconds as `Xh Ym` past the first hour, `Xm` below
/// it.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 {
        return "0m".to_string();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total_minutes = (seconds / 60.0) as u64;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
