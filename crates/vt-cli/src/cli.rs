//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Shift schedule tracker and ticket pacer.
///
/// Watches a work-scheduling portal for today's activities, paces
/// ticket work against a target rate, and keeps per-day throughput and
/// input-activity statistics.
#[derive(Debug, Parser)]
#[command(name = "vt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse and print today's schedule from an offline source.
    Schedule {
        /// Manual schedule file (`H:MM AM Activity` lines).
        #[arg(long)]
        file: Option<PathBuf>,

        /// Saved page-text dump to run the full extraction against.
        #[arg(long)]
        page_text: Option<PathBuf>,
    },

    /// Log a completed ticket.
    Ticket {
        /// The ticket was closed without a reply.
        #[arg(long)]
        no_reply: bool,
    },

    /// Show today's tracking status.
    Status,

    /// Show trailing aggregates for a metric.
    Report {
        /// Metric: volume, cph, aht, kpm, or cpm.
        #[arg(long, default_value = "cph")]
        metric: String,

        /// Bucket by ISO week instead of by day.
        #[arg(long)]
        weekly: bool,

        /// Number of trailing buckets.
        #[arg(long, default_value_t = 14)]
        count: u32,

        /// Emit JSON instead of a bar chart.
        #[arg(long)]
        json: bool,
    },

    /// Run the schedule worker, reminders, pacing timer, and activity
    /// flusher until told to quit.
    Track {
        /// Manual schedule file overriding the configured source.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Saved page-text dump standing in for the live portal page.
        #[arg(long)]
        page_text: Option<PathBuf>,
    },
}
