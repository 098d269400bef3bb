use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vt_cli::commands::{report, schedule, status, ticket, track};
use vt_cli::{Cli, Commands, Config};
use vt_store::StatsStore;

/// Load config and open the stats store. The store itself never fails
/// to open; a bad file just starts empty.
fn open_store(config_path: Option<&Path>) -> Result<(StatsStore, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let store = StatsStore::open(&config.stats_path);
    Ok((store, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout();

    match cli.command {
        Some(Commands::Schedule { file, page_text }) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            schedule::run(&mut stdout, &config, file.as_deref(), page_text.as_deref())?;
        }
        Some(Commands::Ticket { no_reply }) => {
            let (mut store, _config) = open_store(cli.config.as_deref())?;
            ticket::run(&mut stdout, &mut store, no_reply)?;
        }
        Some(Commands::Status) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            status::run(&mut stdout, &store, chrono::Local::now().naive_local())?;
        }
        Some(Commands::Report {
            metric,
            weekly,
            count,
            json,
        }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            report::run(&mut stdout, &store, &metric, weekly, count, json)?;
        }
        Some(Commands::Track { file, page_text }) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            tracing::debug!(?config, "loaded configuration");
            track::run(&config, file, page_text)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
