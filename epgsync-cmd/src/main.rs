mod command_sync;

use std::{io::stderr, path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Sync remote EPG schedules into an XMLTV guide file.
///
/// For every channel in the guide that has a matching row in the schedule
/// sources CSV, the channel's schedule document is fetched and the channel's
/// programme entries are replaced with the fetched ones. Channels with no
/// source row, an empty source URL, or a failing fetch are left exactly as
/// they were. The guide file is rewritten in place.
///
/// Exits non-zero if any channel with a schedule source failed to sync.
#[derive(Parser)]
#[command(version, about, long_about)]
struct Cli {
    /// Logging level filters, e.g., debug, info, warn, etc ...
    #[arg(short, long, default_value = "info")]
    logging: String,

    /// Number of schedule fetches to run at once.
    #[arg(short, long, default_value_t = 1, value_parser = parse_jobs)]
    jobs: usize,

    /// XMLTV guide file to update in place.
    #[arg(value_name = "guide")]
    guide: PathBuf,

    /// CSV file mapping channel ids (epg_channel_id) to schedule source
    /// URLs (schedule_source).
    #[arg(value_name = "sources")]
    sources: PathBuf,
}

fn parse_jobs(jobs: &str) -> Result<usize, String> {
    match jobs.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err("expected a number >= 1".to_string()),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(EnvFilter::new(cli.logging))
        .init();

    let summary = command_sync::sync(&cli.guide, &cli.sources, cli.jobs)?;

    info!("{summary}");
    if !summary.fully_succeeded() {
        error!("{} of {} channels failed to sync", summary.failed(), summary.channels.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
