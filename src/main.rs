//! # hot_topics
//!
//! Builds the "hot topics" snapshot for a static site: fetches a small set of
//! news feeds, merges their items, drops duplicate titles, sorts by
//! publication time and writes the newest items to a JSON file.
//!
//! ## Usage
//!
//! ```sh
//! hot_topics                          # built-in sources -> public/hot.json
//! hot_topics -c sources.yaml -o out/hot.json
//! ```
//!
//! ## Architecture
//!
//! The application is a single pass, run once per invocation by an external
//! scheduler:
//! 1. **Fetching**: GET every source concurrently, with a per-request timeout
//! 2. **Normalizing**: Parse JSON or RSS/Atom into one record shape
//! 3. **Merging**: Concatenate in registry order, drop empty and duplicate titles
//! 4. **Ranking**: Stable sort by timestamp, newest first, keep the top 50
//! 5. **Output**: Write the snapshot as pretty-printed JSON
//!
//! A failing source is logged and skipped. Only a failure to write the
//! snapshot (or an invalid config file) ends the run with a non-zero status.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod sources;
mod utils;

use cli::Cli;
use config::Config;
use fetcher::{HttpFetcher, RetryFetch};
use outputs::json;
use utils::ensure_writable_dir;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("hot_topics starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output, "Parsed CLI arguments");

    let mut config = match Config::load(args.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e);
        }
    };
    if let Some(output) = args.output {
        config.output_path = output;
    }

    // Early check: fail before fetching if the snapshot can't be written
    let output_dir = match config.output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if let Err(e) = ensure_writable_dir(output_dir).await {
        error!(
            path = %output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let fetcher = RetryFetch::new(
        HttpFetcher::new(config.timeout(), &config.user_agent)?,
        config.retries,
    );
    info!(
        sources = config.sources.len(),
        timeout_secs = config.timeout_secs,
        retries = config.retries,
        "Fetching sources"
    );

    let (snapshot, stats) = pipeline::build_snapshot(&fetcher, &config, Utc::now()).await;

    if let Err(e) = json::write_snapshot(&snapshot, &config.output_path).await {
        error!(path = %config.output_path.display(), error = %e, "Failed to write snapshot");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(
        path = %config.output_path.display(),
        written = stats.written,
        fetched = stats.fetched,
        sources_ok = stats.sources_ok,
        sources_failed = stats.sources_failed,
        empty_titles = stats.empty_titles,
        duplicates = stats.duplicates,
        fallback_timestamps = stats.fallback_timestamps,
        elapsed_ms = elapsed.as_millis() as u64,
        "Wrote {} hot topics",
        stats.written
    );

    if snapshot.is_empty() && args.fail_when_empty {
        warn!("Snapshot is empty and --fail-when-empty is set");
        return Err("no items collected from any source".into());
    }

    Ok(())
}
