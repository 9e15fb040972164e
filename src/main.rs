//! # Awful Headlines
//!
//! Aggregates headlines from text-friendly news sites into one newest-first
//! list, cached on disk between runs.
//!
//! ## Usage
//!
//! ```sh
//! awful_headlines --stdout
//! awful_headlines --refresh -j ./json
//! ```

use awful_headlines::cache::{CacheManager, Freshness};
use awful_headlines::cli::Cli;
use awful_headlines::config::Config;
use awful_headlines::error::Diagnostic;
use awful_headlines::fetch::{HttpFetcher, RetryFetch};
use awful_headlines::models::Digest;
use awful_headlines::outputs::json;
use awful_headlines::pipeline::Pipeline;
use awful_headlines::utils::{time_of_day, truncate_for_log};
use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("awful_headlines starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = match &args.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };

    let cache_dir = args.cache_dir.clone().or_else(|| config.cache_dir.clone());
    let cache = match cache_dir {
        Some(dir) => CacheManager::with_dir(dir),
        None => CacheManager::new()
            .ok_or_else(|| Diagnostic::Config("no cache directory available; pass --cache-dir".into()))?,
    };
    info!(cache_dir = %cache.dir().display(), "Using cache directory");

    let http = HttpFetcher::new(&config.user_agent, config.source_timeout())?;
    let fetcher = RetryFetch::new(http, config.retry.max_retries, config.retry_base_delay());
    let pipeline = Pipeline::from_config(&config, fetcher, cache)?;

    let lookup = if args.refresh {
        info!("Refresh requested; bypassing cache TTL");
        pipeline.refresh().await
    } else {
        pipeline.latest().await
    };

    match lookup.freshness {
        Freshness::Stale => warn!(fetched_at = ?lookup.fetched_at, "Serving stale headlines"),
        Freshness::Missing => error!("No headlines fetched and nothing cached"),
        Freshness::Cached | Freshness::Fetched => {}
    }

    let now = Local::now();
    let digest = Digest {
        local_date: now.date_naive().to_string(),
        time_of_day: time_of_day(),
        local_time: now.time().format("%H:%M:%S").to_string(),
        stale: lookup.freshness == Freshness::Stale,
        items: lookup.payload,
    };
    info!(
        count = digest.items.len(),
        time_of_day = %digest.time_of_day,
        local_date = %digest.local_date,
        freshness = ?lookup.freshness,
        "Digest ready"
    );

    if let Some(dir) = &args.json_output_dir {
        match json::write_digest(&digest, dir).await {
            Ok(path) => info!(path = %path.display(), "JSON digest written"),
            Err(e) => {
                error!(path = %dir, error = %e, "Failed to write JSON digest");
                return Err(e);
            }
        }
    }

    if args.prints_to_stdout() {
        for item in &digest.items {
            println!("[{}] {} ({})", item.source(), item.title(), item.raw_time());
            println!("    {}", item.url());
            if !item.summary().is_empty() {
                println!("    {}", truncate_for_log(item.summary(), 200));
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
