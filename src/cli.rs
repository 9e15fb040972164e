//! Command-line interface definitions for Awful Headlines.
//!
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Awful Headlines application.
///
/// # Examples
///
/// ```sh
/// # Print the cached (or freshly fetched) headlines
/// awful_headlines --stdout
///
/// # Force a re-fetch and write a JSON digest
/// awful_headlines --refresh -j ./json
///
/// # Custom sources
/// awful_headlines -c sources.yaml -j ./json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file; built-in sources are used otherwise
    #[arg(short, long, env = "AWFUL_HEADLINES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, env = "AWFUL_HEADLINES_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Output directory for the JSON digest
    #[arg(short, long, env = "AWFUL_HEADLINES_JSON_DIR")]
    pub json_output_dir: Option<String>,

    /// Ignore the cache TTL and fetch every source now
    #[arg(short, long)]
    pub refresh: bool,

    /// Print the headlines to stdout
    #[arg(long)]
    pub stdout: bool,
}

impl Cli {
    /// Whether any output was asked for; with none, headlines go to stdout.
    pub fn prints_to_stdout(&self) -> bool {
        self.stdout || self.json_output_dir.is_none()
    }
}
