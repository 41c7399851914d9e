//! Tracing setup.
//!
//! The terminal belongs to the UI, so log output goes to a file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

const DEFAULT_FILTER: &str = "stonkcast=info,warn";
const VERBOSE_FILTER: &str = "stonkcast=debug,info";

/// Default log location: `<data dir>/stonkcast/stonkcast.log`.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("stonkcast")
        .join("stonkcast.log")
}

fn filter_for(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    })
}

/// Install the global subscriber, appending to `path`.
pub fn init(path: &Path, verbose: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter_for(verbose))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    Ok(())
}
