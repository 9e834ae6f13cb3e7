//! Tracing setup for the CLI: append to a log file in the XDG state dir, or
//! write to stderr when that is unavailable.

use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info,cthulhu=debug,cthulhu_core=debug";
const LOG_FILE: &str = "cthulhu.log";

/// `$XDG_STATE_HOME/cthulhu/cthulhu.log`; the directory is created.
pub fn log_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("cthulhu")?;
    dirs.place_state_file(LOG_FILE)
        .context("create log directory")
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to [`log_path`]. Returns the file used.
pub fn init_logging() -> Result<PathBuf> {
    let path = log_path()?;
    init_logging_at(&path)?;
    Ok(path)
}

/// Append log lines to `path`. Fails if the file cannot be opened or a global
/// subscriber is already installed.
pub fn init_logging_at(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("install log subscriber: {}", e))?;

    tracing::info!(path = %path.display(), "logging started");
    Ok(())
}

/// Log to stderr. Does nothing if a subscriber is already installed.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
