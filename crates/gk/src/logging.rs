//! File logging
//!
//! The terminal belongs to the UI, so log output only goes to a file. The
//! filter comes from `GK_LOG` (`EnvFilter` syntax) and defaults to `info`.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const FILTER_ENV: &str = "GK_LOG";

/// Install the global subscriber writing to `path`. Without a path nothing is
/// installed and every event is discarded.
pub fn init(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install log subscriber: {err}"))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gk started");
    Ok(())
}
