//! Logging initialization for the CLI.
//!
//! Output goes to stderr so that stdout carries only command results, or to a
//! file when one is given. Writes happen on a background thread; keep the
//! returned guard alive until the program exits so buffered lines are flushed.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the filter directives, e.g. `stagefeed=debug`
pub const LOG_ENV: &str = "STAGEFEED_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Filter from [`LOG_ENV`], or `info` when unset or invalid
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `log_file` - Append to this file instead of writing to stderr
/// * `json` - Emit one JSON object per line
///
/// # Errors
/// Fails when the log file cannot be opened or a subscriber is already set.
pub fn init(log_file: Option<&Path>, json: bool) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter());

    if json {
        subscriber
            .with(fmt::layer().json().with_writer(writer))
            .try_init()?;
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(log_file.is_none())
                    .with_writer(writer),
            )
            .try_init()?;
    }

    Ok(guard)
}
