//! Log setup for the tally binary.
//!
//! Logs go to a daily rolling file under `<root>/logs/` so they never mix
//! with the menu on stdout. `TALLY_LOG` (or `RUST_LOG`) sets the filter;
//! `TALLY_DEBUG_LOG=1` forces debug.

use std::env;

use fs_err as fs;
use tally_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "tally.log";

/// Installs the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let logs_dir = storage.logs_dir();
    if let Err(err) = fs::create_dir_all(&logs_dir) {
        // Without a log dir only warnings are worth interrupting the terminal for.
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_writer(std::io::stderr)
            .init();
        tracing::warn!(error = %err, "Failed to create log directory; logging to stderr");
        return None;
    }

    let appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn filter() -> EnvFilter {
    let debug_enabled = env::var("TALLY_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        return EnvFilter::new("debug");
    }

    EnvFilter::try_from_env("TALLY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
