//! Error types for tally-core operations.
//!
//! Engine misuse (starting twice, stopping nothing, blank names) is surfaced
//! as a descriptive error for the caller to show and move on from. Read
//! failures never reach this type; the store absorbs them.

use std::path::PathBuf;

/// All errors that can occur in tally-core operations.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    // ─────────────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("A task is already running: {task_name}. Stop or pause it first")]
    AlreadyRunning { task_name: String },

    #[error("No task is currently running")]
    NothingRunning,

    #[error("Task name cannot be empty")]
    EmptyTaskName,

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },
}

impl TallyError {
    /// True for errors caused by calling an operation in the wrong state or
    /// with a bad argument. Callers show these and keep going.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TallyError::AlreadyRunning { .. }
                | TallyError::NothingRunning
                | TallyError::EmptyTaskName
        )
    }
}

/// Convenience type alias for Results using TallyError.
pub type Result<T> = std::result::Result<T, TallyError>;
