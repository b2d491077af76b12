//! Storage configuration and path management for Tally.
//!
//! All file paths Tally reads or writes are derived from a single root
//! directory, so tests can point everything at a temp dir with
//! [`StorageConfig::with_root`].

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, TallyError};

/// Environment variable that overrides the default root directory.
pub const TALLY_HOME_ENV: &str = "TALLY_HOME";

/// Central configuration for all Tally storage paths.
///
/// Production code uses [`StorageConfig::from_env`] which points to `~/.tally/`
/// unless `TALLY_HOME` is set.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all Tally data (default: ~/.tally)
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the root from `TALLY_HOME`, falling back to `~/.tally`.
    pub fn from_env() -> Result<Self> {
        if let Some(root) = env::var_os(TALLY_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }
        let home = dirs::home_dir().ok_or(TallyError::HomeDirNotFound)?;
        Ok(Self::with_root(home.join(".tally")))
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the root directory for Tally data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to sessions.json (the durable session history).
    pub fn sessions_file(&self) -> PathBuf {
        self.root.join("sessions.json")
    }

    /// Path to config.json (user preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directories
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to logs/ directory (rolling log files).
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Path to exports/ directory, used when no export dir is configured.
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Ensures the root directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)
    }
}

/// Path of the backup kept beside a durable file: `sessions.json.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

/// Where a new backup is built before it is renamed over the old one.
pub fn staged_backup_path(backup: &Path) -> PathBuf {
    with_suffix(backup, ".new")
}

/// Prefix used for temp files written beside a durable file.
pub fn temp_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tally".to_string());
    format!(".{}.", name)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}
