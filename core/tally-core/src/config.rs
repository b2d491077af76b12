//! User preferences loaded from `config.json` in the storage root.
//!
//! Missing or malformed files yield defaults; preferences never block the
//! tracker from starting. On first run the defaults are written out so the
//! available keys are discoverable.

use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::session::SwitchAction;
use crate::storage::StorageConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Directory for CSV exports. Falls back to `<root>/exports` when unset.
    pub export_dir: Option<PathBuf>,
    /// Attribute the running session's elapsed time in summaries.
    pub include_running_in_summary: bool,
    /// Open the exported file in the platform viewer after writing it.
    pub open_after_export: bool,
    /// How the current task is closed when switching to another one.
    pub default_switch_action: SwitchAction,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            export_dir: None,
            include_running_in_summary: false,
            open_after_export: true,
            default_switch_action: SwitchAction::Pause,
        }
    }
}

impl TallyConfig {
    /// Resolves the export directory against the storage root.
    pub fn export_dir(&self, storage: &StorageConfig) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| storage.exports_dir())
    }
}

/// Loads the configuration, returning defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> TallyConfig {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return TallyConfig::default(),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read config; using defaults");
            return TallyConfig::default();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|err| {
        tracing::warn!(error = %err, path = %path.display(), "Malformed config; using defaults");
        TallyConfig::default()
    })
}

/// Loads the configuration, first writing the defaults if no file exists.
/// A failed write is logged and the defaults are used.
pub fn load_or_init_config(path: &Path) -> TallyConfig {
    if !path.exists() {
        let config = TallyConfig::default();
        match save_config(path, &config) {
            Ok(()) => tracing::info!(path = %path.display(), "Wrote default config"),
            Err(err) => tracing::warn!(error = %err, "Failed to write default config"),
        }
        return config;
    }
    load_config(path)
}

/// Saves the configuration to disk.
pub fn save_config(path: &Path, config: &TallyConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config).map_err(|e| TallyError::Json {
        context: "serializing config".to_string(),
        source: e,
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TallyError::ConfigWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, content).map_err(|e| TallyError::ConfigWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
