//! File-backed persistence for the session history.
//!
//! Reads and writes `~/.tally/sessions.json`, a pretty-printed JSON array of
//! [`SessionRecord`]s.
//!
//! # Loading
//!
//! A missing file is the first-run state and yields an empty history. An
//! unreadable or corrupt file also yields an empty history (with a warning
//! logged) so the tracker stays usable. Field names are matched
//! case-insensitively, ignoring `_` and `-`, so `TaskName`, `task_name` and
//! `taskName` all load.
//!
//! # Saving
//!
//! ```text
//! serialize → .sessions.json.XXXX.tmp ─┬─ no durable file ─→ rename into place
//!                                       └─ durable exists ──→ replace, old copy → sessions.json.bak
//! ```
//!
//! The replace step is a [`ReplaceFile`] so tests can make it fail. When it
//! reports [`io::ErrorKind::Unsupported`], the store falls back to copying the
//! durable file to the backup and renaming the temp file over it. That
//! fallback is not crash-atomic. The temp file is removed on every path.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs_err as fs;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, TallyError};
use crate::storage::{backup_path, staged_backup_path, temp_prefix};

use super::types::SessionRecord;

/// Canonical on-disk field names.
const FIELD_NAMES: [&str; 5] = ["id", "taskName", "start", "end", "endKind"];

/// Swaps a freshly written file into place.
pub trait ReplaceFile {
    /// Moves `source` over `destination`, leaving the previous contents of
    /// `destination` at `backup`. Must leave `destination` untouched on error.
    ///
    /// Return [`io::ErrorKind::Unsupported`] when the storage cannot do this
    /// atomically; the caller then uses a weaker copy-then-rename fallback.
    fn replace(&self, source: &Path, destination: &Path, backup: &Path) -> io::Result<()>;
}

/// Hard-links the durable file to a staged backup name, renames that over
/// the backup, then renames the temp file over the durable file. Each rename
/// is atomic on the same filesystem, so the previous backup stays in place
/// until the new one exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicReplace;

impl ReplaceFile for AtomicReplace {
    fn replace(&self, source: &Path, destination: &Path, backup: &Path) -> io::Result<()> {
        let staged = staged_backup_path(backup);
        remove_if_exists(&staged)?;

        if let Err(err) = fs::hard_link(destination, &staged) {
            return Err(io::Error::new(io::ErrorKind::Unsupported, err));
        }
        if let Err(err) = fs::rename(&staged, backup) {
            let _ = fs::remove_file(&staged);
            return Err(err);
        }

        fs::rename(source, destination)
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Durable store for the full session sequence.
pub struct SessionStore {
    path: PathBuf,
    replacer: Box<dyn ReplaceFile>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(path: &Path) -> Self {
        Self::with_replacer(path, Box::new(AtomicReplace))
    }

    pub fn with_replacer(path: &Path, replacer: Box<dyn ReplaceFile>) -> Self {
        SessionStore {
            path: path.to_path_buf(),
            replacer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        backup_path(&self.path)
    }

    /// Loads the stored history. Never fails; unreadable data yields an empty history.
    pub fn load(&self) -> Vec<SessionRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "Failed to read sessions file, starting empty");
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            warn!(path = %self.path.display(), "Empty sessions file, starting empty");
            return Vec::new();
        }

        match parse_records(&content) {
            Ok(records) => {
                debug!(count = records.len(), path = %self.path.display(), "Loaded sessions");
                records
            }
            Err(err) => {
                warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to parse sessions file, starting empty"
                );
                Vec::new()
            }
        }
    }

    /// Writes the full history, replacing the durable file without ever
    /// leaving it half-written.
    pub fn save(&self, records: &[SessionRecord]) -> Result<()> {
        let content = serde_json::to_string_pretty(records).map_err(|e| TallyError::Json {
            context: "serializing sessions".to_string(),
            source: e,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| TallyError::Io {
            context: format!("creating {}", dir.display()),
            source: e,
        })?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&temp_prefix(&self.path))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| TallyError::Io {
                context: format!("creating temp file in {}", dir.display()),
                source: e,
            })?;

        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.flush())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| TallyError::Io {
                context: format!("writing temp file for {}", self.path.display()),
                source: e,
            })?;

        // Deleted on drop if it is still there, whichever branch below runs.
        let tmp_path = tmp.into_temp_path();

        if !self.path.exists() {
            fs::rename(&tmp_path, &self.path).map_err(|e| TallyError::Io {
                context: format!("moving temp file to {}", self.path.display()),
                source: e,
            })?;
            debug!(count = records.len(), "Created sessions file");
            return Ok(());
        }

        let backup = self.backup_path();
        match self.replacer.replace(&tmp_path, &self.path, &backup) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::Unsupported => {
                warn!(error = %err, "Atomic replace unsupported, using copy-then-rename");
                self.fallback_replace(&tmp_path, &backup)?;
            }
            Err(err) => {
                return Err(TallyError::Io {
                    context: format!("replacing {}", self.path.display()),
                    source: err,
                });
            }
        }

        debug!(count = records.len(), "Saved sessions");
        Ok(())
    }

    fn fallback_replace(&self, tmp_path: &Path, backup: &Path) -> Result<()> {
        // Copy into a staged name so a failed copy never truncates the old backup.
        let staged = staged_backup_path(backup);
        let copied = fs::copy(&self.path, &staged).and_then(|_| fs::rename(&staged, backup));
        if let Err(err) = copied {
            warn!(error = %err, "Failed to back up sessions file");
            let _ = fs::remove_file(&staged);
        }

        fs::rename(tmp_path, &self.path).map_err(|e| TallyError::Io {
            context: format!("moving temp file to {}", self.path.display()),
            source: e,
        })
    }
}

fn parse_records(content: &str) -> serde_json::Result<Vec<SessionRecord>> {
    let mut value: Value = serde_json::from_str(content)?;
    if let Value::Array(items) = &mut value {
        for item in items {
            if let Value::Object(map) = item {
                canonicalize_keys(map);
            }
        }
    }
    serde_json::from_value(value)
}

/// Renames keys that loosely match a known field to the canonical spelling.
fn canonicalize_keys(map: &mut Map<String, Value>) {
    let keys: Vec<String> = map.keys().cloned().collect();
    for key in keys {
        let loose = fold_key(&key);
        let Some(canonical) = FIELD_NAMES.iter().find(|f| fold_key(f) == loose) else {
            continue;
        };
        if key == *canonical || map.contains_key(*canonical) {
            continue;
        }
        if let Some(value) = map.remove(&key) {
            map.insert((*canonical).to_string(), value);
        }
    }
}

fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::EndKind;
    use chrono::{DateTime, Utc};
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn sample_records() -> Vec<SessionRecord> {
        vec![
            SessionRecord {
                id: "01HZX0000000000000000000A1".to_string(),
                task_name: "Study".to_string(),
                start: at("2026-01-31T09:00:00Z"),
                end: Some(at("2026-01-31T09:30:00Z")),
                end_kind: Some(EndKind::Stopped),
            },
            SessionRecord {
                id: "01HZX0000000000000000000A2".to_string(),
                task_name: "Write, edit".to_string(),
                start: at("2026-01-31T10:00:00Z"),
                end: Some(at("2026-01-31T10:10:00Z")),
                end_kind: Some(EndKind::Paused),
            },
            SessionRecord {
                id: "01HZX0000000000000000000A3".to_string(),
                task_name: "Review".to_string(),
                start: at("2026-01-31T11:00:00Z"),
                end: None,
                end_kind: None,
            },
        ]
    }

    fn temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    /// Fails the replace step with a fixed error kind, counting calls.
    struct FailingReplace {
        kind: io::ErrorKind,
        calls: Rc<Cell<u32>>,
    }

    impl ReplaceFile for FailingReplace {
        fn replace(&self, _source: &Path, _destination: &Path, _backup: &Path) -> io::Result<()> {
            self.calls.set(self.calls.get() + 1);
            Err(io::Error::new(self.kind, "simulated replace failure"))
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(&temp.path().join("sessions.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        std::fs::write(&path, "[{ this is not json").unwrap();

        let store = SessionStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_empty_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        std::fs::write(&path, "  \n").unwrap();

        assert!(SessionStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_load_wrong_shape_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        std::fs::write(&path, r#"{"version": 3, "sessions": {}}"#).unwrap();

        assert!(SessionStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_save_then_load_preserves_order_and_content() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(&temp.path().join("sessions.json"));
        let records = sample_records();

        store.save(&records).unwrap();
        assert_eq!(store.load(), records);
    }

    #[test]
    fn test_save_empty_sequence_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(&temp.path().join("sessions.json"));

        store.save(&sample_records()).unwrap();
        store.save(&[]).unwrap();
        assert!(store.load().is_empty());
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap().trim(),
            "[]"
        );
    }

    #[test]
    fn test_first_save_creates_file_without_backup() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(&temp.path().join("data").join("sessions.json"));

        store.save(&sample_records()).unwrap();
        assert!(store.path().exists());
        assert!(!store.backup_path().exists());
        assert!(temp_files(store.path().parent().unwrap()).is_empty());
    }

    #[test]
    fn test_second_save_keeps_previous_as_backup() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(&temp.path().join("sessions.json"));
        let mut records = sample_records();

        store.save(&records[..1]).unwrap();
        records.truncate(2);
        store.save(&records).unwrap();

        let backup = SessionStore::new(&store.backup_path());
        assert_eq!(backup.load(), sample_records()[..1].to_vec());
        assert_eq!(store.load(), records);
        assert!(temp_files(temp.path()).is_empty());
        assert!(!staged_backup_path(&store.backup_path()).exists());
    }

    #[test]
    fn test_failed_fallback_backup_keeps_previous_backup() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        let records = sample_records();
        let store = SessionStore::new(&path);
        store.save(&records[..1]).unwrap();
        store.save(&records[..2]).unwrap();

        // A directory at the staged name makes the backup copy fail.
        std::fs::create_dir(staged_backup_path(&store.backup_path())).unwrap();
        let fallback = SessionStore::with_replacer(
            &path,
            Box::new(FailingReplace {
                kind: io::ErrorKind::Unsupported,
                calls: Rc::new(Cell::new(0)),
            }),
        );
        fallback.save(&records).unwrap();

        assert_eq!(fallback.load(), records);
        assert_eq!(
            SessionStore::new(&store.backup_path()).load(),
            records[..1].to_vec()
        );
    }

    #[test]
    fn test_failed_replace_leaves_durable_file_intact() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        let original = sample_records();
        SessionStore::new(&path).save(&original).unwrap();

        let calls = Rc::new(Cell::new(0));
        let store = SessionStore::with_replacer(
            &path,
            Box::new(FailingReplace {
                kind: io::ErrorKind::PermissionDenied,
                calls: Rc::clone(&calls),
            }),
        );

        let err = store.save(&[]).unwrap_err();
        assert!(matches!(err, TallyError::Io { .. }));
        assert_eq!(calls.get(), 1);
        assert_eq!(store.load(), original);
        assert!(temp_files(temp.path()).is_empty());
    }

    #[test]
    fn test_unsupported_replace_falls_back_to_copy_then_rename() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        let original = sample_records();
        SessionStore::new(&path).save(&original).unwrap();

        let calls = Rc::new(Cell::new(0));
        let store = SessionStore::with_replacer(
            &path,
            Box::new(FailingReplace {
                kind: io::ErrorKind::Unsupported,
                calls: Rc::clone(&calls),
            }),
        );

        store.save(&original[..1]).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(store.load(), original[..1].to_vec());
        assert_eq!(SessionStore::new(&store.backup_path()).load(), original);
        assert!(temp_files(temp.path()).is_empty());
    }

    #[test]
    fn test_load_matches_fields_case_insensitively() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        std::fs::write(
            &path,
            r#"[
                {"Id": "a", "TaskName": "Study", "Start": "2026-01-31T09:00:00Z",
                 "End": "2026-01-31T09:05:00Z", "EndKind": "Paused"},
                {"ID": "b", "task_name": "Write", "START": "2026-01-31T10:00:00+01:00",
                 "end": null, "end_kind": null}
            ]"#,
        )
        .unwrap();

        let records = SessionStore::new(&path).load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].task_name, "Study");
        assert_eq!(records[0].end_kind, Some(EndKind::Paused));
        assert_eq!(records[1].id, "b");
        assert_eq!(records[1].start, at("2026-01-31T09:00:00Z"));
        assert!(records[1].is_running());
    }

    #[test]
    fn test_load_legacy_record_without_end_kind() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        std::fs::write(
            &path,
            r#"[{"id": "old", "taskName": "Study", "start": "2026-01-01T09:00:00Z",
                 "end": "2026-01-01T10:00:00Z"}]"#,
        )
        .unwrap();

        let records = SessionStore::new(&path).load();
        assert_eq!(records.len(), 1);
        assert!(records[0].end.is_some());
        assert_eq!(records[0].end_kind, None);
    }

    #[test]
    fn test_canonicalize_prefers_existing_canonical_key() {
        let mut map = Map::new();
        map.insert("taskName".to_string(), Value::from("kept"));
        map.insert("TASK_NAME".to_string(), Value::from("ignored"));

        canonicalize_keys(&mut map);
        assert_eq!(map["taskName"], "kept");
    }
}
