//! CSV export of the session history.
//!
//! One file per export, `tally-export-YYYYMMDD-HHMMSS.csv`, written beside
//! a temp file and persisted without clobbering an earlier export.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, Utc};
use fs_err as fs;
use tempfile::NamedTempFile;

use crate::error::{Result, TallyError};
use crate::session::summary::total_closed;
use crate::session::{SessionRecord, SessionStatus};

pub const EXPORT_PREFIX: &str = "tally-export-";

const HEADER: [&str; 8] = [
    "Date",
    "Task",
    "Start (UTC)",
    "Start (Local)",
    "End (UTC)",
    "End (Local)",
    "Minutes",
    "Status",
];

/// Writes every record to a new CSV file in `dir` and returns its path.
pub fn export_csv(records: &[SessionRecord], dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| TallyError::Io {
        context: format!("creating export dir {}", dir.display()),
        source: e,
    })?;

    let content = render_csv(records)?;
    let path = next_export_path(dir, now);

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| TallyError::Io {
        context: format!("creating temp file in {}", dir.display()),
        source: e,
    })?;
    tmp.write_all(&content)
        .and_then(|()| tmp.flush())
        .map_err(|e| TallyError::Io {
            context: format!("writing {}", path.display()),
            source: e,
        })?;
    tmp.persist_noclobber(&path).map_err(|e| TallyError::Io {
        context: format!("persisting {}", path.display()),
        source: e.error,
    })?;

    tracing::info!(path = %path.display(), rows = records.len(), "Exported sessions to CSV");
    Ok(path)
}

/// Renders the header, one row per record in order, and a trailing total.
pub fn render_csv(records: &[SessionRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| TallyError::Csv {
        context: "rendering sessions".to_string(),
        source: e,
    };

    writer.write_record(HEADER).map_err(csv_err)?;
    for record in records {
        writer.write_record(record_row(record)).map_err(csv_err)?;
    }

    let total = format_minutes(total_closed(records));
    writer
        .write_record(["TOTAL", "", "", "", "", "", total.as_str(), ""])
        .map_err(csv_err)?;

    writer.into_inner().map_err(|e| TallyError::Io {
        context: "flushing CSV buffer".to_string(),
        source: e.into_error(),
    })
}

fn record_row(record: &SessionRecord) -> Vec<String> {
    let local_start = record.start.with_timezone(&Local);
    let (end_utc, end_local) = match record.end {
        Some(end) => (format_utc(end), format_local(end)),
        None => (String::new(), String::new()),
    };
    let minutes = match record.status() {
        SessionStatus::Running => String::new(),
        _ => record.duration().map(format_minutes).unwrap_or_default(),
    };

    vec![
        local_start.format("%Y-%m-%d").to_string(),
        record.task_name.clone(),
        format_utc(record.start),
        format_local(record.start),
        end_utc,
        end_local,
        minutes,
        record.status().label().to_string(),
    ]
}

fn format_utc(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn format_minutes(duration: Duration) -> String {
    format!("{:.2}", duration.num_milliseconds() as f64 / 60_000.0)
}

fn next_export_path(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    let stamp = now.with_timezone(&Local).format("%Y%m%d-%H%M%S");
    let first = dir.join(format!("{}{}.csv", EXPORT_PREFIX, stamp));
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| dir.join(format!("{}{}-{}.csv", EXPORT_PREFIX, stamp, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}
