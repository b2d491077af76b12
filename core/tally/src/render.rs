//! Console formatting for sessions, summaries and name lists.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Duration, Local, Utc};
use tally_core::{CloseOutcome, SessionRecord, ACCIDENTAL_TAP_THRESHOLD_SECS};

/// `1h 05m`, `4m 09s` or `12s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// One line describing what is running, if anything.
pub fn status_line(current: Option<&SessionRecord>, now: DateTime<Utc>) -> String {
    match current {
        Some(record) => format!(
            "Running: {} ({})",
            record.task_name,
            format_duration(record.elapsed_at(now))
        ),
        None => "No task running".to_string(),
    }
}

pub fn close_message(verb: &str, outcome: &CloseOutcome) -> String {
    let record = outcome.record();
    match outcome {
        CloseOutcome::Discarded(_) => format!(
            "Discarded '{}' (ran under {}s, treated as an accidental start)",
            record.task_name, ACCIDENTAL_TAP_THRESHOLD_SECS
        ),
        CloseOutcome::Recorded(_) => format!(
            "{} '{}' after {}",
            verb,
            record.task_name,
            record
                .duration()
                .map(format_duration)
                .unwrap_or_default()
        ),
    }
}

/// History table in stored order.
pub fn history_table(records: &[SessionRecord], now: DateTime<Utc>) -> String {
    if records.is_empty() {
        return "No sessions recorded yet".to_string();
    }

    let width = records
        .iter()
        .map(|r| r.task_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Task".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<width$}  {:<16}  {:<16}  {:>8}  {}",
        "#",
        "Task",
        "Start",
        "End",
        "Duration",
        "Status",
        width = width
    );
    for (index, record) in records.iter().enumerate() {
        let end = record.end.map(format_local).unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>3}  {:<width$}  {:<16}  {:<16}  {:>8}  {}",
            index + 1,
            record.task_name,
            format_local(record.start),
            end,
            format_duration(record.elapsed_at(now)),
            record.status(),
            width = width
        );
    }
    out.trim_end().to_string()
}

/// Per-task totals, largest first, with a grand total.
pub fn summary_table(summary: &BTreeMap<String, Duration>) -> String {
    if summary.is_empty() {
        return "No completed sessions to summarize".to_string();
    }

    let mut rows: Vec<(&String, &Duration)> = summary.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Total".len());

    let mut out = String::new();
    let mut total = Duration::zero();
    for (name, duration) in rows {
        total = total + *duration;
        let _ = writeln!(
            out,
            "{:<width$}  {:>8}",
            name,
            format_duration(*duration),
            width = width
        );
    }
    let _ = write!(
        out,
        "{:<width$}  {:>8}",
        "Total",
        format_duration(total),
        width = width
    );
    out
}

/// Numbered list for picking a name by index.
pub fn numbered(names: &[String]) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("  {}) {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("\n")
}
