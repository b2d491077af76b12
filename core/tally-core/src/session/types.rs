//! Session records and the small enums that describe how they end.
//!
//! On-disk format is a bare JSON array of [`SessionRecord`]. Records written
//! before `endKind` existed load with `end_kind: None`; that state is kept
//! distinct from Stopped and Paused.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Start followed by stop/pause in less than this is treated as an
/// accidental tap and discarded.
pub const ACCIDENTAL_TAP_THRESHOLD_SECS: i64 = 3;

/// How a closed session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndKind {
    #[serde(alias = "stopped", alias = "STOPPED")]
    Stopped,
    #[serde(alias = "paused", alias = "PAUSED")]
    Paused,
}

/// Display status of a record, derived from `end` and `end_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Running,
    Paused,
    Stopped,
}

impl SessionStatus {
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Running => "RUNNING",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One contiguous block of work on one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub task_name: String,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_kind: Option<EndKind>,
}

impl SessionRecord {
    /// Creates a running record with a fresh id. `task_name` must already be trimmed.
    pub(crate) fn begin(task_name: &str, start: DateTime<Utc>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            task_name: task_name.to_string(),
            start,
            end: None,
            end_kind: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }

    /// `end - start`, or `None` while running.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }

    /// Duration so far: the final duration when closed, `now - start` while running.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        self.duration().unwrap_or_else(|| now - self.start)
    }

    /// Legacy closed records without an end kind display as Stopped.
    pub fn status(&self) -> SessionStatus {
        match (self.end, self.end_kind) {
            (None, _) => SessionStatus::Running,
            (Some(_), Some(EndKind::Paused)) => SessionStatus::Paused,
            (Some(_), _) => SessionStatus::Stopped,
        }
    }
}

/// What to do with the current session when switching to another task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchAction {
    #[default]
    Pause,
    Stop,
}

impl FromStr for SwitchAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pause" | "p" => Ok(SwitchAction::Pause),
            "stop" | "s" => Ok(SwitchAction::Stop),
            other => Err(format!("Unknown switch action: {}", other)),
        }
    }
}

impl fmt::Display for SwitchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchAction::Pause => f.write_str("pause"),
            SwitchAction::Stop => f.write_str("stop"),
        }
    }
}

/// Result of stopping or pausing the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The session was kept with its end instant and kind set.
    Recorded(SessionRecord),
    /// The session ended inside the accidental-tap window and was removed.
    Discarded(SessionRecord),
}

impl CloseOutcome {
    pub fn record(&self) -> &SessionRecord {
        match self {
            CloseOutcome::Recorded(record) | CloseOutcome::Discarded(record) => record,
        }
    }

    pub fn was_discarded(&self) -> bool {
        matches!(self, CloseOutcome::Discarded(_))
    }
}

/// Result of switching tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The requested task was already running.
    Continued(SessionRecord),
    /// A new session was started, after closing the previous one if any.
    Started {
        previous: Option<CloseOutcome>,
        started: SessionRecord,
    },
}

/// Whether summaries count the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryPolicy {
    #[default]
    ExcludeRunning,
    /// Attribute the running session at its current elapsed time.
    IncludeRunning,
}

impl SummaryPolicy {
    pub fn from_flag(include_running: bool) -> Self {
        if include_running {
            SummaryPolicy::IncludeRunning
        } else {
            SummaryPolicy::ExcludeRunning
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn make_record(end: Option<&str>, end_kind: Option<EndKind>) -> SessionRecord {
        SessionRecord {
            id: "01J0000000000000000000TEST".to_string(),
            task_name: "Study".to_string(),
            start: at("2026-01-31T09:00:00Z"),
            end: end.map(at),
            end_kind,
        }
    }

    #[test]
    fn test_running_record_has_no_duration() {
        let record = make_record(None, None);
        assert!(record.is_running());
        assert_eq!(record.duration(), None);
        assert_eq!(record.status(), SessionStatus::Running);
        assert_eq!(
            record.elapsed_at(at("2026-01-31T09:01:30Z")),
            Duration::seconds(90)
        );
    }

    #[test]
    fn test_closed_record_duration() {
        let record = make_record(Some("2026-01-31T09:10:00Z"), Some(EndKind::Paused));
        assert_eq!(record.duration(), Some(Duration::minutes(10)));
        assert_eq!(record.status(), SessionStatus::Paused);
        // Elapsed ignores `now` once closed.
        assert_eq!(
            record.elapsed_at(at("2026-02-01T00:00:00Z")),
            Duration::minutes(10)
        );
    }

    #[test]
    fn test_legacy_closed_record_is_stopped_status() {
        let record = make_record(Some("2026-01-31T09:10:00Z"), None);
        assert_eq!(record.status(), SessionStatus::Stopped);
        assert_eq!(record.end_kind, None);
    }

    #[test]
    fn test_begin_assigns_unique_ids() {
        let now = at("2026-01-31T09:00:00Z");
        let a = SessionRecord::begin("Study", now);
        let b = SessionRecord::begin("Study", now);
        assert_ne!(a.id, b.id);
        assert!(a.is_running());
        assert_eq!(a.end_kind, None);
    }

    #[test]
    fn test_serializes_camel_case_fields() {
        let record = make_record(Some("2026-01-31T09:10:00Z"), Some(EndKind::Stopped));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["taskName"], "Study");
        assert_eq!(json["endKind"], "Stopped");
        assert!(json["start"].as_str().unwrap().starts_with("2026-01-31T09:00:00"));
    }

    #[test]
    fn test_switch_action_parse() {
        assert_eq!("pause".parse::<SwitchAction>(), Ok(SwitchAction::Pause));
        assert_eq!(" STOP ".parse::<SwitchAction>(), Ok(SwitchAction::Stop));
        assert_eq!("s".parse::<SwitchAction>(), Ok(SwitchAction::Stop));
        assert!("later".parse::<SwitchAction>().is_err());
    }

    #[test]
    fn test_summary_policy_from_flag() {
        assert_eq!(SummaryPolicy::from_flag(false), SummaryPolicy::ExcludeRunning);
        assert_eq!(SummaryPolicy::from_flag(true), SummaryPolicy::IncludeRunning);
        assert_eq!(SummaryPolicy::default(), SummaryPolicy::ExcludeRunning);
    }
}
