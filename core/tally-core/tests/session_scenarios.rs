//! End-to-end session scenarios driven through the public API with a manual clock.

use chrono::{DateTime, Duration, Utc};
use tally_core::{
    EndKind, ManualClock, SessionEngine, SessionStore, SummaryPolicy, SwitchAction, TallyError,
};
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-31T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn open<'a>(temp: &TempDir, clock: &'a ManualClock) -> SessionEngine<&'a ManualClock> {
    SessionEngine::with_clock(SessionStore::new(&temp.path().join("sessions.json")), clock)
}

#[test]
fn test_study_write_scenario() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let mut engine = open(&temp, &clock);

    // Study for five seconds, then stop.
    engine.start_task("Study").unwrap();
    clock.advance(Duration::seconds(5));
    engine.stop_current_task().unwrap();

    assert_eq!(engine.sessions().len(), 1);
    let study = &engine.sessions()[0];
    assert_eq!(study.duration(), Some(Duration::seconds(5)));
    assert_eq!(study.end_kind, Some(EndKind::Stopped));

    // Tap Study again and pause after a second: discarded.
    clock.advance(Duration::minutes(1));
    engine.start_task("Study").unwrap();
    clock.advance(Duration::seconds(1));
    let outcome = engine.pause_current_task().unwrap();
    assert!(outcome.was_discarded());
    assert_eq!(engine.sessions().len(), 1);
    assert!(engine.current_session().is_none());

    // Write for ten seconds, then pause.
    clock.advance(Duration::minutes(1));
    engine.start_task("Write").unwrap();
    clock.advance(Duration::seconds(10));
    engine.pause_current_task().unwrap();

    assert_eq!(engine.sessions().len(), 2);
    assert_eq!(engine.sessions()[1].end_kind, Some(EndKind::Paused));
    assert_eq!(engine.resumable_task_names(), vec!["Write"]);
}

#[test]
fn test_history_survives_restart() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());

    {
        let mut engine = open(&temp, &clock);
        engine.start_task("Study").unwrap();
        clock.advance(Duration::minutes(20));
        engine
            .switch_to_task("Write", SwitchAction::Pause)
            .unwrap();
        clock.advance(Duration::minutes(40));
    }

    let mut engine = open(&temp, &clock);
    assert_eq!(engine.sessions().len(), 2);
    assert_eq!(engine.current_session().unwrap().task_name, "Write");
    assert!(matches!(
        engine.start_task("Read"),
        Err(TallyError::AlreadyRunning { .. })
    ));

    engine.stop_current_task().unwrap();
    let summary = engine.summary_by_task(SummaryPolicy::ExcludeRunning);
    assert_eq!(summary.get("Study"), Some(&Duration::minutes(20)));
    assert_eq!(summary.get("Write"), Some(&Duration::minutes(40)));
    assert_eq!(engine.resumable_task_names(), vec!["Study"]);
}

#[test]
fn test_independent_engines_do_not_share_state() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());

    let mut first = open(&first_dir, &clock);
    let mut second = open(&second_dir, &clock);

    first.start_task("Study").unwrap();
    second.start_task("Write").unwrap();

    assert_eq!(first.current_session().unwrap().task_name, "Study");
    assert_eq!(second.current_session().unwrap().task_name, "Write");
}

#[test]
fn test_export_after_session_lists_every_record() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let mut engine = open(&temp, &clock);

    engine.start_task("Study").unwrap();
    clock.advance(Duration::minutes(3));
    engine.stop_current_task().unwrap();
    engine.start_task("Write").unwrap();
    clock.advance(Duration::minutes(1));

    let path = engine.export_csv(&temp.path().join("exports")).unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[1].contains("Study"));
    assert!(lines[1].ends_with("STOPPED"));
    assert!(lines[2].contains("Write"));
    assert!(lines[2].ends_with("RUNNING"));
    assert!(lines[3].starts_with("TOTAL"));
    assert!(lines[3].contains("3.00"));
}
