//! The session state machine.
//!
//! Owns the in-memory history and the position of the running session. Every
//! mutation builds the next history, saves it through [`SessionStore`], and
//! only then replaces the in-memory copy, so a failed save changes nothing.
//!
//! ```text
//!              start / resume
//!   (idle) ─────────────────────→ (running)
//!     ↑                               │
//!     │   stop / pause, elapsed ≥ 3s  │  record closed (Stopped | Paused)
//!     ├───────────────────────────────┤
//!     │   stop / pause, elapsed < 3s  │  record removed (accidental tap)
//!     └───────────────────────────────┘
//! ```
//!
//! Switching composes the two: close the current session with the caller's
//! action, then start the new one. Switching to the task already running
//! (compared case-insensitively) changes nothing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TallyError};
use crate::export;

use super::store::SessionStore;
use super::summary;
use super::types::{
    CloseOutcome, EndKind, SessionRecord, SummaryPolicy, SwitchAction, SwitchOutcome,
    ACCIDENTAL_TAP_THRESHOLD_SECS,
};

pub struct SessionEngine<C: Clock = SystemClock> {
    store: SessionStore,
    clock: C,
    sessions: Vec<SessionRecord>,
    /// Index of the first record without an end instant.
    current: Option<usize>,
}

impl SessionEngine<SystemClock> {
    /// Opens the engine against the wall clock.
    pub fn open(store: SessionStore) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<C: Clock> SessionEngine<C> {
    /// Loads the history from `store`. The first record without an end
    /// instant becomes the current session.
    pub fn with_clock(store: SessionStore, clock: C) -> Self {
        let sessions = store.load();

        let current = first_running(&sessions);
        let extra = sessions.iter().filter(|s| s.is_running()).count().saturating_sub(1);
        if extra > 0 {
            warn!(
                extra,
                "Multiple running sessions in history; adopting the first"
            );
        }

        debug!(
            count = sessions.len(),
            running = current.is_some(),
            "Session engine loaded"
        );

        SessionEngine {
            store,
            clock,
            sessions,
            current,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn start_task(&mut self, name: &str) -> Result<&SessionRecord> {
        if let Some(current) = self.current_session() {
            return Err(TallyError::AlreadyRunning {
                task_name: current.task_name.clone(),
            });
        }

        let name = validate_name(name)?;
        let mut next = self.sessions.clone();
        next.push(SessionRecord::begin(name, self.clock.now()));
        self.commit(next)?;

        let record = &self.sessions[self.sessions.len() - 1];
        info!(task = %record.task_name, id = %record.id, "Task started");
        Ok(record)
    }

    pub fn stop_current_task(&mut self) -> Result<CloseOutcome> {
        self.close_current(EndKind::Stopped)
    }

    pub fn pause_current_task(&mut self) -> Result<CloseOutcome> {
        self.close_current(EndKind::Paused)
    }

    /// Starts a fresh session under `name`. Paused records stay closed.
    pub fn resume_task(&mut self, name: &str) -> Result<&SessionRecord> {
        self.start_task(name)
    }

    pub fn switch_to_task(&mut self, name: &str, action: SwitchAction) -> Result<SwitchOutcome> {
        let name = validate_name(name)?;

        if let Some(current) = self.current_session() {
            if current.task_name.to_lowercase() == name.to_lowercase() {
                debug!(task = %current.task_name, "Switch target already running");
                return Ok(SwitchOutcome::Continued(current.clone()));
            }
        }

        let previous = if self.current.is_some() {
            Some(match action {
                SwitchAction::Pause => self.pause_current_task()?,
                SwitchAction::Stop => self.stop_current_task()?,
            })
        } else {
            None
        };

        let started = self.start_task(name)?.clone();
        Ok(SwitchOutcome::Started { previous, started })
    }

    pub fn clear_all_sessions(&mut self) -> Result<()> {
        let removed = self.sessions.len();
        self.commit(Vec::new())?;
        info!(removed, "Cleared all sessions");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Every record in stored order.
    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<&SessionRecord> {
        self.current.and_then(|index| self.sessions.get(index))
    }

    /// Time on `record` so far, measured with the engine's clock.
    pub fn elapsed(&self, record: &SessionRecord) -> Duration {
        record.elapsed_at(self.clock.now())
    }

    pub fn summary_by_task(&self, policy: SummaryPolicy) -> BTreeMap<String, Duration> {
        summary::summarize(&self.sessions, self.clock.now(), policy)
    }

    pub fn known_task_names(&self) -> Vec<String> {
        summary::known_task_names(&self.sessions)
    }

    pub fn resumable_task_names(&self) -> Vec<String> {
        summary::resumable_task_names(&self.sessions)
    }

    pub fn export_csv(&self, dir: &Path) -> Result<PathBuf> {
        export::export_csv(&self.sessions, dir, self.clock.now())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────────

    fn close_current(&mut self, kind: EndKind) -> Result<CloseOutcome> {
        let index = self.current.ok_or(TallyError::NothingRunning)?;

        let now = self.clock.now();
        let elapsed = now - self.sessions[index].start;
        let mut next = self.sessions.clone();

        if elapsed < Duration::seconds(ACCIDENTAL_TAP_THRESHOLD_SECS) {
            let record = next.remove(index);
            self.commit(next)?;
            info!(
                task = %record.task_name,
                elapsed_ms = elapsed.num_milliseconds(),
                "Discarded accidental start"
            );
            self.warn_if_still_running();
            return Ok(CloseOutcome::Discarded(record));
        }

        let record = &mut next[index];
        record.end = Some(now);
        record.end_kind = Some(kind);
        let closed = record.clone();
        self.commit(next)?;

        info!(
            task = %closed.task_name,
            kind = ?kind,
            secs = elapsed.num_seconds(),
            "Task closed"
        );
        self.warn_if_still_running();
        Ok(CloseOutcome::Recorded(closed))
    }

    /// Inconsistent histories can hold several running records; closing one
    /// makes the next the current session.
    fn warn_if_still_running(&self) {
        if let Some(current) = self.current_session() {
            warn!(
                task = %current.task_name,
                id = %current.id,
                "Another running session in history is now current"
            );
        }
    }

    /// Saves `next` and adopts it only once the save succeeded.
    fn commit(&mut self, next: Vec<SessionRecord>) -> Result<()> {
        self.store.save(&next)?;
        self.current = first_running(&next);
        self.sessions = next;
        Ok(())
    }
}

fn first_running(sessions: &[SessionRecord]) -> Option<usize> {
    sessions.iter().position(|s| s.is_running())
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TallyError::EmptyTaskName);
    }
    Ok(trimmed)
}
