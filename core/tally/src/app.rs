//! Shared command layer for the one-shot subcommands and the interactive menu.
//!
//! Every method returns the message to show the user; printing is left to
//! the caller.

use std::path::PathBuf;

use tally_core::{
    Clock, Result, SessionEngine, SessionStore, StorageConfig, SummaryPolicy, SwitchAction,
    SwitchOutcome, SystemClock, TallyConfig,
};

use crate::opener;
use crate::render;

pub struct App<C: Clock = SystemClock> {
    engine: SessionEngine<C>,
    storage: StorageConfig,
    config: TallyConfig,
}

impl App<SystemClock> {
    pub fn open(storage: StorageConfig, config: TallyConfig) -> Self {
        let store = SessionStore::new(&storage.sessions_file());
        Self::with_engine(SessionEngine::open(store), storage, config)
    }
}

impl<C: Clock> App<C> {
    pub fn with_engine(engine: SessionEngine<C>, storage: StorageConfig, config: TallyConfig) -> Self {
        Self {
            engine,
            storage,
            config,
        }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &SessionEngine<C> {
        &self.engine
    }

    pub fn config(&self) -> &TallyConfig {
        &self.config
    }

    pub fn start(&mut self, name: &str) -> Result<String> {
        let record = self.engine.start_task(name)?;
        Ok(format!("Started '{}'", record.task_name))
    }

    pub fn stop(&mut self) -> Result<String> {
        let outcome = self.engine.stop_current_task()?;
        Ok(render::close_message("Stopped", &outcome))
    }

    pub fn pause(&mut self) -> Result<String> {
        let outcome = self.engine.pause_current_task()?;
        Ok(render::close_message("Paused", &outcome))
    }

    /// Resumes `name`, or the only resumable task when no name is given.
    pub fn resume(&mut self, name: Option<&str>) -> Result<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let mut names = self.engine.resumable_task_names();
                match names.len() {
                    0 => return Ok("No paused tasks to resume".to_string()),
                    1 => names.remove(0),
                    _ => {
                        return Ok(format!(
                            "Several paused tasks; name one to resume:\n{}",
                            render::numbered(&names)
                        ))
                    }
                }
            }
        };

        let record = self.engine.resume_task(&name)?;
        Ok(format!("Resumed '{}'", record.task_name))
    }

    /// Switches to `name`, closing the current task with `action` or the
    /// configured default.
    pub fn switch(&mut self, name: &str, action: Option<SwitchAction>) -> Result<String> {
        let action = action.unwrap_or(self.config.default_switch_action);
        let outcome = self.engine.switch_to_task(name, action)?;

        Ok(match outcome {
            SwitchOutcome::Continued(record) => {
                format!("Already working on '{}'", record.task_name)
            }
            SwitchOutcome::Started { previous, started } => {
                let verb = match action {
                    SwitchAction::Pause => "Paused",
                    SwitchAction::Stop => "Stopped",
                };
                let mut lines: Vec<String> = previous
                    .iter()
                    .map(|outcome| render::close_message(verb, outcome))
                    .collect();
                lines.push(format!("Started '{}'", started.task_name));
                lines.join("\n")
            }
        })
    }

    pub fn status(&self) -> String {
        render::status_line(self.engine.current_session(), self.engine.clock().now())
    }

    pub fn history(&self) -> String {
        render::history_table(self.engine.sessions(), self.engine.clock().now())
    }

    pub fn summary(&self, include_running: bool) -> String {
        let policy =
            SummaryPolicy::from_flag(include_running || self.config.include_running_in_summary);
        render::summary_table(&self.engine.summary_by_task(policy))
    }

    /// Writes a CSV export and, when enabled, opens it.
    pub fn export(&self, dir: Option<PathBuf>, open: bool) -> Result<String> {
        let dir = dir.unwrap_or_else(|| self.config.export_dir(&self.storage));
        let path = self.engine.export_csv(&dir)?;
        let mut message = format!("Exported to {}", path.display());

        if open && self.config.open_after_export {
            if let Err(err) = opener::open_path(&path) {
                tracing::warn!(error = %err, "Failed to open export");
                message.push_str(&format!("\n{}", err));
            }
        }
        Ok(message)
    }

    pub fn clear(&mut self) -> Result<String> {
        let count = self.engine.sessions().len();
        self.engine.clear_all_sessions()?;
        Ok(format!("Cleared {} session(s)", count))
    }

    pub fn known_names(&self) -> Vec<String> {
        self.engine.known_task_names()
    }

    pub fn resumable_names(&self) -> Vec<String> {
        self.engine.resumable_task_names()
    }

    pub fn is_running(&self) -> bool {
        self.engine.current_session().is_some()
    }
}
