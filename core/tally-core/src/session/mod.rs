//! Task session tracking.
//!
//! At most one session runs at a time. Starting, stopping and pausing go
//! through [`SessionEngine`], which writes the full history to disk after
//! every change.
//!
//! # Module Structure
//!
//! - [`engine`]: the state machine (start/stop/pause/resume/switch/clear)
//! - [`store`]: atomic JSON persistence with a `.bak` copy of the last good file
//! - [`summary`]: per-task totals and the known/resumable name lists
//! - [`types`]: records and outcome enums

pub mod engine;
pub mod store;
pub mod summary;
pub mod types;

pub use engine::SessionEngine;
pub use store::{AtomicReplace, ReplaceFile, SessionStore};
pub use types::{
    CloseOutcome, EndKind, SessionRecord, SessionStatus, SummaryPolicy, SwitchAction,
    SwitchOutcome, ACCIDENTAL_TAP_THRESHOLD_SECS,
};
