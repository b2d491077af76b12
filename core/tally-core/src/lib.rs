//! # tally-core
//!
//! Core library for Tally, a single-user task time tracker.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Every operation finishes, including its disk write, before returning.
//! - **One running task**: The engine refuses to start a second session while one is open.
//! - **Graceful degradation**: Missing or corrupt history loads as empty, not as an error.
//! - **Injected time**: The engine reads time from a [`Clock`], so tests never sleep.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tally_core::{SessionEngine, SessionStore, StorageConfig};
//!
//! let storage = StorageConfig::from_env()?;
//! let mut engine = SessionEngine::open(SessionStore::new(&storage.sessions_file()));
//! engine.start_task("Write report")?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, load_or_init_config, save_config, TallyConfig};
pub use error::{Result, TallyError};
pub use session::*;
pub use storage::StorageConfig;
