//! Triage Store - run log and report persistence
//!
//! - [`RunLogStore`]: append-only, per-run structured logs
//! - [`ReportStore`]: immutable diagnostic reports
//! - [`MemoryStore`]: process-local backend for both
//! - [`FileStore`]: durable JSON-lines backend for both
//! - [`RunLogger`]: producer-side handle bound to one run
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use triage_core::{LogCategory, RunId};
//! use triage_store::{MemoryStore, RunLogStore, RunLogger};
//!
//! let store = Arc::new(MemoryStore::new());
//! let logger = RunLogger::new(store.clone(), "run-1", "task-1");
//! logger.info(LogCategory::AgentAction, "Starting task execution").unwrap();
//!
//! assert_eq!(store.get_logs(&RunId::new("run-1")).unwrap().len(), 1);
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod file;
pub mod logger;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use file::FileStore;
pub use logger::RunLogger;
pub use memory::MemoryStore;
pub use store::{
    LogQuery, ReportQuery, ReportStore, RunLogStore, DEFAULT_LOG_LIMIT, DEFAULT_REPORT_LIMIT,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
