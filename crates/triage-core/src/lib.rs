//! Triage Core - deterministic failure diagnosis
//!
//! The rule-based half of the diagnosis pipeline:
//! - Detects failure categories from structured run logs
//! - Assesses severity with a fixed rule order
//! - Generates remediation recommendations with rendered commands
//! - Summarizes run logs within a hard length bound
//!
//! Everything here is synchronous and pure; identical input always yields
//! identical output.
//!
//! # Example
//!
//! ```rust
//! use triage_core::prelude::*;
//! use chrono::Utc;
//!
//! let logs = vec![
//!     LogRecord::new("run-1", "task-1", LogLevel::Error, LogCategory::Error,
//!         "ModuleNotFoundError: No module named 'requests'")
//!         .into_entry(0, Utc::now()),
//! ];
//!
//! let category = detect_primary_failure_category(&logs);
//! assert_eq!(category, FailureCategory::DependencyIssue);
//! assert_eq!(assess_severity(category, 1, false), Severity::Low);
//! ```

#![warn(unreachable_pub)]

pub mod detector;
pub mod error;
pub mod recommend;
pub mod severity;
pub mod summary;
pub mod types;

pub use detector::{
    detect_failure_patterns, detect_primary_failure_category, extract_package_name,
    has_unresolved_blocker, primary_failure_category,
};
pub use error::TriageError;
pub use recommend::{generate_recommendations, RecommendationEngine, DEFAULT_COMMAND_PREFIX};
pub use severity::{assess_severity, CRITICAL_ERROR_THRESHOLD};
pub use summary::{
    summarize_logs, truncate_bytes, truncate_chars, LogSummarizer, DEFAULT_MAX_ENTRY_CHARS,
    DEFAULT_SUMMARY_MAX_LENGTH, EMPTY_LOG_SUMMARY,
};
pub use types::{
    DiagnosticRecommendation, DiagnosticReport, FailureCategory, LogCategory, LogContext,
    LogLevel, LogRecord, RemediationAction, ReportId, RunId, RunLogEntry, Severity, TaskId,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with triage core
    pub use crate::{
        assess_severity, detect_failure_patterns, detect_primary_failure_category,
        generate_recommendations, summarize_logs, DiagnosticRecommendation, DiagnosticReport,
        FailureCategory, LogCategory, LogLevel, LogRecord, RemediationAction, RunId,
        RunLogEntry, Severity, TaskId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
