//! Severity assessment
//!
//! A total, pure mapping from `(category, error count, blocker)` to a
//! [`Severity`]. Rules are evaluated in a fixed order and the first match
//! wins:
//!
//! 1. `error_count >= 10` with an unresolved blocker is `Critical`,
//!    whatever the category.
//! 2. `TaskDescription` is `High`.
//! 3. `CodeQuality` is `Medium`.
//! 4. Everything else is `Low`.

use crate::types::{FailureCategory, Severity};

/// Error count at which a run with an open blocker becomes critical
pub const CRITICAL_ERROR_THRESHOLD: usize = 10;

/// Assess the severity of a failure
#[must_use]
pub fn assess_severity(
    failure_category: FailureCategory,
    error_count: usize,
    has_blocker: bool,
) -> Severity {
    if error_count >= CRITICAL_ERROR_THRESHOLD && has_blocker {
        return Severity::Critical;
    }

    match failure_category {
        FailureCategory::TaskDescription => Severity::High,
        FailureCategory::CodeQuality => Severity::Medium,
        FailureCategory::DependencyIssue
        | FailureCategory::EnvironmentIssue
        | FailureCategory::ModelLimitation
        | FailureCategory::TechnicalError => Severity::Low,
    }
}
