//! Pattern-based failure detection
//!
//! Scans WARNING and ERROR entries of a run log and reports every failure
//! category whose indicators appear in the entry message or its stringified
//! context. Matching is case-insensitive and fully deterministic; no model
//! is involved.

use crate::types::{FailureCategory, LogCategory, RunLogEntry};
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet, RegexSetBuilder};
use std::collections::BTreeSet;

/// Indicators of an ambiguous or incomplete task description
const TASK_DESCRIPTION_PATTERNS: &[&str] = &[
    r"\bambiguous\b",
    r"\bunclear\b",
    r"\bvague\b",
    r"\bunspecified\b",
    r"\bmissing\b.*\brequirements?\b",
    r"\bcannot\b.*\bdetermine\b",
    r"\bcannot\b.*\bunderstand\b",
    r"\black\w*\b.*acceptance[\s_-]+criteria",
    r"\bneeds?\b.*\bclarification\b",
    r"\brequirements?\b.*\bincomplete\b",
];

/// Indicators of model or API limits
const MODEL_LIMITATION_PATTERNS: &[&str] = &[
    r"context[\s_-]*length[\s_-]*exceeded",
    r"maximum[\s_-]+context[\s_-]+length",
    r"tokens?[\s_-]*limit",
    r"\bmaximum\b.*\btokens\b",
    r"\btoo\s+many\s+tokens\b",
    r"\brate[\s_-]?limit",
    r"\bapi\b.*\berror\b.*\b429\b",
    r"\bquota\b.*\bexceeded\b",
    r"\bmodel\b.*\bunavailable\b",
];

/// Indicators of missing packages
const DEPENDENCY_PATTERNS: &[&str] = &[
    r"modulenotfounderror",
    r"\bimporterror\b",
    r"\bno module named\b",
    r"\bpackage\b.*\bnot\s+found\b",
    r"\bdependency\b.*\bmissing\b",
    r"\bmissing\s+dependenc(y|ies)\b",
    r"\bcannot\s+import\b",
];

/// Indicators of a misconfigured execution environment
const ENVIRONMENT_PATTERNS: &[&str] = &[
    r"\bpermission\b.*\bdenied\b",
    r"\bfile\b.*\bnot\s+found\b",
    r"\bdirectory\b.*\bnot\b.*\bexists?\b",
    r"\bno\s+such\s+file\s+or\s+directory\b",
    r"\benvironment[\s_-]+variable\b.*\bnot\s+set\b",
    r"\bcommand\b.*\bnot\s+found\b",
];

/// Indicators of failed tests, lint or type checks
const CODE_QUALITY_PATTERNS: &[&str] = &[
    r"\btests?\b.*\bfail",
    r"\bpytest\b.*\bfail",
    r"\blint\b.*\b(error|fail)",
    r"\bruff\b.*\b(check|error|fail)",
    r"\bmypy\b.*\berror",
    r"\bassertion\b.*\bfailed\b",
    r"\bassertionerror\b",
    r"\btype[\s-]?check\b.*\bfail",
];

/// Indicators that the agent is waiting on a human
const BLOCKER_PATTERNS: &[&str] = &[
    r"\bblocker\b.*\bcreated\b",
    r"\bhuman\b.*\binput\b.*\bneeded\b",
    r"\bwaiting\b.*\bfor\b.*\banswer\b",
    r"\bescalated\b.*\bto\b.*\bhuman\b",
];

/// Context keys that carry failing check counts on verification entries
const FAILURE_COUNT_KEYS: &[&str] = &[
    "failed",
    "failures",
    "errors",
    "test_failures",
    "lint_errors",
    "type_errors",
];

fn build_set(patterns: &[&str]) -> RegexSet {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .expect("static failure patterns compile")
}

/// Compiled pattern sets, one per detectable category
static CATEGORY_PATTERNS: Lazy<[(FailureCategory, RegexSet); 5]> = Lazy::new(|| {
    [
        (FailureCategory::TaskDescription, build_set(TASK_DESCRIPTION_PATTERNS)),
        (FailureCategory::ModelLimitation, build_set(MODEL_LIMITATION_PATTERNS)),
        (FailureCategory::DependencyIssue, build_set(DEPENDENCY_PATTERNS)),
        (FailureCategory::EnvironmentIssue, build_set(ENVIRONMENT_PATTERNS)),
        (FailureCategory::CodeQuality, build_set(CODE_QUALITY_PATTERNS)),
    ]
});

static BLOCKER_SET: Lazy<RegexSet> = Lazy::new(|| build_set(BLOCKER_PATTERNS));

/// "3 tests failed", "2 lint errors", "1 failure"
static FAILED_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[1-9]\d*\s+(?:\w+\s+)?(?:tests?|checks?|errors?|failures?|violations?)\b")
        .expect("failed-count pattern compiles")
});

static MISSING_MODULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)no module named\s+['"]?([A-Za-z_][\w.]*)"#).expect("module pattern compiles")
});

static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)cannot import name\s+['"]?\w+['"]?\s+from\s+['"]?([A-Za-z_][\w.]*)"#)
        .expect("import pattern compiles")
});

/// Detect failure patterns from log entries
///
/// Only WARNING and ERROR entries are inspected. Returns every matching
/// category; an empty set means nothing matched and the caller decides the
/// default.
#[must_use]
pub fn detect_failure_patterns(logs: &[RunLogEntry]) -> BTreeSet<FailureCategory> {
    let mut detected = BTreeSet::new();

    for entry in logs.iter().filter(|e| e.level.is_failure_signal()) {
        let text = entry.searchable_text();

        for (category, set) in CATEGORY_PATTERNS.iter() {
            if !detected.contains(category) && set.is_match(&text) {
                detected.insert(*category);
            }
        }

        if reports_failed_checks(entry) {
            detected.insert(FailureCategory::CodeQuality);
        }
    }

    detected
}

/// Pick the authoritative category from a detected set
///
/// Precedence is `TaskDescription > DependencyIssue > EnvironmentIssue >
/// CodeQuality > ModelLimitation > TechnicalError`; an empty set yields `TechnicalError`.
#[must_use]
pub fn primary_failure_category(detected: &BTreeSet<FailureCategory>) -> FailureCategory {
    FailureCategory::ALL
        .into_iter()
        .find(|category| detected.contains(category))
        .unwrap_or(FailureCategory::TechnicalError)
}

/// Detect and resolve in one step
#[must_use]
pub fn detect_primary_failure_category(logs: &[RunLogEntry]) -> FailureCategory {
    primary_failure_category(&detect_failure_patterns(logs))
}

/// Whether any entry indicates a blocker that was not resolved
///
/// BLOCKER entries count unless their context carries `"resolved": true`;
/// blocker phrasing in other entries always counts.
#[must_use]
pub fn has_unresolved_blocker(logs: &[RunLogEntry]) -> bool {
    logs.iter().any(|entry| {
        if entry.category == LogCategory::Blocker {
            return !matches!(entry.context.get("resolved"), Some(serde_json::Value::Bool(true)));
        }
        BLOCKER_SET.is_match(&entry.message)
    })
}

/// Extract the missing package name from error messages
///
/// Understands `No module named 'pkg.sub'` and
/// `cannot import name 'x' from 'pkg'`; dotted names reduce to the
/// top-level package.
#[must_use]
pub fn extract_package_name<S: AsRef<str>>(error_messages: &[S]) -> Option<String> {
    error_messages.iter().find_map(|msg| {
        let msg = msg.as_ref();
        MISSING_MODULE
            .captures(msg)
            .or_else(|| IMPORT_FROM.captures(msg))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().split('.').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    })
}

/// VERIFICATION entries that report a positive count of failing checks
fn reports_failed_checks(entry: &RunLogEntry) -> bool {
    if entry.category != LogCategory::Verification {
        return false;
    }

    let counted = FAILURE_COUNT_KEYS.iter().any(|key| {
        entry
            .context
            .get(*key)
            .and_then(serde_json::Value::as_u64)
            .is_some_and(|n| n > 0)
    });

    counted || FAILED_COUNT.is_match(&entry.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogContext, LogLevel, LogRecord};
    use chrono::Utc;
    use serde_json::json;

    fn entry(level: LogLevel, category: LogCategory, message: &str) -> RunLogEntry {
        LogRecord::new("run-1", "task-1", level, category, message).into_entry(0, Utc::now())
    }

    fn error(message: &str) -> RunLogEntry {
        entry(LogLevel::Error, LogCategory::Error, message)
    }

    #[test]
    fn all_static_patterns_compile() {
        Lazy::force(&CATEGORY_PATTERNS);
        Lazy::force(&BLOCKER_SET);
        Lazy::force(&FAILED_COUNT);
    }

    #[test]
    fn detects_ambiguous_task() {
        let logs = [error("Cannot determine implementation approach - task description is unclear")];
        assert!(detect_failure_patterns(&logs).contains(&FailureCategory::TaskDescription));
    }

    #[test]
    fn detects_model_limitation() {
        let mut context = LogContext::new();
        context.insert("tokens".into(), json!(200_000));
        let mut e = error("Error: Maximum context length exceeded");
        e.context = context;

        assert!(detect_failure_patterns(&[e]).contains(&FailureCategory::ModelLimitation));
    }

    #[test]
    fn model_limits_match_across_separators() {
        let mut coded = error("Request rejected");
        coded.context.insert("code".into(), json!("context_length_exceeded"));
        assert!(detect_failure_patterns(&[coded]).contains(&FailureCategory::ModelLimitation));

        for message in [
            "Error: token-limit exceeded",
            "max_tokens limit reached",
            "Request exceeded token_limit",
            "maximum-context-length reached",
        ] {
            assert!(
                detect_failure_patterns(&[error(message)]).contains(&FailureCategory::ModelLimitation),
                "not detected: {message}"
            );
        }
    }

    #[test]
    fn missing_acceptance_criteria_is_task_description() {
        for message in [
            "Task description lacking acceptance criteria",
            "Description lacks acceptance_criteria",
        ] {
            assert!(
                detect_failure_patterns(&[error(message)]).contains(&FailureCategory::TaskDescription),
                "not detected: {message}"
            );
        }
    }

    #[test]
    fn detects_environment_issue() {
        for message in [
            "PermissionError: [Errno 13] Permission denied: '/opt/app'",
            "bash: ruff: command not found",
            "Environment variable DATABASE_URL not set",
            "Output directory does not exist",
        ] {
            assert!(
                detect_failure_patterns(&[error(message)]).contains(&FailureCategory::EnvironmentIssue),
                "not detected: {message}"
            );
        }
    }

    #[test]
    fn dependency_outranks_environment() {
        let logs = [
            error("bash: uv: command not found"),
            error("ModuleNotFoundError: No module named 'requests'"),
        ];
        let detected = detect_failure_patterns(&logs);

        assert!(detected.contains(&FailureCategory::EnvironmentIssue));
        assert_eq!(primary_failure_category(&detected), FailureCategory::DependencyIssue);

        let detected: BTreeSet<_> =
            [FailureCategory::EnvironmentIssue, FailureCategory::CodeQuality].into_iter().collect();
        assert_eq!(primary_failure_category(&detected), FailureCategory::EnvironmentIssue);
    }

    #[test]
    fn detects_dependency_issue() {
        let logs = [error("ModuleNotFoundError: No module named 'some_package'")];
        assert!(detect_failure_patterns(&logs).contains(&FailureCategory::DependencyIssue));
    }

    #[test]
    fn detects_code_quality_from_verification_counts() {
        let mut e = entry(LogLevel::Error, LogCategory::Verification, "quality gate finished");
        e.context.insert("failed".into(), json!(3));
        e.context.insert("passed".into(), json!(10));

        assert!(detect_failure_patterns(&[e]).contains(&FailureCategory::CodeQuality));
    }

    #[test]
    fn zero_failure_count_is_not_code_quality() {
        let mut e = entry(LogLevel::Warning, LogCategory::Verification, "quality gate finished");
        e.context.insert("failed".into(), json!(0));

        assert!(detect_failure_patterns(&[e]).is_empty());
    }

    #[test]
    fn matches_inside_context_values() {
        let mut e = error("Failed to generate plan");
        e.context.insert("error".into(), json!("Task description is ambiguous"));

        assert!(detect_failure_patterns(&[e]).contains(&FailureCategory::TaskDescription));
    }

    #[test]
    fn info_entries_are_ignored() {
        let logs = [entry(
            LogLevel::Info,
            LogCategory::AgentAction,
            "Clarifying an ambiguous ModuleNotFoundError",
        )];
        assert!(detect_failure_patterns(&logs).is_empty());
    }

    #[test]
    fn returns_every_matching_category() {
        let logs = [
            error("ModuleNotFoundError: No module named 'requests'"),
            entry(LogLevel::Warning, LogCategory::Verification, "pytest failed: 3 tests failed"),
        ];
        let detected = detect_failure_patterns(&logs);

        assert!(detected.contains(&FailureCategory::DependencyIssue));
        assert!(detected.contains(&FailureCategory::CodeQuality));
        assert_eq!(primary_failure_category(&detected), FailureCategory::DependencyIssue);
    }

    #[test]
    fn unmatched_logs_yield_empty_set_and_technical_default() {
        let logs = [error("Transient network error"), error("Latest fetch failed")];
        let detected = detect_failure_patterns(&logs);

        assert!(detected.is_empty());
        assert_eq!(primary_failure_category(&detected), FailureCategory::TechnicalError);
    }

    #[test]
    fn precedence_prefers_task_description() {
        let detected: BTreeSet<_> = FailureCategory::ALL.into_iter().collect();
        assert_eq!(primary_failure_category(&detected), FailureCategory::TaskDescription);

        let detected: BTreeSet<_> =
            [FailureCategory::ModelLimitation, FailureCategory::CodeQuality].into_iter().collect();
        assert_eq!(primary_failure_category(&detected), FailureCategory::CodeQuality);
    }

    #[test]
    fn detection_is_idempotent() {
        let logs = [
            error("Task failed: Cannot understand requirements"),
            entry(LogLevel::Warning, LogCategory::Verification, "Initial lint check failed"),
        ];
        assert_eq!(detect_failure_patterns(&logs), detect_failure_patterns(&logs));
    }

    #[test]
    fn blocker_detection_honours_resolution() {
        let mut open = entry(LogLevel::Info, LogCategory::Blocker, "Which database should be used?");
        assert!(has_unresolved_blocker(&[open.clone()]));

        open.context.insert("resolved".into(), json!(true));
        assert!(!has_unresolved_blocker(&[open]));

        let phrased = entry(LogLevel::Warning, LogCategory::AgentAction, "Escalated to human reviewer");
        assert!(has_unresolved_blocker(&[phrased]));
    }

    #[test]
    fn extracts_package_names() {
        assert_eq!(
            extract_package_name(&["ModuleNotFoundError: No module named 'requests'"]),
            Some("requests".to_string())
        );
        assert_eq!(
            extract_package_name(&["No module named yaml.constructor"]),
            Some("yaml".to_string())
        );
        assert_eq!(
            extract_package_name(&["ImportError: cannot import name 'Foo' from 'bar'"]),
            Some("bar".to_string())
        );
        assert_eq!(extract_package_name(&["something else"]), None);
    }
}
