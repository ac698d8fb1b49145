//! Core types for run diagnosis
//!
//! Defines the fundamental types shared by every stage of the pipeline:
//! - Run, task and report identifiers
//! - Structured run log entries
//! - Failure categories, severities and remediation actions
//! - Recommendations and the persisted diagnostic report

use crate::error::TriageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Structured context attached to a log entry
pub type LogContext = BTreeMap<String, serde_json::Value>;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an externally assigned identifier
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of one execution attempt of a task
    RunId
);

string_id!(
    /// Identifier of a task (assigned by the task tracker)
    TaskId
);

/// Unique diagnostic report identifier, generated at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    /// Generate new report ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReportId {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| TriageError::InvalidIdentifier(s.to_string()))
    }
}

/// Implements `as_str`, `Display` and case-insensitive `FromStr` on top of
/// an exhaustive `ALL` table.
macro_rules! closed_enum_strings {
    ($name:ident, $kind:literal) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TriageError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| TriageError::unknown($kind, s))
            }
        }
    };
}

/// Log level for run log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Verbose tracing, ignored by diagnosis
    Debug,
    /// Normal progress
    Info,
    /// Something went wrong but execution continued
    Warning,
    /// Execution failed at this point
    Error,
}

impl LogLevel {
    /// Every level, lowest first
    pub const ALL: [Self; 4] = [Self::Debug, Self::Info, Self::Warning, Self::Error];

    /// Canonical persisted form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Whether the pattern detector looks at entries of this level
    #[inline]
    #[must_use]
    pub const fn is_failure_signal(&self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }
}

closed_enum_strings!(LogLevel, "log level");

/// Category of log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Agent decided or performed a step
    AgentAction,
    /// Request to a language model
    LlmCall,
    /// Error report
    Error,
    /// Run or task state transition
    StateChange,
    /// Quality gate output (tests, lint, type-check)
    Verification,
    /// Question raised to a human
    Blocker,
    /// File created, edited or deleted
    FileOperation,
    /// Shell command executed
    ShellCommand,
}

impl LogCategory {
    /// Every category
    pub const ALL: [Self; 8] = [
        Self::AgentAction,
        Self::LlmCall,
        Self::Error,
        Self::StateChange,
        Self::Verification,
        Self::Blocker,
        Self::FileOperation,
        Self::ShellCommand,
    ];

    /// Canonical persisted form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AgentAction => "agent_action",
            Self::LlmCall => "llm_call",
            Self::Error => "error",
            Self::StateChange => "state_change",
            Self::Verification => "verification",
            Self::Blocker => "blocker",
            Self::FileOperation => "file_operation",
            Self::ShellCommand => "shell_command",
        }
    }
}

closed_enum_strings!(LogCategory, "log category");

/// Categories of failure for diagnostic analysis
///
/// Declaration order is the precedence used to pick the authoritative
/// category when several match: earlier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Task description is ambiguous or lacks acceptance criteria
    TaskDescription,
    /// Missing package or import failure
    DependencyIssue,
    /// Permissions, paths, missing commands or environment variables
    EnvironmentIssue,
    /// Tests, lint or type checks failed
    CodeQuality,
    /// Context window, token or rate limits
    ModelLimitation,
    /// Anything else; assumed transient
    TechnicalError,
}

impl FailureCategory {
    /// Every category in precedence order
    pub const ALL: [Self; 6] = [
        Self::TaskDescription,
        Self::DependencyIssue,
        Self::EnvironmentIssue,
        Self::CodeQuality,
        Self::ModelLimitation,
        Self::TechnicalError,
    ];

    /// Canonical persisted form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TaskDescription => "task_description",
            Self::DependencyIssue => "dependency_issue",
            Self::EnvironmentIssue => "environment_issue",
            Self::CodeQuality => "code_quality",
            Self::ModelLimitation => "model_limitation",
            Self::TechnicalError => "technical_error",
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TaskDescription => "task description",
            Self::DependencyIssue => "dependency issue",
            Self::EnvironmentIssue => "environment issue",
            Self::CodeQuality => "code quality",
            Self::ModelLimitation => "model limitation",
            Self::TechnicalError => "technical error",
        }
    }
}

closed_enum_strings!(FailureCategory, "failure category");

/// Severity level for diagnostic reports, `Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Likely transient
    Low,
    /// Needs a retry with attention
    Medium,
    /// Needs human action before retrying
    High,
    /// Repeated failure with an open blocker
    Critical,
}

impl Severity {
    /// Every severity, lowest first
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Canonical persisted form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

closed_enum_strings!(Severity, "severity");

/// Types of remediation actions that can be recommended
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    /// Rewrite the task with clearer acceptance criteria
    UpdateTaskDescription,
    /// Answer the open blocker
    AnswerBlocker,
    /// Switch to a model with a larger context
    ChangeModel,
    /// Install the missing package
    ResolveDependency,
    /// Fix paths, permissions or environment variables
    FixEnvironment,
    /// Re-run the task
    RetryWithContext,
    /// Break the task into smaller pieces
    SplitTask,
    /// Provide fixtures the checks need
    AddTestData,
}

impl RemediationAction {
    /// Every action
    pub const ALL: [Self; 8] = [
        Self::UpdateTaskDescription,
        Self::AnswerBlocker,
        Self::ChangeModel,
        Self::ResolveDependency,
        Self::FixEnvironment,
        Self::RetryWithContext,
        Self::SplitTask,
        Self::AddTestData,
    ];

    /// Canonical persisted form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UpdateTaskDescription => "update_task_description",
            Self::AnswerBlocker => "answer_blocker",
            Self::ChangeModel => "change_model",
            Self::ResolveDependency => "resolve_dependency",
            Self::FixEnvironment => "fix_environment",
            Self::RetryWithContext => "retry_with_context",
            Self::SplitTask => "split_task",
            Self::AddTestData => "add_test_data",
        }
    }
}

closed_enum_strings!(RemediationAction, "remediation action");

/// Input to a run log append; the store assigns sequence and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Run this entry belongs to
    pub run_id: RunId,
    /// Task being executed
    pub task_id: TaskId,
    /// Severity level
    pub level: LogLevel,
    /// Type of log entry
    pub category: LogCategory,
    /// Human-readable message
    pub message: String,
    /// Additional structured data
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: LogContext,
}

impl LogRecord {
    /// Create new record without context
    #[must_use]
    pub fn new(
        run_id: impl Into<RunId>,
        task_id: impl Into<TaskId>,
        level: LogLevel,
        category: LogCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            task_id: task_id.into(),
            level,
            category,
            message: message.into(),
            context: LogContext::new(),
        }
    }

    /// Attach structured context
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    /// Seal into an immutable entry
    #[must_use]
    pub fn into_entry(self, sequence: u64, timestamp: DateTime<Utc>) -> RunLogEntry {
        RunLogEntry {
            sequence,
            run_id: self.run_id,
            task_id: self.task_id,
            timestamp,
            level: self.level,
            category: self.category,
            message: self.message,
            context: self.context,
        }
    }
}

/// A single, immutable log entry for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// Insertion position within the run, starting at 0
    pub sequence: u64,
    /// Run this entry belongs to
    pub run_id: RunId,
    /// Task being executed
    pub task_id: TaskId,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
    /// Severity level
    pub level: LogLevel,
    /// Type of log entry
    pub category: LogCategory,
    /// Human-readable message
    pub message: String,
    /// Additional structured data
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: LogContext,
}

impl RunLogEntry {
    /// Whether this is an ERROR-level entry
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    /// Context values flattened to text, in key order
    ///
    /// Strings are used verbatim; other values use their JSON rendering.
    #[must_use]
    pub fn context_text(&self) -> String {
        self.context
            .values()
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Message followed by stringified context, the text patterns run over
    #[must_use]
    pub fn searchable_text(&self) -> String {
        if self.context.is_empty() {
            self.message.clone()
        } else {
            format!("{} {}", self.message, self.context_text())
        }
    }
}

/// A single remediation recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecommendation {
    /// Type of remediation action
    pub action: RemediationAction,
    /// Why this action is recommended
    pub reason: String,
    /// Fully rendered command for this action
    pub command: String,
    /// Values substituted into the command
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

/// Analysis of a failed run with recommendations
///
/// Created once per analysis and never mutated; re-analysis produces a
/// new report with a new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Unique report identifier
    pub id: ReportId,
    /// Task that failed
    pub task_id: TaskId,
    /// Run that failed
    pub run_id: RunId,
    /// Description of the root cause
    pub root_cause: String,
    /// Authoritative category driving severity and recommendations
    pub failure_category: FailureCategory,
    /// Every category the detector matched, in precedence order
    #[serde(default)]
    pub matched_categories: Vec<FailureCategory>,
    /// How severe the issue is
    pub severity: Severity,
    /// Recommended actions, most actionable first
    pub recommendations: Vec<DiagnosticRecommendation>,
    /// Bounded summary of relevant log entries
    pub log_summary: String,
    /// Whether the root cause text came from a language model
    #[serde(default)]
    pub llm_enriched: bool,
    /// When the report was created
    pub created_at: DateTime<Utc>,
}

impl DiagnosticReport {
    /// First (most actionable) recommendation
    #[inline]
    #[must_use]
    pub fn primary_recommendation(&self) -> Option<&DiagnosticRecommendation> {
        self.recommendations.first()
    }

    /// Whether any recommendation uses the given action
    #[must_use]
    pub fn recommends(&self, action: RemediationAction) -> bool {
        self.recommendations.iter().any(|r| r.action == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_is_totally_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::Critical));
    }

    #[test]
    fn enum_strings_parse_case_insensitively() {
        assert_eq!("TASK_DESCRIPTION".parse::<FailureCategory>(), Ok(FailureCategory::TaskDescription));
        assert_eq!(" high ".parse::<Severity>(), Ok(Severity::High));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert!("blocker_unresolved".parse::<FailureCategory>().is_err());
    }

    #[test]
    fn enum_strings_match_serde() {
        for category in FailureCategory::ALL {
            let encoded = serde_json::to_string(&category).unwrap();
            assert_eq!(encoded, format!("\"{}\"", category.as_str()));
        }
        for action in RemediationAction::ALL {
            let encoded = serde_json::to_string(&action).unwrap();
            assert_eq!(encoded, format!("\"{}\"", action.as_str()));
        }
        assert_eq!(serde_json::to_string(&LogLevel::Warning).unwrap(), "\"WARNING\"");
    }

    #[test]
    fn context_text_uses_raw_strings() {
        let mut context = LogContext::new();
        context.insert("error".into(), json!("Task description is ambiguous"));
        context.insert("tokens".into(), json!(200_000));

        let entry = LogRecord::new("run", "task", LogLevel::Error, LogCategory::Error, "Failed to plan")
            .with_context(context)
            .into_entry(0, Utc::now());

        assert_eq!(entry.context_text(), "Task description is ambiguous 200000");
        assert!(entry.searchable_text().starts_with("Failed to plan "));
    }

    #[test]
    fn report_id_round_trips_through_display() {
        let id = ReportId::new();
        assert_eq!(id.to_string().parse::<ReportId>(), Ok(id));
        assert!("not-a-uuid".parse::<ReportId>().is_err());
    }
}
