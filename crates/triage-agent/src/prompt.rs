//! Prompt construction and lenient parsing of the sectioned answer
//!
//! The model is asked for plain text with `Root Cause:`, `Failure Category:`,
//! `Severity:` and a numbered `Recommendations:` list. Models drift from the
//! format (markdown emphasis, headings, missing sections), so parsing accepts
//! any subset and never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use triage_core::{truncate_chars, FailureCategory, RunLogEntry, Severity};

/// Longest root cause accepted from a model answer
pub const MAX_ROOT_CAUSE_CHARS: usize = 1000;

static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[\s#>*_]*(root[\s_-]*cause|failure[\s_-]*category|category|severity|recommendations?)[\s*_]*:[\s*_]*(.*)$",
    )
    .expect("section header regex compiles")
});

static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(.+)$").expect("list item regex compiles"));

/// Inputs rendered into the analysis prompt
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    /// Run log, oldest first
    pub logs: &'a [RunLogEntry],
    /// Messages of ERROR-level entries
    pub error_messages: &'a [&'a str],
    /// Bounded narrative of the run
    pub summary: &'a str,
    /// Most recent entries to include
    pub log_window: usize,
    /// Error messages to include
    pub max_errors: usize,
    /// Per-entry message cap
    pub max_entry_chars: usize,
}

/// Build the analysis prompt
#[must_use]
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let skip = input.logs.len().saturating_sub(input.log_window);
    let log_text = input.logs[skip..]
        .iter()
        .map(|entry| {
            format!(
                "[{}] {}: {}",
                entry.level,
                entry.category,
                truncate_chars(&entry.message.replace('\n', " "), input.max_entry_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let error_text = input
        .error_messages
        .iter()
        .take(input.max_errors)
        .map(|message| truncate_chars(message, input.max_entry_chars))
        .collect::<Vec<_>>()
        .join("\n");
    let categories = FailureCategory::ALL.map(|c| c.as_str()).join(", ");
    let severities = Severity::ALL.iter().rev().map(Severity::as_str).collect::<Vec<_>>().join(", ");

    format!(
        "Analyze the following agent execution logs and determine the root cause of the failure.\n\
         \n\
         Summary:\n{summary}\n\
         \n\
         Logs:\n{log_text}\n\
         \n\
         Error messages:\n{error_text}\n\
         \n\
         Provide your analysis in this format:\n\
         Root Cause: [One sentence description of the root cause]\n\
         Failure Category: [One of: {categories}]\n\
         Severity: [One of: {severities}]\n\
         Recommendations:\n\
         1. [Most important action]\n\
         2. [Next action]",
        summary = input.summary,
    )
}

/// Whatever could be recovered from a model answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmAnalysis {
    /// Root cause narrative
    pub root_cause: Option<String>,
    /// Category the model suggested
    pub failure_category: Option<FailureCategory>,
    /// Severity the model suggested
    pub severity: Option<Severity>,
    /// Recommendation lines, in the model's order
    pub recommendations: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    RootCause,
    Category,
    Severity,
    Recommendations,
}

fn section_for(name: &str) -> Section {
    let name = name.to_ascii_lowercase();
    if name.starts_with("root") {
        Section::RootCause
    } else if name.contains("category") {
        Section::Category
    } else if name.starts_with("severity") {
        Section::Severity
    } else {
        Section::Recommendations
    }
}

/// Normalize free text like `**Task Description**` to `task_description`
fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn parse_category(text: &str) -> Option<FailureCategory> {
    let normalized = normalize(text);
    FailureCategory::ALL
        .into_iter()
        .find(|category| normalized.contains(category.as_str()))
}

fn parse_severity(text: &str) -> Option<Severity> {
    let normalized = normalize(text);
    normalized
        .split('_')
        .find_map(|word| Severity::ALL.into_iter().find(|s| s.as_str() == word))
}

/// Parse a sectioned answer
///
/// Without a `Root Cause:` section, the leading free text before any other
/// section is taken as the root cause.
#[must_use]
pub fn parse_analysis(content: &str) -> LlmAnalysis {
    let mut analysis = LlmAnalysis::default();
    let mut section = Section::Preamble;
    let mut root_cause_lines: Vec<&str> = Vec::new();
    let mut preamble_lines: Vec<&str> = Vec::new();
    let mut category_text = String::new();
    let mut severity_text = String::new();

    for line in content.lines() {
        if let Some(caps) = SECTION_HEADER.captures(line) {
            section = section_for(&caps[1]);
            let rest = caps.get(2).map_or("", |m| m.as_str()).trim();
            match section {
                Section::RootCause => root_cause_lines.push(rest),
                Section::Category => category_text.push_str(rest),
                Section::Severity => severity_text.push_str(rest),
                Section::Recommendations if !rest.is_empty() => {
                    analysis.recommendations.push(rest.to_string());
                }
                Section::Recommendations | Section::Preamble => {}
            }
            continue;
        }

        let trimmed = line.trim();
        match section {
            Section::Preamble => preamble_lines.push(trimmed),
            Section::RootCause => root_cause_lines.push(trimmed),
            Section::Category if category_text.is_empty() => category_text.push_str(trimmed),
            Section::Severity if severity_text.is_empty() => severity_text.push_str(trimmed),
            Section::Recommendations => {
                if let Some(caps) = LIST_ITEM.captures(line) {
                    analysis.recommendations.push(caps[1].trim().to_string());
                }
            }
            Section::Category | Section::Severity => {}
        }
    }

    let chosen = if root_cause_lines.is_empty() { preamble_lines } else { root_cause_lines };
    let root_cause = chosen
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let root_cause = root_cause.trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());
    if !root_cause.is_empty() {
        analysis.root_cause = Some(truncate_chars(root_cause, MAX_ROOT_CAUSE_CHARS));
    }
    analysis.failure_category = parse_category(&category_text);
    analysis.severity = parse_severity(&severity_text);
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use triage_core::{LogCategory, LogLevel, LogRecord};

    fn entry(seq: u64, level: LogLevel, message: &str) -> RunLogEntry {
        LogRecord::new("run-p", "task-p", level, LogCategory::AgentAction, message).into_entry(seq, Utc::now())
    }

    fn input<'a>(logs: &'a [RunLogEntry], errors: &'a [&'a str]) -> PromptInput<'a> {
        PromptInput {
            logs,
            error_messages: errors,
            summary: "[ERROR] error: boom",
            log_window: 2,
            max_errors: 1,
            max_entry_chars: 200,
        }
    }

    #[test]
    fn prompt_includes_summary_window_and_format() {
        let logs: Vec<_> = (0..5).map(|i| entry(i, LogLevel::Info, &format!("step {i}"))).collect();
        let errors = ["first failure", "second failure"];
        let prompt = build_prompt(&input(&logs, &errors));

        assert!(prompt.contains("Summary:\n[ERROR] error: boom"));
        assert!(prompt.contains("[INFO] agent_action: step 4"));
        assert!(prompt.contains("step 3"));
        assert!(!prompt.contains("step 2"));
        assert!(prompt.contains("first failure"));
        assert!(!prompt.contains("second failure"));
        assert!(prompt.contains("Root Cause:"));
        assert!(prompt.contains("Failure Category: [One of: task_description, dependency_issue"));
        assert!(prompt.contains("Severity: [One of: critical, high, medium, low]"));
        assert!(prompt.contains("Recommendations:"));
    }

    #[test]
    fn parses_well_formed_answer() {
        let analysis = parse_analysis(
            "Root Cause: The task description never states the expected output format.\n\
             Failure Category: task_description\n\
             Severity: high\n\
             Recommendations:\n\
             1. Add acceptance criteria\n\
             2) Retry the task\n",
        );

        assert_eq!(
            analysis,
            LlmAnalysis {
                root_cause: Some("The task description never states the expected output format.".into()),
                failure_category: Some(FailureCategory::TaskDescription),
                severity: Some(Severity::High),
                recommendations: vec!["Add acceptance criteria".into(), "Retry the task".into()],
            }
        );
    }

    #[test]
    fn tolerates_markdown_and_case() {
        let analysis = parse_analysis(
            "## Analysis\n\
             **Root cause:** The `requests` package is not installed\n\
             in the task environment.\n\
             **FAILURE CATEGORY:** Dependency Issue\n\
             **Severity**: LOW\n\
             **Recommendations:**\n\
             - Install requests\n",
        );

        assert_eq!(
            analysis.root_cause.as_deref(),
            Some("The `requests` package is not installed in the task environment.")
        );
        assert_eq!(analysis.failure_category, Some(FailureCategory::DependencyIssue));
        assert_eq!(analysis.severity, Some(Severity::Low));
        assert_eq!(analysis.recommendations, vec!["Install requests".to_string()]);
    }

    #[test]
    fn free_text_becomes_root_cause() {
        let analysis = parse_analysis("The model ran out of context while reading the repository.");
        assert_eq!(
            analysis.root_cause.as_deref(),
            Some("The model ran out of context while reading the repository.")
        );
        assert_eq!(analysis.failure_category, None);
        assert_eq!(analysis.severity, None);
    }

    #[test]
    fn unknown_values_are_ignored() {
        let analysis = parse_analysis("Root Cause: unclear\nFailure Category: blocker_unresolved\nSeverity: severe");
        assert_eq!(analysis.root_cause.as_deref(), Some("unclear"));
        assert_eq!(analysis.failure_category, None);
        assert_eq!(analysis.severity, None);
    }

    #[test]
    fn empty_answer_yields_nothing() {
        assert_eq!(parse_analysis("  \n\n"), LlmAnalysis::default());
    }
}
