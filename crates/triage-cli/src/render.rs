//! Plain text rendering of reports and logs

use std::fmt::Write as _;
use triage_core::{truncate_chars, DiagnosticReport, RunLogEntry};

/// Longest root cause shown in report listings
const LIST_ROOT_CAUSE_CHARS: usize = 60;

/// Full report view
pub(crate) fn report(report: &DiagnosticReport, verbose: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Diagnostic Report {}", report.id);
    let _ = writeln!(out, "  Task:      {}", report.task_id);
    let _ = writeln!(out, "  Run:       {}", report.run_id);
    let _ = writeln!(out, "  Created:   {}", report.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "  Severity:  {}", report.severity.as_str().to_uppercase());
    let _ = writeln!(out, "  Category:  {}", report.failure_category.label());
    if verbose && report.matched_categories.len() > 1 {
        let matched: Vec<_> = report.matched_categories.iter().map(|c| c.label()).collect();
        let _ = writeln!(out, "  Matched:   {}", matched.join(", "));
    }
    out.push('\n');

    let source = if report.llm_enriched { " (language model)" } else { "" };
    let _ = writeln!(out, "Root Cause{source}:");
    for line in report.root_cause.lines() {
        let _ = writeln!(out, "  {line}");
    }

    if !report.recommendations.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "Recommendations:");
        for (i, rec) in report.recommendations.iter().enumerate() {
            let _ = writeln!(out, "  {}. [{}] {}", i + 1, rec.action, rec.command);
            if verbose {
                let _ = writeln!(out, "     {}", rec.reason);
            }
        }
    }

    if verbose {
        out.push('\n');
        let _ = writeln!(out, "Log Summary:");
        for line in report.log_summary.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    out
}

/// One line per log entry
pub(crate) fn logs(entries: &[RunLogEntry]) -> String {
    if entries.is_empty() {
        return "No log entries found.\n".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{:>5} {} {:<7} {:<14} {}",
            entry.sequence,
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.level.as_str(),
            entry.category.as_str(),
            entry.message
        );
    }
    out
}

/// One line per report
pub(crate) fn report_list(reports: &[DiagnosticReport]) -> String {
    if reports.is_empty() {
        return "No diagnostic reports found.\n".to_string();
    }
    let mut out = String::new();
    for report in reports {
        let first_line = report.root_cause.lines().next().unwrap_or_default();
        let _ = writeln!(
            out,
            "{}  {}  {:<8} {:<18} {}/{}  {}",
            report.id,
            report.created_at.format("%Y-%m-%d %H:%M"),
            report.severity.as_str().to_uppercase(),
            report.failure_category.as_str(),
            report.task_id,
            report.run_id,
            truncate_chars(first_line, LIST_ROOT_CAUSE_CHARS)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{
        generate_recommendations, FailureCategory, LogCategory, LogLevel, LogRecord, ReportId,
        RunId, Severity, TaskId,
    };

    fn sample(llm_enriched: bool) -> DiagnosticReport {
        let task = TaskId::new("task-7f3a");
        let run = RunId::new("run-19c2");
        DiagnosticReport {
            id: ReportId::new(),
            recommendations: generate_recommendations(
                &task,
                &run,
                FailureCategory::DependencyIssue,
                &["No module named 'requests'"],
            ),
            task_id: task,
            run_id: run,
            root_cause: "Missing dependencies prevented task execution.\n\nFirst error: No module named 'requests'".into(),
            failure_category: FailureCategory::DependencyIssue,
            matched_categories: vec![FailureCategory::DependencyIssue, FailureCategory::CodeQuality],
            severity: Severity::Low,
            log_summary: "[ERROR] error: No module named 'requests'".into(),
            llm_enriched,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn report_shows_commands_and_hides_detail_by_default() {
        let text = report(&sample(false), false);
        assert!(text.contains("Severity:  LOW"));
        assert!(text.contains("Category:  dependency issue"));
        assert!(text.contains("1. [resolve_dependency] uv pip install requests && cf work start task-7f3a --execute"));
        assert!(text.contains("  First error: No module named 'requests'"));
        assert!(!text.contains("Log Summary:"));
        assert!(!text.contains("Matched:"));
        assert!(!text.contains("(language model)"));
    }

    #[test]
    fn verbose_report_adds_summary_reasons_and_matches() {
        let text = report(&sample(true), true);
        assert!(text.contains("Log Summary:\n  [ERROR] error: No module named 'requests'"));
        assert!(text.contains("Missing package: requests"));
        assert!(text.contains("Matched:   dependency issue, code quality"));
        assert!(text.contains("Root Cause (language model):"));
    }

    #[test]
    fn log_lines_and_empty_run() {
        let entry = LogRecord::new("r", "t", LogLevel::Error, LogCategory::Error, "boom")
            .into_entry(3, chrono::Utc::now());
        let text = logs(&[entry]);
        assert!(text.starts_with("    3 "));
        assert!(text.contains("ERROR"));
        assert!(text.trim_end().ends_with("boom"));
        assert_eq!(logs(&[]), "No log entries found.\n");
    }

    #[test]
    fn listing_uses_first_root_cause_line() {
        let text = report_list(&[sample(false)]);
        assert!(text.contains("dependency_issue"));
        assert!(text.contains("task-7f3a/run-19c2"));
        assert!(!text.contains("First error"));
        assert_eq!(report_list(&[]), "No diagnostic reports found.\n");
    }
}
