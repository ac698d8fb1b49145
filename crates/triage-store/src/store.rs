//! Storage traits and query filters
//!
//! Run logs are append-only: entries are stored in insertion order and are
//! never rewritten. Reports are immutable once saved.

use crate::error::StoreError;
use std::collections::BTreeMap;
use triage_core::{
    DiagnosticReport, LogCategory, LogLevel, LogRecord, ReportId, RunId, RunLogEntry, TaskId,
};

/// Default page size for log queries issued from user-facing surfaces
pub const DEFAULT_LOG_LIMIT: usize = 1000;

/// Default page size for report listings
pub const DEFAULT_REPORT_LIMIT: usize = 20;

/// Filter for reading a run's log
///
/// An empty query returns every entry. `limit` keeps the first `n` matches in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Only entries at this level
    pub level: Option<LogLevel>,
    /// Only entries in this category
    pub category: Option<LogCategory>,
    /// Maximum number of entries
    pub limit: Option<usize>,
}

impl LogQuery {
    /// Query matching every entry
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a level
    #[inline]
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Restrict to a category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: LogCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Cap the number of entries
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether an entry passes the level and category filters
    #[must_use]
    pub fn matches(&self, entry: &RunLogEntry) -> bool {
        self.level.map_or(true, |level| entry.level == level)
            && self.category.map_or(true, |category| entry.category == category)
    }

    /// Apply filters and limit to entries already in insertion order
    pub fn apply<'a, I>(&self, entries: I) -> Vec<RunLogEntry>
    where
        I: IntoIterator<Item = &'a RunLogEntry>,
    {
        entries
            .into_iter()
            .filter(|entry| self.matches(entry))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Filter for listing reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    /// Only reports for this task
    pub task_id: Option<TaskId>,
    /// Only reports for this run
    pub run_id: Option<RunId>,
    /// Maximum number of reports
    pub limit: usize,
}

impl ReportQuery {
    /// Query for the most recent reports of any task
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            task_id: None,
            run_id: None,
            limit: DEFAULT_REPORT_LIMIT,
        }
    }

    /// Restrict to a task
    #[inline]
    #[must_use]
    pub fn for_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Restrict to a run
    #[inline]
    #[must_use]
    pub fn for_run(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Cap the number of reports
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a report passes the task and run filters
    #[must_use]
    pub fn matches(&self, report: &DiagnosticReport) -> bool {
        self.task_id.as_ref().map_or(true, |task| &report.task_id == task)
            && self.run_id.as_ref().map_or(true, |run| &report.run_id == run)
    }

    /// Filter, order newest first and limit
    pub fn apply<I>(&self, reports: I) -> Vec<DiagnosticReport>
    where
        I: IntoIterator<Item = DiagnosticReport>,
    {
        let mut matched: Vec<_> = reports.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        matched.truncate(self.limit);
        matched
    }
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only, per-run log storage
///
/// Appends to the same run from concurrent producers are serialized; each
/// entry receives the next sequence number of its run.
pub trait RunLogStore: Send + Sync {
    /// Append a record, returning the sealed entry
    fn append(&self, record: LogRecord) -> Result<RunLogEntry, StoreError>;

    /// Entries of a run matching `query`, in insertion order
    fn query_logs(&self, run_id: &RunId, query: &LogQuery) -> Result<Vec<RunLogEntry>, StoreError>;

    /// Every entry of a run, in insertion order
    ///
    /// An unknown run has an empty log.
    fn get_logs(&self, run_id: &RunId) -> Result<Vec<RunLogEntry>, StoreError> {
        self.query_logs(run_id, &LogQuery::all())
    }

    /// ERROR-level entries of a run
    fn get_run_errors(&self, run_id: &RunId) -> Result<Vec<RunLogEntry>, StoreError> {
        self.query_logs(run_id, &LogQuery::all().with_level(LogLevel::Error))
    }

    /// Entry counts per level; levels without entries are omitted
    fn count_by_level(&self, run_id: &RunId) -> Result<BTreeMap<LogLevel, usize>, StoreError> {
        let mut counts = BTreeMap::new();
        for entry in self.get_logs(run_id)? {
            *counts.entry(entry.level).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Storage for immutable diagnostic reports
pub trait ReportStore: Send + Sync {
    /// Persist a new report; saving an existing id fails
    fn save_report(&self, report: &DiagnosticReport) -> Result<(), StoreError>;

    /// Report by id
    fn get_report(&self, id: &ReportId) -> Result<Option<DiagnosticReport>, StoreError>;

    /// Reports matching `query`, newest first
    fn list_reports(&self, query: &ReportQuery) -> Result<Vec<DiagnosticReport>, StoreError>;

    /// Most recent report for a task and/or run
    fn latest_report(
        &self,
        task_id: Option<&TaskId>,
        run_id: Option<&RunId>,
    ) -> Result<Option<DiagnosticReport>, StoreError> {
        let query = ReportQuery {
            task_id: task_id.cloned(),
            run_id: run_id.cloned(),
            limit: 1,
        };
        Ok(self.list_reports(&query)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(seq: u64, level: LogLevel, category: LogCategory) -> RunLogEntry {
        LogRecord::new("run-q", "task-q", level, category, format!("entry {seq}"))
            .into_entry(seq, Utc::now())
    }

    #[test]
    fn log_query_filters_then_limits_in_order() {
        let entries = vec![
            entry(0, LogLevel::Info, LogCategory::AgentAction),
            entry(1, LogLevel::Error, LogCategory::Error),
            entry(2, LogLevel::Error, LogCategory::Verification),
            entry(3, LogLevel::Error, LogCategory::Error),
        ];

        let errors = LogQuery::all().with_level(LogLevel::Error).apply(&entries);
        assert_eq!(errors.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);

        let limited = LogQuery::all()
            .with_level(LogLevel::Error)
            .with_category(LogCategory::Error)
            .with_limit(1)
            .apply(&entries);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].sequence, 1);
    }

    #[test]
    fn empty_query_matches_everything() {
        let entries = vec![entry(0, LogLevel::Debug, LogCategory::StateChange)];
        assert_eq!(LogQuery::all().apply(&entries), entries);
    }
}
