//! In-memory store
//!
//! Each run owns its own lock so appends to different runs never contend;
//! the map shard lock is only held while looking up the run.

use crate::error::StoreError;
use crate::store::{LogQuery, ReportQuery, ReportStore, RunLogStore};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use triage_core::{DiagnosticReport, LogRecord, ReportId, RunId, RunLogEntry};

type RunLog = Arc<Mutex<Vec<RunLogEntry>>>;

/// Process-local run log and report store
#[derive(Debug, Default)]
pub struct MemoryStore {
    runs: DashMap<RunId, RunLog>,
    reports: DashMap<ReportId, DiagnosticReport>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of runs with at least one entry
    #[inline]
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Number of saved reports
    #[inline]
    #[must_use]
    pub fn report_count(&self) -> usize {
        self.reports.len()
    }

    fn run_log(&self, run_id: &RunId) -> RunLog {
        Arc::clone(self.runs.entry(run_id.clone()).or_default().value())
    }
}

impl RunLogStore for MemoryStore {
    fn append(&self, record: LogRecord) -> Result<RunLogEntry, StoreError> {
        let log = self.run_log(&record.run_id);
        let mut guard = log.lock();
        let sequence = guard.len() as u64;
        let entry = record.into_entry(sequence, Utc::now());
        guard.push(entry.clone());
        Ok(entry)
    }

    fn query_logs(&self, run_id: &RunId, query: &LogQuery) -> Result<Vec<RunLogEntry>, StoreError> {
        let Some(log) = self.runs.get(run_id).map(|r| Arc::clone(r.value())) else {
            return Ok(Vec::new());
        };
        let guard = log.lock();
        Ok(query.apply(guard.iter()))
    }
}

impl ReportStore for MemoryStore {
    fn save_report(&self, report: &DiagnosticReport) -> Result<(), StoreError> {
        match self.reports.entry(report.id) {
            Entry::Occupied(_) => Err(StoreError::ReportExists(report.id)),
            Entry::Vacant(slot) => {
                slot.insert(report.clone());
                Ok(())
            }
        }
    }

    fn get_report(&self, id: &ReportId) -> Result<Option<DiagnosticReport>, StoreError> {
        Ok(self.reports.get(id).map(|r| r.value().clone()))
    }

    fn list_reports(&self, query: &ReportQuery) -> Result<Vec<DiagnosticReport>, StoreError> {
        Ok(query.apply(self.reports.iter().map(|r| r.value().clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use triage_core::{FailureCategory, LogCategory, LogLevel, Severity, TaskId};

    fn record(run: &str, level: LogLevel, message: &str) -> LogRecord {
        LogRecord::new(run, "task-1", level, LogCategory::AgentAction, message)
    }

    fn report(task: &str, run: &str, age_secs: i64) -> DiagnosticReport {
        DiagnosticReport {
            id: ReportId::new(),
            task_id: TaskId::new(task),
            run_id: RunId::new(run),
            root_cause: "Technical error".into(),
            failure_category: FailureCategory::TechnicalError,
            matched_categories: vec![FailureCategory::TechnicalError],
            severity: Severity::Low,
            recommendations: Vec::new(),
            log_summary: String::new(),
            llm_enriched: false,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn append_assigns_sequences_per_run() {
        let store = MemoryStore::new();
        let a0 = store.append(record("run-a", LogLevel::Info, "a0")).unwrap();
        let b0 = store.append(record("run-b", LogLevel::Info, "b0")).unwrap();
        let a1 = store.append(record("run-a", LogLevel::Error, "a1")).unwrap();

        assert_eq!((a0.sequence, a1.sequence, b0.sequence), (0, 1, 0));
        assert_eq!(store.run_count(), 2);

        let logs = store.get_logs(&RunId::new("run-a")).unwrap();
        assert_eq!(logs.iter().map(|e| e.message.as_str()).collect::<Vec<_>>(), vec!["a0", "a1"]);
    }

    #[test]
    fn unknown_run_has_empty_log() {
        let store = MemoryStore::new();
        assert!(store.get_logs(&RunId::new("missing")).unwrap().is_empty());
        assert!(store.count_by_level(&RunId::new("missing")).unwrap().is_empty());
        assert_eq!(store.run_count(), 0);
    }

    #[test]
    fn errors_and_level_counts() {
        let store = MemoryStore::new();
        for (level, msg) in [
            (LogLevel::Info, "start"),
            (LogLevel::Error, "boom"),
            (LogLevel::Warning, "hmm"),
            (LogLevel::Error, "boom again"),
        ] {
            store.append(record("run-c", level, msg)).unwrap();
        }
        let run = RunId::new("run-c");

        let errors = store.get_run_errors(&run).unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(RunLogEntry::is_error));

        let counts = store.count_by_level(&run).unwrap();
        assert_eq!(counts.get(&LogLevel::Error), Some(&2));
        assert_eq!(counts.get(&LogLevel::Info), Some(&1));
        assert_eq!(counts.get(&LogLevel::Debug), None);
    }

    #[test]
    fn reports_are_immutable() {
        let store = MemoryStore::new();
        let r = report("task-1", "run-1", 0);
        store.save_report(&r).unwrap();

        let mut changed = r.clone();
        changed.root_cause = "rewritten".into();
        assert!(matches!(store.save_report(&changed), Err(StoreError::ReportExists(id)) if id == r.id));
        assert_eq!(store.get_report(&r.id).unwrap(), Some(r));
    }

    #[test]
    fn latest_report_is_newest_matching() {
        let store = MemoryStore::new();
        let old = report("task-1", "run-1", 60);
        let new = report("task-1", "run-2", 5);
        let other = report("task-2", "run-3", 0);
        for r in [&old, &new, &other] {
            store.save_report(r).unwrap();
        }

        let task = TaskId::new("task-1");
        assert_eq!(store.latest_report(Some(&task), None).unwrap().map(|r| r.id), Some(new.id));
        assert_eq!(
            store.latest_report(Some(&task), Some(&RunId::new("run-1"))).unwrap().map(|r| r.id),
            Some(old.id)
        );
        assert_eq!(store.latest_report(None, None).unwrap().map(|r| r.id), Some(other.id));

        let listed = store.list_reports(&ReportQuery::new().for_task(task)).unwrap();
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![new.id, old.id]);
        assert_eq!(store.list_reports(&ReportQuery::new().with_limit(1)).unwrap().len(), 1);
    }
}
