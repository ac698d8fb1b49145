//! Run-scoped logger
//!
//! Producers hold a [`RunLogger`] bound to one run and task and append
//! entries through it. Every append is mirrored as a `tracing` event so run
//! activity also shows up in process logs.

use crate::error::StoreError;
use crate::store::RunLogStore;
use std::sync::Arc;
use triage_core::{LogCategory, LogContext, LogLevel, LogRecord, RunId, RunLogEntry, TaskId};

/// Appends entries for a single run
#[derive(Clone)]
pub struct RunLogger {
    store: Arc<dyn RunLogStore>,
    run_id: RunId,
    task_id: TaskId,
}

impl std::fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLogger")
            .field("run_id", &self.run_id)
            .field("task_id", &self.task_id)
            .finish_non_exhaustive()
    }
}

impl RunLogger {
    /// Create logger for a run
    pub fn new(store: Arc<dyn RunLogStore>, run_id: impl Into<RunId>, task_id: impl Into<TaskId>) -> Self {
        Self {
            store,
            run_id: run_id.into(),
            task_id: task_id.into(),
        }
    }

    /// Run this logger writes to
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Task this logger writes for
    #[inline]
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Append an entry with optional context
    pub fn log(
        &self,
        level: LogLevel,
        category: LogCategory,
        message: impl Into<String>,
        context: Option<LogContext>,
    ) -> Result<RunLogEntry, StoreError> {
        let mut record = LogRecord::new(self.run_id.clone(), self.task_id.clone(), level, category, message);
        if let Some(context) = context {
            record = record.with_context(context);
        }

        let entry = self.store.append(record)?;
        mirror(&entry);
        Ok(entry)
    }

    /// Append a DEBUG entry
    pub fn debug(&self, category: LogCategory, message: impl Into<String>) -> Result<RunLogEntry, StoreError> {
        self.log(LogLevel::Debug, category, message, None)
    }

    /// Append an INFO entry
    pub fn info(&self, category: LogCategory, message: impl Into<String>) -> Result<RunLogEntry, StoreError> {
        self.log(LogLevel::Info, category, message, None)
    }

    /// Append a WARNING entry
    pub fn warning(&self, category: LogCategory, message: impl Into<String>) -> Result<RunLogEntry, StoreError> {
        self.log(LogLevel::Warning, category, message, None)
    }

    /// Append an ERROR entry
    pub fn error(&self, category: LogCategory, message: impl Into<String>) -> Result<RunLogEntry, StoreError> {
        self.log(LogLevel::Error, category, message, None)
    }
}

fn mirror(entry: &RunLogEntry) {
    let run_id = entry.run_id.as_str();
    let category = entry.category.as_str();
    match entry.level {
        LogLevel::Debug => tracing::trace!(run_id, category, sequence = entry.sequence, "{}", entry.message),
        LogLevel::Info => tracing::debug!(run_id, category, sequence = entry.sequence, "{}", entry.message),
        LogLevel::Warning => tracing::info!(run_id, category, sequence = entry.sequence, "{}", entry.message),
        LogLevel::Error => tracing::warn!(run_id, category, sequence = entry.sequence, "{}", entry.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;

    #[test]
    fn logger_binds_run_and_task() {
        let store = Arc::new(MemoryStore::new());
        let logger = RunLogger::new(store.clone(), "run-l", "task-l");

        logger.info(LogCategory::AgentAction, "Starting task execution").unwrap();
        let context: LogContext = [("blocker_id".to_string(), json!(7))].into_iter().collect();
        let entry = logger
            .log(LogLevel::Warning, LogCategory::Blocker, "Need input on schema", Some(context))
            .unwrap();

        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.task_id, TaskId::new("task-l"));
        assert_eq!(entry.context.get("blocker_id"), Some(&json!(7)));

        let logs = store.get_logs(&RunId::new("run-l")).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].level, LogLevel::Info);
    }
}
