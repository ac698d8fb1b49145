//! Testing utilities for the triage workspace
//!
//! Shared log fixtures, scripted language model providers and a report
//! store that refuses to save.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use triage_agent::{DiagnosticAgent, DiagnosticConfig, LlmError, LlmProvider, LlmResponse};
use triage_core::{
    DiagnosticReport, LogCategory, LogLevel, LogRecord, ReportId, RunId, RunLogEntry, TaskId,
};
use triage_store::{LogQuery, MemoryStore, ReportQuery, ReportStore, RunLogStore, StoreError};

pub type LogLine = (LogLevel, LogCategory, &'static str);

pub const TASK: &str = "task-7f3a";
pub const RUN: &str = "run-19c2";

pub fn task_id() -> TaskId {
    TaskId::new(TASK)
}

pub fn run_id() -> RunId {
    RunId::new(RUN)
}

/// Append a script of lines to the default run
pub fn seed_run(store: &dyn RunLogStore, lines: &[LogLine]) {
    for (level, category, message) in lines {
        store
            .append(LogRecord::new(RUN, TASK, *level, *category, *message))
            .unwrap();
    }
}

/// A run whose task statement the agent could not act on
pub fn ambiguous_task_logs() -> Vec<LogLine> {
    vec![
        (LogLevel::Info, LogCategory::AgentAction, "Starting task execution"),
        (LogLevel::Info, LogCategory::LlmCall, "Planning with Claude"),
        (LogLevel::Warning, LogCategory::Verification, "Initial lint check failed"),
        (LogLevel::Error, LogCategory::Error, "Task failed: Cannot understand requirements"),
    ]
}

/// A run that died on a missing package
pub fn missing_dependency_logs() -> Vec<LogLine> {
    vec![
        (LogLevel::Info, LogCategory::AgentAction, "Starting task execution"),
        (LogLevel::Info, LogCategory::ShellCommand, "python -m app.main"),
        (LogLevel::Error, LogCategory::Error, "ModuleNotFoundError: No module named 'requests'"),
    ]
}

/// `count` unsealed records of exactly `width` characters for the default run
///
/// Every tenth record is an ERROR.
pub fn noisy_logs(count: usize, width: usize) -> Vec<LogRecord> {
    (0..count)
        .map(|i| {
            let level = if i % 10 == 9 { LogLevel::Error } else { LogLevel::Info };
            let prefix = format!("entry {i} failed ");
            let message = format!("{prefix}{}", "x".repeat(width.saturating_sub(prefix.len())));
            LogRecord::new(RUN, TASK, level, LogCategory::AgentAction, message)
        })
        .collect()
}

/// Agent over a shared memory store with the default configuration
pub fn memory_agent(store: &Arc<MemoryStore>) -> DiagnosticAgent {
    DiagnosticAgent::new(store.clone(), store.clone(), DiagnosticConfig::default())
}

/// Provider answering every prompt with the same text
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    answer: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        Ok(LlmResponse::new(self.answer.clone()))
    }
}

/// Provider that always fails
#[derive(Debug, Default)]
pub struct FailingProvider {
    calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FailingProvider {
    async fn complete(&self, _prompt: &str) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::Transport("connection refused".into()))
    }
}

/// Provider that answers only after a delay
#[derive(Debug)]
pub struct SlowProvider {
    delay: Duration,
    answer: String,
    completed: AtomicUsize,
}

impl SlowProvider {
    pub fn new(delay: Duration, answer: impl Into<String>) -> Self {
        Self {
            delay,
            answer: answer.into(),
            completed: AtomicUsize::new(0),
        }
    }

    /// Calls that ran to completion (not dropped by a timeout)
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for SlowProvider {
    async fn complete(&self, _prompt: &str) -> Result<LlmResponse, LlmError> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse::new(self.answer.clone()))
    }
}

/// Memory-backed stores whose report side refuses every save
#[derive(Debug, Default)]
pub struct FailingReportStore {
    inner: MemoryStore,
}

impl FailingReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunLogStore for FailingReportStore {
    fn append(&self, record: LogRecord) -> Result<RunLogEntry, StoreError> {
        self.inner.append(record)
    }

    fn query_logs(&self, run_id: &RunId, query: &LogQuery) -> Result<Vec<RunLogEntry>, StoreError> {
        self.inner.query_logs(run_id, query)
    }
}

impl ReportStore for FailingReportStore {
    fn save_report(&self, _report: &DiagnosticReport) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("report store is read-only".into()))
    }

    fn get_report(&self, id: &ReportId) -> Result<Option<DiagnosticReport>, StoreError> {
        self.inner.get_report(id)
    }

    fn list_reports(&self, query: &ReportQuery) -> Result<Vec<DiagnosticReport>, StoreError> {
        self.inner.list_reports(query)
    }
}
