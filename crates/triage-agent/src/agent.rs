//! Diagnostic agent
//!
//! Runs the rule-based pipeline over a run's log, asks the language model
//! (when configured) for a root cause narrative, and persists an immutable
//! report. The rule-based category and severity are always the persisted
//! values; the model can only replace the root cause text.

use crate::config::DiagnosticConfig;
use crate::error::{DiagnosisError, LlmError};
use crate::prompt::{build_prompt, parse_analysis, PromptInput};
use crate::provider::LlmProvider;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use triage_core::{
    assess_severity, detect_failure_patterns, has_unresolved_blocker, primary_failure_category,
    truncate_chars, DiagnosticReport, FailureCategory, LogSummarizer, RecommendationEngine,
    ReportId, RunId, RunLogEntry, Severity, TaskId,
};
use triage_store::{ReportStore, RunLogStore};

/// Characters of the first error quoted in a rule-based root cause
pub const FIRST_ERROR_CHARS: usize = 200;

/// Root cause of a run that recorded no log entries
pub const NO_LOGS_ROOT_CAUSE: &str = "No log entries were recorded for this run, so the failure cause \
     could not be determined. Retry the task and inspect its output if it fails again.";

/// Rule-based explanation for a failure category
#[must_use]
pub const fn category_description(category: FailureCategory) -> &'static str {
    match category {
        FailureCategory::TaskDescription => {
            "Task description lacks clear requirements or acceptance criteria. \
             The agent could not determine the expected implementation approach."
        }
        FailureCategory::DependencyIssue => {
            "Missing dependencies prevented task execution. \
             Required packages need to be installed before retrying."
        }
        FailureCategory::EnvironmentIssue => {
            "Environment configuration issues prevented task execution. \
             Check file permissions, paths, and environment variables."
        }
        FailureCategory::CodeQuality => {
            "Code quality checks (tests or linting) failed. \
             The agent's self-correction loop was unable to resolve the issues."
        }
        FailureCategory::ModelLimitation => {
            "The task exceeded model limitations (token limit, rate limit, etc.). \
             Consider using a model with larger context or breaking down the task."
        }
        FailureCategory::TechnicalError => {
            "A technical error occurred during task execution. \
             This may be a transient issue that could resolve on retry."
        }
    }
}

/// Root cause used when no model narrative is available
#[must_use]
pub fn fallback_root_cause(category: FailureCategory, error_messages: &[&str]) -> String {
    let description = category_description(category);
    match error_messages.first() {
        Some(first) => format!(
            "{description}\n\nFirst error: {}",
            truncate_chars(first, FIRST_ERROR_CHARS)
        ),
        None => description.to_string(),
    }
}

/// Analyzes failed runs and produces diagnostic reports
pub struct DiagnosticAgent {
    logs: Arc<dyn RunLogStore>,
    reports: Arc<dyn ReportStore>,
    llm: Option<Arc<dyn LlmProvider>>,
    config: DiagnosticConfig,
    llm_timeout: Duration,
    summarizer: LogSummarizer,
    recommender: RecommendationEngine,
}

impl std::fmt::Debug for DiagnosticAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticAgent")
            .field("llm", &self.llm.is_some())
            .field("config", &self.config)
            .field("llm_timeout", &self.llm_timeout)
            .finish_non_exhaustive()
    }
}

impl DiagnosticAgent {
    /// Create agent over explicit store handles, without a language model
    #[must_use]
    pub fn new(logs: Arc<dyn RunLogStore>, reports: Arc<dyn ReportStore>, config: DiagnosticConfig) -> Self {
        Self {
            logs,
            reports,
            llm: None,
            llm_timeout: config.llm_timeout(),
            summarizer: config.summarizer(),
            recommender: config.recommender(),
            config,
        }
    }

    /// Attach a language model provider for root cause narratives
    #[must_use]
    pub fn with_llm_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(provider);
        self
    }

    /// Override the bound on the language model call
    #[must_use]
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DiagnosticConfig {
        &self.config
    }

    /// Whether a language model will be consulted
    #[inline]
    #[must_use]
    pub fn llm_active(&self) -> bool {
        self.llm.is_some() && self.config.llm_enabled
    }

    /// Analyze a failed run and persist a new report
    ///
    /// Only storage failures are returned as errors.
    pub async fn analyze(&self, task_id: &TaskId, run_id: &RunId) -> Result<DiagnosticReport, DiagnosisError> {
        self.analyze_with_cancellation(task_id, run_id, &CancellationToken::new())
            .await
    }

    /// Analyze a failed run, skipping the language model if `cancel` fires first
    ///
    /// Cancellation is checked once, before the request is issued. A request
    /// already in flight is only bounded by the timeout.
    #[tracing::instrument(skip_all, fields(task_id = %task_id, run_id = %run_id))]
    pub async fn analyze_with_cancellation(
        &self,
        task_id: &TaskId,
        run_id: &RunId,
        cancel: &CancellationToken,
    ) -> Result<DiagnosticReport, DiagnosisError> {
        let logs = self.logs.get_logs(run_id)?;

        let report = if logs.is_empty() {
            tracing::info!("run has no log entries; producing generic report");
            self.empty_run_report(task_id, run_id)
        } else {
            self.diagnose(task_id, run_id, &logs, cancel).await
        };

        self.reports.save_report(&report)?;
        tracing::info!(
            report_id = %report.id,
            category = %report.failure_category,
            severity = %report.severity,
            llm_enriched = report.llm_enriched,
            "diagnostic report saved"
        );
        Ok(report)
    }

    /// Fetch a persisted report by id
    pub fn get_diagnostic_report(&self, id: &ReportId) -> Result<Option<DiagnosticReport>, DiagnosisError> {
        Ok(self.reports.get_report(id)?)
    }

    /// Most recent report for a task and/or run
    pub fn latest_report(
        &self,
        task_id: Option<&TaskId>,
        run_id: Option<&RunId>,
    ) -> Result<Option<DiagnosticReport>, DiagnosisError> {
        Ok(self.reports.latest_report(task_id, run_id)?)
    }

    async fn diagnose(
        &self,
        task_id: &TaskId,
        run_id: &RunId,
        logs: &[RunLogEntry],
        cancel: &CancellationToken,
    ) -> DiagnosticReport {
        let matched = detect_failure_patterns(logs);
        let category = primary_failure_category(&matched);

        let error_messages: Vec<&str> = logs
            .iter()
            .filter(|entry| entry.is_error())
            .map(|entry| entry.message.as_str())
            .collect();
        let has_blocker = has_unresolved_blocker(logs);
        let severity = assess_severity(category, error_messages.len(), has_blocker);

        let mut recommendations = self.recommender.generate(task_id, run_id, category, &error_messages);
        if has_blocker {
            recommendations.insert(0, self.recommender.blocker_recommendation(task_id, run_id));
        }

        let log_summary = self.summarizer.summarize(logs);
        tracing::debug!(
            matched = ?matched,
            category = %category,
            severity = %severity,
            error_count = error_messages.len(),
            has_blocker,
            "rule-based classification"
        );

        let narrative = match self.request_narrative(logs, &error_messages, &log_summary, cancel).await {
            Ok(content) => self.narrative_from(&content, category, severity),
            Err(e) if e.is_skipped() => {
                tracing::debug!(reason = %e, "language model skipped; using rule-based root cause");
                None
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "language model request failed; using rule-based root cause"
                );
                None
            }
        };
        let llm_enriched = narrative.is_some();
        let root_cause = narrative.unwrap_or_else(|| fallback_root_cause(category, &error_messages));

        DiagnosticReport {
            id: ReportId::new(),
            task_id: task_id.clone(),
            run_id: run_id.clone(),
            root_cause,
            failure_category: category,
            matched_categories: matched.into_iter().collect(),
            severity,
            recommendations,
            log_summary,
            llm_enriched,
            created_at: Utc::now(),
        }
    }

    /// Issue the single language model call
    async fn request_narrative(
        &self,
        logs: &[RunLogEntry],
        error_messages: &[&str],
        log_summary: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let provider = match &self.llm {
            Some(provider) if self.config.llm_enabled => provider,
            _ => return Err(LlmError::Unavailable("no provider configured".into())),
        };
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        let prompt = build_prompt(&PromptInput {
            logs,
            error_messages,
            summary: log_summary,
            log_window: self.config.prompt_log_window,
            max_errors: self.config.prompt_max_errors,
            max_entry_chars: self.config.max_entry_chars,
        });

        match tokio::time::timeout(self.llm_timeout, provider.complete(&prompt)).await {
            Ok(result) => result.map(|response| response.content),
            Err(_) => Err(LlmError::Timeout {
                timeout_secs: self.llm_timeout.as_secs(),
            }),
        }
    }

    /// Root cause text from a model answer; disagreements are only logged
    fn narrative_from(&self, content: &str, category: FailureCategory, severity: Severity) -> Option<String> {
        let analysis = parse_analysis(content);

        if let Some(suggested) = analysis.failure_category.filter(|c| *c != category) {
            tracing::info!(
                llm_category = %suggested,
                category = %category,
                "language model disagrees with rule-based category; keeping rule-based value"
            );
        }
        if let Some(suggested) = analysis.severity.filter(|s| *s != severity) {
            tracing::info!(
                llm_severity = %suggested,
                severity = %severity,
                "language model disagrees with rule-based severity; keeping rule-based value"
            );
        }
        if !analysis.recommendations.is_empty() {
            tracing::debug!(
                suggestions = ?analysis.recommendations,
                "language model recommendations are advisory; keeping rule-based recommendations"
            );
        }
        if analysis.root_cause.is_none() {
            tracing::warn!("language model answer had no usable root cause");
        }
        analysis.root_cause
    }

    fn empty_run_report(&self, task_id: &TaskId, run_id: &RunId) -> DiagnosticReport {
        let category = FailureCategory::TechnicalError;
        DiagnosticReport {
            id: ReportId::new(),
            task_id: task_id.clone(),
            run_id: run_id.clone(),
            root_cause: NO_LOGS_ROOT_CAUSE.to_string(),
            failure_category: category,
            matched_categories: Vec::new(),
            severity: assess_severity(category, 0, false),
            recommendations: self.recommender.generate::<&str>(task_id, run_id, category, &[]),
            log_summary: self.summarizer.summarize(&[]),
            llm_enriched: false,
            created_at: Utc::now(),
        }
    }
}
