//! Recommendation generation
//!
//! Maps an authoritative failure category to an ordered list of remediation
//! actions with fully rendered commands. The most specific action comes
//! first and the output is identical for identical input.

use crate::detector::extract_package_name;
use crate::types::{DiagnosticRecommendation, FailureCategory, RemediationAction, RunId, TaskId};
use std::collections::BTreeMap;

/// CLI used in rendered commands unless configured otherwise
pub const DEFAULT_COMMAND_PREFIX: &str = "cf";

/// Dependency command when no package name could be extracted
const REVIEW_DEPENDENCIES_TEMPLATE: &str =
    "{prefix} work diagnose {task_id} --verbose  # review the import errors and install the missing packages";

impl RemediationAction {
    /// Canonical command template
    ///
    /// Placeholders: `{prefix}`, `{task_id}`, `{run_id}` and, for
    /// [`RemediationAction::ResolveDependency`], `{package}`.
    #[must_use]
    pub const fn command_template(&self) -> &'static str {
        match self {
            Self::UpdateTaskDescription => {
                "{prefix} tasks show {task_id}  # review the description, then add explicit acceptance criteria"
            }
            Self::AnswerBlocker => "{prefix} blocker list --task {task_id}  # answer the open blocker",
            Self::ChangeModel => {
                "{prefix} work start {task_id} --execute --model-tier large  # model with a larger context window"
            }
            Self::ResolveDependency => "uv pip install {package} && {prefix} work start {task_id} --execute",
            Self::FixEnvironment => "{prefix} env doctor && {prefix} work start {task_id} --execute",
            Self::RetryWithContext => "{prefix} work start {task_id} --execute --context-from {run_id}",
            Self::SplitTask => "{prefix} tasks show {task_id}  # split into smaller subtasks",
            Self::AddTestData => "{prefix} tasks show {task_id}  # add the fixtures the failing checks need",
        }
    }
}

/// Replace every `{key}` in `template` with its value
fn render(template: &str, vars: &BTreeMap<String, String>) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

/// Generates recommendations with a configurable command prefix
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    command_prefix: String,
}

impl RecommendationEngine {
    /// Create engine rendering commands for the given CLI prefix
    #[inline]
    #[must_use]
    pub fn new(command_prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: command_prefix.into(),
        }
    }

    /// Configured command prefix
    #[inline]
    #[must_use]
    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Generate remediation recommendations for a failure category
    #[must_use]
    pub fn generate<S: AsRef<str>>(
        &self,
        task_id: &TaskId,
        run_id: &RunId,
        failure_category: FailureCategory,
        error_messages: &[S],
    ) -> Vec<DiagnosticRecommendation> {
        let base = self.base_vars(task_id, run_id);

        match failure_category {
            FailureCategory::TaskDescription => vec![
                self.recommend(
                    RemediationAction::UpdateTaskDescription,
                    "Task description may be ambiguous or incomplete. Adding clearer acceptance criteria will help the agent understand requirements.",
                    &base,
                ),
                self.recommend(
                    RemediationAction::RetryWithContext,
                    "After updating the description, retry the task",
                    &base,
                ),
            ],
            FailureCategory::DependencyIssue => {
                let resolve = match extract_package_name(error_messages) {
                    Some(package) => {
                        let mut vars = base.clone();
                        vars.insert("package".into(), package.clone());
                        self.recommend(
                            RemediationAction::ResolveDependency,
                            &format!("Missing package: {package}. Install it and retry."),
                            &vars,
                        )
                    }
                    None => self.recommend_with(
                        RemediationAction::ResolveDependency,
                        REVIEW_DEPENDENCIES_TEMPLATE,
                        "Missing dependencies detected. Review the error and install required packages.",
                        &base,
                    ),
                };
                vec![
                    resolve,
                    self.recommend(
                        RemediationAction::RetryWithContext,
                        "After resolving dependencies, retry the task",
                        &base,
                    ),
                ]
            }
            FailureCategory::EnvironmentIssue => vec![
                self.recommend(
                    RemediationAction::FixEnvironment,
                    "Environment configuration issue detected. Check file permissions, paths, and environment variables.",
                    &base,
                ),
                self.recommend(
                    RemediationAction::RetryWithContext,
                    "After fixing the environment, retry the task",
                    &base,
                ),
            ],
            FailureCategory::CodeQuality => {
                let mut verbose = base.clone();
                verbose.insert("verbose".into(), "true".into());
                let retry_template =
                    format!("{} --verbose", RemediationAction::RetryWithContext.command_template());
                vec![
                    self.recommend_with(
                        RemediationAction::RetryWithContext,
                        &retry_template,
                        "Code quality issues (tests/lint) detected. The agent will try to self-correct on retry.",
                        &verbose,
                    ),
                    self.recommend(
                        RemediationAction::AddTestData,
                        "If checks keep failing on missing fixtures, add the test data they expect",
                        &base,
                    ),
                ]
            }
            FailureCategory::ModelLimitation => vec![
                self.recommend(
                    RemediationAction::ChangeModel,
                    "Model limitation detected (token limit, rate limit, etc.). Consider using a model with a larger context.",
                    &base,
                ),
                self.recommend(
                    RemediationAction::SplitTask,
                    "The task may be too large. Consider splitting it into smaller subtasks.",
                    &base,
                ),
            ],
            FailureCategory::TechnicalError => vec![self.recommend(
                RemediationAction::RetryWithContext,
                "Technical error occurred. A simple retry may resolve transient issues.",
                &base,
            )],
        }
    }

    /// Recommendation to answer an unresolved blocker
    #[must_use]
    pub fn blocker_recommendation(&self, task_id: &TaskId, run_id: &RunId) -> DiagnosticRecommendation {
        self.recommend(
            RemediationAction::AnswerBlocker,
            "The task has an unresolved blocker that needs human input",
            &self.base_vars(task_id, run_id),
        )
    }

    fn base_vars(&self, task_id: &TaskId, run_id: &RunId) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("prefix".to_string(), self.command_prefix.clone()),
            ("task_id".to_string(), task_id.to_string()),
            ("run_id".to_string(), run_id.to_string()),
        ])
    }

    fn recommend(
        &self,
        action: RemediationAction,
        reason: &str,
        vars: &BTreeMap<String, String>,
    ) -> DiagnosticRecommendation {
        self.recommend_with(action, action.command_template(), reason, vars)
    }

    fn recommend_with(
        &self,
        action: RemediationAction,
        template: &str,
        reason: &str,
        vars: &BTreeMap<String, String>,
    ) -> DiagnosticRecommendation {
        let mut parameters = vars.clone();
        parameters.remove("prefix");

        DiagnosticRecommendation {
            action,
            reason: reason.to_string(),
            command: render(template, vars),
            parameters,
        }
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_PREFIX)
    }
}

/// Generate recommendations with the default command prefix
#[must_use]
pub fn generate_recommendations<S: AsRef<str>>(
    task_id: &TaskId,
    run_id: &RunId,
    failure_category: FailureCategory,
    error_messages: &[S],
) -> Vec<DiagnosticRecommendation> {
    RecommendationEngine::default().generate(task_id, run_id, failure_category, error_messages)
}
