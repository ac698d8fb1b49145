//! Diagnostic agent configuration
//!
//! Every field has a default, so a TOML file only needs the values it
//! overrides:
//!
//! ```toml
//! summary_max_length = 800
//! llm_timeout_secs = 10
//!
//! [llm]
//! model = "openai/gpt-4o-mini"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use triage_core::{
    LogSummarizer, RecommendationEngine, DEFAULT_COMMAND_PREFIX, DEFAULT_MAX_ENTRY_CHARS,
    DEFAULT_SUMMARY_MAX_LENGTH,
};

/// Connection settings for the HTTP language model provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,
    /// Model identifier sent with each request
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Completion token cap
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            max_tokens: 1024,
        }
    }
}

/// Diagnostic agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    /// Upper bound on the log summary length, in bytes
    pub summary_max_length: usize,
    /// Per-entry message cap inside summaries and prompts
    pub max_entry_chars: usize,
    /// Whether to ask the language model for a root cause narrative
    pub llm_enabled: bool,
    /// Bound on the single language model call
    pub llm_timeout_secs: u64,
    /// Most recent entries included in the prompt
    pub prompt_log_window: usize,
    /// Error messages included in the prompt
    pub prompt_max_errors: usize,
    /// CLI used in rendered remediation commands
    pub command_prefix: String,
    /// Language model provider settings
    pub llm: LlmSettings,
}

impl DiagnosticConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.summary_max_length == 0 {
            return Err(ConfigError::Invalid {
                field: "summary_max_length",
                reason: "must be greater than zero",
            });
        }
        if self.max_entry_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "max_entry_chars",
                reason: "must be greater than zero",
            });
        }
        if self.llm_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "llm_timeout_secs",
                reason: "must be greater than zero",
            });
        }
        if self.command_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "command_prefix",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// With summary length bound
    #[inline]
    #[must_use]
    pub fn with_summary_max_length(mut self, max_length: usize) -> Self {
        self.summary_max_length = max_length;
        self
    }

    /// With language model enrichment on or off
    #[inline]
    #[must_use]
    pub fn with_llm_enabled(mut self, enabled: bool) -> Self {
        self.llm_enabled = enabled;
        self
    }

    /// With language model timeout in seconds
    #[inline]
    #[must_use]
    pub fn with_llm_timeout_secs(mut self, secs: u64) -> Self {
        self.llm_timeout_secs = secs;
        self
    }

    /// With command prefix
    #[inline]
    #[must_use]
    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    /// With provider settings
    #[inline]
    #[must_use]
    pub fn with_llm_settings(mut self, settings: LlmSettings) -> Self {
        self.llm = settings;
        self
    }

    /// Language model timeout as a duration
    #[inline]
    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Summarizer honoring the configured bounds
    #[must_use]
    pub fn summarizer(&self) -> LogSummarizer {
        LogSummarizer::new(self.summary_max_length).with_max_entry_chars(self.max_entry_chars)
    }

    /// Recommendation engine for the configured prefix
    #[must_use]
    pub fn recommender(&self) -> RecommendationEngine {
        RecommendationEngine::new(self.command_prefix.clone())
    }
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            summary_max_length: DEFAULT_SUMMARY_MAX_LENGTH,
            max_entry_chars: DEFAULT_MAX_ENTRY_CHARS,
            llm_enabled: true,
            llm_timeout_secs: 30,
            prompt_log_window: 30,
            prompt_max_errors: 10,
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            llm: LlmSettings::default(),
        }
    }
}
