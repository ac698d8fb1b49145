//! Error types for the diagnostic agent
//!
//! Only storage failures escape [`crate::DiagnosticAgent::analyze`].
//! Language model failures are absorbed inside the agent and surface as a
//! rule-based root cause instead.

use std::path::PathBuf;
use triage_store::StoreError;

/// Failure of a language model completion
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Request could not be sent or the body could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Sanitized, truncated response body
        body: String,
    },

    /// Provider answered without any content
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// No answer within the configured bound
    #[error("completion timed out after {timeout_secs}s")]
    Timeout {
        /// Bound that elapsed
        timeout_secs: u64,
    },

    /// Caller cancelled before the request was issued
    #[error("completion cancelled")]
    Cancelled,

    /// Provider is not configured or refused to run
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl LlmError {
    /// Whether a later attempt could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyResponse | Self::Cancelled | Self::Unavailable(_) => false,
        }
    }

    /// Whether the request was never issued
    #[inline]
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Unavailable(_))
    }
}

/// Failure of a diagnosis
#[derive(Debug, thiserror::Error)]
pub enum DiagnosisError {
    /// Logs could not be read or the report could not be persisted
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Invalid or unreadable configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_llm_errors() {
        assert!(LlmError::Timeout { timeout_secs: 30 }.is_retryable());
        assert!(LlmError::Transport("reset".into()).is_retryable());
        assert!(LlmError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(LlmError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!LlmError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!LlmError::Cancelled.is_retryable());
        assert!(!LlmError::EmptyResponse.is_retryable());
    }

    #[test]
    fn only_unissued_requests_are_skips() {
        assert!(LlmError::Cancelled.is_skipped());
        assert!(LlmError::Unavailable("no provider configured".into()).is_skipped());
        assert!(!LlmError::Timeout { timeout_secs: 30 }.is_skipped());
        assert!(!LlmError::Transport("reset".into()).is_skipped());
        assert!(!LlmError::EmptyResponse.is_skipped());
    }

    #[test]
    fn store_errors_convert() {
        let err: DiagnosisError = StoreError::Unavailable("disk full".into()).into();
        assert!(err.to_string().contains("disk full"));
    }
}
