//! Language model capability
//!
//! The agent only needs `prompt -> text`. Any backend (HTTP API, local model,
//! scripted stub) plugs in through [`LlmProvider`].

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text returned by a completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Plain text answer
    pub content: String,
}

impl LlmResponse {
    /// Wrap completion text
    #[inline]
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Single-shot text completion
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, LlmError>;
}
