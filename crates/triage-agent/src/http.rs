//! OpenAI-compatible chat completions provider

use crate::config::LlmSettings;
use crate::error::LlmError;
use crate::provider::{LlmProvider, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use triage_core::truncate_chars;

/// Longest response body quoted in an error
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// Quote a provider body without leaking credentials
fn sanitize_body(body: &str) -> String {
    const SECRET_MARKERS: &[&str] = &["api_key", "apikey", "secret", "password", "bearer", "sk-"];

    let lower = body.to_lowercase();
    if SECRET_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return "(response body redacted)".to_string();
    }
    truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS)
}

/// First choice text of a chat completions body
fn extract_content(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::Transport(format!("malformed response: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

/// Provider backed by an HTTP chat completions endpoint
#[derive(Debug, Clone)]
pub struct HttpLlmProvider {
    client: reqwest::Client,
    settings: LlmSettings,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl HttpLlmProvider {
    /// Create provider, reading the API key from `settings.api_key_env`
    ///
    /// A missing key is not an error; requests are then sent without an
    /// `Authorization` header, which suits local servers.
    pub fn new(settings: LlmSettings, request_timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LlmError::Unavailable(format!("cannot build HTTP client: {e}")))?;
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            client,
            settings,
            api_key,
            request_timeout,
        })
    }

    /// Override the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Provider settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.settings.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let mut request = self
            .client
            .post(&self.settings.endpoint)
            .json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    timeout_secs: self.request_timeout.as_secs(),
                }
            } else {
                LlmError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: sanitize_body(&body),
            });
        }

        tracing::debug!(model = %self.settings.model, bytes = body.len(), "completion received");
        extract_content(&body).map(LlmResponse::new)
    }
}
