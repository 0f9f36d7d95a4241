//! TextCompletionBackend -- concrete [`CompletionBackend`] over HTTP.
//!
//! Sends one `POST {base_url}/completions` per call and returns
//! `choices[0].text`. Retries are not handled here; see
//! `turnstile_core::llm::retry::UpstreamCaller`.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use turnstile_core::llm::provider::CompletionBackend;
use turnstile_types::config::ServiceConfig;
use turnstile_types::llm::{CompletionRequest, LlmError};

use super::types::{TextCompletionRequest, TextCompletionResponse};

/// Longest error body kept in [`LlmError::Status`].
const MAX_ERROR_BODY_BYTES: usize = 512;

/// HTTP text-completion backend.
pub struct TextCompletionBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: Option<String>,
}

impl TextCompletionBackend {
    /// Create a backend for `base_url` (e.g. `http://127.0.0.1:5001/v1`).
    ///
    /// `timeout` bounds a single HTTP exchange.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: None,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, LlmError> {
        let api_key = config
            .upstream_api_key
            .clone()
            .filter(|k| !k.expose_secret().trim().is_empty());

        let backend = Self::new(
            config.upstream_base_url.clone(),
            api_key,
            config.request_timeout(),
        )?;
        Ok(match &config.model {
            Some(model) => backend.with_model(model.clone()),
            None => backend,
        })
    }

    /// Send `model` with every request. Omitted by default.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self) -> String {
        format!("{}/completions", self.base_url)
    }
}

// TextCompletionBackend does not derive Debug; the key must never be printed.

impl CompletionBackend for TextCompletionBackend {
    fn name(&self) -> &str {
        "text-completion"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = TextCompletionRequest {
            model: self.model.as_deref(),
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            top_k: request.top_k,
            min_p: request.min_p,
            repetition_penalty: request.repetition_penalty,
            stop: &request.stop,
        };

        let mut builder = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: truncate_body(&error_body, MAX_ERROR_BODY_BYTES),
            });
        }

        let parsed: TextCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyCompletion)?;
        if choice.text.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }

        tracing::debug!(
            chars = choice.text.len(),
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "completion received"
        );
        Ok(choice.text)
    }
}

/// Cut `body` to at most `max` bytes on a char boundary.
fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
