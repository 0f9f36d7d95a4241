//! Wire types for the OpenAI-compatible `/completions` endpoint.
//!
//! These are backend-specific request/response structures. They are NOT the
//! generic completion types from turnstile-types.

use serde::{Deserialize, Serialize};

/// Request body for `POST {base_url}/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct TextCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub min_p: f64,
    pub repetition_penalty: f64,
    pub stop: &'a [String],
}

/// Response body; only the first choice is read.
#[derive(Debug, Clone, Deserialize)]
pub struct TextCompletionResponse {
    #[serde(default)]
    pub choices: Vec<TextChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextChoice {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
}
