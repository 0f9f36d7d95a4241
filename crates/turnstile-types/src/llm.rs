//! Upstream completion request type and the per-attempt error.

use serde::{Deserialize, Serialize};

/// A single text-completion request to the upstream model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub min_p: f64,
    pub repetition_penalty: f64,
    pub stop: Vec<String>,
}

/// Failure of one attempt against the upstream endpoint.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("attempt timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("upstream returned no completion text")]
    EmptyCompletion,
}
