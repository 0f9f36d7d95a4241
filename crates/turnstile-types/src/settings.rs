//! Caller-supplied generation parameters.

use serde::{Deserialize, Serialize};

/// Sampling parameters for one request.
///
/// Immutable once submitted. Missing fields fall back to the defaults
/// below, so clients may send a partial object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub repetition_penalty: f64,
    pub min_p: f64,
    pub top_k: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.95,
            max_tokens: 512,
            repetition_penalty: 1.1,
            min_p: 0.05,
            top_k: 40,
        }
    }
}

impl Settings {
    /// Copy of these settings with `max_tokens` clamped to `1..=ceiling`.
    pub fn with_max_tokens_clamped(&self, ceiling: u32) -> Self {
        Self {
            max_tokens: self.max_tokens.clamp(1, ceiling.max(1)),
            ..self.clone()
        }
    }
}
