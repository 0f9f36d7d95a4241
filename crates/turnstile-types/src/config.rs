//! Service configuration types for Turnstile.
//!
//! `ServiceConfig` is read from an optional `turnstile.toml` and then
//! overridden from `TURNSTILE_*` environment variables. All fields have
//! defaults so an empty file (or no file) is a valid configuration.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the Turnstile service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the OpenAI-compatible completion API.
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Bearer token for the upstream API. Never serialized.
    #[serde(default, skip_serializing)]
    pub upstream_api_key: Option<SecretString>,

    /// Model name sent upstream; omitted when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Display name of the assistant, used in prompts and label stripping.
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// Estimated-token budget for the history sent upstream.
    #[serde(default = "default_token_budget")]
    pub token_budget: u32,

    /// Maximum number of requests processed at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// How long finished requests stay pollable.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Period of the background cleanup sweep.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Total upstream attempts per call (first try plus retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for each later retry.
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,

    /// Wall-clock limit for a single upstream attempt.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// A title is regenerated every this many completed exchanges.
    #[serde(default = "default_title_interval")]
    pub title_interval: usize,
}

fn default_upstream_base_url() -> String {
    "http://127.0.0.1:5001/v1".to_string()
}

fn default_assistant_name() -> String {
    "Assistant".to_string()
}

fn default_token_budget() -> u32 {
    3072
}

fn default_max_concurrent() -> usize {
    3
}

fn default_retention_secs() -> u64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    6
}

fn default_initial_retry_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_title_interval() -> usize {
    5
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: default_upstream_base_url(),
            upstream_api_key: None,
            model: None,
            assistant_name: default_assistant_name(),
            token_budget: default_token_budget(),
            max_concurrent: default_max_concurrent(),
            retention_secs: default_retention_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            max_attempts: default_max_attempts(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            title_interval: default_title_interval(),
        }
    }
}

impl ServiceConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_service_config_default_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.retention_secs, 60);
        assert_eq!(config.cleanup_interval_secs, 60);
        assert_eq!(config.max_attempts, 6);
        assert_eq!(config.assistant_name, "Assistant");
        assert!(config.upstream_api_key.is_none());
    }

    #[test]
    fn test_service_config_deserialize_with_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.token_budget, 3072);
        assert_eq!(config.title_interval, 5);
    }

    #[test]
    fn test_service_config_deserialize_with_values() {
        let toml_str = r#"
upstream_base_url = "http://llm.internal:8000/v1"
upstream_api_key = "sk-test"
assistant_name = "Mira"
token_budget = 8000
max_concurrent = 5
"#;
        let config: ServiceConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.upstream_base_url, "http://llm.internal:8000/v1");
        assert_eq!(
            config.upstream_api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-test")
        );
        assert_eq!(config.assistant_name, "Mira");
        assert_eq!(config.token_budget, 8000);
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.retention_secs, 60);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ServiceConfig {
            upstream_api_key: Some(SecretString::from("sk-very-secret".to_string())),
            ..ServiceConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_serialize_skips_api_key() {
        let config = ServiceConfig {
            upstream_api_key: Some(SecretString::from("sk-very-secret".to_string())),
            ..ServiceConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-very-secret"));
    }

    #[test]
    fn test_duration_helpers() {
        let config = ServiceConfig::default();
        assert_eq!(config.retention(), Duration::from_secs(60));
        assert_eq!(config.initial_retry_delay(), Duration::from_millis(1000));
    }
}
