//! Upstream caller with per-attempt timeout and exponential backoff.
//!
//! Every failure (transport error, non-success status, timeout, empty or
//! malformed body) is retried until the attempt ceiling is reached. The
//! delay before retry `n` is `initial_delay * 2^(n-1)`.

use std::time::Duration;

use turnstile_types::config::ServiceConfig;
use turnstile_types::error::UpstreamError;
use turnstile_types::llm::{CompletionRequest, LlmError};

use super::box_provider::BoxCompletionBackend;

/// Longest single backoff delay, regardless of attempt number.
const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Attempt ceiling and timing for upstream calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Wall-clock limit for one attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_retry_delay(),
            attempt_timeout: config.request_timeout(),
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }
}

/// Issues completion requests against a backend, retrying on failure.
///
/// Stateless across invocations; safe to share between pipelines.
pub struct UpstreamCaller {
    backend: BoxCompletionBackend,
    policy: RetryPolicy,
}

impl UpstreamCaller {
    pub fn new(backend: BoxCompletionBackend, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Run `request` until it succeeds or the attempt ceiling is reached.
    ///
    /// On exhaustion, returns [`UpstreamError::Exhausted`] wrapping the last
    /// attempt's error.
    #[tracing::instrument(
        name = "upstream_complete",
        skip(self, request),
        fields(
            backend = %self.backend.name(),
            max_tokens = request.max_tokens,
            prompt_chars = request.prompt.len(),
        )
    )]
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let last_error = match self.attempt(request).await {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "upstream call succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(e) => e,
            };

            if attempt >= max_attempts {
                tracing::error!(attempts = attempt, error = %last_error, "upstream retries exhausted");
                return Err(UpstreamError::Exhausted {
                    attempts: attempt,
                    source: last_error,
                });
            }

            let delay = self.policy.delay_before_retry(attempt);
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "upstream call failed, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One bounded attempt.
    async fn attempt(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let timeout = self.policy.attempt_timeout;
        match tokio::time::timeout(timeout, self.backend.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
