//! CompletionBackend trait definition.
//!
//! The seam between the pipeline and whatever actually talks to the model.
//! Uses RPITIT for `complete`; [`super::box_provider::BoxCompletionBackend`]
//! provides the object-safe wrapper for runtime selection.

use std::sync::Arc;

use turnstile_types::llm::{CompletionRequest, LlmError};

/// A single-shot text completion endpoint.
///
/// Implementations perform exactly one attempt per call. Retries, backoff
/// and per-attempt timeouts live in [`super::retry::UpstreamCaller`].
///
/// Implementations live in turnstile-infra (e.g., `TextCompletionBackend`).
pub trait CompletionBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Send one completion request and return the generated text.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;
}

impl<T: CompletionBackend> CompletionBackend for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send {
        (**self).complete(request)
    }
}
