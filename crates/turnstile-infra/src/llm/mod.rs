//! Completion backend implementations.
//!
//! Contains concrete implementations of the [`CompletionBackend`] trait
//! defined in `turnstile-core`, and a factory ([`create_backend`]) that
//! builds the configured backend.
//!
//! [`CompletionBackend`]: turnstile_core::llm::provider::CompletionBackend

pub mod text_completion;

use turnstile_core::llm::box_provider::BoxCompletionBackend;
use turnstile_types::config::ServiceConfig;
use turnstile_types::llm::LlmError;

use self::text_completion::TextCompletionBackend;

/// Create a [`BoxCompletionBackend`] from service configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn create_backend(config: &ServiceConfig) -> Result<BoxCompletionBackend, LlmError> {
    let backend = TextCompletionBackend::from_config(config)?;
    tracing::info!(
        base_url = backend.base_url(),
        authenticated = config.upstream_api_key.is_some(),
        "completion backend configured"
    );
    Ok(BoxCompletionBackend::new(backend))
}
