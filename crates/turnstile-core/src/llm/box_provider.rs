//! BoxCompletionBackend -- object-safe dynamic dispatch wrapper for CompletionBackend.
//!
//! 1. Define an object-safe `CompletionBackendDyn` trait with boxed futures
//! 2. Blanket-impl `CompletionBackendDyn` for all `T: CompletionBackend`
//! 3. `BoxCompletionBackend` wraps `Box<dyn CompletionBackendDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use turnstile_types::llm::{CompletionRequest, LlmError};

use super::provider::CompletionBackend;

/// Object-safe version of [`CompletionBackend`] with boxed futures.
pub trait CompletionBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;
}

impl<T: CompletionBackend> CompletionBackendDyn for T {
    fn name(&self) -> &str {
        CompletionBackend::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }
}

/// Type-erased completion backend.
///
/// Since `CompletionBackend` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxCompletionBackend` provides the same methods over an inner
/// `CompletionBackendDyn` trait object.
pub struct BoxCompletionBackend {
    inner: Box<dyn CompletionBackendDyn + Send + Sync>,
}

impl BoxCompletionBackend {
    /// Wrap a concrete backend in a type-erased box.
    pub fn new<T: CompletionBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Send one completion request.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.inner.complete_boxed(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl CompletionBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            Ok(request.prompt.clone())
        }
    }

    #[tokio::test]
    async fn test_boxed_backend_delegates() {
        let backend = BoxCompletionBackend::new(Echo);
        assert_eq!(backend.name(), "echo");

        let request = CompletionRequest {
            prompt: "ping".to_string(),
            max_tokens: 8,
            temperature: 0.0,
            top_p: 1.0,
            top_k: 0,
            min_p: 0.0,
            repetition_penalty: 1.0,
            stop: vec![],
        };
        assert_eq!(backend.complete(&request).await.unwrap(), "ping");
    }
}
