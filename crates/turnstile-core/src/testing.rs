//! Test doubles shared by the core test modules.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use turnstile_types::llm::{CompletionRequest, LlmError};

use crate::llm::provider::CompletionBackend;

/// Build a completion request with neutral sampling settings.
pub fn request(prompt: &str) -> CompletionRequest {
    CompletionRequest {
        prompt: prompt.to_string(),
        max_tokens: 64,
        temperature: 0.7,
        top_p: 0.9,
        top_k: 40,
        min_p: 0.05,
        repetition_penalty: 1.1,
        stop: vec![],
    }
}

/// Backend that replays a fixed script of results.
///
/// Once the script runs dry, `always` (if set) is returned forever; otherwise
/// every further call yields `LlmError::EmptyCompletion`.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    always: Option<Result<String, LlmError>>,
    latency: Mutex<VecDeque<Duration>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            always: None,
            latency: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always(result: Result<String, LlmError>) -> Self {
        Self {
            always: Some(result),
            ..Self::new(vec![])
        }
    }

    /// Per-call artificial latency, consumed in order.
    pub fn with_latency(self, latency: Vec<Duration>) -> Self {
        *self.latency.lock().unwrap() = latency.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        let delay = self.latency.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => self
                .always
                .clone()
                .unwrap_or(Err(LlmError::EmptyCompletion)),
        }
    }
}

/// Backend whose answer is computed from the request.
pub struct FnBackend<F> {
    respond: F,
    calls: AtomicUsize,
}

impl<F> FnBackend<F>
where
    F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> CompletionBackend for FnBackend<F>
where
    F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(request)
    }
}
