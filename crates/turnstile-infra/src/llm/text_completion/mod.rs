//! Text-completion backend for OpenAI-compatible servers.
//!
//! This module provides the [`TextCompletionBackend`] which implements the
//! [`CompletionBackend`](turnstile_core::llm::provider::CompletionBackend)
//! trait against a `/completions` endpoint (llama.cpp, vLLM, KoboldCpp and
//! similar local or hosted servers).

pub mod client;
pub mod types;

pub use client::TextCompletionBackend;
