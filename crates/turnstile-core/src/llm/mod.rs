//! Upstream completion abstractions for Turnstile.
//!
//! - `CompletionBackend`: RPITIT trait for concrete backends
//! - `BoxCompletionBackend`: Object-safe wrapper for dynamic dispatch
//! - `UpstreamCaller`: retry, backoff and per-attempt timeout

pub mod box_provider;
pub mod provider;
pub mod retry;
