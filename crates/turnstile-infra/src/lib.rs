//! Infrastructure layer for Turnstile.
//!
//! Contains the HTTP implementation of the `CompletionBackend` trait defined
//! in `turnstile-core` and the configuration loader (TOML file plus
//! environment overrides).

pub mod config;
pub mod llm;
