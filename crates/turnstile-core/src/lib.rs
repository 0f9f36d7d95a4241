//! Business logic for Turnstile.
//!
//! Token estimation, history pruning, prompt construction, the retrying
//! upstream caller, the turn pipeline and the request scheduler. Depends only
//! on `turnstile-types`; the HTTP backend and configuration loading live in
//! `turnstile-infra`.

pub mod history;
pub mod llm;
pub mod prompt;
pub mod queue;
pub mod turn;

#[cfg(test)]
mod testing;
