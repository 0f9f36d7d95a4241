//! Shared domain types for Turnstile.
//!
//! This crate contains the types passed between the scheduler, the turn
//! pipeline, the upstream backend and the HTTP layer: messages, settings,
//! queue lifecycle types, configuration, and their error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, thiserror, secrecy.

pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod queue;
pub mod settings;
