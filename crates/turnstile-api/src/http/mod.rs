//! HTTP/REST API layer for Turnstile.
//!
//! Axum-based REST API at `/api/v1/` with CORS support and a JSON
//! `{"error": ...}` body on failures.

pub mod error;
pub mod handlers;
pub mod router;
