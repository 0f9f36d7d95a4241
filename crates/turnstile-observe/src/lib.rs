//! Observability setup for Turnstile: tracing subscriber with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
