//! Application error type mapping to HTTP status codes.
//!
//! Every error body has the shape `{"error": "<message>"}`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use turnstile_types::error::QueueError;

/// Message returned for items that finished in the `error` state.
pub const PROCESSING_ERROR_MESSAGE: &str = "An error occurred while processing the request";

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or rejected submission.
    Validation(String),
    /// Unknown, expired, or missing resource.
    NotFound(&'static str),
    /// The request was processed and failed.
    Processing,
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Validation(msg) => AppError::Validation(msg),
            QueueError::NotFound => AppError::NotFound("Request not found"),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            AppError::Processing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                PROCESSING_ERROR_MESSAGE.to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
