//! Request queue HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/queue                   - Submit a turn request
//! - GET    /api/v1/queue?requestId={id}    - Poll a request
//! - DELETE /api/v1/queue/{id}              - Cancel a request that has not started
//! - GET    /api/v1/queue/stats             - Queue counters

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use turnstile_types::message::ConversationState;
use turnstile_types::queue::{
    Disposition, ItemOutcome, QueueStatus, RequestKind, TurnRequest, TurnResult,
};
use turnstile_types::settings::Settings;

use crate::http::error::AppError;
use crate::state::AppState;

/// Body of `POST /api/v1/queue`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub chat_state: ConversationState,
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub is_regeneration: bool,
    #[serde(default)]
    pub edited_message_id: Option<String>,
    #[serde(default)]
    pub user_settings: Settings,
    #[serde(default)]
    pub kind: RequestKind,
    #[serde(default)]
    pub use_fallback_prompt: bool,
}

impl SubmitBody {
    fn into_request(self) -> Result<TurnRequest, AppError> {
        let edited = self.edited_message_id.filter(|id| !id.trim().is_empty());
        let disposition = match (self.is_regeneration, edited) {
            (true, Some(_)) => {
                return Err(AppError::Validation(
                    "isRegeneration and editedMessageId are mutually exclusive".to_string(),
                ));
            }
            (true, None) => Disposition::Regenerate,
            (false, Some(message_id)) => Disposition::Edit { message_id },
            (false, None) => Disposition::NewTurn,
        };

        Ok(TurnRequest {
            state: self.chat_state,
            user_input: self.user_input,
            user_name: self.user_name,
            disposition,
            settings: self.user_settings,
            kind: self.kind,
            use_fallback_prompt: self.use_fallback_prompt,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub request_id: Uuid,
    pub queue_position: usize,
    pub total_queue_length: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollQuery {
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub status: QueueStatus,
    pub queue_position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TurnResult>,
    pub total_queue_length: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub queued: usize,
    pub processing: usize,
    pub retained: usize,
    pub max_concurrent: usize,
}

/// POST /api/v1/queue - Submit a turn request.
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let Json(body) = payload?;
    let request = body.into_request()?;

    let receipt = state.scheduler.submit(request)?;
    let total_queue_length = state.scheduler.stats().queued.max(receipt.position);

    Ok(Json(SubmitResponse {
        request_id: receipt.id,
        queue_position: receipt.position,
        total_queue_length,
    }))
}

/// GET /api/v1/queue?requestId={id} - Poll a request.
pub async fn poll(
    State(state): State<AppState>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollResponse>, AppError> {
    let raw = query
        .request_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("requestId is required".to_string()))?;
    // Ids are opaque: a malformed id is just an unknown one.
    let id: Uuid = raw
        .trim()
        .parse()
        .map_err(|_| AppError::NotFound("Request not found"))?;

    let snapshot = state.scheduler.snapshot(id)?;
    match snapshot.status {
        QueueStatus::Queued | QueueStatus::Processing => Ok(Json(PollResponse {
            status: snapshot.status,
            queue_position: snapshot.position,
            result: None,
            total_queue_length: snapshot.queue_length,
        })),
        QueueStatus::Completed => match snapshot.outcome {
            Some(ItemOutcome::Completed(result)) => Ok(Json(PollResponse {
                status: QueueStatus::Completed,
                queue_position: 0,
                result: Some(result),
                total_queue_length: snapshot.queue_length,
            })),
            _ => Err(AppError::NotFound("Result not found")),
        },
        QueueStatus::Error => {
            if let Some(ItemOutcome::Failed(reason)) = &snapshot.outcome {
                tracing::debug!(request_id = %id, reason = %reason, "reporting failed request");
            }
            Err(AppError::Processing)
        }
    }
}

/// DELETE /api/v1/queue/{id} - Cancel a request that has not been admitted.
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| AppError::NotFound("Request not found"))?;
    state.scheduler.cancel(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/queue/stats - Queue counters.
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.scheduler.stats();
    Json(StatsResponse {
        queued: stats.queued,
        processing: stats.processing,
        retained: stats.retained,
        max_concurrent: stats.max_concurrent,
    })
}
