//! Request queue types: submissions, lifecycle status, and results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{ConversationState, Message};
use crate::settings::Settings;

/// Lifecycle status of a queued request.
///
/// Transitions only forward: `queued -> processing -> completed | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

/// What a submission asks the pipeline to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// A normal conversation turn: reply (and maybe a title).
    #[default]
    Turn,
    /// Only (re)generate the conversation title.
    Title,
}

/// How a submission transforms the history before generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Disposition {
    /// Append the user input as a new turn.
    NewTurn,
    /// Produce a fresh reply to the trailing user turn.
    Regenerate,
    /// Replace the content of an earlier user turn and drop everything after it.
    Edit { message_id: String },
}

/// Everything the pipeline needs for one request, captured at submission.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub state: ConversationState,
    pub user_input: String,
    pub user_name: String,
    pub disposition: Disposition,
    pub settings: Settings,
    pub kind: RequestKind,
    pub use_fallback_prompt: bool,
}

/// Successful pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub messages: Vec<Message>,
    pub system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Returned by a successful submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    pub id: Uuid,
    /// 1-based position in the pending list at submission time.
    pub position: usize,
}

/// Terminal outcome stored for a finished item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Completed(TurnResult),
    Failed(String),
}

/// Point-in-time view of one request, as seen by a poller.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub id: Uuid,
    pub status: QueueStatus,
    /// 1-based pending position; 0 once admitted.
    pub position: usize,
    /// Items currently waiting for admission.
    pub queue_length: usize,
    pub outcome: Option<ItemOutcome>,
}

/// Aggregate counters across the scheduler's collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub queued: usize,
    pub processing: usize,
    pub retained: usize,
    pub max_concurrent: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value([
            QueueStatus::Queued,
            QueueStatus::Processing,
            QueueStatus::Completed,
            QueueStatus::Error,
        ])
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!(["queued", "processing", "completed", "error"])
        );
    }

    #[test]
    fn test_kind_serde() {
        let kind: RequestKind = serde_json::from_str("\"title\"").unwrap();
        assert_eq!(kind, RequestKind::Title);
        assert_eq!(RequestKind::default(), RequestKind::Turn);
    }

    #[test]
    fn test_turn_result_omits_missing_title() {
        let result = TurnResult {
            messages: vec![],
            system_prompt: "sp".to_string(),
            title: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("title").is_none());
        assert_eq!(json["systemPrompt"], "sp");
    }
}
