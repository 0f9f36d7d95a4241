//! Conversation message types for Turnstile.
//!
//! A conversation is an ordered list of [`Message`]s plus the system prompt
//! currently steering the assistant. Clients own the canonical copy; the
//! scheduler only ever works on a value copy and hands back a new state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn in a conversation.
///
/// `id` is opaque to the server. Client-created turns carry whatever id the
/// client assigned; turns created by the pipeline get a UUID v7 string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    /// Create a user turn with a fresh id.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn with a fresh id.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Messages plus the system prompt in effect for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub system_prompt: String,
}

impl ConversationState {
    /// Number of completed user/assistant exchanges (assistant turns).
    pub fn exchange_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count()
    }
}
