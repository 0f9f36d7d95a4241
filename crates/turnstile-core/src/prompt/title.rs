//! Conversation title generation.
//!
//! Titles are short (three words at most) and regenerated periodically as
//! the conversation drifts. If the model cannot produce one, a dated
//! placeholder is used so the item never fails because of its title.

use chrono::NaiveDate;
use turnstile_types::error::UpstreamError;
use turnstile_types::message::Message;
use turnstile_types::settings::Settings;

use super::template::{completion_request, open_assistant_turn, render_turn, transcript};
use crate::llm::retry::UpstreamCaller;

const TITLE_SYSTEM_PROMPT: &str = r#"Generate a title of at most three words for this conversation. The title should capture the main topic. Return ONLY the title text, nothing else.

Examples:
- "Weekend Tokyo Trip"
- "Rust Lifetimes"
- "Dinner Party Recipes""#;

/// Maximum words kept from a generated title.
pub const TITLE_MAX_WORDS: usize = 3;

/// Tokens requested for a title; a few words never need more.
const TITLE_MAX_TOKENS: u32 = 16;

/// How many trailing messages the title is based on.
const TITLE_CONTEXT_MESSAGES: usize = 6;

const TITLE_TRANSCRIPT_CHARS: usize = 300;

/// Whether a title should be (re)generated after `exchange_count` exchanges.
///
/// True on the first exchange and every `interval` exchanges after that.
pub fn title_due(exchange_count: usize, interval: usize) -> bool {
    exchange_count == 1 || (interval > 0 && exchange_count > 0 && exchange_count % interval == 0)
}

/// Placeholder title for `date`.
pub fn fallback_title(date: NaiveDate) -> String {
    format!("Chat {}", date.format("%Y-%m-%d"))
}

/// Normalize a generated title: trim quotes and trailing punctuation, keep
/// at most [`TITLE_MAX_WORDS`] words. Returns `None` when nothing is left.
pub fn clean_title(raw: &str) -> Option<String> {
    let first_line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let unquoted = first_line
        .trim_start_matches("Title:")
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*')
        .trim();

    let title = unquoted
        .split_whitespace()
        .take(TITLE_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    let title = title.trim_end_matches(['.', '!', '?', ',', ':', ';', '"', '\'']);

    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Ask the model for a title based on the tail of `messages`.
#[tracing::instrument(
    name = "generate_title",
    skip(caller, messages, settings),
    fields(message_count = messages.len())
)]
pub async fn generate_title(
    caller: &UpstreamCaller,
    messages: &[Message],
    assistant_name: &str,
    user_name: &str,
    settings: &Settings,
) -> Result<String, UpstreamError> {
    let tail = &messages[messages.len().saturating_sub(TITLE_CONTEXT_MESSAGES)..];
    let conversation = transcript(tail, user_name, assistant_name, TITLE_TRANSCRIPT_CHARS);

    let mut prompt = String::new();
    render_turn(&mut prompt, "system", TITLE_SYSTEM_PROMPT);
    render_turn(
        &mut prompt,
        "user",
        &format!("<conversation>\n{conversation}\n</conversation>\nTitle this conversation."),
    );
    open_assistant_turn(&mut prompt);

    let title_settings = Settings {
        temperature: 0.3,
        max_tokens: TITLE_MAX_TOKENS,
        ..settings.clone()
    };
    let raw = caller
        .complete(&completion_request(prompt, &title_settings))
        .await?;

    clean_title(super::template::strip_markers(&raw)).ok_or(UpstreamError::EmptyReply)
}

/// [`generate_title`], falling back to a dated placeholder on any failure.
pub async fn title_or_fallback(
    caller: &UpstreamCaller,
    messages: &[Message],
    assistant_name: &str,
    user_name: &str,
    settings: &Settings,
) -> String {
    match generate_title(caller, messages, assistant_name, user_name, settings).await {
        Ok(title) => title,
        Err(e) => {
            tracing::warn!(error = %e, "title generation failed, using dated title");
            fallback_title(chrono::Local::now().date_naive())
        }
    }
}
