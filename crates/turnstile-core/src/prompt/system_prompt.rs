//! System prompt synthesis.
//!
//! Before each reply the model is asked to write its own system prompt from
//! the recent conversation. When synthesis is skipped (fallback requested, or
//! a regenerate/edit arrives with no prior prompt) a fixed prompt is used.

use turnstile_types::error::UpstreamError;
use turnstile_types::message::Message;
use turnstile_types::settings::Settings;

use super::template::{
    completion_request, open_assistant_turn, render_turn, strip_markers, transcript,
};
use crate::llm::retry::UpstreamCaller;

/// Ceiling on tokens generated for a synthesized system prompt.
pub const SYSTEM_PROMPT_MAX_TOKENS: u32 = 1024;

/// Per-message character cap inside the synthesis transcript.
const TRANSCRIPT_CHARS: usize = 1_000;

const SYNTHESIS_INSTRUCTIONS: &str = r#"You are writing the system prompt for {assistant}, who is chatting with {user}.
Read the conversation and write a short system prompt, addressed to {assistant} in the second person, that covers:
1. Who {assistant} is and how they speak
2. What {user} cares about in this conversation
3. Any facts or commitments that must be remembered

Return ONLY the system prompt text, nothing else."#;

const FALLBACK_TEMPLATE: &str = "You are {assistant}, a warm and attentive conversational partner chatting with {user}. \
Reply naturally and concisely, stay consistent with everything said so far, and never speak for {user}.";

fn fill(template: &str, assistant_name: &str, user_name: &str) -> String {
    let user = if user_name.trim().is_empty() {
        "the user"
    } else {
        user_name.trim()
    };
    template
        .replace("{assistant}", assistant_name.trim())
        .replace("{user}", user)
}

/// Fixed system prompt used when synthesis is skipped.
pub fn fallback_system_prompt(assistant_name: &str, user_name: &str) -> String {
    fill(FALLBACK_TEMPLATE, assistant_name, user_name)
}

/// Render the synthesis prompt for `messages`.
pub fn synthesis_prompt(messages: &[Message], assistant_name: &str, user_name: &str) -> String {
    let mut out = String::new();
    render_turn(
        &mut out,
        "system",
        &fill(SYNTHESIS_INSTRUCTIONS, assistant_name, user_name),
    );
    let conversation = transcript(messages, user_name, assistant_name, TRANSCRIPT_CHARS);
    render_turn(
        &mut out,
        "user",
        &format!("<conversation>\n{conversation}\n</conversation>"),
    );
    open_assistant_turn(&mut out);
    out
}

/// Ask the model for a fresh system prompt.
///
/// The caller's sampling settings are reused with `max_tokens` clamped to
/// [`SYSTEM_PROMPT_MAX_TOKENS`]. A reply that is empty after cleanup is an
/// error.
#[tracing::instrument(
    name = "synthesize_system_prompt",
    skip(caller, messages, settings),
    fields(message_count = messages.len())
)]
pub async fn synthesize(
    caller: &UpstreamCaller,
    messages: &[Message],
    assistant_name: &str,
    user_name: &str,
    settings: &Settings,
) -> Result<String, UpstreamError> {
    let prompt = synthesis_prompt(messages, assistant_name, user_name);
    let request = completion_request(
        prompt,
        &settings.with_max_tokens_clamped(SYSTEM_PROMPT_MAX_TOKENS),
    );

    let raw = caller.complete(&request).await?;
    let cleaned = strip_markers(&raw);
    if cleaned.is_empty() {
        return Err(UpstreamError::EmptyReply);
    }
    Ok(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::box_provider::BoxCompletionBackend;
    use crate::llm::retry::RetryPolicy;
    use crate::testing::ScriptedBackend;
    use std::sync::Arc;
    use std::time::Duration;

    fn caller(backend: Arc<ScriptedBackend>) -> UpstreamCaller {
        UpstreamCaller::new(
            BoxCompletionBackend::new(backend),
            RetryPolicy {
                max_attempts: 1,
                initial_delay: Duration::from_millis(1),
                attempt_timeout: Duration::from_secs(1),
            },
        )
    }

    #[test]
    fn test_fallback_prompt_names_both_parties() {
        let prompt = fallback_system_prompt("Ava", "Sam");
        assert!(prompt.starts_with("You are Ava"));
        assert!(prompt.contains("Sam"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_fallback_prompt_without_user_name() {
        let prompt = fallback_system_prompt("Ava", " ");
        assert!(prompt.contains("the user"));
    }

    #[test]
    fn test_synthesis_prompt_embeds_transcript() {
        let messages = vec![Message::user("I like tea"), Message::assistant("Noted!")];
        let prompt = synthesis_prompt(&messages, "Ava", "Sam");
        assert!(prompt.starts_with("<|im_start|>system\n"));
        assert!(prompt.contains("Sam: I like tea\nAva: Noted!"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[tokio::test]
    async fn test_synthesize_clamps_tokens_and_cleans() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            "  You are Ava.<|im_end|>junk".to_string()
        )]));
        let settings = Settings {
            max_tokens: 4096,
            ..Settings::default()
        };

        let prompt = synthesize(&caller(backend.clone()), &[Message::user("hi")], "Ava", "Sam", &settings)
            .await
            .unwrap();
        assert_eq!(prompt, "You are Ava.");
        assert_eq!(backend.requests()[0].max_tokens, SYSTEM_PROMPT_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_synthesize_empty_reply_is_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("<|im_end|>".to_string())]));
        let err = synthesize(&caller(backend), &[Message::user("hi")], "Ava", "Sam", &Settings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyReply));
    }
}
