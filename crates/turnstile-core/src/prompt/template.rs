//! ChatML prompt rendering and reply cleanup.
//!
//! The upstream endpoint is a raw text-completion API, so the conversation is
//! flattened into a single ChatML document ending with an open assistant turn.

use turnstile_types::llm::CompletionRequest;
use turnstile_types::message::{Message, MessageRole};
use turnstile_types::settings::Settings;

pub const IM_START: &str = "<|im_start|>";
pub const IM_END: &str = "<|im_end|>";

/// Stop sequences sent with every generation request.
pub fn stop_sequences() -> Vec<String> {
    vec![IM_END.to_string(), IM_START.to_string()]
}

/// Append one `<|im_start|>role\ncontent<|im_end|>\n` block.
pub fn render_turn(out: &mut String, role: &str, content: &str) {
    out.push_str(IM_START);
    out.push_str(role);
    out.push('\n');
    out.push_str(content);
    out.push_str(IM_END);
    out.push('\n');
}

/// Render the generation prompt: system block, history, then an open
/// assistant turn for the model to complete.
///
/// User turns are prefixed with `user_name` when one is given.
pub fn build_prompt(system_prompt: &str, messages: &[Message], user_name: &str) -> String {
    let mut out = String::new();
    if !system_prompt.trim().is_empty() {
        render_turn(&mut out, "system", system_prompt.trim());
    }

    for message in messages {
        match message.role {
            MessageRole::User if !user_name.trim().is_empty() => {
                let content = format!("{}: {}", user_name.trim(), message.content);
                render_turn(&mut out, "user", &content);
            }
            role => render_turn(&mut out, &role.to_string(), &message.content),
        }
    }

    open_assistant_turn(&mut out);
    out
}

pub fn open_assistant_turn(out: &mut String) {
    out.push_str(IM_START);
    out.push_str("assistant\n");
}

/// Flatten messages into a plain `Name: content` transcript.
///
/// Each message is cut to `max_chars` characters.
pub fn transcript(
    messages: &[Message],
    user_name: &str,
    assistant_name: &str,
    max_chars: usize,
) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                MessageRole::User => non_empty_or(user_name, "User"),
                MessageRole::Assistant => non_empty_or(assistant_name, "Assistant"),
                MessageRole::System => "System",
            };
            let content: String = m.content.chars().take(max_chars).collect();
            format!("{speaker}: {}", content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() { default } else { trimmed }
}

/// Build a completion request from a rendered prompt and caller settings.
pub fn completion_request(prompt: String, settings: &Settings) -> CompletionRequest {
    CompletionRequest {
        prompt,
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
        top_p: settings.top_p,
        top_k: settings.top_k,
        min_p: settings.min_p,
        repetition_penalty: settings.repetition_penalty,
        stop: stop_sequences(),
    }
}

/// Cut generated text at the first ChatML marker and trim it.
///
/// Backends that ignore stop sequences may run on into the next turn, and a
/// truncated generation can end in a partial `<|` fragment.
pub fn strip_markers(raw: &str) -> &str {
    let end = raw.find("<|").unwrap_or(raw.len());
    raw[..end].trim()
}

/// Clean a generated reply: strip markers and a leading speaker label.
///
/// The label is matched case-insensitively (`Ava:`, `ava:`, `ASSISTANT:`).
pub fn clean_reply(raw: &str, assistant_name: &str) -> String {
    let mut text = strip_markers(raw);

    let name = assistant_name.trim();
    for label in [name, "assistant"] {
        if label.is_empty() {
            continue;
        }
        if let Some(rest) = strip_label(text, label) {
            text = rest.trim_start();
            break;
        }
    }

    text.to_string()
}

/// `text` after a leading `label:`, ignoring case.
fn strip_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let head = text.get(..label.len())?;
    if head.to_lowercase() != label.to_lowercase() {
        return None;
    }
    text[label.len()..].strip_prefix(':')
}
