//! Applying a submission's disposition (new turn, edit, regeneration) to
//! the history before it is pruned and sent upstream.

use turnstile_types::message::{Message, MessageRole};
use turnstile_types::queue::{Disposition, RequestKind};

/// Check a submission before it is enqueued.
///
/// Returns a human-readable reason on rejection. The same rules are applied
/// again by [`apply`] inside the pipeline, so a submission that passes here
/// cannot fail there for these reasons.
pub fn validate(
    messages: &[Message],
    disposition: &Disposition,
    user_input: &str,
    kind: RequestKind,
) -> Result<(), String> {
    if kind == RequestKind::Title {
        if messages.is_empty() {
            return Err("cannot generate a title for an empty conversation".to_string());
        }
        return Ok(());
    }

    match disposition {
        Disposition::NewTurn => {
            if user_input.trim().is_empty() {
                return Err("userInput must not be empty".to_string());
            }
        }
        Disposition::Regenerate => match messages.last() {
            Some(last) if last.role == MessageRole::User => {}
            Some(last) => {
                return Err(format!(
                    "regeneration requires a trailing user message, found {}",
                    last.role
                ));
            }
            None => return Err("regeneration requires a non-empty conversation".to_string()),
        },
        Disposition::Edit { message_id } => {
            if user_input.trim().is_empty() {
                return Err("userInput must not be empty".to_string());
            }
            match messages.iter().find(|m| &m.id == message_id) {
                Some(m) if m.role == MessageRole::User => {}
                Some(m) => {
                    return Err(format!(
                        "only user messages can be edited; '{message_id}' is {}",
                        m.role
                    ));
                }
                None => return Err(format!("edited message '{message_id}' not found")),
            }
        }
    }
    Ok(())
}

/// Transform `messages` according to `disposition`.
///
/// - `NewTurn`: append the input as a user turn. If the trailing turn is an
///   unanswered user turn, its content is replaced instead (last write wins),
///   so a rapid re-submission never produces two user turns in a row.
/// - `Regenerate`: history is kept as-is; the trailing user turn is answered again.
/// - `Edit`: truncate after the edited turn and replace its content.
pub fn apply(
    mut messages: Vec<Message>,
    disposition: &Disposition,
    user_input: &str,
) -> Result<Vec<Message>, String> {
    validate(&messages, disposition, user_input, RequestKind::Turn)?;

    match disposition {
        Disposition::NewTurn => match messages.last_mut() {
            Some(last) if last.role == MessageRole::User => {
                tracing::debug!(message_id = %last.id, "replacing unanswered user turn");
                last.content = user_input.to_string();
            }
            _ => messages.push(Message::user(user_input)),
        },
        Disposition::Regenerate => {}
        Disposition::Edit { message_id } => {
            // validate() guarantees the id exists.
            if let Some(pos) = messages.iter().position(|m| &m.id == message_id) {
                messages.truncate(pos + 1);
                messages[pos].content = user_input.to_string();
            }
        }
    }

    Ok(messages)
}
