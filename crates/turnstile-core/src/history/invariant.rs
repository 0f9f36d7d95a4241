//! Structural checks on a message list.

use std::collections::HashSet;

use turnstile_types::message::Message;

/// Drop messages whose id was already seen, keeping the first occurrence.
pub fn dedup_by_id(messages: Vec<Message>) -> Vec<Message> {
    let before = messages.len();
    let mut seen = HashSet::with_capacity(before);
    let out: Vec<Message> = messages
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect();

    if out.len() != before {
        tracing::debug!(dropped = before - out.len(), "removed duplicate messages");
    }
    out
}

/// Verify that no two adjacent messages share a role.
pub fn check_alternation(messages: &[Message]) -> Result<(), String> {
    for (i, pair) in messages.windows(2).enumerate() {
        if pair[0].role == pair[1].role {
            return Err(format!(
                "messages {} and {} are both {} turns",
                i,
                i + 1,
                pair[0].role
            ));
        }
    }
    Ok(())
}
