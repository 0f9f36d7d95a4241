//! History pruning against an estimated-token budget.
//!
//! Drops the oldest messages in fixed-size blocks until the estimate fits,
//! but never below a minimum number of retained messages. The budget is
//! soft: when it cannot be met, the smallest allowed history is returned
//! and the caller proceeds anyway.

use turnstile_types::message::Message;

use super::estimator::estimate;

/// Messages removed per pruning step.
pub const PRUNE_BLOCK: usize = 6;

/// Pruning never leaves fewer messages than this.
pub const MIN_RETAINED: usize = 6;

/// Result of a pruning pass.
#[derive(Debug, Clone)]
pub struct Pruned {
    pub messages: Vec<Message>,
    /// How many leading messages were dropped.
    pub removed: usize,
    /// Estimate for the returned history.
    pub estimated_tokens: usize,
}

/// Shrink `messages` until `estimate(messages, system_prompt) <= budget`
/// or only [`MIN_RETAINED`] messages remain.
#[tracing::instrument(skip(messages, system_prompt), fields(message_count = messages.len()))]
pub fn prune(messages: Vec<Message>, system_prompt: &str, budget: usize) -> Pruned {
    let mut messages = messages;
    let mut removed = 0;
    let mut estimated = estimate(&messages, system_prompt);

    while estimated > budget && messages.len() > MIN_RETAINED {
        let block = PRUNE_BLOCK.min(messages.len() - MIN_RETAINED);
        if block == 0 {
            break;
        }
        messages.drain(..block);
        removed += block;
        estimated = estimate(&messages, system_prompt);
    }

    if estimated > budget {
        tracing::warn!(
            estimated_tokens = estimated,
            budget,
            retained = messages.len(),
            "history still over budget after pruning; continuing"
        );
    } else if removed > 0 {
        tracing::debug!(removed, estimated_tokens = estimated, budget, "pruned history");
    }

    Pruned {
        messages,
        removed,
        estimated_tokens: estimated,
    }
}
