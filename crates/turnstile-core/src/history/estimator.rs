//! Approximate token counting for conversation histories.
//!
//! This is a heuristic, not a tokenizer: it counts lower-cased words
//! (runs of Unicode letters, digits and apostrophes), adds a fixed
//! framing overhead per message, then pads the total by 10%.

use std::sync::LazyLock;

use regex::Regex;
use turnstile_types::message::Message;

/// Structural overhead charged per message (role marker, separators).
pub const PER_MESSAGE_OVERHEAD: usize = 4;

/// Safety margin applied to the raw count, as a percentage.
const SAFETY_MARGIN_PERCENT: usize = 10;

static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}']+").expect("word pattern is a valid regex")
});

/// Number of word tokens in `text`.
pub fn count_words(text: &str) -> usize {
    WORD.find_iter(&text.to_lowercase()).count()
}

/// Estimate the token cost of sending `messages` under `system_prompt`.
///
/// The system prompt is charged like one more message. The result is
/// deterministic and never fails.
pub fn estimate(messages: &[Message], system_prompt: &str) -> usize {
    let system = if system_prompt.is_empty() {
        0
    } else {
        count_words(system_prompt) + PER_MESSAGE_OVERHEAD
    };

    let raw: usize = system
        + messages
            .iter()
            .map(|m| count_words(&m.content) + PER_MESSAGE_OVERHEAD)
            .sum::<usize>();

    with_margin(raw)
}

/// `raw * 1.1`, rounded up, in integer arithmetic.
fn with_margin(raw: usize) -> usize {
    (raw * (100 + SAFETY_MARGIN_PERCENT)).div_ceil(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_words_basic() {
        assert_eq!(count_words("Hello, world!"), 2);
        assert_eq!(count_words("don't stop"), 2);
        assert_eq!(count_words("   "), 0);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_count_words_unicode_and_digits() {
        assert_eq!(count_words("café 42 naïve"), 3);
        assert_eq!(count_words("Привет мир"), 2);
        assert_eq!(count_words("a-b_c"), 3);
    }

    #[test]
    fn test_empty_history_and_prompt_is_zero() {
        assert_eq!(estimate(&[], ""), 0);
    }

    #[test]
    fn test_overhead_and_margin() {
        // 2 words + 4 overhead = 6 raw; 6 * 1.1 = 6.6 -> 7
        let messages = vec![Message::user("hello there")];
        assert_eq!(estimate(&messages, ""), 7);

        // system: 3 words + 4 = 7; message: 6 -> 13 raw; 14.3 -> 15
        assert_eq!(estimate(&messages, "you are helpful"), 15);
    }

    #[test]
    fn test_margin_rounds_up() {
        assert_eq!(with_margin(10), 11);
        assert_eq!(with_margin(1), 2);
        assert_eq!(with_margin(0), 0);
        assert_eq!(with_margin(20), 22);
    }

    #[test]
    fn test_case_does_not_change_count() {
        let upper = vec![Message::user("HELLO WORLD")];
        let lower = vec![Message::user("hello world")];
        assert_eq!(estimate(&upper, ""), estimate(&lower, ""));
    }

    #[test]
    fn test_monotonic_in_messages() {
        let mut messages = vec![Message::user("one two three")];
        let before = estimate(&messages, "sys");
        messages.push(Message::assistant("four"));
        assert!(estimate(&messages, "sys") > before);
    }
}
