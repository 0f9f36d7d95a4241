//! Prompt construction for the three generation calls a turn makes:
//! system prompt synthesis, the reply itself, and the conversation title.

pub mod system_prompt;
pub mod template;
pub mod title;
