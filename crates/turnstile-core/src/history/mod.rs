//! Conversation history handling: token estimation, pruning, disposition
//! and structural invariants.

pub mod disposition;
pub mod estimator;
pub mod invariant;
pub mod pruner;
