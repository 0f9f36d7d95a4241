use thiserror::Error;

use crate::llm::LlmError;

/// The upstream endpoint could not produce a completion.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("upstream completion failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: LlmError,
    },

    /// The model answered, but nothing usable was left after cleanup.
    #[error("upstream returned an empty reply")]
    EmptyReply,
}

/// Errors surfaced synchronously by scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The submission was malformed and was never enqueued.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// Unknown, expired, or (for cancel) no longer pending.
    #[error("request not found")]
    NotFound,
}

/// Errors that end a pipeline run; stored as the item's terminal error.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Role alternation broke; indicates a defect in disposition handling.
    #[error("conversation invariant violated: {0}")]
    Invariant(String),
}
