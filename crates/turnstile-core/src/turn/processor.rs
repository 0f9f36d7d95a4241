//! TurnProcessor trait definition.
//!
//! The seam between the scheduler and the work it runs for each admitted
//! item. [`super::pipeline::TurnPipeline`] is the production implementation;
//! scheduler tests substitute gated or failing processors.

use turnstile_types::error::PipelineError;
use turnstile_types::queue::{TurnRequest, TurnResult};

/// Turns one submitted request into a result.
pub trait TurnProcessor: Send + Sync + 'static {
    fn process(
        &self,
        request: TurnRequest,
    ) -> impl std::future::Future<Output = Result<TurnResult, PipelineError>> + Send;
}
