//! Application state wiring all services together.
//!
//! The scheduler is generic over its turn processor, but AppState pins it to
//! the production pipeline.

use std::sync::Arc;

use turnstile_core::llm::box_provider::BoxCompletionBackend;
use turnstile_core::llm::retry::{RetryPolicy, UpstreamCaller};
use turnstile_core::queue::scheduler::{RequestScheduler, SchedulerOptions};
use turnstile_core::turn::pipeline::{PipelineOptions, TurnPipeline};
use turnstile_infra::llm::create_backend;
use turnstile_types::config::ServiceConfig;

/// Concrete scheduler type pinned to the production pipeline.
pub type ConcreteScheduler = RequestScheduler<TurnPipeline>;

/// Shared application state used by the REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<ConcreteScheduler>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Build the state with the configured HTTP completion backend.
    pub fn init(config: ServiceConfig) -> anyhow::Result<Self> {
        let backend = create_backend(&config)?;
        Ok(Self::with_backend(config, backend))
    }

    /// Build the state around an already constructed backend.
    pub fn with_backend(config: ServiceConfig, backend: BoxCompletionBackend) -> Self {
        let caller = UpstreamCaller::new(backend, RetryPolicy::from_config(&config));
        let pipeline = TurnPipeline::new(caller, PipelineOptions::from_config(&config));
        let scheduler = RequestScheduler::new(pipeline, SchedulerOptions::from_config(&config));

        Self {
            scheduler: Arc::new(scheduler),
            config: Arc::new(config),
        }
    }
}
