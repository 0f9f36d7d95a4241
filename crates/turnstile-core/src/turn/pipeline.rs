//! The per-item turn pipeline.
//!
//! Runs one admitted request end to end: dedup, disposition, pruning,
//! system prompt, reply, optional title, and the alternation check.

use turnstile_types::config::ServiceConfig;
use turnstile_types::error::{PipelineError, UpstreamError};
use turnstile_types::message::{ConversationState, Message};
use turnstile_types::queue::{Disposition, RequestKind, TurnRequest, TurnResult};

use super::processor::TurnProcessor;
use crate::history::disposition;
use crate::history::invariant::{check_alternation, dedup_by_id};
use crate::history::pruner::prune;
use crate::llm::retry::UpstreamCaller;
use crate::prompt::system_prompt::{fallback_system_prompt, synthesize};
use crate::prompt::template::{build_prompt, clean_reply, completion_request};
use crate::prompt::title::{title_due, title_or_fallback};

/// Knobs the pipeline reads from service configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub assistant_name: String,
    pub token_budget: usize,
    pub title_interval: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            assistant_name: config.assistant_name.clone(),
            token_budget: config.token_budget as usize,
            title_interval: config.title_interval,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

/// Production [`TurnProcessor`] backed by an [`UpstreamCaller`].
pub struct TurnPipeline {
    caller: UpstreamCaller,
    options: PipelineOptions,
}

impl TurnPipeline {
    pub fn new(caller: UpstreamCaller, options: PipelineOptions) -> Self {
        Self { caller, options }
    }

    #[tracing::instrument(
        name = "turn_pipeline",
        skip(self, request),
        fields(
            kind = ?request.kind,
            message_count = request.state.messages.len(),
        )
    )]
    pub async fn run(&self, request: TurnRequest) -> Result<TurnResult, PipelineError> {
        let TurnRequest {
            state,
            user_input,
            user_name,
            disposition,
            settings,
            kind,
            use_fallback_prompt,
        } = request;
        let assistant_name = self.options.assistant_name.as_str();

        let messages = dedup_by_id(state.messages);

        if kind == RequestKind::Title {
            disposition::validate(&messages, &disposition, &user_input, kind)
                .map_err(PipelineError::Validation)?;
            check_alternation(&messages).map_err(PipelineError::Invariant)?;
            let title =
                title_or_fallback(&self.caller, &messages, assistant_name, &user_name, &settings)
                    .await;
            return Ok(TurnResult {
                messages,
                system_prompt: state.system_prompt,
                title: Some(title),
            });
        }

        let applied = ConversationState {
            messages: disposition::apply(messages, &disposition, &user_input)
                .map_err(PipelineError::Validation)?,
            system_prompt: state.system_prompt,
        };
        // Counted before pruning; the reply completes one more exchange.
        let exchange = applied.exchange_count() + 1;

        let pruned = prune(
            applied.messages,
            &applied.system_prompt,
            self.options.token_budget,
        );
        let mut messages = pruned.messages;

        let prior_missing = applied.system_prompt.trim().is_empty();
        let system_prompt = if use_fallback_prompt
            || (disposition != Disposition::NewTurn && prior_missing)
        {
            tracing::debug!(requested = use_fallback_prompt, "using fallback system prompt");
            fallback_system_prompt(assistant_name, &user_name)
        } else {
            synthesize(&self.caller, &messages, assistant_name, &user_name, &settings).await?
        };

        let prompt = build_prompt(&system_prompt, &messages, &user_name);
        let raw = self
            .caller
            .complete(&completion_request(prompt, &settings))
            .await?;
        let reply = clean_reply(&raw, assistant_name);
        if reply.is_empty() {
            return Err(UpstreamError::EmptyReply.into());
        }
        messages.push(Message::assistant(reply));

        let title = if title_due(exchange, self.options.title_interval) {
            Some(
                title_or_fallback(&self.caller, &messages, assistant_name, &user_name, &settings)
                    .await,
            )
        } else {
            None
        };

        check_alternation(&messages).map_err(PipelineError::Invariant)?;

        tracing::debug!(
            pruned = pruned.removed,
            exchange,
            estimated_tokens = pruned.estimated_tokens,
            titled = title.is_some(),
            "turn complete"
        );

        Ok(TurnResult {
            messages,
            system_prompt,
            title,
        })
    }
}

impl TurnProcessor for TurnPipeline {
    async fn process(&self, request: TurnRequest) -> Result<TurnResult, PipelineError> {
        self.run(request).await
    }
}
