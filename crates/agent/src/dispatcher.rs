//! Step Dispatcher: routes each plan step to its handler.
//!
//! | Tag | Handler |
//! |-----|---------|
//! | `[API]` | retrieve API docs, run the synthesis loop, keep a truthy batch |
//! | `[Search]` | web search with the previous result as context |
//! | `[Summarization]` | summarize every result so far, remember the answer |
//! | `[Clarification]` | announce and hand the instruction back |
//!
//! Each handler returns the step's output. Only API, search and
//! summarization steps append to the context's result list.

use std::sync::Arc;
use stepwise_core::{Error, KnowledgeRetriever, ProgressChannel, Step, StepTag, TaskResult, WebSearch};
use stepwise_tools::OPENAPI_COLLECTION;
use tracing::{debug, info, warn};
use crate::context::ExecutionContext;
use crate::summarizer::Summarizer;
use crate::synthesis_loop::SynthesisLoop;

/// Output of an API step whose synthesis never produced a batch.
pub const NO_API_RESPONSE: &str = "No API response received";

pub struct StepDispatcher {
    retriever: Arc<dyn KnowledgeRetriever>,
    synthesis: SynthesisLoop,
    search: Arc<dyn WebSearch>,
    summarizer: Summarizer,
    search_context_chars: usize,
}

impl StepDispatcher {
    pub fn new(
        retriever: Arc<dyn KnowledgeRetriever>,
        synthesis: SynthesisLoop,
        search: Arc<dyn WebSearch>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            retriever,
            synthesis,
            search,
            summarizer,
            search_context_chars: 10_000,
        }
    }

    /// How many characters of the previous result a search step receives.
    pub fn with_search_context_chars(mut self, chars: usize) -> Self {
        self.search_context_chars = chars;
        self
    }

    /// Run one step. Returns `None` for steps without a recognised tag.
    pub async fn dispatch(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Option<TaskResult>, Error> {
        let output = match step.tag {
            StepTag::Api => self.api(step, ctx).await?,
            StepTag::Search => self.web_search(step, ctx).await?,
            StepTag::Summarization => self.summarization(step, ctx).await?,
            StepTag::Clarification => self.clarification(step, ctx).await,
            StepTag::Unidentified => {
                debug!(step = step.index, instruction = %step.instruction, "Unidentified task");
                return Ok(None);
            }
        };
        Ok(Some(output))
    }

    async fn api(&self, step: &Step, ctx: &mut ExecutionContext<'_>) -> Result<TaskResult, Error> {
        ctx.progress
            .announce(ProgressChannel::Api, "Fetching data via API")
            .await;

        let docs = self
            .retriever
            .retrieve(&step.instruction, OPENAPI_COLLECTION)
            .await?;
        let api_docs = docs
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        debug!(step = step.index, documents = docs.len(), "Retrieved API documentation");

        let prior_context = ctx
            .previous(step.index)
            .map(ToString::to_string)
            .unwrap_or_default();

        let Some(batch) = self
            .synthesis
            .synthesize_and_execute(&api_docs, &step.instruction, &prior_context, &ctx.role)
            .await
        else {
            warn!(step = step.index, "API step produced no invocation result");
            // The fallback is the step output only. It is not appended as a
            // result, so later steps never see it as API data.
            return Ok(TaskResult::Text(NO_API_RESPONSE.to_string()));
        };

        if !batch.urls.is_empty() {
            ctx.progress
                .stream(&format!(
                    "Executed {} with response size of {} tokens",
                    batch.urls.join(", "),
                    batch.approx_tokens()
                ))
                .await;
        }
        info!(step = step.index, urls = ?batch.urls, "API step executed");

        if batch.first_is_truthy() {
            ctx.push_result(TaskResult::Api(batch.clone()));
        } else {
            warn!(step = step.index, "API result is empty, not kept");
        }
        Ok(TaskResult::Api(batch))
    }

    async fn web_search(&self, step: &Step, ctx: &mut ExecutionContext<'_>) -> Result<TaskResult, Error> {
        ctx.progress
            .announce(ProgressChannel::Search, "Searching the internet with the Search agent")
            .await;

        let context: String = ctx
            .previous(step.index)
            .map(|r| r.to_string().chars().take(self.search_context_chars).collect())
            .unwrap_or_default();
        info!(step = step.index, context_chars = context.chars().count(), "Running search step");

        let answer = self.search.search(&step.instruction, &context).await?;
        ctx.progress
            .announce(
                ProgressChannel::Search,
                &format!(
                    "Results from the Search agent.\n\nquery:\n{}\n\nResponse:\n{answer}",
                    step.instruction
                ),
            )
            .await;

        ctx.push_result(TaskResult::Text(answer.clone()));
        Ok(TaskResult::Text(answer))
    }

    async fn summarization(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<TaskResult, Error> {
        ctx.progress
            .announce(ProgressChannel::Summarization, "Summarizing the collected results")
            .await;

        let instruction = format!(
            "You are creating response for a user with {} privileges. Now do {}",
            ctx.role, step.instruction
        );
        let object = ctx.render_results();
        info!(step = step.index, results = ctx.results().len(), "Running summarization step");

        let response = self.summarizer.summarize(&object, &instruction, &ctx.role).await?;
        if !response.is_empty() {
            ctx.memory.save_context(&step.instruction, &response);
            ctx.push_result(TaskResult::Text(response.clone()));
        }
        Ok(TaskResult::Text(response))
    }

    async fn clarification(&self, step: &Step, ctx: &mut ExecutionContext<'_>) -> TaskResult {
        info!(step = step.index, "Clarification requested");
        ctx.progress
            .announce(
                ProgressChannel::Clarification,
                "I need to get clarification before I go ahead...",
            )
            .await;
        TaskResult::Text(step.instruction.clone())
    }
}
