//! Summarizer: answers the user from collected step results, behind a
//! token-budget gate.

use std::sync::Arc;
use std::time::Instant;
use stepwise_core::error::ProviderError;
use stepwise_core::{TokenCounter, UserRole};
use stepwise_providers::{CompletionClient, CompletionOptions};
use tracing::{info, warn};
use crate::prompts;

pub struct Summarizer {
    client: CompletionClient,
    counter: Arc<dyn TokenCounter>,
    token_ceiling: usize,
    max_tokens: u32,
}

impl Summarizer {
    pub fn new(client: CompletionClient, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            client,
            counter,
            token_ceiling: 128_000,
            max_tokens: 4096,
        }
    }

    /// Prompts counted at or above this many tokens are never sent.
    pub fn with_token_ceiling(mut self, ceiling: usize) -> Self {
        self.token_ceiling = ceiling;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Summarize `object` according to `instruction`.
    ///
    /// Returns [`prompts::TOO_MANY_TOKENS`] without calling the model when
    /// the prompt is over budget.
    pub async fn summarize(
        &self,
        object: &str,
        instruction: &str,
        role: &UserRole,
    ) -> Result<String, ProviderError> {
        let prompt = prompts::render(
            prompts::SUMMARIZER,
            &[("object", object), ("transformation_prompt", instruction)],
        );

        let tokens = self.counter.count(&prompt).await?;
        if tokens >= self.token_ceiling {
            warn!(tokens, ceiling = self.token_ceiling, "Summarization prompt over budget");
            return Ok(prompts::TOO_MANY_TOKENS.to_string());
        }

        let started = Instant::now();
        let response = self
            .client
            .complete(
                &prompt,
                role,
                CompletionOptions::default().with_max_tokens(self.max_tokens),
            )
            .await?;
        info!(
            tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Summarization finished"
        );
        Ok(response)
    }
}
