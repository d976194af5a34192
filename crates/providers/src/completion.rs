//! CompletionClient: a provider bound to one model, answering plain prompts.
//!
//! Every engine role (planner, generator, search, summarizer) talks to its
//! model through one of these: `complete(prompt, role, options) -> text`.

use std::sync::Arc;
use std::time::Instant;
use stepwise_core::error::ProviderError;
use stepwise_core::message::Message;
use stepwise_core::provider::{Provider, ProviderRequest};
use stepwise_core::role::UserRole;
use tracing::{debug, info};

/// Per-call overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionOptions {
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    pub fn json() -> Self {
        Self {
            json_mode: true,
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A provider plus the model and defaults it is called with.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    system_prompt: Option<String>,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            system_prompt: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send `prompt` as a single user message and return the reply text.
    ///
    /// For [`UserRole::Developer`] the full prompt and response are logged.
    pub async fn complete(
        &self,
        prompt: &str,
        role: &UserRole,
        options: CompletionOptions,
    ) -> std::result::Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));

        let mut request = ProviderRequest::new(&self.model, messages);
        request.temperature = options.temperature.unwrap_or(self.temperature);
        request.max_tokens = options.max_tokens;
        request.json_mode = options.json_mode;

        if role.is_developer() {
            info!(provider = %self.provider.name(), model = %self.model, %prompt, "LLM prompt");
        }

        let started = Instant::now();
        let response = self.provider.complete(request).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        debug!(
            provider = %self.provider.name(),
            model = %response.model,
            elapsed_ms,
            tokens = response.usage.as_ref().map(|u| u.total_tokens),
            "Completion finished"
        );

        if role.is_developer() {
            info!(
                provider = %self.provider.name(),
                model = %self.model,
                response = %response.message.content,
                elapsed_ms,
                "LLM response"
            );
        }

        Ok(response.message.content)
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}
