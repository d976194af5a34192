//! Endpoint Synthesizer: asks the generator model for endpoint candidates.

use stepwise_core::UserRole;
use stepwise_core::error::ProviderError;
use stepwise_providers::{CompletionClient, CompletionOptions};
use crate::prompts;

/// Everything one generation attempt is conditioned on.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub api_docs: &'a str,
    pub task: &'a str,
    pub prior_context: &'a str,
    pub annotations: &'a [String],
    pub role: &'a UserRole,
}

/// Renders the generator prompt and returns the model's raw output.
pub struct EndpointSynthesizer {
    client: CompletionClient,
    response_schema: String,
}

impl EndpointSynthesizer {
    pub fn new(client: CompletionClient) -> Self {
        Self {
            client,
            response_schema: prompts::GENERATOR_SCHEMA.to_string(),
        }
    }

    pub fn with_response_schema(mut self, schema: impl Into<String>) -> Self {
        self.response_schema = schema.into();
        self
    }

    pub fn prompt(&self, request: &SynthesisRequest<'_>) -> String {
        let previous = if request.annotations.is_empty() {
            "[]".to_string()
        } else {
            request.annotations.join("\n\n")
        };

        prompts::render(
            prompts::GENERATOR,
            &[
                ("context", request.prior_context),
                ("response_schema", &self.response_schema),
                ("previous_generations", &previous),
                ("open_api_spec", request.api_docs),
                ("question", request.task),
            ],
        )
    }

    /// One generation. The output is not parsed here.
    pub async fn generate(&self, request: SynthesisRequest<'_>) -> Result<String, ProviderError> {
        let prompt = self.prompt(&request);
        self.client
            .complete(&prompt, request.role, CompletionOptions::json())
            .await
    }
}
