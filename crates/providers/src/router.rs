//! Provider router: selects the correct LLM provider based on config.
//!
//! Handles provider creation and hands out a [`CompletionClient`] per
//! engine role (planner, generator, search, summarizer).

use std::collections::HashMap;
use std::sync::Arc;
use stepwise_config::{AppConfig, ModelRole};
use stepwise_core::error::ProviderError;
use stepwise_core::provider::Provider;
use crate::anthropic::AnthropicProvider;
use crate::completion::CompletionClient;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// The completion client configured for `role`.
    pub fn client_for(
        &self,
        config: &AppConfig,
        role: ModelRole,
    ) -> std::result::Result<CompletionClient, ProviderError> {
        let (provider_name, model) = config.model_for(role);
        let provider = self.get(&provider_name).ok_or_else(|| {
            ProviderError::NotConfigured(format!("provider `{provider_name}` for {role:?}"))
        })?;

        Ok(CompletionClient::new(provider, model).with_temperature(config.default_temperature))
    }
}

/// Build providers from configuration.
///
/// Registers every `[providers.*]` entry, the default provider, and any
/// provider named by a `[models.*]` role.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(name.clone(), create_provider(name, &base_url, &api_key));
    }

    let mut wanted = vec![config.default_provider.clone()];
    for role in [
        ModelRole::Planner,
        ModelRole::Generator,
        ModelRole::Search,
        ModelRole::Summarizer,
    ] {
        wanted.push(config.model_for(role).0);
    }

    // Ensure every referenced provider exists (even if not explicitly configured)
    for name in wanted {
        if router.get(&name).is_none() {
            let api_key = config.api_key.clone().unwrap_or_default();
            let provider = create_provider(&name, &default_base_url(&name), &api_key);
            router.register(name, provider);
        }
    }

    router
}

fn create_provider(name: &str, base_url: &str, api_key: &str) -> Arc<dyn Provider> {
    if name == "anthropic" {
        // Native Messages API rather than an OpenAI-compatible proxy
        Arc::new(AnthropicProvider::new(api_key).with_base_url(base_url))
    } else {
        Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "anthropic" => "https://api.anthropic.com".into(),
        "perplexity" => "https://api.perplexity.ai".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
