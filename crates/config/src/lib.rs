//! Configuration loading, validation, and management for Stepwise.
//!
//! Loads configuration from `~/.stepwise/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.stepwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the default provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Per-role model selection
    #[serde(default)]
    pub models: ModelsConfig,

    /// Plan execution engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Target API access settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Knowledge collections for retrieval
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("models", &self.models)
            .field("engine", &self.engine)
            .field("api", &self.api)
            .field("memory", &self.memory)
            .field("knowledge", &self.knowledge)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("access_token", &redact(&self.access_token))
            .field("openapi_spec_dir", &self.openapi_spec_dir)
            .field("response_schema_path", &self.response_schema_path)
            .field("resolve_servers", &self.resolve_servers)
            .finish()
    }
}

/// Which provider and model serve one role of the engine.
///
/// Unset fields fall back to `default_provider` / `default_model`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Writes the plan for a user turn
    #[serde(default)]
    pub planner: ModelRef,

    /// Synthesizes endpoint candidates
    #[serde(default)]
    pub generator: ModelRef,

    /// Answers `[Search]` steps (an online model works best)
    #[serde(default)]
    pub search: ModelRef,

    /// Answers `[Summarization]` steps
    #[serde(default)]
    pub summarizer: ModelRef,
}

/// The engine roles a model can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Planner,
    Generator,
    Search,
    Summarizer,
}

/// What happens to the rest of a candidate batch when one request fails
/// at the transport level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateFailures {
    /// Abort the whole batch; the attempt yields no result.
    #[default]
    AbortBatch,
    /// Record the failure for that candidate and continue with the next.
    Isolate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Synthesis attempts per API step (R)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Summarization prompts at or above this many tokens are not sent
    #[serde(default = "default_token_ceiling")]
    pub token_ceiling: usize,

    /// Timeout for every endpoint invocation
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Base URL used when no loaded API document declares a server
    #[serde(default = "default_base_url")]
    pub default_base_url: String,

    /// Duration estimate announced per plan step
    #[serde(default = "default_seconds_per_step")]
    pub seconds_per_step: u64,

    /// How much of the previous result a search step receives
    #[serde(default = "default_search_context_chars")]
    pub search_context_chars: usize,

    #[serde(default = "default_output_tokens")]
    pub summarizer_max_tokens: u32,

    #[serde(default = "default_output_tokens")]
    pub planner_max_tokens: u32,

    /// Most reflective annotations kept during one synthesis loop
    #[serde(default = "default_feedback_limit")]
    pub feedback_limit: usize,

    #[serde(default)]
    pub candidate_failures: CandidateFailures,
}

fn default_max_retries() -> u32 {
    3
}
fn default_token_ceiling() -> usize {
    128_000
}
fn default_http_timeout_secs() -> u64 {
    600
}
fn default_base_url() -> String {
    "https://api.apify.com/v2".into()
}
fn default_seconds_per_step() -> u64 {
    18
}
fn default_search_context_chars() -> usize {
    10_000
}
fn default_output_tokens() -> u32 {
    4096
}
fn default_feedback_limit() -> usize {
    8
}
fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            token_ceiling: default_token_ceiling(),
            http_timeout_secs: default_http_timeout_secs(),
            default_base_url: default_base_url(),
            seconds_per_step: default_seconds_per_step(),
            search_context_chars: default_search_context_chars(),
            summarizer_max_tokens: default_output_tokens(),
            planner_max_tokens: default_output_tokens(),
            feedback_limit: default_feedback_limit(),
            candidate_failures: CandidateFailures::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Token appended to every invocation as the `token` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Directory of OpenAPI JSON documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi_spec_dir: Option<PathBuf>,

    /// Replaces the built-in generator response schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema_path: Option<PathBuf>,

    /// Resolve each endpoint's base URL from the loaded documents
    #[serde(default = "default_true")]
    pub resolve_servers: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            openapi_spec_dir: None,
            response_schema_path: None,
            resolve_servers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Number of exchanges kept in the conversation window
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_window() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

/// A named document collection loaded into the knowledge retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,

    /// File or directory to load
    pub location: PathBuf,

    #[serde(default)]
    pub kind: CollectionKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// OpenAPI JSON documents, chunked per path
    Openapi,
    /// Plain text, one document per blank-line separated block
    #[default]
    Text,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.stepwise/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load from `path` (or the default path) and apply environment overrides.
    ///
    /// Environment variables checked:
    /// - `STEPWISE_API_KEY` (default provider key)
    /// - `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `PERPLEXITY_API_KEY`
    /// - `STEPWISE_PROVIDER`, `STEPWISE_MODEL`
    /// - `STEPWISE_API_TOKEN` / `TOKEN` (API access token)
    /// - `MAX_RETRIES`, `OPENAPI_SPEC_DIR`
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir().join("config.toml"),
        };
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`. Values already set in
    /// the file win for keys and tokens; provider, model, retries and the
    /// spec directory are overridden unconditionally.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("STEPWISE_API_KEY");
        }

        for (provider, var) in [
            ("openai", "OPENAI_API_KEY"),
            ("anthropic", "ANTHROPIC_API_KEY"),
            ("perplexity", "PERPLEXITY_API_KEY"),
        ] {
            if let Some(key) = lookup(var) {
                let entry = self
                    .providers
                    .entry(provider.to_string())
                    .or_insert_with(|| ProviderConfig {
                        api_key: None,
                        api_url: None,
                        default_model: None,
                    });
                if entry.api_key.is_none() {
                    entry.api_key = Some(key);
                }
            }
        }

        if let Some(provider) = lookup("STEPWISE_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("STEPWISE_MODEL") {
            self.default_model = model;
        }

        if self.api.access_token.is_none() {
            self.api.access_token = lookup("STEPWISE_API_TOKEN").or_else(|| lookup("TOKEN"));
        }

        if let Some(raw) = lookup("MAX_RETRIES") {
            match raw.trim().parse::<u32>() {
                Ok(n) => self.engine.max_retries = n,
                Err(_) => tracing::warn!(value = %raw, "Ignoring non-numeric MAX_RETRIES"),
            }
        }
        if let Some(dir) = lookup("OPENAPI_SPEC_DIR") {
            self.api.openapi_spec_dir = Some(PathBuf::from(dir));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.engine.max_retries < 1 {
            return Err(ConfigError::ValidationError(
                "engine.max_retries must be at least 1".into(),
            ));
        }

        if self.engine.feedback_limit < 1 {
            return Err(ConfigError::ValidationError(
                "engine.feedback_limit must be at least 1".into(),
            ));
        }

        if self.engine.token_ceiling == 0 {
            return Err(ConfigError::ValidationError(
                "engine.token_ceiling must be > 0".into(),
            ));
        }

        if self.engine.http_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "engine.http_timeout_secs must be > 0".into(),
            ));
        }

        if self.memory.window < 1 {
            return Err(ConfigError::ValidationError(
                "memory.window must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// The (provider, model) pair serving `role`.
    pub fn model_for(&self, role: ModelRole) -> (String, String) {
        let entry = match role {
            ModelRole::Planner => &self.models.planner,
            ModelRole::Generator => &self.models.generator,
            ModelRole::Search => &self.models.search,
            ModelRole::Summarizer => &self.models.summarizer,
        };

        let provider = entry
            .provider
            .clone()
            .unwrap_or_else(|| self.default_provider.clone());

        let model = entry
            .model
            .clone()
            .or_else(|| {
                self.providers
                    .get(&provider)
                    .and_then(|p| p.default_model.clone())
            })
            .unwrap_or_else(|| self.default_model.clone());

        (provider, model)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            models: ModelsConfig::default(),
            engine: EngineConfig::default(),
            api: ApiConfig::default(),
            memory: MemoryConfig::default(),
            knowledge: KnowledgeConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
