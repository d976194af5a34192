//! Error types for the Stepwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Stepwise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Plan errors ---
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    // --- Endpoint invocation errors ---
    #[error("Invocation error: {0}")]
    Invoke(#[from] InvokeError),

    // --- Knowledge retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Web search errors ---
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures turning the planner's output into a [`crate::plan::Plan`].
///
/// These are fatal for a turn: the plan is never regenerated by the engine.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Plan is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("Plan document must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("Plan field `plan` must be a string, got {0}")]
    InvalidPlanField(String),
}

/// Transport-level failures while dispatching endpoint candidates.
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    #[error("No access token configured for API invocation")]
    MissingAccessToken,

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Failed to load documents from {location}: {reason}")]
    LoadFailed { location: String, reason: String },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search provider failed: {0}")]
    Provider(#[from] ProviderError),
}
