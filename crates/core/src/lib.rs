//! # Stepwise Core
//!
//! Domain types, capability traits, and error definitions for the Stepwise
//! plan execution engine. This crate has **no I/O of its own**; it defines
//! the model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion model, token counter, knowledge
//! retriever, web search, progress reporting, conversation memory) is a
//! trait here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Scripted test doubles for every suspension point
//! - Clean dependency graph (all crates depend inward on core)

pub mod capability;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod plan;
pub mod provider;
pub mod role;
pub mod task;

// Re-export key types at crate root for ergonomics
pub use capability::{
    ConversationMemory, Document, KnowledgeRetriever, ProgressChannel, ProgressSink, TokenCounter,
    WebSearch,
};
pub use endpoint::{EndpointCandidate, InvocationBatch, InvocationResult, Outcome};
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use plan::{Plan, Step, StepTag};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use role::UserRole;
pub use task::TaskResult;
