//! LLM Provider implementations for Stepwise.
//!
//! All providers implement the `stepwise_core::Provider` trait.
//! The router selects the correct provider based on configuration and
//! hands out one [`CompletionClient`] per engine role.

pub mod anthropic;
pub mod completion;
pub mod openai_compat;
pub mod router;
pub mod token;

pub use anthropic::AnthropicProvider;
pub use completion::{CompletionClient, CompletionOptions};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
pub use token::{HeuristicTokenCounter, estimate_tokens};
