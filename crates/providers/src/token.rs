//! Token estimation.
//!
//! Uses a character-based heuristic: ~4 characters per token.
//! This approximation is accurate within ~10% for BPE tokenizers
//! (GPT-4, Claude) on English text.

use async_trait::async_trait;
use stepwise_core::error::ProviderError;
use stepwise_core::TokenCounter;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.len() + 3) / 4
}

/// [`TokenCounter`] backed by [`estimate_tokens`]. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

#[async_trait]
impl TokenCounter for HeuristicTokenCounter {
    async fn count(&self, text: &str) -> std::result::Result<usize, ProviderError> {
        Ok(estimate_tokens(text))
    }
}
