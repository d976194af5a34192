//! Capability traits: the external collaborators the engine consumes.
//!
//! Each trait marks one suspension point of a turn: token counting,
//! knowledge retrieval, web search, and progress reporting are awaited;
//! conversation memory is plain owned state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{ProviderError, RetrievalError, SearchError};

/// Estimates a prompt's size in model tokens.
#[async_trait]
pub trait TokenCounter: Send + Sync {
    async fn count(&self, text: &str) -> std::result::Result<usize, ProviderError>;
}

/// A documentation fragment returned by a knowledge retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,

    /// Where the fragment came from (file path, endpoint path, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Relevance score set by the retriever
    #[serde(default)]
    pub score: f32,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
            score: 0.0,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Similarity search over named document collections.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        collection: &str,
    ) -> std::result::Result<Vec<Document>, RetrievalError>;
}

/// Answers a task from the web, given supplementary context.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, task: &str, context: &str) -> std::result::Result<String, SearchError>;
}

/// The named announcement channels a turn reports progress on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressChannel {
    #[serde(rename = "planner")]
    Planner,
    #[serde(rename = "api")]
    Api,
    #[serde(rename = "search")]
    Search,
    // Front-ends subscribe to the historical spelling.
    #[serde(rename = "summerization")]
    Summarization,
    #[serde(rename = "clarification")]
    Clarification,
}

impl ProgressChannel {
    /// The channel name as sent to front-ends.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Api => "api",
            Self::Search => "search",
            Self::Summarization => "summerization",
            Self::Clarification => "clarification",
        }
    }
}

impl fmt::Display for ProgressChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Receives human-readable status lines while a turn runs.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// A status line on one of the named channels.
    async fn announce(&self, channel: ProgressChannel, message: &str);

    /// A free-form progress line (e.g. "Executing task # 2").
    async fn stream(&self, message: &str);
}

/// Conversation history that outlives a single turn.
///
/// Only the planner reads it and only summarization steps and the
/// conversation service write to it.
pub trait ConversationMemory: Send {
    fn save_context(&mut self, input: &str, output: &str);

    /// The history rendered for inclusion in a prompt.
    fn render(&self) -> String;

    fn clear(&mut self);
}
