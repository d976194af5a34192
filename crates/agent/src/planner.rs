//! Planner: turns a user query into a plan document.
//!
//! The prompt combines the tool list, the usable endpoints, the response
//! schema, knowledge-base definitions matching the query, the current UTC
//! time and the conversation history.

use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use stepwise_core::error::RetrievalError;
use stepwise_core::{ConversationMemory, Error, KnowledgeRetriever, UserRole};
use stepwise_providers::{CompletionClient, CompletionOptions};
use stepwise_tools::{EndpointSummary, KNOWLEDGE_COLLECTION};
use tracing::{debug, info};
use crate::prompts;

/// Which planner prompt to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlannerVariant {
    /// API, search and summarization steps.
    #[default]
    WithApis,
    /// A single summarization step answered from the model's own knowledge.
    SummaryOnly,
}

impl PlannerVariant {
    fn template(&self) -> &'static str {
        match self {
            Self::WithApis => prompts::PLANNER_WITH_APIS,
            Self::SummaryOnly => prompts::PLANNER_SUMMARY_ONLY,
        }
    }
}

impl FromStr for PlannerVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "with-apis" | "apis" => Ok(Self::WithApis),
            "summary-only" | "summary" => Ok(Self::SummaryOnly),
            other => Err(format!("unknown planner `{other}` (expected with-apis or summary-only)")),
        }
    }
}

pub struct Planner {
    client: CompletionClient,
    retriever: Arc<dyn KnowledgeRetriever>,
    variant: PlannerVariant,
    endpoints: String,
    max_tokens: u32,
}

impl Planner {
    pub fn new(client: CompletionClient, retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        Self {
            client,
            retriever,
            variant: PlannerVariant::default(),
            endpoints: "(none)".into(),
            max_tokens: 4096,
        }
    }

    pub fn with_variant(mut self, variant: PlannerVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The endpoints listed in the prompt as usable.
    pub fn with_endpoints(mut self, endpoints: &[EndpointSummary]) -> Self {
        if !endpoints.is_empty() {
            self.endpoints = endpoints
                .iter()
                .enumerate()
                .map(|(i, e)| match &e.summary {
                    Some(summary) => format!("{}. {} {}: {summary}", i + 1, e.method, e.path),
                    None => format!("{}. {} {}", i + 1, e.method, e.path),
                })
                .collect::<Vec<_>>()
                .join("\n");
        }
        self
    }

    pub fn variant(&self) -> PlannerVariant {
        self.variant
    }

    /// Produce the plan document for `query`. The text is not validated here.
    pub async fn plan(
        &self,
        query: &str,
        role: &UserRole,
        memory: &dyn ConversationMemory,
    ) -> Result<String, Error> {
        let knowledge = match self.retriever.retrieve(query, KNOWLEDGE_COLLECTION).await {
            Ok(docs) => docs
                .into_iter()
                .map(|d| d.content)
                .collect::<Vec<_>>()
                .join("\n"),
            Err(RetrievalError::UnknownCollection(_)) => String::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(knowledge = %knowledge, "Knowledge base search result");

        let datetime = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let context = memory.render();
        let prompt = prompts::render(
            self.variant.template(),
            &[
                ("endpoints", &self.endpoints),
                ("response_schema", prompts::PLANNER_SCHEMA),
                ("knowledge", &knowledge),
                ("datetime", &datetime),
                ("context", &context),
                ("query", query),
            ],
        );

        let started = Instant::now();
        let plan = self
            .client
            .complete(
                &prompt,
                role,
                CompletionOptions::json().with_max_tokens(self.max_tokens),
            )
            .await?;
        info!(
            variant = ?self.variant,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Plan generated"
        );
        Ok(plan.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{scripted_client, StaticRetriever};
    use stepwise_memory::{ConversationWindow, NoopMemory};
    use stepwise_tools::KeywordRetriever;

    #[tokio::test]
    async fn prompt_includes_knowledge_history_and_endpoints() {
        let (client, provider) = scripted_client([r#"  {"plan": "[Summarization] hi"}  "#]);
        let retriever = Arc::new(StaticRetriever::new(&["Actor: a serverless program"]));
        let planner = Planner::new(client, retriever.clone()).with_endpoints(&[EndpointSummary {
            method: "GET".into(),
            path: "/acts".into(),
            summary: Some("Get list of actors".into()),
        }]);

        let mut memory = ConversationWindow::new(2);
        memory.save_context("earlier question", "earlier plan");

        let plan = planner.plan("what is an actor", &UserRole::Admin, &memory).await.unwrap();
        assert_eq!(plan, r#"{"plan": "[Summarization] hi"}"#);

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("Actor: a serverless program"));
        assert!(prompt.contains("Human: earlier question\nAI: earlier plan"));
        assert!(prompt.contains("1. GET /acts: Get list of actors"));
        assert!(prompt.contains("User query: what is an actor"));
        assert!(prompt.contains(r#""plan": {"#));
        assert_eq!(retriever.queries()[0].1, KNOWLEDGE_COLLECTION);
    }

    #[tokio::test]
    async fn missing_knowledge_collection_is_tolerated() {
        let (client, provider) = scripted_client([r#"{"plan": ""}"#]);
        let planner = Planner::new(client, Arc::new(KeywordRetriever::new()))
            .with_variant(PlannerVariant::SummaryOnly);

        planner.plan("hello", &UserRole::Admin, &NoopMemory).await.unwrap();
        let prompt = &provider.prompts()[0];
        assert!(prompt.starts_with("You answer the user's question with a plan of exactly one step"));
        assert!(prompt.contains("Definitions related to the question (ignore if irrelevant): \n"));
    }

    #[test]
    fn variant_names_parse() {
        assert_eq!("with-apis".parse::<PlannerVariant>().unwrap(), PlannerVariant::WithApis);
        assert_eq!("summary_only".parse::<PlannerVariant>().unwrap(), PlannerVariant::SummaryOnly);
        assert!("chatty".parse::<PlannerVariant>().is_err());
    }
}
