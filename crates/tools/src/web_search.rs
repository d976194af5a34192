//! Web search backed by an online completion model (e.g. Perplexity sonar).
//!
//! The model is asked to answer the task directly, using the previous
//! step's output as supplementary information.

use async_trait::async_trait;
use stepwise_core::error::SearchError;
use stepwise_core::{UserRole, WebSearch};
use stepwise_providers::{CompletionClient, CompletionOptions};
use tracing::{info, warn};

const DEFAULT_TEMPLATE: &str = "\
Search the web and answer the following task as accurately and concisely as you can.
Prefer recent, verifiable sources and include concrete figures where available.

Task: {task}

Supplementary information (may be empty):
{search_information}";

pub struct LlmWebSearch {
    client: CompletionClient,
    template: String,
    role: UserRole,
}

impl LlmWebSearch {
    pub fn new(client: CompletionClient) -> Self {
        Self {
            client,
            template: DEFAULT_TEMPLATE.to_string(),
            role: UserRole::default(),
        }
    }

    /// Replace the prompt; `{task}` and `{search_information}` are filled in.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Role passed to the completion client (controls prompt logging).
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    /// Fill the template in one pass; placeholders inside the task or the
    /// context are left as written.
    fn render(&self, task: &str, context: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + task.len() + context.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let (value, len) = if tail.starts_with("{task}") {
                (task, "{task}".len())
            } else if tail.starts_with("{search_information}") {
                (context, "{search_information}".len())
            } else {
                ("{", 1)
            };
            out.push_str(value);
            rest = &tail[len..];
        }
        out.push_str(rest);
        out
    }
}

#[async_trait]
impl WebSearch for LlmWebSearch {
    async fn search(&self, task: &str, context: &str) -> std::result::Result<String, SearchError> {
        info!(context_chars = context.chars().count(), "Running web search");

        let prompt = self.render(task, context);
        let answer = self
            .client
            .complete(&prompt, &self.role, CompletionOptions::default())
            .await?;

        if answer.trim().is_empty() {
            warn!(task, "Web search returned an empty answer");
        }
        Ok(answer)
    }
}
