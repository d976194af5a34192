//! Per-turn execution state threaded through every step.

use std::sync::Arc;
use stepwise_core::{ConversationMemory, ProgressSink, TaskResult, UserRole};

/// State owned by one conversation turn.
///
/// Results are appended in step order and never rewritten. The memory is
/// borrowed from the conversation for the duration of the turn.
pub struct ExecutionContext<'a> {
    pub query: String,
    pub role: UserRole,
    pub progress: Arc<dyn ProgressSink>,
    pub memory: &'a mut dyn ConversationMemory,
    results: Vec<TaskResult>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        query: impl Into<String>,
        role: UserRole,
        progress: Arc<dyn ProgressSink>,
        memory: &'a mut dyn ConversationMemory,
    ) -> Self {
        Self {
            query: query.into(),
            role,
            progress,
            memory,
            results: Vec::new(),
        }
    }

    /// The result appended just before the step at `index`.
    ///
    /// Looks up position `index - 1` of the result list, so it is `None`
    /// for the first step and whenever earlier steps appended fewer results.
    pub fn previous(&self, index: usize) -> Option<&TaskResult> {
        index.checked_sub(1).and_then(|i| self.results.get(i))
    }

    pub fn push_result(&mut self, result: TaskResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    /// All results as one JSON list, for the summarizer.
    pub fn render_results(&self) -> String {
        let values: Vec<serde_json::Value> = self
            .results
            .iter()
            .map(|r| match r {
                TaskResult::Api(batch) => batch.to_value(),
                TaskResult::Text(text) => serde_json::Value::String(text.clone()),
            })
            .collect();
        serde_json::Value::Array(values).to_string()
    }
}
