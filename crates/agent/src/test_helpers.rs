//! Scripted collaborators shared by the engine tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use stepwise_core::error::{InvokeError, ProviderError, RetrievalError, SearchError};
use stepwise_core::{
    Document, EndpointCandidate, InvocationBatch, InvocationResult, KnowledgeRetriever, Message,
    Outcome, ProgressChannel, ProgressSink, Provider, ProviderRequest, ProviderResponse,
    TokenCounter, Usage, WebSearch,
};
use stepwise_providers::CompletionClient;
use crate::synthesis_loop::EndpointExecutor;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response and records the
/// prompt it was sent. Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl SequentialMockProvider {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt);
            prompts.len()
        };

        let text = self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            panic!("SequentialMockProvider: no more responses (call #{call})")
        });
        Ok(make_text_response(&text))
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A completion client over a fresh [`SequentialMockProvider`].
pub fn scripted_client<S: Into<String>>(
    responses: impl IntoIterator<Item = S>,
) -> (CompletionClient, Arc<SequentialMockProvider>) {
    let provider = Arc::new(SequentialMockProvider::new(responses));
    (CompletionClient::new(provider.clone(), "mock-model"), provider)
}

/// One scripted reply of a [`ScriptedExecutor`].
pub enum Reply {
    /// Every candidate answers with this JSON body.
    Json(serde_json::Value),
    /// Every candidate answers with a non-2xx status.
    Status(u16, &'static str),
    /// The whole batch fails at the transport level.
    Transport,
}

/// An executor that answers batches from a script and records what it saw.
pub struct ScriptedExecutor {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<Vec<EndpointCandidate>>>,
    problems: Vec<String>,
}

impl ScriptedExecutor {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
            problems: Vec::new(),
        }
    }

    /// Problems reported by `validate` for every candidate.
    pub fn with_problems(mut self, problems: &[&str]) -> Self {
        self.problems = problems.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn invocations(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn batches(&self) -> Vec<Vec<EndpointCandidate>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EndpointExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        candidates: &[EndpointCandidate],
    ) -> Result<InvocationBatch, InvokeError> {
        self.seen.lock().unwrap().push(candidates.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedExecutor: no more replies");

        let mut batch = InvocationBatch::default();
        for candidate in candidates {
            let (url, _) = candidate.resolve_template();
            let outcome = match &reply {
                Reply::Json(body) => Outcome::Json { body: body.clone() },
                Reply::Status(status, body) => Outcome::Failed {
                    status: *status,
                    body: body.to_string(),
                },
                Reply::Transport => {
                    return Err(InvokeError::Transport {
                        url,
                        reason: "connection refused".into(),
                    });
                }
            };
            batch.push(InvocationResult { url, outcome });
        }
        Ok(batch)
    }

    fn validate(&self, _candidate: &EndpointCandidate) -> Vec<String> {
        self.problems.clone()
    }
}

/// Records every progress line.
#[derive(Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<(Option<ProgressChannel>, String)>>,
}

impl RecordingProgress {
    pub fn lines(&self) -> Vec<(Option<ProgressChannel>, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn on(&self, channel: ProgressChannel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(c, _)| *c == Some(channel))
            .map(|(_, m)| m)
            .collect()
    }

    pub fn streamed(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(c, _)| c.is_none())
            .map(|(_, m)| m)
            .collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn announce(&self, channel: ProgressChannel, message: &str) {
        self.lines.lock().unwrap().push((Some(channel), message.to_string()));
    }

    async fn stream(&self, message: &str) {
        self.lines.lock().unwrap().push((None, message.to_string()));
    }
}

/// Returns the same documents for every query and records the queries.
#[derive(Default)]
pub struct StaticRetriever {
    documents: Vec<Document>,
    queries: Mutex<Vec<(String, String)>>,
}

impl StaticRetriever {
    pub fn new(contents: &[&str]) -> Self {
        Self {
            documents: contents.iter().map(|c| Document::new(*c)).collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticRetriever {
    async fn retrieve(&self, query: &str, collection: &str) -> Result<Vec<Document>, RetrievalError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), collection.to_string()));
        Ok(self.documents.clone())
    }
}

/// Answers every search with a fixed text and records the context it got.
pub struct EchoSearch {
    answer: String,
    contexts: Mutex<Vec<String>>,
}

impl EchoSearch {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for EchoSearch {
    async fn search(&self, _task: &str, context: &str) -> Result<String, SearchError> {
        self.contexts.lock().unwrap().push(context.to_string());
        Ok(self.answer.clone())
    }
}

/// Reports the same token count for every text.
pub struct FixedCounter(pub usize);

#[async_trait]
impl TokenCounter for FixedCounter {
    async fn count(&self, _text: &str) -> Result<usize, ProviderError> {
        Ok(self.0)
    }
}

/// A single GET candidate as the synthesizer would emit it.
pub fn candidate_json(url: &str) -> String {
    serde_json::json!({"url": url, "method": "GET", "data": {}}).to_string()
}
