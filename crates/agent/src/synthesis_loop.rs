//! The Synthesis-Execution Loop: generate endpoint candidates, call them,
//! judge the result, and retry with reflective feedback.
//!
//! Each attempt:
//! 1. asks the [`EndpointSynthesizer`] for candidates, replaying all
//!    feedback recorded so far
//! 2. parses the generation (a lone object becomes a one-element list)
//! 3. executes the candidates and applies [`InvocationBatch::is_success`]
//! 4. on failure of a single candidate, records an annotation describing it
//!
//! Every attempt counts against the retry bound, including attempts whose
//! generation failed to parse or whose execution failed at the transport
//! level. The loop never fails: after the last attempt it hands back the
//! last batch it obtained, if any.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use stepwise_core::error::InvokeError;
use stepwise_core::{EndpointCandidate, InvocationBatch, UserRole};
use stepwise_tools::EndpointInvoker;
use tracing::{debug, info, warn};
use crate::prompts::REFLECTION;
use crate::synthesizer::{EndpointSynthesizer, SynthesisRequest};

/// Runs a batch of candidates against the real API.
#[async_trait]
pub trait EndpointExecutor: Send + Sync {
    async fn execute(
        &self,
        candidates: &[EndpointCandidate],
    ) -> Result<InvocationBatch, InvokeError>;

    /// Advisory problems with a candidate, quoted in its failure annotation.
    fn validate(&self, _candidate: &EndpointCandidate) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
impl EndpointExecutor for EndpointInvoker {
    async fn execute(
        &self,
        candidates: &[EndpointCandidate],
    ) -> Result<InvocationBatch, InvokeError> {
        self.invoke(candidates).await
    }

    fn validate(&self, candidate: &EndpointCandidate) -> Vec<String> {
        self.catalog().validate(candidate)
    }
}

/// Reflective annotations of one loop run, oldest dropped first once full.
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    entries: Vec<String>,
    limit: usize,
}

impl FeedbackLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, annotation: String) {
        if self.entries.len() == self.limit {
            self.entries.remove(0);
        }
        self.entries.push(annotation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Annotations oldest first.
    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }
}

/// Mutable state of one loop run. Dropped when the run ends.
#[derive(Debug)]
pub struct RetryState {
    pub attempt: u32,
    pub feedback: FeedbackLog,
    pub last: Option<InvocationBatch>,
}

impl RetryState {
    fn new(feedback_limit: usize) -> Self {
        Self {
            attempt: 0,
            feedback: FeedbackLog::new(feedback_limit),
            last: None,
        }
    }
}

/// Parse a generation into candidates.
///
/// Accepts a JSON array of candidate objects or a single candidate object.
pub fn parse_generation(generation: &str) -> Result<Vec<EndpointCandidate>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(generation.trim())?;
    let list = match value {
        serde_json::Value::Object(_) => serde_json::Value::Array(vec![value]),
        other => other,
    };
    serde_json::from_value(list)
}

pub struct SynthesisLoop {
    synthesizer: EndpointSynthesizer,
    executor: Arc<dyn EndpointExecutor>,
    max_retries: u32,
    feedback_limit: usize,
}

impl SynthesisLoop {
    pub fn new(synthesizer: EndpointSynthesizer, executor: Arc<dyn EndpointExecutor>) -> Self {
        Self {
            synthesizer,
            executor,
            max_retries: 3,
            feedback_limit: 8,
        }
    }

    /// Attempts per run (at least one).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_feedback_limit(mut self, limit: usize) -> Self {
        self.feedback_limit = limit.max(1);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Generate and execute until a batch passes the success test or the
    /// attempts run out.
    pub async fn synthesize_and_execute(
        &self,
        api_docs: &str,
        task: &str,
        prior_context: &str,
        role: &UserRole,
    ) -> Option<InvocationBatch> {
        let started = Instant::now();
        let mut state = RetryState::new(self.feedback_limit);

        while state.attempt < self.max_retries {
            state.attempt += 1;
            let attempt = state.attempt;

            let request = SynthesisRequest {
                api_docs,
                task,
                prior_context,
                annotations: state.feedback.as_slice(),
                role,
            };
            let generation = match self.synthesizer.generate(request).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(attempt, error = %e, "Endpoint generation failed, retrying");
                    continue;
                }
            };
            debug!(attempt, %generation, "Generated endpoint");

            let candidates = match parse_generation(&generation) {
                Ok(candidates) => candidates,
                Err(e) => {
                    info!(attempt, error = %e, "Generated endpoint was not valid JSON, retrying");
                    continue;
                }
            };

            let observed = match self.executor.execute(&candidates).await {
                Ok(batch) => {
                    if batch.is_success() {
                        info!(
                            attempt,
                            urls = ?batch.urls,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Endpoint synthesis succeeded"
                        );
                        return Some(batch);
                    }
                    let observed = batch.to_string();
                    state.last = Some(batch);
                    observed
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Endpoint execution failed");
                    e.to_string()
                }
            };

            if let [candidate] = candidates.as_slice() {
                let annotation = self.annotate(candidate, &observed);
                state.feedback.push(annotation);
            }
            info!(attempt, feedback = state.feedback.len(), "Retrying endpoint generation");
        }

        warn!(
            attempts = state.attempt,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Endpoint synthesis exhausted its attempts"
        );
        state.last
    }

    fn annotate(&self, candidate: &EndpointCandidate, observed: &str) -> String {
        let mut annotation = format!("{candidate} resulted in error as {observed}\n");
        let problems = self.executor.validate(candidate);
        if !problems.is_empty() {
            annotation.push_str("Checked against the API documentation: ");
            annotation.push_str(&problems.join("; "));
            annotation.push('\n');
        }
        annotation.push('\n');
        annotation.push_str(REFLECTION);
        annotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{candidate_json, scripted_client, Reply, ScriptedExecutor};
    use serde_json::json;

    fn looped(
        responses: Vec<String>,
        executor: Arc<ScriptedExecutor>,
    ) -> (SynthesisLoop, Arc<crate::test_helpers::SequentialMockProvider>) {
        let (client, provider) = scripted_client(responses);
        let run = SynthesisLoop::new(EndpointSynthesizer::new(client), executor).with_max_retries(3);
        (run, provider)
    }

    async fn run(l: &SynthesisLoop) -> Option<InvocationBatch> {
        l.synthesize_and_execute("docs", "[API] get items", "", &UserRole::Admin)
            .await
    }

    fn api_error() -> Reply {
        Reply::Status(400, r#"{"error":{"type":"invalid-input"}}"#)
    }

    #[test]
    fn lone_object_is_wrapped() {
        let list = parse_generation(r#"{"url": "/a", "method": "GET", "data": {"x": 1}}"#).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].url, "/a");

        let list = parse_generation(r#"[{"url": "/a", "method": "GET"}, {"url": "/b", "method": "POST"}]"#).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].data.is_empty());
    }

    #[test]
    fn prose_and_scalars_do_not_parse() {
        assert!(parse_generation("Here is the endpoint: {}").is_err());
        assert!(parse_generation("42").is_err());
        assert!(parse_generation(r#"[{"method": "GET"}]"#).is_err());
    }

    #[test]
    fn feedback_log_drops_oldest() {
        let mut log = FeedbackLog::new(2);
        log.push("a".into());
        log.push("b".into());
        log.push("c".into());
        assert_eq!(log.as_slice(), ["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn malformed_generations_never_invoke() {
        let executor = Arc::new(ScriptedExecutor::new([]));
        let (l, provider) = looped(vec!["not json".into(), "{".into(), "```json []```".into()], executor.clone());

        assert!(run(&l).await.is_none());
        assert_eq!(provider.call_count(), 3);
        assert_eq!(executor.invocations(), 0);
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_with_growing_feedback() {
        let executor = Arc::new(ScriptedExecutor::new([
            api_error(),
            api_error(),
            Reply::Json(json!([{"title": "ok"}])),
        ]));
        let (l, provider) = looped(
            vec![candidate_json("/first"), candidate_json("/second"), candidate_json("/third")],
            executor.clone(),
        );

        let batch = run(&l).await.unwrap();
        assert!(batch.is_success());
        assert_eq!(batch.urls, vec!["/third"]);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(executor.invocations(), 3);

        let prompts = provider.prompts();
        assert!(!prompts[0].contains("resulted in error as"));
        assert!(prompts[1].contains(r#""url":"/first""#));
        assert!(prompts[2].contains(r#""url":"/first""#));
        assert!(prompts[2].contains(r#""url":"/second""#));
        assert!(prompts[2].contains(REFLECTION));
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let executor = Arc::new(ScriptedExecutor::new([Reply::Json(json!({"items": [1]}))]));
        let (l, provider) = looped(vec![candidate_json("/items")], executor.clone());

        let batch = run(&l).await.unwrap();
        assert_eq!(batch.urls, vec!["/items"]);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_first_value_is_a_failure() {
        let executor = Arc::new(ScriptedExecutor::new([
            Reply::Json(json!([])),
            Reply::Json(json!([])),
            Reply::Json(json!([])),
        ]));
        let (l, provider) = looped(vec![candidate_json("/a"); 3], executor.clone());

        let batch = run(&l).await.unwrap();
        assert!(!batch.first_is_truthy());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn multi_candidate_failures_add_no_feedback() {
        let pair = json!([
            {"url": "/a", "method": "GET", "data": {}},
            {"url": "/b", "method": "GET", "data": {}}
        ])
        .to_string();
        let executor = Arc::new(ScriptedExecutor::new([api_error(), api_error(), api_error()]));
        let (l, provider) = looped(vec![pair.clone(), pair.clone(), pair], executor.clone());

        let batch = run(&l).await.unwrap();
        assert_eq!(batch.urls, vec!["/a", "/b"]);
        for prompt in provider.prompts() {
            assert!(!prompt.contains("resulted in error as"));
        }
    }

    #[tokio::test]
    async fn transport_failure_consumes_attempt_and_annotates() {
        let executor = Arc::new(ScriptedExecutor::new([
            Reply::Transport,
            Reply::Json(json!({"ok": true})),
        ]));
        let (l, provider) = looped(vec![candidate_json("/a"), candidate_json("/a")], executor.clone());

        let batch = run(&l).await.unwrap();
        assert!(batch.is_success());
        assert_eq!(provider.call_count(), 2);
        assert!(provider.prompts()[1].contains("connection refused"));
    }

    #[tokio::test]
    async fn exhaustion_returns_last_failed_batch() {
        let executor = Arc::new(ScriptedExecutor::new([api_error(), Reply::Transport]));
        let (l, _) = looped(
            vec![candidate_json("/a"), candidate_json("/b"), "garbage".into()],
            executor.clone(),
        );

        let batch = run(&l).await.unwrap();
        assert_eq!(batch.urls, vec!["/a"]);
        assert_eq!(executor.invocations(), 2);
    }

    #[tokio::test]
    async fn validation_problems_join_the_annotation() {
        let executor = Arc::new(
            ScriptedExecutor::new([api_error(), Reply::Json(json!({"ok": 1}))])
                .with_problems(&["missing required parameter `actorId`"]),
        );
        let (l, provider) = looped(vec![candidate_json("/a"), candidate_json("/a")], executor);

        run(&l).await.unwrap();
        assert!(provider.prompts()[1].contains("missing required parameter `actorId`"));
    }

    #[tokio::test]
    async fn feedback_is_bounded() {
        let executor = Arc::new(ScriptedExecutor::new([api_error(), api_error(), api_error()]));
        let (client, provider) = scripted_client(vec![
            candidate_json("/one"),
            candidate_json("/two"),
            candidate_json("/three"),
        ]);
        let l = SynthesisLoop::new(EndpointSynthesizer::new(client), executor)
            .with_max_retries(3)
            .with_feedback_limit(1);

        run(&l).await;
        let third = &provider.prompts()[2];
        assert!(!third.contains(r#""url":"/one""#));
        assert!(third.contains(r#""url":"/two""#));
    }

    #[tokio::test]
    async fn retry_bound_has_a_floor_of_one() {
        let executor = Arc::new(ScriptedExecutor::new([]));
        let (client, provider) = scripted_client(["nope"]);
        let l = SynthesisLoop::new(EndpointSynthesizer::new(client), executor).with_max_retries(0);

        assert_eq!(l.max_retries(), 1);
        assert!(run(&l).await.is_none());
        assert_eq!(provider.call_count(), 1);
    }
}
