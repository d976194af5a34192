//! End-to-end integration tests for the Stepwise engine.
//!
//! These tests run whole conversation turns: planner output, step dispatch,
//! endpoint synthesis against a real local HTTP API, and summarization.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use stepwise_agent::{
    ChannelProgress, Conversation, EndpointSynthesizer, PlanOrchestrator, Planner, PlannerVariant,
    ProgressEvent, StepDispatcher, Summarizer, SynthesisLoop, load_catalog,
};
use stepwise_config::AppConfig;
use stepwise_core::error::ProviderError;
use stepwise_core::{
    ConversationMemory, Error, Message, ProgressChannel, Provider, ProviderRequest,
    ProviderResponse, UserRole,
};
use stepwise_memory::ConversationWindow;
use stepwise_providers::{CompletionClient, HeuristicTokenCounter};
use stepwise_tools::{ApiCatalog, EndpointInvoker, KeywordRetriever, LlmWebSearch};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request.messages.last().unwrap().content.clone();
        self.prompts.lock().unwrap().push(prompt);
        let text = self
            .responses
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider exhausted");
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: "mock".into(),
        })
    }
}

fn client(provider: &Arc<ScriptedProvider>) -> CompletionClient {
    CompletionClient::new(provider.clone(), "mock")
}

// ── Local API ────────────────────────────────────────────────────────────

async fn runs(
    State(hits): State<Arc<AtomicUsize>>,
    Path(actor_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    hits.fetch_add(1, Ordering::SeqCst);
    if query.get("token").map(String::as_str) != Some("secret") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"type": "unauthorized"}})));
    }
    if actor_id != "apify~web-scraper" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": {"type": "record-not-found"}})));
    }
    (
        StatusCode::OK,
        Json(json!({"data": {"items": [{"id": "run-1", "status": "SUCCEEDED"}]}})),
    )
}

/// Start the API; returns its base URL and hit counter.
async fn spawn_api() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/v2/acts/{actor_id}/runs", get(runs))
        .with_state(hits.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v2"), hits)
}

fn api_spec(base: &str) -> Value {
    json!({
        "openapi": "3.0.0",
        "servers": [{"url": base}],
        "paths": {
            "/acts/{actorId}/runs": {
                "get": {
                    "summary": "Get list of runs",
                    "description": "Gets the list of runs of a specific actor.",
                    "parameters": [
                        {"name": "actorId", "in": "path", "required": true,
                         "description": "Actor ID or a tilde-separated owner's username and actor name"}
                    ]
                }
            }
        }
    })
}

struct Pipeline {
    conversation: Conversation,
    planner: Arc<ScriptedProvider>,
    generator: Arc<ScriptedProvider>,
    summarizer: Arc<ScriptedProvider>,
}

fn pipeline(
    catalog: ApiCatalog,
    plans: &[&str],
    generations: &[&str],
    searches: &[&str],
    summaries: &[&str],
    token_ceiling: usize,
) -> Pipeline {
    let planner = ScriptedProvider::new(plans);
    let generator = ScriptedProvider::new(generations);
    let search = ScriptedProvider::new(searches);
    let summarizer = ScriptedProvider::new(summaries);

    let catalog = Arc::new(catalog);
    let retriever = Arc::new(KeywordRetriever::new().with_catalog(&catalog));
    let invoker = Arc::new(EndpointInvoker::new(catalog.clone(), Some("secret".into())));

    let synthesis = SynthesisLoop::new(EndpointSynthesizer::new(client(&generator)), invoker)
        .with_max_retries(3);
    let dispatcher = StepDispatcher::new(
        retriever.clone(),
        synthesis,
        Arc::new(LlmWebSearch::new(client(&search))),
        Summarizer::new(client(&summarizer), Arc::new(HeuristicTokenCounter))
            .with_token_ceiling(token_ceiling),
    );

    let conversation = Conversation::new(
        Planner::new(client(&planner), retriever).with_endpoints(&catalog.endpoints()),
        PlanOrchestrator::new(dispatcher),
        Box::new(ConversationWindow::new(10)),
    );

    Pipeline {
        conversation,
        planner,
        generator,
        summarizer,
    }
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn api_turn_recovers_from_a_failed_endpoint() {
    let (base, hits) = spawn_api().await;
    let mut catalog = ApiCatalog::new();
    catalog.add(api_spec(&base), None);

    let plan = json!({"plan": "1. [API] list the runs of the actor apify~web-scraper\n2. [Summarization] tell the user how many runs there are"}).to_string();
    let wrong = r#"{"url": "/acts/{actorId}/runs", "method": "GET", "data": {"actorId": "web-scraper"}}"#;
    let right = r#"[{"url": "/acts/{actorId}/runs", "method": "GET", "data": {"actorId": "apify~web-scraper"}}]"#;

    let mut p = pipeline(catalog, &[&plan], &[wrong, right], &[], &["There is one run."], 128_000);
    let (progress, mut rx) = ChannelProgress::new();

    let answer = p
        .conversation
        .converse("how many runs does the web scraper have?", UserRole::Admin, Arc::new(progress))
        .await
        .unwrap();

    assert_eq!(answer, "There is one run.");
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    // Planner saw the catalog's endpoints
    assert!(p.planner.prompts()[0].contains("1. GET /acts/{actorId}/runs: Get list of runs"));

    // First generation saw the retrieved docs; the retry saw the failure
    let generations = p.generator.prompts();
    assert_eq!(generations.len(), 2);
    assert!(generations[0].contains("Path: /acts/{actorId}/runs"));
    assert!(generations[1].contains("resulted in error as"));
    assert!(generations[1].contains("record-not-found"));

    // The summary was built from the API result
    assert!(p.summarizer.prompts()[0].contains("run-1"));

    let events = drain(&mut rx);
    assert!(matches!(
        &events[0],
        ProgressEvent::Announce { channel: ProgressChannel::Planner, message }
            if message.starts_with("I've made a plan with 2 steps")
    ));
    assert!(events.iter().any(|e| e.message().starts_with(
        "Executed /acts/apify~web-scraper/runs with response size of"
    )));

    let history = p.conversation.memory().render();
    assert!(history.starts_with("Human: how many runs does the web scraper have?\nAI: {\"plan\""));
    assert!(history.ends_with("AI: There is one run."));
}

#[tokio::test]
async fn search_then_oversized_summary_degrades() {
    let plan = json!({"plan": "[Search] latest news about web scraping\n[Summarization] answer"}).to_string();
    let mut p = pipeline(
        ApiCatalog::new(),
        &[&plan],
        &[],
        &["Scraping is popular."],
        &[],
        1,
    );

    let answer = p
        .conversation
        .converse("news?", UserRole::Normal, Arc::new(ChannelProgress::new().0))
        .await
        .unwrap();

    assert_eq!(answer, "Cannot process the response right now as it contains too many tokens !");
    assert_eq!(p.summarizer.calls(), 0);
    assert_eq!(p.generator.calls(), 0);
}

#[tokio::test]
async fn malformed_plan_fails_the_turn_after_being_remembered() {
    let mut p = pipeline(ApiCatalog::new(), &["not a plan"], &[], &[], &[], 128_000);

    let err = p
        .conversation
        .converse("hello", UserRole::Admin, Arc::new(ChannelProgress::new().0))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Plan(_)));
    assert_eq!(p.conversation.memory().render(), "Human: hello\nAI: not a plan");
}

#[tokio::test]
async fn exhausted_api_step_hands_last_failure_to_the_summary() {
    let (base, hits) = spawn_api().await;
    let mut catalog = ApiCatalog::new();
    catalog.add(api_spec(&base), None);

    let plan = json!({"plan": "[API] list runs\n[Summarization] answer"}).to_string();
    let wrong = r#"{"url": "/acts/{actorId}/runs", "method": "GET", "data": {"actorId": "nobody"}}"#;
    let mut p = pipeline(catalog, &[&plan], &[wrong, "oops", wrong], &[], &["No data."], 128_000);

    let answer = p
        .conversation
        .converse("runs?", UserRole::Admin, Arc::new(ChannelProgress::new().0))
        .await
        .unwrap();

    assert_eq!(answer, "No data.");
    assert_eq!(p.generator.calls(), 3);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    // The last failed batch is non-empty, so it is kept as the step result
    assert!(p.summarizer.prompts()[0].contains("record-not-found"));
}

#[test]
fn configuration_drives_catalog_and_wiring() {
    let dir = tempfile::tempdir().unwrap();
    let specs = dir.path().join("specs");
    std::fs::create_dir_all(&specs).unwrap();
    std::fs::write(
        specs.join("apify.json"),
        api_spec("https://api.apify.com/v2").to_string(),
    )
    .unwrap();
    std::fs::write(specs.join("broken.json"), "{ not json").unwrap();

    let kb = dir.path().join("kb.txt");
    std::fs::write(&kb, "Actor: a serverless program\n\nRun: one execution of an actor\n").unwrap();

    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
api_key = "sk-test"

[engine]
max_retries = 2

[api]
access_token = "secret"
openapi_spec_dir = {specs:?}

[[knowledge.collections]]
name = "knowledgebase"
location = {kb:?}
kind = "text"
"#
        ),
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    assert_eq!(config.engine.max_retries, 2);

    let catalog = load_catalog(&config).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.endpoints()[0].path, "/acts/{actorId}/runs");

    let conversation = Conversation::from_config(&config, PlannerVariant::SummaryOnly).unwrap();
    assert!(conversation.memory().render().is_empty());
}
