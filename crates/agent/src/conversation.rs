//! Conversation service: one planner call plus one plan execution per turn.
//!
//! The conversation owns the memory window, so history carries across
//! turns while each turn gets its own [`ExecutionContext`].

use std::sync::Arc;
use std::time::Instant;
use stepwise_config::{AppConfig, ModelRole};
use stepwise_core::{ConversationMemory, Error, ProgressSink, TaskResult, UserRole};
use stepwise_memory::ConversationWindow;
use stepwise_providers::{build_from_config, HeuristicTokenCounter};
use stepwise_tools::{ApiCatalog, EndpointInvoker, KeywordRetriever, LlmWebSearch};
use tracing::{info, warn};
use uuid::Uuid;
use crate::context::ExecutionContext;
use crate::dispatcher::StepDispatcher;
use crate::orchestrator::PlanOrchestrator;
use crate::planner::{Planner, PlannerVariant};
use crate::prompts;
use crate::summarizer::Summarizer;
use crate::synthesis_loop::SynthesisLoop;
use crate::synthesizer::EndpointSynthesizer;

pub struct Conversation {
    id: Uuid,
    planner: Planner,
    orchestrator: PlanOrchestrator,
    memory: Box<dyn ConversationMemory>,
}

impl Conversation {
    pub fn new(
        planner: Planner,
        orchestrator: PlanOrchestrator,
        memory: Box<dyn ConversationMemory>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            planner,
            orchestrator,
            memory,
        }
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(config: &AppConfig, variant: PlannerVariant) -> Result<Self, Error> {
        let router = build_from_config(config);
        let catalog = Arc::new(load_catalog(config)?);

        let mut retriever = KeywordRetriever::new().with_catalog(&catalog);
        for collection in &config.knowledge.collections {
            retriever.load_collection(collection)?;
        }
        let retriever = Arc::new(retriever);

        let mut synthesizer = EndpointSynthesizer::new(router.client_for(config, ModelRole::Generator)?);
        if let Some(path) = &config.api.response_schema_path {
            synthesizer = synthesizer.with_response_schema(prompts::load_schema(path)?);
        }
        let invoker = Arc::new(EndpointInvoker::from_config(config, catalog.clone()));
        let synthesis = SynthesisLoop::new(synthesizer, invoker)
            .with_max_retries(config.engine.max_retries)
            .with_feedback_limit(config.engine.feedback_limit);

        let search = Arc::new(LlmWebSearch::new(router.client_for(config, ModelRole::Search)?));
        let summarizer = Summarizer::new(
            router.client_for(config, ModelRole::Summarizer)?,
            Arc::new(HeuristicTokenCounter),
        )
        .with_token_ceiling(config.engine.token_ceiling)
        .with_max_tokens(config.engine.summarizer_max_tokens);

        let dispatcher = StepDispatcher::new(retriever.clone(), synthesis, search, summarizer)
            .with_search_context_chars(config.engine.search_context_chars);
        let orchestrator =
            PlanOrchestrator::new(dispatcher).with_seconds_per_step(config.engine.seconds_per_step);

        let planner = Planner::new(router.client_for(config, ModelRole::Planner)?, retriever)
            .with_variant(variant)
            .with_max_tokens(config.engine.planner_max_tokens)
            .with_endpoints(&catalog.endpoints());

        info!(
            documents = catalog.len(),
            providers = ?router.list(),
            "Conversation ready"
        );
        Ok(Self::new(
            planner,
            orchestrator,
            Box::new(ConversationWindow::new(config.memory.window)),
        ))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn memory(&self) -> &dyn ConversationMemory {
        self.memory.as_ref()
    }

    /// Answer `query`: plan, remember the plan, execute it.
    pub async fn converse(
        &mut self,
        query: &str,
        role: UserRole,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<String, Error> {
        let started = Instant::now();
        info!(conversation = %self.id, %role, "Conversation turn started");

        let plan = self.planner.plan(query, &role, self.memory.as_ref()).await?;
        info!(conversation = %self.id, %plan, "Planner response");
        if plan.is_empty() {
            warn!(conversation = %self.id, "Planner returned an empty plan");
        } else {
            self.memory.save_context(query, &plan);
        }

        let response = self.run(&plan, query, role, progress).await?;
        info!(
            conversation = %self.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Conversation turn finished"
        );
        Ok(response)
    }

    /// Execute an already produced plan as one turn.
    pub async fn execute_plan(
        &mut self,
        plan: &str,
        query: &str,
        role: UserRole,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<String, Error> {
        self.run(plan, query, role, progress).await
    }

    async fn run(
        &mut self,
        plan: &str,
        query: &str,
        role: UserRole,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<String, Error> {
        let mut ctx = ExecutionContext::new(query, role, progress, self.memory.as_mut());
        let response = self.orchestrator.execute(plan, &mut ctx).await?;
        Ok(response.as_ref().map(TaskResult::to_string).unwrap_or_default())
    }
}

/// The OpenAPI documents under `[api].openapi_spec_dir`, or an empty catalog.
pub fn load_catalog(config: &AppConfig) -> Result<ApiCatalog, Error> {
    match &config.api.openapi_spec_dir {
        Some(dir) => Ok(ApiCatalog::load_dir(dir)?),
        None => {
            warn!("No OpenAPI spec directory configured; API steps have no documentation");
            Ok(ApiCatalog::new())
        }
    }
}
