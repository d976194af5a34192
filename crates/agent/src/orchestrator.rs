//! Plan Orchestrator: parses a plan and runs its steps strictly in order.

use std::time::Instant;
use stepwise_core::{Error, Plan, ProgressChannel, TaskResult};
use tracing::info;
use crate::context::ExecutionContext;
use crate::dispatcher::StepDispatcher;

pub struct PlanOrchestrator {
    dispatcher: StepDispatcher,
    seconds_per_step: u64,
}

impl PlanOrchestrator {
    pub fn new(dispatcher: StepDispatcher) -> Self {
        Self {
            dispatcher,
            seconds_per_step: 18,
        }
    }

    /// Duration estimate announced per step.
    pub fn with_seconds_per_step(mut self, seconds: u64) -> Self {
        self.seconds_per_step = seconds;
        self
    }

    /// Execute `plan_text` (`{"plan": "..."}`) and return the output of the
    /// last step that produced one.
    ///
    /// A plan that does not parse is returned as an error before any step
    /// runs. Earlier outputs are only visible through `ctx`.
    pub async fn execute(
        &self,
        plan_text: &str,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Option<TaskResult>, Error> {
        let plan = Plan::parse(plan_text)?;
        let started = Instant::now();
        let steps = plan.len();

        ctx.progress
            .announce(
                ProgressChannel::Planner,
                &format!(
                    "I've made a plan with {steps} steps. It will take me approximately {} seconds to answer your question. Here's the plan: \n\n {}",
                    steps as u64 * self.seconds_per_step,
                    plan.text()
                ),
            )
            .await;

        let mut response = None;
        for step in plan.steps() {
            ctx.progress
                .stream(&format!("Executing task # {}", step.index + 1))
                .await;
            info!(step = step.index, tag = ?step.tag, "Executing step");

            if let Some(output) = self.dispatcher.dispatch(step, ctx).await? {
                response = Some(output);
            }
        }

        info!(
            steps,
            results = ctx.results().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Plan executed"
        );
        Ok(response)
    }
}
