//! `stepwise execute`: run a plan document without the planner.

use std::path::Path;
use std::sync::Arc;
use stepwise_agent::{ChannelProgress, Conversation, PlannerVariant};
use stepwise_core::UserRole;
use super::ask::print_progress;
use super::{load_config, CommandResult};

pub async fn run(config_path: Option<&Path>, plan_path: &Path, query: &str, role: UserRole) -> CommandResult {
    let config = load_config(config_path)?;
    let plan = std::fs::read_to_string(plan_path)
        .map_err(|e| format!("Failed to read plan {}: {e}", plan_path.display()))?;

    let mut conversation = Conversation::from_config(&config, PlannerVariant::WithApis)?;
    let (progress, rx) = ChannelProgress::new();
    let printer = tokio::spawn(print_progress(rx));

    let answer = conversation
        .execute_plan(&plan, query, role, Arc::new(progress))
        .await;
    printer.await?;

    println!("{}", answer?);
    Ok(())
}
