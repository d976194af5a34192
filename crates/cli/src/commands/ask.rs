//! `stepwise ask`: one full conversation turn.

use std::path::Path;
use std::sync::Arc;
use stepwise_agent::{ChannelProgress, Conversation, PlannerVariant, ProgressEvent};
use stepwise_config::AppConfig;
use stepwise_core::UserRole;
use tokio::sync::mpsc::UnboundedReceiver;
use super::{load_config, CommandResult};

pub async fn run(
    config_path: Option<&Path>,
    question: &str,
    role: UserRole,
    variant: PlannerVariant,
) -> CommandResult {
    let config = load_config(config_path)?;

    // Check for API key early and give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY, ANTHROPIC_API_KEY, PERPLEXITY_API_KEY, STEPWISE_API_KEY");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let mut conversation = Conversation::from_config(&config, variant)?;
    let (progress, rx) = ChannelProgress::new();
    let printer = tokio::spawn(print_progress(rx));

    let answer = conversation
        .converse(question, role, Arc::new(progress))
        .await;
    // The sink is dropped with the turn, which ends the printer.
    printer.await?;

    println!("{}", answer?);
    Ok(())
}

pub(crate) async fn print_progress(mut rx: UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Announce { channel, message } => eprintln!("  [{channel}] {message}"),
            ProgressEvent::Stream { message } => eprintln!("  - {message}"),
        }
    }
}
