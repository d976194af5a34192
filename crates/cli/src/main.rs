//! Stepwise CLI: the main entry point.
//!
//! Commands:
//! - `ask`      Plan, execute and answer a question
//! - `execute`  Run a plan document
//! - `catalog`  List the endpoints of the loaded OpenAPI documents
//! - `init`     Write the default configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stepwise_agent::PlannerVariant;

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Stepwise: plan, call APIs, and answer",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ~/.stepwise/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question: plan, execute, summarize
    Ask {
        question: String,

        /// Role of the user the answer is for
        #[arg(short, long, default_value = "Admin")]
        role: String,

        /// Planner prompt: with-apis or summary-only
        #[arg(short, long, default_value = "with-apis")]
        planner: PlannerVariant,
    },

    /// Execute a plan document ({"plan": "..."})
    Execute {
        plan: PathBuf,

        /// The query the plan answers
        #[arg(short, long, default_value = "")]
        query: String,

        #[arg(short, long, default_value = "Admin")]
        role: String,
    },

    /// List the endpoints of the loaded OpenAPI documents
    Catalog,

    /// Write the default configuration file
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Ask {
            question,
            role,
            planner,
        } => commands::ask::run(config, &question, role.into(), planner).await,
        Commands::Execute { plan, query, role } => {
            commands::execute::run(config, &plan, &query, role.into()).await
        }
        Commands::Catalog => commands::catalog::run(config),
        Commands::Init => commands::init::run(config),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Sorry, something went wrong while answering your question. Please try again.");
        eprintln!("  details: {e}");
        std::process::exit(1);
    }
}
