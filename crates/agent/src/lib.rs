//! The plan execution engine.
//!
//! A turn runs in two phases:
//!
//! 1. **Plan**: the [`Planner`] turns the user query into
//!    `{"plan": "<tagged step>\n<tagged step>..."}`
//! 2. **Execute**: the [`PlanOrchestrator`] runs every step in order through
//!    the [`StepDispatcher`]; API steps go through the [`SynthesisLoop`],
//!    which generates endpoint calls, executes them, and retries with
//!    reflective feedback until a call succeeds or the attempts run out
//!
//! The [`Conversation`] ties both phases to a memory window that outlives
//! the turn.

pub mod context;
pub mod conversation;
pub mod dispatcher;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod prompts;
pub mod summarizer;
pub mod synthesis_loop;
pub mod synthesizer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::ExecutionContext;
pub use conversation::{Conversation, load_catalog};
pub use dispatcher::StepDispatcher;
pub use orchestrator::PlanOrchestrator;
pub use planner::{Planner, PlannerVariant};
pub use progress::{ChannelProgress, ProgressEvent, TracingProgress};
pub use summarizer::Summarizer;
pub use synthesis_loop::{EndpointExecutor, FeedbackLog, RetryState, SynthesisLoop, parse_generation};
pub use synthesizer::{EndpointSynthesizer, SynthesisRequest};
