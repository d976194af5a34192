//! Conversation memory implementations for Stepwise.

pub mod noop;
pub mod window;

pub use noop::NoopMemory;
pub use window::{ConversationWindow, Exchange};
