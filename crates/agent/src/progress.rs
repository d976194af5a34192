//! Progress sinks.
//!
//! `ProgressEvent` is what front-ends receive while a turn runs. Announcements
//! carry one of the named channels (`planner`, `api`, `search`,
//! `summerization`, `clarification`); stream lines carry none.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepwise_core::{ProgressChannel, ProgressSink};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A single progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A status line on a named channel.
    Announce {
        channel: ProgressChannel,
        message: String,
    },
    /// A free-form line such as "Executing task # 2".
    Stream { message: String },
}

impl ProgressEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Announce { channel, .. } => channel.wire_name(),
            Self::Stream { .. } => "stream",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Announce { message, .. } | Self::Stream { message } => message,
        }
    }
}

/// Writes progress to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

#[async_trait]
impl ProgressSink for TracingProgress {
    async fn announce(&self, channel: ProgressChannel, message: &str) {
        info!(%channel, "{message}");
    }

    async fn stream(&self, message: &str) {
        debug!("{message}");
    }
}

/// Forwards progress over an mpsc channel.
///
/// Events are dropped once the receiver is gone; progress never fails a turn.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            debug!("Progress receiver closed");
        }
    }
}

#[async_trait]
impl ProgressSink for ChannelProgress {
    async fn announce(&self, channel: ProgressChannel, message: &str) {
        self.send(ProgressEvent::Announce {
            channel,
            message: message.to_string(),
        });
    }

    async fn stream(&self, message: &str) {
        self.send(ProgressEvent::Stream {
            message: message.to_string(),
        });
    }
}
