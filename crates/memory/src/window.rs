//! Windowed conversation memory: keeps the last `k` exchanges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use stepwise_core::ConversationMemory;

/// One input/output pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub input: String,
    pub output: String,
    pub at: DateTime<Utc>,
}

/// Conversation memory holding at most `k` exchanges; the oldest is
/// dropped when a new one would exceed the window.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    k: usize,
    exchanges: VecDeque<Exchange>,
}

impl ConversationWindow {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            exchanges: VecDeque::with_capacity(k),
        }
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }
}

impl Default for ConversationWindow {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ConversationMemory for ConversationWindow {
    fn save_context(&mut self, input: &str, output: &str) {
        if self.k == 0 {
            return;
        }
        while self.exchanges.len() >= self.k {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange {
            input: input.to_string(),
            output: output.to_string(),
            at: Utc::now(),
        });
    }

    fn render(&self) -> String {
        self.exchanges
            .iter()
            .map(|e| format!("Human: {}\nAI: {}", e.input, e.output))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn clear(&mut self) {
        self.exchanges.clear();
    }
}
