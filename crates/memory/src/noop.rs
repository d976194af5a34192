//! No-op memory: disables conversation history entirely.

use stepwise_core::ConversationMemory;

/// Conversation memory that stores nothing. Used for one-off plan runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMemory;

impl ConversationMemory for NoopMemory {
    fn save_context(&mut self, _input: &str, _output: &str) {}

    fn render(&self) -> String {
        String::new()
    }

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_nothing() {
        let mut mem = NoopMemory;
        mem.save_context("q", "a");
        assert!(mem.render().is_empty());
    }
}
