//! A scripted model double for tests: returns queued completions in order,
//! with no network I/O.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::llm::base::{ChatInvokeCompletion, ChatMessage, VisionChatModel};

/// Replays a fixed queue of completions, one per call. Panics-free: once
/// exhausted, returns a `ModelError` so callers exercise their fallback
/// path instead of the test harness crashing.
pub struct FakeChatModel {
    model: String,
    queue: Mutex<Vec<String>>,
}

impl FakeChatModel {
    /// Build a double that replays `completions` in order, then errors.
    pub fn scripted(model: impl Into<String>, completions: Vec<String>) -> Self {
        let mut queue = completions;
        queue.reverse();
        Self {
            model: model.into(),
            queue: Mutex::new(queue),
        }
    }

    /// Number of completions left in the queue.
    pub fn remaining(&self) -> usize {
        self.queue.lock().expect("fake model queue poisoned").len()
    }
}

#[async_trait]
impl VisionChatModel for FakeChatModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _max_output_tokens: u32,
        cancel: &CancellationToken,
    ) -> Result<ChatInvokeCompletion> {
        if cancel.is_cancelled() {
            return Err(AgentError::ModelError("request cancelled".into()));
        }
        let mut queue = self.queue.lock().expect("fake model queue poisoned");
        match queue.pop() {
            Some(completion) => Ok(ChatInvokeCompletion::new(completion)),
            None => Err(AgentError::ModelError("fake model queue exhausted".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_completions_in_order_then_errors() {
        let fake = FakeChatModel::scripted("test/fake", vec!["one".into(), "two".into()]);
        let msgs = vec![ChatMessage::user_text("hi")];
        let cancel = CancellationToken::new();

        let first = fake.chat(&msgs, 100, &cancel).await.unwrap();
        assert_eq!(first.completion, "one");

        let second = fake.chat(&msgs, 100, &cancel).await.unwrap();
        assert_eq!(second.completion, "two");

        assert!(fake.chat(&msgs, 100, &cancel).await.is_err());
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_before_the_queue() {
        let fake = FakeChatModel::scripted("test/fake", vec!["one".into()]);
        let msgs = vec![ChatMessage::user_text("hi")];
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(fake.chat(&msgs, 100, &cancel).await.is_err());
        assert_eq!(fake.remaining(), 1);
    }
}
