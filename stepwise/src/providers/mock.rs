//! Scripted model for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{ChatMessage, GenerateOptions, Model, ModelResponse, TokenUsage};
use crate::error::LlmError;

/// A [`Model`] that replays queued replies and records every request.
///
/// When the queue is empty the fallback reply is returned, or an error if
/// none was set.
#[derive(Debug, Default)]
pub struct MockModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockModel {
    /// Create a mock with no queued replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that always answers `reply`.
    #[must_use]
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Queue a text reply.
    #[must_use]
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.lock_replies().push_back(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_error(self, error: LlmError) -> Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    /// Messages of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Model for MockModel {
    fn model_id(&self) -> &str {
        "mock"
    }

    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        _options: GenerateOptions,
    ) -> Result<ModelResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages);

        let next = self.lock_replies().pop_front();
        let text = match next {
            Some(reply) => reply?,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::internal("mock model has no reply queued"))?,
        };

        Ok(ModelResponse::new(ChatMessage::assistant(text)).with_token_usage(TokenUsage::new(1, 1)))
    }
}
