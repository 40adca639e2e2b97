use super::{ChatMessage, LlmClient};
use crate::errors::CoreError;
use crate::model::LlmResponse;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Scripted client for tests and offline runs. Replies are served in order;
/// once the script is exhausted every call fails as unavailable.
#[derive(Default)]
pub struct FakeClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    pub fn with_failure(self, reason: impl Into<String>) -> Self {
        self.push(Err(reason.into()));
        self
    }

    fn push(&self, entry: Result<String, String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(entry);
    }

    /// Every message list this client was called with.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<LlmResponse, CoreError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(Ok(text)) => Ok(LlmResponse {
                text,
                provider: self.provider_name().to_string(),
                model: "fake".to_string(),
            }),
            Some(Err(reason)) => Err(CoreError::CompletionServiceUnavailable(reason)),
            None => Err(CoreError::CompletionServiceUnavailable(
                "fake client script exhausted".into(),
            )),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
