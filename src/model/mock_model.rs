//! # Mock Completion Model for Testing
//!
//! `MockCompletionModel` replays a queue of scripted replies, optionally after
//! a delay, and counts how often it was called.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    one_or_many::OneOrMany,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Error(String),
}

/// Scripted completion model. Once the queue is drained it answers with empty
/// text.
#[derive(Debug, Clone, Default)]
pub struct MockCompletionModel {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockCompletionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_text(&self, text: &str) {
        self.replies.lock().await.push_back(Reply::Text(text.to_string()));
    }

    pub async fn push_error(&self, message: &str) {
        self.replies
            .lock()
            .await
            .push_back(Reply::Error(message.to_string()));
    }

    /// Number of completion requests received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().await.pop_front();
        match reply {
            Some(Reply::Error(message)) => Err(CompletionError::ProviderError(message)),
            Some(Reply::Text(text)) => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text(&text)),
                raw_response: text,
            }),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: String::new(),
            }),
        }
    }
}
