//! Scripted completion gateway for integration tests.
//!
//! Each `submit` pops the next scripted reply, sleeps its delay on the tokio clock, then
//! returns its result. Requests are recorded before the delay starts.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{Completion, CompletionError, CompletionGateway, CompletionRequest};

struct ScriptedReply {
    delay: Duration,
    result: Result<Completion, CompletionError>,
}

/// Fake gateway returning canned results in order.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGateway {
    /// Empty script; every call fails with `Upstream` until replies are pushed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer after `delay`.
    #[must_use]
    pub fn answer(self, delay: Duration, text: &str) -> Self {
        self.push(delay, Ok(Completion {
            text: text.to_string(),
            parent_id: None,
        }))
    }

    /// Queue an answer carrying a continuation handle.
    #[must_use]
    pub fn answer_with_parent(self, delay: Duration, text: &str, parent_id: &str) -> Self {
        self.push(delay, Ok(Completion {
            text: text.to_string(),
            parent_id: Some(parent_id.to_string()),
        }))
    }

    /// Queue a failure after `delay`.
    #[must_use]
    pub fn fail(self, delay: Duration, error: CompletionError) -> Self {
        self.push(delay, Err(error))
    }

    fn push(self, delay: Duration, result: Result<Completion, CompletionError>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(ScriptedReply { delay, result });
        self
    }

    /// Requests seen so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn submit(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(reply) = next else {
            return Err(CompletionError::Upstream("script exhausted".to_string()));
        };
        tokio::time::sleep(reply.delay).await;
        reply.result
    }
}
