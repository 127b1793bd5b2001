//! Completion task: foreground phase under the session gate, then the provider call,
//! then persisting the outcome onto the pending turn.
//!
//! Runs as its own tokio task. It never learns whether the reply path is still open;
//! the orchestrator only flips `deferred` so late completions are logged as such.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use omni_window::{ContextWindow, Turn, WindowLimits, turn_cost};
use uuid::Uuid;

use crate::llm::{CompletionError, CompletionGateway, CompletionRequest};
use crate::observability::RelayEvent;
use crate::session::{SessionGate, TurnStore};

use super::replies::{RATE_LIMITED_MESSAGE, UPSTREAM_ERROR_MESSAGE};

pub(super) struct CompletionTask {
    pub(super) gateway: Arc<dyn CompletionGateway>,
    pub(super) store: Arc<TurnStore>,
    pub(super) gate: SessionGate,
    pub(super) limits: WindowLimits,
    pub(super) session_id: String,
    /// Trimmed question text.
    pub(super) question: String,
    pub(super) arrival_ms: u64,
    pub(super) deferred: Arc<AtomicBool>,
}

impl CompletionTask {
    /// Returns the user-facing text: the answer or an error placeholder.
    pub(super) async fn run(self) -> String {
        let (request, turn_id) = {
            let _guard = self.gate.acquire(&self.session_id).await;
            let request = self.build_request().await;
            (request, self.append_pending().await)
        };
        let session_id = self.session_id.as_str();

        let (text, parent_id) = match self.gateway.submit(request).await {
            Ok(completion) => (completion.text, completion.parent_id),
            Err(CompletionError::RateLimited) => {
                tracing::warn!(
                    event = RelayEvent::CompletionFailed.as_str(),
                    session_id,
                    question = %self.question,
                    reason = "rate_limited",
                    "completion provider rate limited"
                );
                (RATE_LIMITED_MESSAGE.to_string(), None)
            }
            Err(CompletionError::Upstream(cause)) => {
                tracing::warn!(
                    event = RelayEvent::CompletionFailed.as_str(),
                    session_id,
                    question = %self.question,
                    reason = "upstream",
                    error = %cause,
                    "completion provider failed"
                );
                (UPSTREAM_ERROR_MESSAGE.to_string(), None)
            }
        };

        if let Some(turn_id) = turn_id {
            let token_cost = turn_cost(&self.question, &text);
            if let Err(error) = self
                .store
                .attach_answer(session_id, turn_id, &text, token_cost, parent_id)
                .await
            {
                tracing::warn!(
                    event = RelayEvent::TurnPersistFailed.as_str(),
                    session_id,
                    turn_id = %turn_id,
                    error = %error,
                    "failed to persist answer; turn lost for context and retry"
                );
            }
        }

        if self.deferred.load(Ordering::Acquire) {
            tracing::info!(
                event = RelayEvent::TurnCompletedLate.as_str(),
                session_id,
                "deferred completion resolved"
            );
        }
        text
    }

    /// Prompt for the question; purges the session when the window hit an idle gap.
    async fn build_request(&self) -> CompletionRequest {
        let session_id = self.session_id.as_str();
        let history = match self
            .store
            .recent(session_id, self.limits.max_turns.saturating_add(1))
            .await
        {
            Ok(history) => history,
            Err(error) => {
                tracing::warn!(
                    session_id,
                    error = %error,
                    "failed to load history; building context without it"
                );
                Vec::new()
            }
        };
        let window = ContextWindow::build(&history, &self.question, self.arrival_ms, self.limits);
        if window.stop().purges_history() {
            match self.store.clear(session_id).await {
                Ok(()) => tracing::info!(
                    event = RelayEvent::ContextWindowPurged.as_str(),
                    session_id,
                    discarded_turns = history.len(),
                    "idle gap exceeded; session history purged"
                ),
                Err(error) => tracing::warn!(
                    event = RelayEvent::ContextWindowPurged.as_str(),
                    session_id,
                    error = %error,
                    "idle gap exceeded but purge failed"
                ),
            }
        }
        tracing::debug!(
            event = RelayEvent::ContextWindowBuilt.as_str(),
            session_id,
            kept_turns = window.kept_turns(),
            kept_tokens = window.kept_tokens(),
            question_tokens = window.question_tokens(),
            stop = window.stop().as_str(),
            "context window built"
        );
        let parent_id = window.parent_id().map(str::to_string);
        CompletionRequest {
            messages: window.into_messages(),
            parent_id,
        }
    }

    /// `None` when the append failed; the answer is then delivered but not persisted.
    async fn append_pending(&self) -> Option<Uuid> {
        let pending = Turn::pending(&self.session_id, &self.question, self.arrival_ms);
        let pending_id = pending.id;
        match self.store.append(pending).await {
            Ok(()) => Some(pending_id),
            Err(error) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %error,
                    "failed to append pending turn; answer will not be persisted"
                );
                None
            }
        }
    }
}
