//! Response orchestration: commands, retry polls, and the deadline race for questions.
//!
//! A question is answered by whichever resolves first: the completion task (context build,
//! pending-turn append, provider call, answer persist) or the deadline timer. A losing
//! completion task is never aborted; its [`tokio::task::JoinHandle`] is dropped and the
//! task persists its answer through `attach_answer` on its own.

mod completion;
mod replies;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use omni_window::Turn;

use crate::commands::{RelayCommand, detect_command};
use crate::config::RelayConfig;
use crate::llm::{CompletionGateway, LlmClient};
use crate::observability::RelayEvent;
use crate::session::{SessionGate, TurnStore};

use completion::CompletionTask;
pub use replies::{
    CLEAR_MESSAGE, RATE_LIMITED_MESSAGE, RECAP_SEPARATOR, STORE_UNAVAILABLE_MESSAGE,
    UPSTREAM_ERROR_MESSAGE, help_message, nothing_yet_message, processing_message,
    recap_message, unsupported_message,
};

/// One inbound message for the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundTurn {
    /// Session the message belongs to.
    pub session_id: String,
    /// Raw message text.
    pub text: String,
    /// Arrival time, epoch milliseconds.
    pub arrival_ms: u64,
}

impl InboundTurn {
    /// Inbound turn stamped with the current wall clock.
    pub fn now(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            text: text.into(),
            arrival_ms: epoch_millis(),
        }
    }
}

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Completion won the race; the reply is its text.
    Delivered,
    /// Deadline won; the reply is the processing placeholder.
    Deferred,
    /// Retry keyword: recap or "nothing yet".
    Retried,
    /// Administrative command.
    Command(RelayCommand),
}

/// Reply text plus the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReply {
    /// User-facing text.
    pub text: String,
    /// Path taken.
    pub outcome: TurnOutcome,
}

impl RelayReply {
    fn new(text: impl Into<String>, outcome: TurnOutcome) -> Self {
        Self {
            text: text.into(),
            outcome,
        }
    }
}

/// Orchestrator shared by every inbound surface.
pub struct Relay {
    config: RelayConfig,
    store: Arc<TurnStore>,
    gateway: Arc<dyn CompletionGateway>,
    gate: SessionGate,
}

impl Relay {
    /// Wire the orchestrator with an explicit gateway.
    pub fn new(
        config: RelayConfig,
        store: Arc<TurnStore>,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
            gate: SessionGate::default(),
        }
    }

    /// Wire the orchestrator with the HTTP chat-completions client described by `config`.
    pub fn from_config(config: RelayConfig, store: Arc<TurnStore>) -> Self {
        let gateway = LlmClient::new(
            config.inference_url.clone(),
            config.model.clone(),
            config.resolve_api_key(),
            Duration::from_secs(config.request_timeout_secs),
        );
        Self::new(config, store, Arc::new(gateway))
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Underlying turn store.
    #[must_use]
    pub fn store(&self) -> &Arc<TurnStore> {
        &self.store
    }

    /// Usage text for this relay's keyword and prefix.
    #[must_use]
    pub fn help_message(&self) -> String {
        help_message(&self.config.retry_keyword, &self.config.command_prefix)
    }

    /// Handle `text` for `session_id`, stamped with the current time.
    pub async fn handle_text(&self, session_id: &str, text: &str) -> String {
        self.handle(InboundTurn::now(session_id, text)).await.text
    }

    /// Handle one inbound message. Always returns user-facing text.
    pub async fn handle(&self, inbound: InboundTurn) -> RelayReply {
        if let Some(command) = detect_command(&inbound.text, &self.config.command_prefix) {
            return self.dispatch_command(&inbound.session_id, command).await;
        }
        if inbound.text.trim() == self.config.retry_keyword {
            return self.recap(&inbound.session_id).await;
        }
        self.ask(inbound).await
    }

    async fn dispatch_command(&self, session_id: &str, command: RelayCommand) -> RelayReply {
        tracing::info!(
            event = RelayEvent::CommandDispatched.as_str(),
            session_id,
            command = command.as_str(),
            "relay command dispatched"
        );
        let text = match command {
            RelayCommand::Help => self.help_message(),
            RelayCommand::Clear => self.clear(session_id).await,
        };
        RelayReply::new(text, TurnOutcome::Command(command))
    }

    /// Clear under the gate. Past the deadline the clear keeps running detached.
    async fn clear(&self, session_id: &str) -> String {
        let store = Arc::clone(&self.store);
        let gate = self.gate.clone();
        let owned_session = session_id.to_string();
        let clearing = tokio::spawn(async move {
            let _guard = gate.acquire(&owned_session).await;
            store.clear(&owned_session).await
        });
        match tokio::time::timeout(self.config.deadline(), clearing).await {
            Ok(Ok(Ok(()))) => CLEAR_MESSAGE.to_string(),
            Ok(Ok(Err(error))) => {
                tracing::warn!(session_id, error = %error, "failed to clear session turns");
                STORE_UNAVAILABLE_MESSAGE.to_string()
            }
            Ok(Err(error)) => {
                tracing::warn!(session_id, error = %error, "clear task failed to join");
                STORE_UNAVAILABLE_MESSAGE.to_string()
            }
            Err(_) => {
                tracing::warn!(session_id, "clear still running at deadline");
                STORE_UNAVAILABLE_MESSAGE.to_string()
            }
        }
    }

    async fn recap(&self, session_id: &str) -> RelayReply {
        let keyword = self.config.retry_keyword.as_str();
        let lookup = tokio::time::timeout(self.config.deadline(), self.store.latest(session_id));
        let latest = match lookup.await {
            Ok(Ok(latest)) => latest,
            Ok(Err(error)) => {
                tracing::warn!(session_id, error = %error, "failed to load latest turn");
                None
            }
            Err(_) => {
                tracing::warn!(session_id, "latest turn lookup exceeded the deadline");
                None
            }
        };
        let text = match latest {
            Some(Turn {
                question,
                answer: Some(answer),
                ..
            }) => {
                tracing::info!(
                    event = RelayEvent::RetryRecapServed.as_str(),
                    session_id,
                    "retry keyword served recap"
                );
                recap_message(&question, &answer)
            }
            _ => {
                tracing::info!(
                    event = RelayEvent::RetryNothingYet.as_str(),
                    session_id,
                    "retry keyword found no answer yet"
                );
                nothing_yet_message(keyword)
            }
        };
        RelayReply::new(text, TurnOutcome::Retried)
    }

    async fn ask(&self, inbound: InboundTurn) -> RelayReply {
        let deadline = tokio::time::sleep(self.config.deadline());
        tokio::pin!(deadline);

        let InboundTurn {
            session_id,
            text,
            arrival_ms,
        } = inbound;
        let deferred = Arc::new(AtomicBool::new(false));
        // Gate wait, store I/O and the provider call all run inside the task,
        // so the deadline bounds every one of them.
        let task = CompletionTask {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            gate: self.gate.clone(),
            limits: self.config.window_limits(),
            session_id: session_id.clone(),
            question: text.trim().to_string(),
            arrival_ms,
            deferred: Arc::clone(&deferred),
        };
        let mut handle = tokio::spawn(task.run());

        tokio::select! {
            biased;
            joined = &mut handle => match joined {
                Ok(text) => {
                    tracing::info!(
                        event = RelayEvent::TurnDelivered.as_str(),
                        session_id = %session_id,
                        "completion delivered before deadline"
                    );
                    RelayReply::new(text, TurnOutcome::Delivered)
                }
                Err(error) => {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %error,
                        "completion task failed to join"
                    );
                    RelayReply::new(UPSTREAM_ERROR_MESSAGE, TurnOutcome::Delivered)
                }
            },
            () = &mut deadline => {
                deferred.store(true, Ordering::Release);
                tracing::info!(
                    event = RelayEvent::TurnDeferred.as_str(),
                    session_id = %session_id,
                    deadline_ms = self.config.deadline_ms,
                    "deadline reached; completion continues detached"
                );
                drop(handle);
                RelayReply::new(
                    processing_message(&self.config.retry_keyword),
                    TurnOutcome::Deferred,
                )
            }
        }
    }
}

/// Current wall clock in epoch milliseconds; 0 if the clock reads before the epoch.
#[must_use]
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
