//! Stable event names attached to structured log records (`event = ...`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelayEvent {
    StoreBackendEnabled,
    StoreTurnAppended,
    StoreTurnsLoaded,
    StoreAnswerAttached,
    StoreCleared,
    StoreValkeyConnected,
    StoreValkeyCommandFailed,
    ContextWindowBuilt,
    ContextWindowPurged,
    TurnDelivered,
    TurnDeferred,
    TurnCompletedLate,
    TurnPersistFailed,
    CompletionFailed,
    RetryRecapServed,
    RetryNothingYet,
    CommandDispatched,
    GatewayListening,
    GatewayStopped,
}

impl RelayEvent {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::StoreBackendEnabled => "relay.store.backend_enabled",
            Self::StoreTurnAppended => "relay.store.turn_appended",
            Self::StoreTurnsLoaded => "relay.store.turns_loaded",
            Self::StoreAnswerAttached => "relay.store.answer_attached",
            Self::StoreCleared => "relay.store.cleared",
            Self::StoreValkeyConnected => "relay.store.valkey_connected",
            Self::StoreValkeyCommandFailed => "relay.store.valkey_command_failed",
            Self::ContextWindowBuilt => "relay.context_window.built",
            Self::ContextWindowPurged => "relay.context_window.purged",
            Self::TurnDelivered => "relay.turn.delivered",
            Self::TurnDeferred => "relay.turn.deferred",
            Self::TurnCompletedLate => "relay.turn.completed_late",
            Self::TurnPersistFailed => "relay.turn.persist_failed",
            Self::CompletionFailed => "relay.completion.failed",
            Self::RetryRecapServed => "relay.retry.recap_served",
            Self::RetryNothingYet => "relay.retry.nothing_yet",
            Self::CommandDispatched => "relay.command.dispatched",
            Self::GatewayListening => "relay.gateway.listening",
            Self::GatewayStopped => "relay.gateway.stopped",
        }
    }
}
