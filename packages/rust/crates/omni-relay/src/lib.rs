//! Bounded-latency relay between chat users and a slow completion provider.
//!
//! - Turn store (in-memory or Valkey) holding each session's ordered turn log.
//! - Context window from `omni-window`: budget, turn-count and idle-gap bounded history.
//! - Orchestrator racing each completion against a deadline; late answers are fetched
//!   with the retry keyword.
//! - HTTP and stdio gateways.

mod commands;
mod config;
mod gateway;
mod llm;
mod observability;
mod relay;
mod session;
#[doc(hidden)]
pub mod test_support;

pub use commands::{RelayCommand, detect_command};
pub use config::{
    DEFAULT_INFERENCE_URL, LlmSettings, RelayConfig, RelaySettings, RuntimeSettings,
    StoreSettings, load_runtime_settings, load_runtime_settings_from_paths,
    runtime_settings_paths, set_config_home_override,
};
pub use gateway::{
    DEFAULT_STDIO_SESSION_ID, GatewayHealthResponse, GatewayState, InboundMessage,
    MessageRequest, MessageResponse, router, run_http, run_lines, run_stdio,
    validate_message_request,
};
pub use llm::{Completion, CompletionError, CompletionGateway, CompletionRequest, LlmClient};
pub use relay::{
    CLEAR_MESSAGE, InboundTurn, RATE_LIMITED_MESSAGE, RECAP_SEPARATOR, Relay, RelayReply,
    STORE_UNAVAILABLE_MESSAGE, TurnOutcome, UPSTREAM_ERROR_MESSAGE, epoch_millis, help_message,
    nothing_yet_message, processing_message, recap_message, unsupported_message,
};
pub use session::{SessionGate, SessionGuard, StoreError, TurnStore};
