//! Relay configuration: completion endpoint, context window bounds, deadline, keywords.

use std::time::Duration;

use omni_window::WindowLimits;
use serde::{Deserialize, Serialize};

use super::settings::RuntimeSettings;

/// Default OpenAI-compatible chat completions endpoint.
pub const DEFAULT_INFERENCE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Runtime configuration for one relay instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Chat completions endpoint (OpenAI-compatible).
    pub inference_url: String,
    /// Model id sent with every request.
    pub model: String,
    /// API key; falls back to `OPENAI_API_KEY` for remote endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// HTTP timeout for one completion request. Detached completions are bounded by this.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Max cumulative token cost of history in one context window.
    #[serde(default = "default_budget_tokens")]
    pub budget_tokens: usize,
    /// Silence (seconds) between adjacent turns that purges a session's history.
    #[serde(default = "default_idle_gap_secs")]
    pub idle_gap_secs: u64,
    /// Max history turns considered per window.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Time (milliseconds) before the placeholder reply is sent.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Text that polls for the latest answer.
    #[serde(default = "default_retry_keyword")]
    pub retry_keyword: String,
    /// Prefix marking administrative commands.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_budget_tokens() -> usize {
    1024
}

fn default_idle_gap_secs() -> u64 {
    600
}

fn default_max_turns() -> usize {
    50
}

fn default_deadline_ms() -> u64 {
    4_000
}

fn default_retry_keyword() -> String {
    "1".to_string()
}

fn default_command_prefix() -> String {
    "/".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            budget_tokens: default_budget_tokens(),
            idle_gap_secs: default_idle_gap_secs(),
            max_turns: default_max_turns(),
            deadline_ms: default_deadline_ms(),
            retry_keyword: default_retry_keyword(),
            command_prefix: default_command_prefix(),
        }
    }
}

impl RelayConfig {
    /// Build config from merged YAML settings; unset keys keep their defaults.
    #[must_use]
    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        let defaults = Self::default();
        let relay = &settings.relay;
        let llm = &settings.llm;
        Self {
            inference_url: non_empty(llm.inference_url.as_deref())
                .unwrap_or(defaults.inference_url),
            model: non_empty(llm.model.as_deref()).unwrap_or(defaults.model),
            api_key: llm
                .api_key_env
                .as_deref()
                .and_then(|name| std::env::var(name).ok())
                .and_then(|key| non_empty(Some(&key))),
            request_timeout_secs: llm
                .request_timeout_secs
                .filter(|v| *v > 0)
                .unwrap_or(defaults.request_timeout_secs),
            budget_tokens: relay.budget_tokens.unwrap_or(defaults.budget_tokens),
            idle_gap_secs: relay.idle_gap_secs.unwrap_or(defaults.idle_gap_secs),
            max_turns: relay.max_turns.unwrap_or(defaults.max_turns),
            deadline_ms: relay
                .deadline_ms
                .filter(|v| *v > 0)
                .unwrap_or(defaults.deadline_ms),
            retry_keyword: non_empty(relay.retry_keyword.as_deref())
                .unwrap_or(defaults.retry_keyword),
            command_prefix: non_empty(relay.command_prefix.as_deref())
                .unwrap_or(defaults.command_prefix),
        }
    }

    /// Window bounds in the units the window builder expects.
    #[must_use]
    pub fn window_limits(&self) -> WindowLimits {
        WindowLimits {
            budget_tokens: self.budget_tokens,
            idle_gap_ms: self.idle_gap_secs.saturating_mul(1_000),
            max_turns: self.max_turns,
        }
    }

    /// Placeholder deadline.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Resolve API key: config value, or `OPENAI_API_KEY`.
    /// Local proxies (127.0.0.1 / localhost) get no key; the proxy holds it.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref k) = self.api_key {
            return Some(k.clone());
        }
        if self.inference_url.contains("127.0.0.1") || self.inference_url.contains("localhost") {
            return None;
        }
        std::env::var("OPENAI_API_KEY").ok()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
