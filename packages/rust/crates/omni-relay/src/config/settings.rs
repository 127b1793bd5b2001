//! YAML settings for the relay: `relay`, `llm` and `store` sections.
//!
//! Two files are read, later keys winning:
//! 1. `<PRJ_ROOT>/packages/conf/settings.yaml` (shipped defaults)
//! 2. `<config home>/omni-relay/settings.yaml`, where config home is `--conf`,
//!    else `PRJ_CONFIG_HOME`, else `.config` under the project root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

const SYSTEM_SETTINGS_FILE: &str = "packages/conf/settings.yaml";
const USER_SETTINGS_FILE: &str = "omni-relay/settings.yaml";
const FALLBACK_CONFIG_HOME: &str = ".config";
static CONF_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Merged settings file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    /// Window, deadline and keyword options.
    #[serde(default)]
    pub relay: RelaySettings,
    /// Completion provider options.
    #[serde(default)]
    pub llm: LlmSettings,
    /// Turn store backend options.
    #[serde(default)]
    pub store: StoreSettings,
}

/// `relay:` section; see `RelayConfig` for meanings and defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelaySettings {
    /// Token budget per context window.
    pub budget_tokens: Option<usize>,
    /// Silence (seconds) that purges a session's history.
    pub idle_gap_secs: Option<u64>,
    /// Max history turns per window.
    pub max_turns: Option<usize>,
    /// Placeholder deadline in milliseconds.
    pub deadline_ms: Option<u64>,
    /// Text that polls for the latest answer.
    pub retry_keyword: Option<String>,
    /// Prefix marking administrative commands.
    pub command_prefix: Option<String>,
}

/// `llm:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmSettings {
    /// Chat completions endpoint.
    pub inference_url: Option<String>,
    /// Model id.
    pub model: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// HTTP timeout for one completion request.
    pub request_timeout_secs: Option<u64>,
}

/// `store:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    /// `memory`, `valkey`, or `auto` (valkey when a URL is configured).
    pub backend: Option<String>,
    /// Valkey URL; `VALKEY_URL` wins.
    pub valkey_url: Option<String>,
    /// Key prefix; `OMNI_RELAY_STORE_PREFIX` wins.
    pub key_prefix: Option<String>,
    /// Key expiry in seconds; `OMNI_RELAY_STORE_TTL_SECS` wins.
    pub ttl_secs: Option<u64>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            relay: self.relay.merge(overlay.relay),
            llm: self.llm.merge(overlay.llm),
            store: self.store.merge(overlay.store),
        }
    }
}

impl RelaySettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            budget_tokens: overlay.budget_tokens.or(self.budget_tokens),
            idle_gap_secs: overlay.idle_gap_secs.or(self.idle_gap_secs),
            max_turns: overlay.max_turns.or(self.max_turns),
            deadline_ms: overlay.deadline_ms.or(self.deadline_ms),
            retry_keyword: overlay.retry_keyword.or(self.retry_keyword),
            command_prefix: overlay.command_prefix.or(self.command_prefix),
        }
    }
}

impl LlmSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            inference_url: overlay.inference_url.or(self.inference_url),
            model: overlay.model.or(self.model),
            api_key_env: overlay.api_key_env.or(self.api_key_env),
            request_timeout_secs: overlay.request_timeout_secs.or(self.request_timeout_secs),
        }
    }
}

impl StoreSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            backend: overlay.backend.or(self.backend),
            valkey_url: overlay.valkey_url.or(self.valkey_url),
            key_prefix: overlay.key_prefix.or(self.key_prefix),
            ttl_secs: overlay.ttl_secs.or(self.ttl_secs),
        }
    }
}

/// Read both settings files and merge them.
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system, user) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system, &user)
}

/// `(system, user)` settings file locations for the current environment.
#[doc(hidden)]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = env_path("PRJ_ROOT")
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let config_home = CONF_DIR
        .get()
        .cloned()
        .or_else(|| env_path("PRJ_CONFIG_HOME"))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_CONFIG_HOME));
    // `join` keeps absolute config homes as they are.
    let user = root.join(config_home).join(USER_SETTINGS_FILE);
    (root.join(SYSTEM_SETTINGS_FILE), user)
}

/// Merge `user` over `system`; absent, unreadable or malformed files count as empty.
#[doc(hidden)]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    [system, user]
        .into_iter()
        .filter_map(read_settings_file)
        .fold(RuntimeSettings::default(), RuntimeSettings::merge)
}

fn read_settings_file(path: &Path) -> Option<RuntimeSettings> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "settings file unreadable; skipped"
            );
            return None;
        }
    };
    serde_yaml::from_str(&raw)
        .map_err(|error| {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "settings yaml invalid; skipped"
            );
        })
        .ok()
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Pin the config home (CLI `--conf`). Relative paths resolve against the project root.
/// Only the first call takes effect.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if let Err(rejected) = CONF_DIR.set(path)
        && CONF_DIR.get() != Some(&rejected)
    {
        tracing::warn!(
            ignored = %rejected.display(),
            "config home already pinned; keeping the first value"
        );
    }
}
