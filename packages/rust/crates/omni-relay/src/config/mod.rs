//! Config namespace: relay config and YAML runtime settings.

mod relay;
mod settings;

pub use relay::{DEFAULT_INFERENCE_URL, RelayConfig};
pub use settings::{
    LlmSettings, RelaySettings, RuntimeSettings, StoreSettings, load_runtime_settings,
    load_runtime_settings_from_paths, runtime_settings_paths, set_config_home_override,
};
