use std::sync::Arc;

use anyhow::{Context, Result};
use omni_relay::{Relay, RelayConfig, RuntimeSettings, TurnStore};

/// Wire store, gateway client and orchestrator from merged settings.
pub(crate) fn build_relay(
    runtime_settings: &RuntimeSettings,
    deadline_ms: Option<u64>,
) -> Result<Arc<Relay>> {
    let mut config = RelayConfig::from_settings(runtime_settings);
    if let Some(ms) = deadline_ms.filter(|ms| *ms > 0) {
        config.deadline_ms = ms;
    }
    let store = TurnStore::from_settings(&runtime_settings.store)
        .context("failed to initialize turn store")?;
    tracing::debug!(
        inference_url = %config.inference_url,
        model = %config.model,
        deadline_ms = config.deadline_ms,
        budget_tokens = config.budget_tokens,
        idle_gap_secs = config.idle_gap_secs,
        "relay configured"
    );
    Ok(Arc::new(Relay::from_config(config, Arc::new(store))))
}
