use omni_relay::{RuntimeSettings, run_stdio};

use crate::relay_builder::build_relay;

pub(crate) async fn run_stdio_mode(
    session_id: String,
    deadline_ms: Option<u64>,
    runtime_settings: &RuntimeSettings,
) -> anyhow::Result<()> {
    let relay = build_relay(runtime_settings, deadline_ms)?;
    tracing::info!(session_id = %session_id, "stdio relay ready (EOF or Ctrl+C to exit)");
    run_stdio(relay, session_id).await
}
