use omni_relay::{RuntimeSettings, run_http};

use crate::relay_builder::build_relay;

pub(crate) async fn run_gateway_mode(
    bind_addr: String,
    deadline_ms: Option<u64>,
    runtime_settings: &RuntimeSettings,
) -> anyhow::Result<()> {
    let relay = build_relay(runtime_settings, deadline_ms)?;
    run_http(relay, &bind_addr).await
}
