//! omni-relay CLI: HTTP gateway or stdio mode.
//!
//! Settings from `packages/conf/settings.yaml` merged with `<conf>/omni-relay/settings.yaml`.
//!
//! Logging: set `RUST_LOG=omni_relay=info` (or `warn`, `debug`) to see relay logs on stderr.

mod cli;
mod nodes;
mod relay_builder;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_relay::{load_runtime_settings, set_config_home_override};

use crate::cli::{Cli, Command};
use crate::nodes::{run_gateway_mode, run_stdio_mode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_relay=debug"
        } else {
            "omni_relay=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let runtime_settings = load_runtime_settings();

    match cli.command {
        Command::Gateway { bind, deadline_ms } => {
            run_gateway_mode(bind, deadline_ms, &runtime_settings).await
        }
        Command::Stdio {
            session_id,
            deadline_ms,
        } => run_stdio_mode(session_id, deadline_ms, &runtime_settings).await,
    }
}
