use std::path::PathBuf;

use clap::{Parser, Subcommand};

use omni_relay::DEFAULT_STDIO_SESSION_ID;

#[derive(Parser)]
#[command(name = "omni-relay")]
#[command(
    about = "Bounded-latency chat relay: answers within a deadline, defers slow completions to a retry keyword."
)]
pub(crate) struct Cli {
    /// Override config directory (`<dir>/omni-relay/settings.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging for omni_relay (ignored when RUST_LOG is set).
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run HTTP server (POST /message, GET /health). Default bind: 0.0.0.0:8080
    Gateway {
        /// Listen address (e.g. 0.0.0.0:8080)
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// Placeholder deadline in milliseconds (default: relay.deadline_ms or 4000)
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Read lines from stdin, relay each, print the reply. Exit on EOF or Ctrl+C.
    Stdio {
        /// Session ID for conversation (default: default)
        #[arg(long, default_value = DEFAULT_STDIO_SESSION_ID)]
        session_id: String,

        /// Placeholder deadline in milliseconds (default: relay.deadline_ms or 4000)
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
}
