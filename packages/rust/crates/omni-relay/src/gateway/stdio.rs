//! Stdio gateway: read line from stdin → relay turn → print reply.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::relay::Relay;

/// Default session ID when not overridden by flag.
pub const DEFAULT_STDIO_SESSION_ID: &str = "default";

/// Run stdio loop: read lines, relay each, print the reply. Exits on EOF or Ctrl+C.
pub async fn run_stdio(relay: Arc<Relay>, session_id: String) -> Result<()> {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %error, "failed to listen for Ctrl+C; stopping stdio loop");
        }
    };
    run_lines(
        &relay,
        &session_id,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        ctrl_c,
    )
    .await
}

/// Line loop over any reader/writer; stops on EOF or when `shutdown` resolves.
/// A reply already being computed is finished and written before stopping.
pub async fn run_lines<R, W>(
    relay: &Relay,
    session_id: &str,
    input: R,
    mut output: W,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = &mut shutdown => {
                tracing::info!(session_id, "stdio loop interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let out = relay.handle_text(session_id, line).await;
        output.write_all(out.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}
