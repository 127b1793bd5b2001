//! Stdio gateway: line loop over in-memory readers, EOF and shutdown handling.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use omni_relay::test_support::ScriptedGateway;
use omni_relay::{DEFAULT_STDIO_SESSION_ID, Relay, RelayConfig, TurnStore, run_lines};
use tokio::io::BufReader;

fn test_relay(gateway: ScriptedGateway) -> Relay {
    Relay::new(
        RelayConfig::default(),
        Arc::new(TurnStore::new()),
        Arc::new(gateway),
    )
}

#[test]
fn default_stdio_session_id() {
    assert_eq!(DEFAULT_STDIO_SESSION_ID, "default");
}

#[tokio::test]
async fn replies_once_per_non_empty_line_until_eof() -> Result<()> {
    let relay = test_relay(ScriptedGateway::new().answer(Duration::from_millis(5), "hi"));
    let mut output = Vec::new();

    run_lines(
        &relay,
        "s1",
        &b"hello\n\n   \n/help\n"[..],
        &mut output,
        std::future::pending(),
    )
    .await?;

    let printed = String::from_utf8(output)?;
    let expected = format!("hi\n{}\n", relay.help_message());
    assert_eq!(printed, expected);
    assert_eq!(relay.store().len("s1").await?, 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_signal_ends_loop_while_input_is_open() -> Result<()> {
    let relay = test_relay(ScriptedGateway::new());
    let (_writer, reader) = tokio::io::duplex(64);
    let mut output = Vec::new();

    let finished = tokio::time::timeout(
        Duration::from_secs(2),
        run_lines(
            &relay,
            "s1",
            BufReader::new(reader),
            &mut output,
            tokio::time::sleep(Duration::from_millis(50)),
        ),
    )
    .await;

    assert!(matches!(finished, Ok(Ok(()))));
    assert!(output.is_empty());
    Ok(())
}
