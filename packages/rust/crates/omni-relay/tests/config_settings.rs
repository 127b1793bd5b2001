//! YAML settings merge and relay config derivation.

use std::fs;

use anyhow::Result;
use omni_relay::{RelayConfig, load_runtime_settings_from_paths};

#[test]
fn user_settings_override_system_settings() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let system = temp.path().join("system.yaml");
    let user = temp.path().join("user.yaml");
    fs::write(
        &system,
        r#"
relay:
  budget_tokens: 2048
  deadline_ms: 3500
  retry_keyword: "again"
llm:
  model: "system-model"
store:
  backend: "memory"
"#,
    )?;
    fs::write(
        &user,
        r#"
relay:
  deadline_ms: 4500
llm:
  model: "user-model"
"#,
    )?;

    let settings = load_runtime_settings_from_paths(&system, &user);
    assert_eq!(settings.relay.budget_tokens, Some(2048));
    assert_eq!(settings.relay.deadline_ms, Some(4500));
    assert_eq!(settings.llm.model.as_deref(), Some("user-model"));
    assert_eq!(settings.store.backend.as_deref(), Some("memory"));

    let config = RelayConfig::from_settings(&settings);
    assert_eq!(config.budget_tokens, 2048);
    assert_eq!(config.deadline_ms, 4500);
    assert_eq!(config.retry_keyword, "again");
    assert_eq!(config.command_prefix, "/");
    assert_eq!(config.window_limits().idle_gap_ms, 600_000);
    Ok(())
}

#[test]
fn missing_or_invalid_files_fall_back_to_defaults() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let broken = temp.path().join("broken.yaml");
    fs::write(&broken, "relay: [not, a, map")?;

    let settings = load_runtime_settings_from_paths(&temp.path().join("absent.yaml"), &broken);
    let config = RelayConfig::from_settings(&settings);
    let defaults = RelayConfig::default();
    assert_eq!(config.deadline_ms, defaults.deadline_ms);
    assert_eq!(config.budget_tokens, 1024);
    assert_eq!(config.max_turns, 50);
    assert_eq!(config.retry_keyword, "1");
    Ok(())
}
