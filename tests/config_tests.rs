// ABOUTME: Tests for configuration loading and validation
// ABOUTME: Verifies TOML parsing, env var overrides, and required field validation

use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;

/// Helper to clear all config-related env vars
fn clear_config_env_vars() {
    for var in [
        "DRAGME_CONFIG_PATH",
        "DISCORD_TOKEN",
        "GUILD_ID",
        "OWNER_IDS",
        "REQUEST_TIMEOUT_SECS",
        "REQUEST_COOLDOWN_SECS",
        "KEEPALIVE_PORT",
        "KEEPALIVE_HOST",
        "REGISTRY_PATH",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let config_path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    config_path
}

#[test]
#[serial]
fn test_config_loads_from_toml_file() {
    clear_config_env_vars();

    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
[discord]
token = "file-token"
home_guild_id = "111"

[requests]
timeout_secs = 20
intake_channel_name = "move-requests"

[profile]
owner_ids = ["42"]

[keepalive]
port = 9090

[storage]
registry_path = "/tmp/dragme-test/channels.json"
"#,
    );
    std::env::set_var("DRAGME_CONFIG_PATH", config_path.to_str().unwrap());

    let config = dragme::config::Config::load().unwrap();

    assert_eq!(config.discord_token().unwrap(), "file-token");
    assert_eq!(config.discord.home_guild_id.as_deref(), Some("111"));
    assert_eq!(config.requests.timeout_secs, 20);
    assert_eq!(config.requests.cooldown_secs, 60);
    assert_eq!(config.requests.intake_channel_name, "move-requests");
    assert!(config.is_owner("42"));
    assert_eq!(config.keepalive.port, 9090);
    assert_eq!(
        config.registry_path(),
        PathBuf::from("/tmp/dragme-test/channels.json")
    );

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_env_var_overrides() {
    clear_config_env_vars();

    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
[discord]
token = "file-token"

[requests]
timeout_secs = 20
"#,
    );
    std::env::set_var("DRAGME_CONFIG_PATH", config_path.to_str().unwrap());
    std::env::set_var("DISCORD_TOKEN", "env-token");
    std::env::set_var("OWNER_IDS", "1, 2,,3");
    std::env::set_var("REQUEST_TIMEOUT_SECS", "45");
    std::env::set_var("KEEPALIVE_PORT", "7000");
    std::env::set_var("GUILD_ID", "999");

    let config = dragme::config::Config::load().unwrap();

    assert_eq!(config.discord_token().unwrap(), "env-token");
    assert_eq!(config.profile.owner_ids, vec!["1", "2", "3"]);
    assert_eq!(config.requests.timeout_secs, 45);
    assert_eq!(config.keepalive.port, 7000);
    assert_eq!(config.discord.home_guild_id.as_deref(), Some("999"));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_invalid_env_number_is_error() {
    clear_config_env_vars();

    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&temp_dir, "");
    std::env::set_var("DRAGME_CONFIG_PATH", config_path.to_str().unwrap());
    std::env::set_var("REQUEST_COOLDOWN_SECS", "soon");

    let err = dragme::config::Config::load().unwrap_err();
    assert!(err.to_string().contains("REQUEST_COOLDOWN_SECS"));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_zero_timeout_rejected() {
    clear_config_env_vars();

    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&temp_dir, "[requests]\ntimeout_secs = 0\n");
    std::env::set_var("DRAGME_CONFIG_PATH", config_path.to_str().unwrap());

    assert!(dragme::config::Config::load().is_err());

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_missing_token_only_fails_when_requested() {
    clear_config_env_vars();

    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&temp_dir, "[keepalive]\nenabled = false\n");
    std::env::set_var("DRAGME_CONFIG_PATH", config_path.to_str().unwrap());

    let config = dragme::config::Config::load().unwrap();
    assert!(config.discord_token().is_err());

    std::env::set_var("DISCORD_TOKEN", "   ");
    let config = dragme::config::Config::load().unwrap();
    assert!(config.discord_token().is_err());

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_malformed_toml_is_error() {
    clear_config_env_vars();

    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&temp_dir, "[requests\ntimeout_secs = ");
    std::env::set_var("DRAGME_CONFIG_PATH", config_path.to_str().unwrap());

    let err = dragme::config::Config::load().unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));

    clear_config_env_vars();
}
