// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates required fields and provides sensible defaults for optional ones
use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub requests: RequestsConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub keepalive: KeepAliveConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

// ─── DiscordConfig ──────────────────────────────────────────────

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied through DISCORD_TOKEN rather than the file.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// Guild where owner-only profile commands are registered.
    /// Registered globally when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_guild_id: Option<String>,
}

// Custom Debug impl to redact token
impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("home_guild_id", &self.home_guild_id)
            .finish()
    }
}

// ─── RequestsConfig ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsConfig {
    /// Seconds a move-request prompt stays answerable
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum seconds between two move-requests from the same user
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Name given to the intake channel created by the setup command
    #[serde(default = "default_intake_channel_name")]
    pub intake_channel_name: String,
}

impl RequestsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_request_timeout_secs(),
            cooldown_secs: default_cooldown_secs(),
            intake_channel_name: default_intake_channel_name(),
        }
    }
}

// ─── ProfileConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Users allowed to change the bot's avatar and banner
    #[serde(default)]
    pub owner_ids: Vec<String>,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
}

impl ProfileConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn owners(&self) -> HashSet<String> {
        self.owner_ids.iter().cloned().collect()
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            owner_ids: Vec::new(),
            cooldown_secs: default_cooldown_secs(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

// ─── KeepAliveConfig ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_keepalive_host")]
    pub host: String,
    #[serde(default = "default_keepalive_port")]
    pub port: u16,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_keepalive_host(),
            port: default_keepalive_port(),
        }
    }
}

// ─── StorageConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_intake_channel_name() -> String {
    "drag-requests".to_string()
}

fn default_max_image_bytes() -> u64 {
    8 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_keepalive_host() -> String {
    "0.0.0.0".to_string()
}

fn default_keepalive_port() -> u16 {
    8080
}

fn default_registry_path() -> String {
    paths::registry_file().to_string_lossy().to_string()
}

/// Expand tilde (~) to home directory in paths
/// Logs a warning if expansion fails and falls back to the original path
fn expand_tilde(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs
                .home_dir()
                .join(stripped)
                .to_string_lossy()
                .to_string();
        } else {
            tracing::warn!(
                path = %path,
                "Failed to expand tilde in path: could not determine home directory"
            );
        }
    }
    path.to_string()
}

/// Split a comma separated env value, dropping blanks
fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. DRAGME_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/dragme/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("DRAGME_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration from config.toml with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if let Some(config_path) = Self::find_config_file() {
            tracing::info!(
                path = %config_path.display(),
                "Loading configuration from file"
            );
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        if let Ok(val) = std::env::var("DISCORD_TOKEN") {
            config.discord.token = val;
        }
        if let Ok(val) = std::env::var("GUILD_ID") {
            let val = val.trim().to_string();
            config.discord.home_guild_id = (!val.is_empty()).then_some(val);
        }
        if let Ok(val) = std::env::var("OWNER_IDS") {
            config.profile.owner_ids = split_list(&val);
        }
        if let Ok(val) = std::env::var("REQUEST_TIMEOUT_SECS") {
            config.requests.timeout_secs = val.parse().with_context(|| {
                format!("REQUEST_TIMEOUT_SECS must be a valid number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("REQUEST_COOLDOWN_SECS") {
            config.requests.cooldown_secs = val.parse().with_context(|| {
                format!("REQUEST_COOLDOWN_SECS must be a valid number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("KEEPALIVE_PORT") {
            config.keepalive.port = val.parse().with_context(|| {
                format!("KEEPALIVE_PORT must be a valid port number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("KEEPALIVE_HOST") {
            config.keepalive.host = val;
        }
        if let Ok(val) = std::env::var("REGISTRY_PATH") {
            config.storage.registry_path = val;
        }

        config.storage.registry_path = expand_tilde(&config.storage.registry_path);

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the workflow misbehave
    pub fn validate(&self) -> Result<()> {
        if self.requests.timeout_secs == 0 {
            anyhow::bail!("requests.timeout_secs must be greater than zero");
        }
        if self.requests.cooldown_secs == 0 {
            anyhow::bail!("requests.cooldown_secs must be greater than zero");
        }
        if self.requests.intake_channel_name.trim().is_empty() {
            anyhow::bail!("requests.intake_channel_name must not be empty");
        }
        if self.profile.max_image_bytes == 0 {
            anyhow::bail!("profile.max_image_bytes must be greater than zero");
        }
        if self.storage.registry_path.trim().is_empty() {
            anyhow::bail!("storage.registry_path must not be empty");
        }
        Ok(())
    }

    /// The bot token, required only when actually connecting
    pub fn discord_token(&self) -> Result<&str> {
        let token = self.discord.token.trim();
        if token.is_empty() {
            anyhow::bail!(
                "discord.token is required (set in config.toml or DISCORD_TOKEN env var)"
            );
        }
        Ok(token)
    }

    pub fn registry_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.registry_path)
    }

    /// Check if a user may change the bot's profile images
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.profile.owner_ids.iter().any(|id| id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_timings() {
        let config = Config::default();
        assert_eq!(config.requests.timeout(), Duration::from_secs(30));
        assert_eq!(config.requests.cooldown(), Duration::from_secs(60));
        assert_eq!(config.requests.intake_channel_name, "drag-requests");
        assert_eq!(config.profile.max_image_bytes, 8 * 1024 * 1024);
        assert!(config.keepalive.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.requests.timeout_secs, 30);
        assert!(config.discord.token.is_empty());
        assert!(config.discord.home_guild_id.is_none());
    }

    #[test]
    fn test_full_toml_deserialize() {
        let toml_str = r#"
            [discord]
            token = "abc.def.ghi"
            home_guild_id = "1234"

            [requests]
            timeout_secs = 45
            cooldown_secs = 10
            intake_channel_name = "move-me"

            [profile]
            owner_ids = ["1", "2"]
            cooldown_secs = 120

            [keepalive]
            enabled = false
            port = 9000

            [storage]
            registry_path = "/tmp/channels.json"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.discord.token, "abc.def.ghi");
        assert_eq!(config.discord.home_guild_id.as_deref(), Some("1234"));
        assert_eq!(config.requests.timeout_secs, 45);
        assert_eq!(config.requests.intake_channel_name, "move-me");
        assert_eq!(config.profile.owner_ids, vec!["1", "2"]);
        assert_eq!(config.profile.max_image_bytes, 8 * 1024 * 1024);
        assert!(!config.keepalive.enabled);
        assert_eq!(config.keepalive.host, "0.0.0.0");
        assert_eq!(config.keepalive.port, 9000);
        assert_eq!(config.registry_path(), PathBuf::from("/tmp/channels.json"));
        assert!(config.is_owner("2"));
        assert!(!config.is_owner("3"));
    }

    #[test]
    fn test_discord_config_debug_redacts_token() {
        let config = DiscordConfig {
            token: "super-secret".to_string(),
            home_guild_id: None,
        };
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("super-secret"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.requests.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.requests.cooldown_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_channel_name() {
        let mut config = Config::default();
        config.requests.intake_channel_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discord_token_required_only_on_demand() {
        let config = Config::default();
        assert!(config.discord_token().is_err());

        let mut config = Config::default();
        config.discord.token = " tok ".to_string();
        assert_eq!(config.discord_token().unwrap(), "tok");
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list("1, 2,,3 ,"), vec!["1", "2", "3"]);
        assert!(split_list("").is_empty());
    }
}
