//! # Configuration Management Module
//!
//! Typed, TOML-backed configuration with documented defaults and a validation pass.
//!
//! ## Configuration Structure
//!
//! - [`BotConfig`] - bot name, secret token, command prefix, default ruleset
//! - [`StorageConfig`] - database location and busy timeout
//! - [`DiceConfig`] - per-roll safety caps
//! - [`SessionsConfig`] - whether sessions are also written to the database
//! - [`ConsoleConfig`] - identities used by the console transport
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! name = "RPG Master"
//! command_prefix = "/"
//! default_system = "D&D 5e"
//!
//! [storage]
//! data_dir = "./data"
//! db_file = "rpg_campaigns.db"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## Secret token
//!
//! The platform token may live in `[bot] token`, but the `RPGMASTER_TOKEN` environment
//! variable takes precedence. [`Config::resolve_token`] fails with
//! [`RpgError::StartupFatal`] when neither is set.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::dice::DiceLimits;
use crate::error::{RpgError, RpgResult};

/// Environment variable that overrides `[bot] token`.
pub const TOKEN_ENV: &str = "RPGMASTER_TOKEN";

/// Command prefixes accepted by [`Config::validate`].
pub const ALLOWED_PREFIXES: [&str; 6] = ["/", "!", "^", "$", "+", ">"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    /// Chat platform token. Prefer the environment variable over committing it here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
    /// Ruleset recorded by `start-session` when none is given.
    #[serde(default = "default_system")]
    pub default_system: String,
}

fn default_prefix() -> String {
    "/".to_string()
}

fn default_system() -> String {
    "D&D 5e".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    #[serde(default = "default_db_file")]
    pub db_file: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_file() -> String {
    "rpg_campaigns.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.db_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceConfig {
    pub max_count: u32,
    pub max_sides: u32,
}

impl Default for DiceConfig {
    fn default() -> Self {
        let limits = DiceLimits::default();
        Self {
            max_count: limits.max_count,
            max_sides: limits.max_sides,
        }
    }
}

impl DiceConfig {
    pub fn limits(&self) -> DiceLimits {
        DiceLimits {
            max_count: self.max_count,
            max_sides: self.max_sides,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Also write sessions to the `sessions` table. The in-memory registry is always kept.
    pub persist: bool,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { persist: true }
    }
}

/// Who "you" are when typing commands into the console transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub user_id: String,
    pub display_name: String,
    pub server_id: String,
    pub channel_id: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            user_id: "console".to_string(),
            display_name: "Game Master".to_string(),
            server_id: "local".to_string(),
            channel_id: "table".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub dice: DiceConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Check values that serde cannot: prefix whitelist, dice caps, non-empty identities.
    pub fn validate(&self) -> RpgResult<()> {
        if !ALLOWED_PREFIXES.contains(&self.bot.command_prefix.as_str()) {
            return Err(RpgError::StartupFatal(format!(
                "command_prefix '{}' is not one of {}",
                self.bot.command_prefix,
                ALLOWED_PREFIXES.join(" ")
            )));
        }
        if self.dice.max_count == 0 || self.dice.max_sides == 0 {
            return Err(RpgError::StartupFatal(
                "dice.max_count and dice.max_sides must be at least 1".into(),
            ));
        }
        if self.storage.data_dir.trim().is_empty() || self.storage.db_file.trim().is_empty() {
            return Err(RpgError::StartupFatal(
                "storage.data_dir and storage.db_file must be set".into(),
            ));
        }
        let console = &self.console;
        if [&console.user_id, &console.server_id, &console.channel_id]
            .iter()
            .any(|id| id.trim().is_empty())
        {
            return Err(RpgError::StartupFatal(
                "console user_id, server_id and channel_id must be non-empty".into(),
            ));
        }
        Ok(())
    }

    /// The platform token: environment first, then the config file.
    pub fn resolve_token(&self) -> RpgResult<String> {
        let from_env = std::env::var(TOKEN_ENV).ok();
        Self::pick_token(from_env, self.bot.token.clone())
    }

    fn pick_token(from_env: Option<String>, from_file: Option<String>) -> RpgResult<String> {
        from_env
            .into_iter()
            .chain(from_file)
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .ok_or_else(|| {
                RpgError::StartupFatal(format!(
                    "no bot token found; set {TOKEN_ENV} or [bot] token in the config file"
                ))
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot: BotConfig {
                name: "RPG Master".to_string(),
                token: None,
                command_prefix: default_prefix(),
                default_system: default_system(),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                db_file: default_db_file(),
                busy_timeout_ms: default_busy_timeout_ms(),
            },
            dice: DiceConfig::default(),
            sessions: SessionsConfig::default(),
            console: ConsoleConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("rpgmaster.log".to_string()),
            },
        }
    }
}
