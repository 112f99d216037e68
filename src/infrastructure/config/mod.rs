//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    /// Prefix used outside guilds and in guilds that did not set their own
    pub prefix: String,
    /// Used when the transport cannot tell who owns the bot
    pub owner_id: Option<String>,
    /// Direct message the owner a summary once booted
    pub startup_summary: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "guildbot".to_string(),
            prefix: "!".to_string(),
            owner_id: None,
            startup_summary: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for `json`, database file for `sqlite`
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data"),
        }
    }
}

/// Identity the console transport speaks as
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    pub user_id: String,
    pub username: String,
    pub guild_id: String,
    pub guild_name: String,
    pub channel_id: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            user_id: "1".to_string(),
            username: "console".to_string(),
            guild_id: "console".to_string(),
            guild_name: "Console".to_string(),
            channel_id: "stdin".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.is_empty() || self.bot.prefix.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue(format!(
                "bot.prefix '{}' must be non-empty without spaces",
                self.bot.prefix
            )));
        }
        Ok(())
    }

    pub fn load_env() -> Self {
        Self::default().with_env()
    }

    /// Apply `BOT_PREFIX`, `BOT_OWNER_ID` and `BOT_NAME` overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }
        if let Ok(owner) = std::env::var("BOT_OWNER_ID") {
            self.bot.owner_id = Some(owner);
        }
        if let Ok(name) = std::env::var("BOT_NAME") {
            self.bot.name = name;
        }
        self
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(format!("Failed to write config: {}", e)))
    }
}
