use async_trait::async_trait;
use std::collections::HashMap;

use super::keys;
use crate::application::context::BotContext;
use crate::application::errors::BotError;
use crate::application::registry::RegistryKey;
use crate::plugins::trait_def::Service;

/// Commands that can never be disabled
pub const REQUIRED_COMMANDS: [&str; 2] = ["help", "config"];

/// Per-guild command enablement
#[derive(Debug, Default)]
pub struct CommandService;

impl CommandService {
    pub const NAME: &'static str = "CommandService";

    pub fn new() -> Self {
        Self
    }

    pub fn is_required(&self, command_name: &str) -> bool {
        REQUIRED_COMMANDS.iter().any(|r| r.eq_ignore_ascii_case(command_name))
    }

    /// Enabled when the owning plugin is enabled and the command was not explicitly disabled
    pub async fn is_command_enabled(
        &self,
        bot: &BotContext,
        guild_id: &str,
        command_name: &str,
    ) -> Result<bool, BotError> {
        let command = bot.registries().commands.get(command_name)?;
        let plugins = bot.plugin_service()?;
        if !plugins.is_plugin_enabled(bot, guild_id, &command.plugin_name).await? {
            return Ok(false);
        }
        if self.is_required(&command.name) {
            return Ok(true);
        }
        let enabled = self.enabled_map(bot, guild_id).await?;
        Ok(enabled
            .get(RegistryKey::new(&command.name).as_str())
            .copied()
            .unwrap_or(true))
    }

    pub async fn enable_command(&self, bot: &BotContext, guild_id: &str, command_name: &str) -> Result<(), BotError> {
        let command = bot.registries().commands.get(command_name)?;
        self.set_enabled(bot, guild_id, &command.name, true).await
    }

    pub async fn disable_command(&self, bot: &BotContext, guild_id: &str, command_name: &str) -> Result<(), BotError> {
        let command = bot.registries().commands.get(command_name)?;
        if self.is_required(&command.name) {
            return Err(BotError::Denied(format!("Command {} can not be disabled.", command.name)));
        }
        self.set_enabled(bot, guild_id, &command.name, false).await
    }

    async fn enabled_map(&self, bot: &BotContext, guild_id: &str) -> Result<HashMap<String, bool>, BotError> {
        Ok(bot
            .guild_data(guild_id)
            .get::<HashMap<String, bool>>(keys::ENABLED_COMMANDS)
            .await?
            .unwrap_or_default())
    }

    async fn set_enabled(&self, bot: &BotContext, guild_id: &str, command_name: &str, enabled: bool) -> Result<(), BotError> {
        let mut map = self.enabled_map(bot, guild_id).await?;
        map.insert(RegistryKey::new(command_name).to_string(), enabled);
        bot.guild_data(guild_id).set(keys::ENABLED_COMMANDS, &map).await?;
        tracing::info!(
            "{} command {} in guild {}",
            if enabled { "Enabled" } else { "Disabled" },
            command_name,
            guild_id
        );
        Ok(())
    }
}

#[async_trait]
impl Service for CommandService {
    fn name(&self) -> &str {
        Self::NAME
    }
}
