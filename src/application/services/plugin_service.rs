use async_trait::async_trait;
use std::collections::HashMap;

use super::keys;
use crate::application::context::BotContext;
use crate::application::errors::BotError;
use crate::application::registry::RegistryKey;
use crate::plugins::trait_def::Service;

/// Per-guild plugin enablement
#[derive(Debug, Default)]
pub struct PluginService;

impl PluginService {
    pub const NAME: &'static str = "PluginService";

    pub fn new() -> Self {
        Self
    }

    pub async fn is_plugin_enabled(
        &self,
        bot: &BotContext,
        guild_id: &str,
        plugin_name: &str,
    ) -> Result<bool, BotError> {
        let plugin = bot.registries().plugins.get(plugin_name)?;
        if plugin.is_core() {
            return Ok(true);
        }
        let enabled = self.enabled_map(bot, guild_id).await?;
        Ok(enabled
            .get(RegistryKey::new(&plugin.name).as_str())
            .copied()
            .unwrap_or(plugin.enabled_by_default))
    }

    pub async fn enable_plugin(&self, bot: &BotContext, guild_id: &str, plugin_name: &str) -> Result<(), BotError> {
        let plugin = bot.registries().plugins.get(plugin_name)?;
        if self.is_plugin_enabled(bot, guild_id, &plugin.name).await? {
            return Err(BotError::Denied(format!("Plugin {} is already enabled.", plugin.name)));
        }
        self.set_enabled(bot, guild_id, &plugin.name, true).await?;
        if let Some(hooks) = &plugin.hooks {
            hooks.on_enabled(bot, guild_id).await?;
        }
        tracing::info!("Enabled plugin {} in guild {}", plugin.name, guild_id);
        Ok(())
    }

    pub async fn disable_plugin(&self, bot: &BotContext, guild_id: &str, plugin_name: &str) -> Result<(), BotError> {
        let plugin = bot.registries().plugins.get(plugin_name)?;
        if plugin.is_core() {
            return Err(BotError::Denied(format!("Plugin {} can not be disabled.", plugin.name)));
        }
        if !self.is_plugin_enabled(bot, guild_id, &plugin.name).await? {
            return Err(BotError::Denied(format!("Plugin {} is already disabled.", plugin.name)));
        }
        self.set_enabled(bot, guild_id, &plugin.name, false).await?;
        if let Some(hooks) = &plugin.hooks {
            hooks.on_disabled(bot, guild_id).await?;
        }
        tracing::info!("Disabled plugin {} in guild {}", plugin.name, guild_id);
        Ok(())
    }

    async fn enabled_map(&self, bot: &BotContext, guild_id: &str) -> Result<HashMap<String, bool>, BotError> {
        Ok(bot
            .guild_data(guild_id)
            .get::<HashMap<String, bool>>(keys::ENABLED_PLUGINS)
            .await?
            .unwrap_or_default())
    }

    async fn set_enabled(&self, bot: &BotContext, guild_id: &str, plugin_name: &str, enabled: bool) -> Result<(), BotError> {
        let mut map = self.enabled_map(bot, guild_id).await?;
        map.insert(RegistryKey::new(plugin_name).to_string(), enabled);
        bot.guild_data(guild_id).set(keys::ENABLED_PLUGINS, &map).await?;
        Ok(())
    }
}

#[async_trait]
impl Service for PluginService {
    fn name(&self) -> &str {
        Self::NAME
    }
}
