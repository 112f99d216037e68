use async_trait::async_trait;

use super::keys;
use crate::application::context::BotContext;
use crate::application::errors::BotError;
use crate::application::registry::LoadedPlugin;
use crate::plugins::trait_def::Service;

/// Command prefix and plugin default data per guild
#[derive(Debug, Default)]
pub struct GuildSettingsService;

impl GuildSettingsService {
    pub const NAME: &'static str = "GuildSettingsService";

    pub fn new() -> Self {
        Self
    }

    /// Prefix for a guild, or the configured default outside guilds
    pub async fn prefix(&self, bot: &BotContext, guild_id: Option<&str>) -> Result<String, BotError> {
        let default = &bot.config().bot.prefix;
        let Some(guild_id) = guild_id else {
            return Ok(default.clone());
        };
        Ok(bot
            .guild_data(guild_id)
            .get::<String>(keys::PREFIX)
            .await?
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| default.clone()))
    }

    pub async fn set_prefix(&self, bot: &BotContext, guild_id: &str, prefix: &str) -> Result<String, BotError> {
        if prefix.is_empty() || prefix.contains(char::is_whitespace) {
            return Err(BotError::Denied("The prefix can not be empty or contain spaces.".to_string()));
        }
        bot.guild_data(guild_id).set(keys::PREFIX, &prefix).await?;
        Ok(prefix.to_string())
    }

    /// Write each of the plugin's default data entries the guild does not have yet
    pub async fn seed_default_data(
        &self,
        bot: &BotContext,
        guild_id: &str,
        plugin: &LoadedPlugin,
    ) -> Result<(), BotError> {
        for entry in &plugin.default_data {
            let existing = bot.store().get(guild_id, &entry.keyword).await?;
            if existing.is_none() {
                bot.store().set(guild_id, &entry.keyword, entry.data.clone()).await?;
                tracing::debug!("Seeded {} for guild {}", entry.keyword, guild_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Service for GuildSettingsService {
    fn name(&self) -> &str {
        Self::NAME
    }
}
