use async_trait::async_trait;

use super::keys;
use crate::application::context::BotContext;
use crate::application::errors::BotError;
use crate::domain::entities::{Message, PermissionLevelData, Role, User};
use crate::plugins::trait_def::Service;

/// Decides who may run what, and manages per-guild level membership
#[derive(Debug, Default)]
pub struct PermissionsService;

impl PermissionsService {
    pub const NAME: &'static str = "PermissionsService";

    pub fn new() -> Self {
        Self
    }

    /// Whether the author of `message` may run `command_name`
    pub async fn has_permission(
        &self,
        bot: &BotContext,
        message: &Message,
        command_name: &str,
    ) -> Result<bool, BotError> {
        let command = bot.registries().commands.get(command_name)?;
        if command.owner_only && !bot.is_owner(&message.author.id) {
            return Ok(false);
        }
        self.check_levels(bot, message, &command.effective_permissions()).await
    }

    /// Owner and guild-owner bypass, then membership in any of `levels`.
    /// Level names that are not registered are skipped.
    pub async fn check_levels(
        &self,
        bot: &BotContext,
        message: &Message,
        levels: &[String],
    ) -> Result<bool, BotError> {
        let author = &message.author.id;
        if bot.is_owner(author) || message.guild.as_ref().is_some_and(|g| &g.owner_id == author) {
            return Ok(true);
        }
        if levels.is_empty() {
            return Ok(true);
        }
        let Some(guild_id) = message.guild_id() else {
            return Ok(false);
        };

        for level in levels {
            if !bot.registries().permission_levels.contains(level) {
                tracing::debug!("Skipping unregistered permission level '{}'", level);
                continue;
            }
            let data = self.get_level(bot, guild_id, level).await?;
            if data.grants(author, &message.member_roles) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Membership of `level` in a guild, created empty on first access
    pub async fn get_level(
        &self,
        bot: &BotContext,
        guild_id: &str,
        level: &str,
    ) -> Result<PermissionLevelData, BotError> {
        let registered = bot.registries().permission_levels.get(level)?;
        let key = keys::permission_level(&registered.name);
        let data = bot.guild_data(guild_id);
        match data.get::<PermissionLevelData>(&key).await? {
            Some(existing) => Ok(existing),
            None => {
                let fresh = PermissionLevelData::empty(&registered.name);
                data.set(&key, &fresh).await?;
                Ok(fresh)
            }
        }
    }

    async fn save_level(
        &self,
        bot: &BotContext,
        guild_id: &str,
        level: &PermissionLevelData,
    ) -> Result<(), BotError> {
        let key = keys::permission_level(&level.name);
        bot.guild_data(guild_id).set(&key, level).await?;
        Ok(())
    }

    pub async fn add_user(
        &self,
        bot: &BotContext,
        guild_id: &str,
        level: &str,
        user: &User,
    ) -> Result<PermissionLevelData, BotError> {
        let mut data = self.get_level(bot, guild_id, level).await?;
        if data.users.contains(&user.id) {
            return Err(BotError::permission_level(&data.name, "User is already added to the permission level"));
        }
        data.users.push(user.id.clone());
        self.save_level(bot, guild_id, &data).await?;
        Ok(data)
    }

    pub async fn remove_user(
        &self,
        bot: &BotContext,
        guild_id: &str,
        level: &str,
        user: &User,
    ) -> Result<PermissionLevelData, BotError> {
        let mut data = self.get_level(bot, guild_id, level).await?;
        let Some(idx) = data.users.iter().position(|u| u == &user.id) else {
            return Err(BotError::permission_level(&data.name, "User is not added to the permission level"));
        };
        data.users.remove(idx);
        self.save_level(bot, guild_id, &data).await?;
        Ok(data)
    }

    pub async fn add_role(
        &self,
        bot: &BotContext,
        guild_id: &str,
        level: &str,
        role: &Role,
    ) -> Result<PermissionLevelData, BotError> {
        let mut data = self.get_level(bot, guild_id, level).await?;
        if data.roles.contains(&role.id) {
            return Err(BotError::permission_level(&data.name, "Role is already added to the permission level"));
        }
        data.roles.push(role.id.clone());
        self.save_level(bot, guild_id, &data).await?;
        Ok(data)
    }

    pub async fn remove_role(
        &self,
        bot: &BotContext,
        guild_id: &str,
        level: &str,
        role: &Role,
    ) -> Result<PermissionLevelData, BotError> {
        let mut data = self.get_level(bot, guild_id, level).await?;
        let Some(idx) = data.roles.iter().position(|r| r == &role.id) else {
            return Err(BotError::permission_level(&data.name, "Role is not added to the permission level"));
        };
        data.roles.remove(idx);
        self.save_level(bot, guild_id, &data).await?;
        Ok(data)
    }
}

#[async_trait]
impl Service for PermissionsService {
    fn name(&self) -> &str {
        Self::NAME
    }
}
