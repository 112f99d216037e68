//! Built-in config actions

use async_trait::async_trait;

use crate::application::errors::{BotError, Entity};
use crate::application::messaging::ActionContext;
use crate::domain::entities::{parse_mention, Arg, ConfigAction, ConfigActionHandler, Embed, Response, Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    SetPrefix,
    EnablePlugin,
    DisablePlugin,
    EnableCommand,
    DisableCommand,
    GrantUser,
    RevokeUser,
    GrantRole,
    RevokeRole,
    ListPermissions,
}

struct CoreAction(Kind);

fn action(name: &str, kind: Kind, description: &str) -> ConfigAction {
    ConfigAction::new(name, CoreAction(kind))
        .with_description(description)
        .admin_only()
}

fn level_arg() -> Arg {
    Arg::new("level").required().with_description("Permission level, e.g. admin")
}

pub fn all() -> Vec<ConfigAction> {
    vec![
        action("setPrefix", Kind::SetPrefix, "Changes the command prefix")
            .with_arg(Arg::new("prefix").required().with_description("New prefix")),
        action("enablePlugin", Kind::EnablePlugin, "Enables a plugin in this server")
            .with_arg(Arg::new("plugin").required()),
        action("disablePlugin", Kind::DisablePlugin, "Disables a plugin in this server")
            .with_arg(Arg::new("plugin").required()),
        action("enableCommand", Kind::EnableCommand, "Enables a command in this server")
            .with_arg(Arg::new("command").required()),
        action("disableCommand", Kind::DisableCommand, "Disables a command in this server")
            .with_arg(Arg::new("command").required()),
        action("grantUser", Kind::GrantUser, "Adds a user to a permission level")
            .with_arg(Arg::new("user").required().with_description("Mention, id or name"))
            .with_arg(level_arg()),
        action("revokeUser", Kind::RevokeUser, "Removes a user from a permission level")
            .with_arg(Arg::new("user").required().with_description("Mention, id or name"))
            .with_arg(level_arg()),
        action("grantRole", Kind::GrantRole, "Adds a role to a permission level")
            .with_arg(Arg::new("role").required().with_description("Mention, id or name"))
            .with_arg(level_arg()),
        action("revokeRole", Kind::RevokeRole, "Removes a role from a permission level")
            .with_arg(Arg::new("role").required().with_description("Mention, id or name"))
            .with_arg(level_arg()),
        action("listPermissions", Kind::ListPermissions, "Shows the members of permission levels")
            .with_arg(Arg::new("level").with_description("Only show this level")),
    ]
}

async fn find_user(ctx: &ActionContext, guild_id: &str) -> Result<User, BotError> {
    let query = ctx.require_arg("user")?;
    ctx.bot
        .transport()
        .find_member(guild_id, query)
        .await?
        .ok_or_else(|| BotError::not_found(Entity::User, parse_mention(query).unwrap_or(query)))
}

async fn find_role(ctx: &ActionContext, guild_id: &str) -> Result<Role, BotError> {
    let query = ctx.require_arg("role")?;
    ctx.bot
        .transport()
        .find_role(guild_id, query)
        .await?
        .ok_or_else(|| BotError::not_found(Entity::Role, parse_mention(query).unwrap_or(query)))
}

async fn list_permissions(ctx: &ActionContext, guild_id: &str) -> Result<Embed, BotError> {
    let bot = &ctx.bot;
    let permissions = bot.permissions()?;
    let levels: Vec<String> = match ctx.arg("level") {
        Some(level) => vec![bot.registries().permission_levels.get(level)?.name.clone()],
        None => bot
            .registries()
            .permission_levels
            .iter()
            .map(|l| l.name.clone())
            .collect(),
    };

    let mut embed = Embed::new().with_title("Permission levels").with_color(0x9b59b6);
    for level in levels {
        let data = permissions.get_level(bot, guild_id, &level).await?;
        let mut members: Vec<String> = data.users.iter().map(|id| format!("<@{}>", id)).collect();
        members.extend(data.roles.iter().map(|id| format!("<@&{}>", id)));
        let value = if members.is_empty() {
            "No members".to_string()
        } else {
            members.join(", ")
        };
        embed = embed.add_field(data.name, value);
    }
    Ok(embed)
}

#[async_trait]
impl ConfigActionHandler for CoreAction {
    async fn run(&self, ctx: &ActionContext, response: &mut Response) -> Result<(), BotError> {
        let bot = &ctx.bot;
        let guild_id = ctx.guild()?.id.as_str();

        let reply = match self.0 {
            Kind::SetPrefix => {
                let prefix = bot
                    .guild_settings()?
                    .set_prefix(bot, guild_id, ctx.require_arg("prefix")?)
                    .await?;
                format!("The prefix is now {}", prefix)
            }
            Kind::EnablePlugin => {
                let plugin = bot.registries().plugins.get(ctx.require_arg("plugin")?)?;
                bot.plugin_service()?.enable_plugin(bot, guild_id, &plugin.name).await?;
                format!("Enabled plugin {}", plugin.name)
            }
            Kind::DisablePlugin => {
                let plugin = bot.registries().plugins.get(ctx.require_arg("plugin")?)?;
                bot.plugin_service()?.disable_plugin(bot, guild_id, &plugin.name).await?;
                format!("Disabled plugin {}", plugin.name)
            }
            Kind::EnableCommand => {
                let command = bot.registries().commands.get(ctx.require_arg("command")?)?;
                bot.command_service()?.enable_command(bot, guild_id, &command.name).await?;
                format!("Enabled command {}", command.name)
            }
            Kind::DisableCommand => {
                let command = bot.registries().commands.get(ctx.require_arg("command")?)?;
                bot.command_service()?.disable_command(bot, guild_id, &command.name).await?;
                format!("Disabled command {}", command.name)
            }
            Kind::GrantUser => {
                let user = find_user(ctx, guild_id).await?;
                let level = bot
                    .permissions()?
                    .add_user(bot, guild_id, ctx.require_arg("level")?, &user)
                    .await?;
                format!("Added {} to {}", user.username, level.name)
            }
            Kind::RevokeUser => {
                let user = find_user(ctx, guild_id).await?;
                let level = bot
                    .permissions()?
                    .remove_user(bot, guild_id, ctx.require_arg("level")?, &user)
                    .await?;
                format!("Removed {} from {}", user.username, level.name)
            }
            Kind::GrantRole => {
                let role = find_role(ctx, guild_id).await?;
                let level = bot
                    .permissions()?
                    .add_role(bot, guild_id, ctx.require_arg("level")?, &role)
                    .await?;
                format!("Added role {} to {}", role.name, level.name)
            }
            Kind::RevokeRole => {
                let role = find_role(ctx, guild_id).await?;
                let level = bot
                    .permissions()?
                    .remove_role(bot, guild_id, ctx.require_arg("level")?, &role)
                    .await?;
                format!("Removed role {} from {}", role.name, level.name)
            }
            Kind::ListPermissions => {
                *response = Response::embed(list_permissions(ctx, guild_id).await?);
                return Ok(());
            }
        };

        *response = Response::reply(reply);
        Ok(())
    }
}
