//! Built-in chat commands: help, config and owner:listGuilds

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::{BotError, Entity};
use crate::application::messaging::{help, ActionContext, CommandContext};
use crate::application::registry::RegistryKey;
use crate::domain::entities::{Arg, Command, CommandHandler, ConfigAction, Embed, Flag, Response, Value};

const LIST_COLOR: u32 = 0x2ecc71;

pub fn help() -> Command {
    Command::new("help", HelpCommand)
        .with_description("Lists the available commands, or describes one of them")
        .with_arg(Arg::new("command").with_description("Command to describe"))
        .with_flag(
            Flag::boolean("list")
                .with_alias('l')
                .with_description("Only list command names, one per line"),
        )
}

pub fn config() -> Command {
    Command::new("config", ConfigCommand)
        .with_description("Changes the bot's settings for this server")
        .with_arg(Arg::new("plugin").with_description("Plugin whose settings to change"))
        .with_arg(Arg::new("action").with_description("Setting to change"))
        .with_arg(Arg::new("input1"))
        .with_arg(Arg::new("input2"))
        .with_arg(Arg::new("input3").greedy())
        .admin_only()
}

pub fn list_guilds() -> Command {
    Command::new("listGuilds", ListGuildsCommand)
        .with_description("Lists every server the bot is in")
        .owner_only()
}

struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn run(&self, ctx: &CommandContext, response: &mut Response) -> Result<(), BotError> {
        let bot = &ctx.bot;
        if let Some(name) = ctx.arg("command") {
            let command = bot.registries().commands.get(name)?;
            *response = Response::embed(help::command_help(&ctx.prefix, &command));
            return Ok(());
        }

        let guild_id = ctx.message.guild_id();
        let is_owner = bot.is_owner(&ctx.author().id);
        let plugins = bot.plugin_service()?;
        let commands = bot.command_service()?;

        let mut sections = Vec::new();
        for plugin in bot.registries().plugins.iter() {
            if let Some(guild_id) = guild_id {
                if !plugins.is_plugin_enabled(bot, guild_id, &plugin.name).await? {
                    continue;
                }
            }

            let mut visible = Vec::new();
            for name in &plugin.commands {
                let Some(command) = bot.registries().commands.find(name) else {
                    continue;
                };
                if !command.show_in_help || (command.owner_only && !is_owner) {
                    continue;
                }
                if let Some(guild_id) = guild_id {
                    if !commands.is_command_enabled(bot, guild_id, &command.name).await? {
                        continue;
                    }
                }
                visible.push(command);
            }
            if !visible.is_empty() {
                sections.push((plugin.name.clone(), visible));
            }
        }

        let mut embed = Embed::new().with_title("Available commands").with_color(LIST_COLOR);
        if ctx.flag_set("list") {
            // one name per line, no grouping
            let names: Vec<String> = sections
                .iter()
                .flat_map(|(_, visible)| visible.iter())
                .map(|c| format!("`{}{}`", ctx.prefix, c.name))
                .collect();
            embed = embed.with_description(names.join("\n"));
        } else {
            embed = embed.with_footer(format!("Use {}help <command> for details", ctx.prefix));
            for (plugin, visible) in sections {
                let lines: Vec<String> = visible
                    .iter()
                    .map(|c| {
                        if c.description.is_empty() {
                            format!("`{}{}`", ctx.prefix, c.name)
                        } else {
                            format!("`{}{}` {}", ctx.prefix, c.name, c.description)
                        }
                    })
                    .collect();
                embed = embed.add_field(plugin, lines.join("\n"));
            }
        }

        *response = Response::embed(embed);
        Ok(())
    }
}

struct ConfigCommand;

impl ConfigCommand {
    fn list_actions<'a>(ctx: &CommandContext, actions: impl Iterator<Item = &'a Arc<ConfigAction>>) -> Response {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for action in actions {
            let line = if action.description.is_empty() {
                format!("`{}`", action.name)
            } else {
                format!("`{}` {}", action.name, action.description)
            };
            match grouped.iter_mut().find(|(plugin, _)| plugin == &action.plugin_name) {
                Some((_, lines)) => lines.push(line),
                None => grouped.push((action.plugin_name.clone(), vec![line])),
            }
        }

        let mut embed = Embed::new()
            .with_title("Config actions")
            .with_color(LIST_COLOR)
            .with_footer(format!("Use {}config <plugin> <action> ...", ctx.prefix));
        for (plugin, lines) in grouped {
            embed = embed.add_field(plugin, lines.join("\n"));
        }
        Response::embed(embed)
    }

    /// Map `input1..input3` onto the action's declared args in order
    fn map_inputs(ctx: &CommandContext, action: &ConfigAction) -> HashMap<String, Value> {
        let inputs = ["input1", "input2", "input3"];
        let mut args = HashMap::new();
        for (arg, input) in action.args.iter().zip(inputs) {
            match ctx.arg(input) {
                Some(value) => {
                    args.insert(arg.name.clone(), Value::from(value));
                }
                None => {
                    if let Some(default) = &arg.default {
                        args.insert(arg.name.clone(), default.clone());
                    }
                }
            }
        }
        args
    }
}

#[async_trait]
impl CommandHandler for ConfigCommand {
    async fn run(&self, ctx: &CommandContext, response: &mut Response) -> Result<(), BotError> {
        let bot = &ctx.bot;
        let Some(guild_id) = ctx.message.guild_id() else {
            return Err(BotError::Denied("Settings can only be changed inside a server.".to_string()));
        };
        let plugins = bot.plugin_service()?;

        let Some(plugin_name) = ctx.arg("plugin") else {
            let mut enabled = Vec::new();
            for action in bot.registries().config_actions.iter() {
                if plugins.is_plugin_enabled(bot, guild_id, &action.plugin_name).await? {
                    enabled.push(action.clone());
                }
            }
            *response = Self::list_actions(ctx, enabled.iter());
            return Ok(());
        };

        let plugin = bot.registries().plugins.get(plugin_name)?;
        let Some(action_name) = ctx.arg("action") else {
            let own = bot
                .registries()
                .config_actions
                .iter()
                .filter(|a| a.plugin_name == plugin.name);
            *response = Self::list_actions(ctx, own);
            return Ok(());
        };

        let key = RegistryKey::namespaced(&plugin.name, action_name);
        let action = bot
            .registries()
            .config_actions
            .find(key.as_str())
            .ok_or_else(|| BotError::not_found(Entity::ConfigAction, format!("{}.{}", plugin.name, action_name)))?;

        if !plugins.is_plugin_enabled(bot, guild_id, &plugin.name).await? {
            return Err(BotError::Denied(format!("Plugin {} is disabled in this server.", plugin.name)));
        }
        if action.owner_only && !bot.is_owner(&ctx.author().id) {
            return Err(BotError::Denied("Only the bot owner can use this setting.".to_string()));
        }
        let allowed = bot
            .permissions()?
            .check_levels(bot, &ctx.message, &action.effective_permissions())
            .await?;
        if !allowed {
            return Err(BotError::Denied("You do not have permission to change this setting.".to_string()));
        }

        let args = Self::map_inputs(ctx, &action);
        let missing: Vec<&str> = action
            .args
            .iter()
            .filter(|a| a.required && !args.contains_key(&a.name))
            .map(|a| a.name.as_str())
            .collect();
        if !missing.is_empty() {
            let embed = help::action_help(&ctx.prefix, &action)
                .with_title(format!("Missing required arguments: {}", missing.join(", ")));
            *response = Response::embed(embed);
            return Ok(());
        }

        tracing::info!(
            "[{}] {} runs config action {}",
            guild_id,
            ctx.author().id,
            action.qualified_name()
        );
        let action_ctx = ActionContext {
            message: ctx.message.clone(),
            action: action.clone(),
            args,
            bot: bot.clone(),
        };
        action.handler().run(&action_ctx, response).await
    }
}

struct ListGuildsCommand;

#[async_trait]
impl CommandHandler for ListGuildsCommand {
    async fn run(&self, ctx: &CommandContext, response: &mut Response) -> Result<(), BotError> {
        let guilds = ctx.bot.transport().guilds().await?;
        let lines: Vec<String> = guilds
            .iter()
            .map(|g| format!("{} ({})", g.name, g.id))
            .collect();
        let description = if lines.is_empty() {
            "Not in any server.".to_string()
        } else {
            lines.join("\n")
        };
        *response = Response::embed(
            Embed::new()
                .with_title(format!("Servers ({})", guilds.len()))
                .with_color(LIST_COLOR)
                .with_description(description),
        );
        Ok(())
    }
}
