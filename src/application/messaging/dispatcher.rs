//! Message dispatcher - Routes messages through the filter chain to command handlers

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::context::CommandContext;
use super::help;
use super::middleware::{FilterChain, FilterOutcome};
use super::parser::{MessageParser, Tokenizer};
use crate::application::context::BotContext;
use crate::application::errors::{BotError, Entity};
use crate::domain::entities::{Message, Response, ResponseType};
use crate::domain::traits::Target;

const APOLOGY: &str = "I'm sorry, but there was an unexpected error while running that command.";

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command
    Ignored,
    /// Silently dropped by the named filter
    Dropped(&'static str),
    /// `--help` was answered
    Help,
    /// Required args were missing; usage was sent
    MissingArgs(Vec<String>),
    Completed,
    /// The handler failed; the user and the owner were notified
    Failed,
}

/// Message dispatcher - turns inbound messages into command invocations
pub struct MessageDispatcher {
    filters: FilterChain,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::with_filters(FilterChain::default())
    }

    pub fn with_filters(filters: FilterChain) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// The guild (or default) prefix plus the mention forms of the bot's user
    pub async fn prefixes(&self, bot: &BotContext, message: &Message) -> Result<Vec<String>, BotError> {
        let mut prefixes = vec![bot.guild_settings()?.prefix(bot, message.guild_id()).await?];
        if let Some(me) = bot.user() {
            prefixes.push(format!("<@{}> ", me.id));
            prefixes.push(format!("<@!{}> ", me.id));
        }
        Ok(prefixes)
    }

    /// Build an invocation context, or `None` when the message is not a known command
    pub async fn resolve(&self, bot: &Arc<BotContext>, message: Message) -> Result<Option<CommandContext>, BotError> {
        if bot.user().is_some_and(|me| me.id == message.author.id) {
            return Ok(None);
        }

        let parser = MessageParser::new(self.prefixes(bot, &message).await?);
        let Some((prefix, text)) = parser.strip_prefix(&message.content) else {
            return Ok(None);
        };
        let Some((name, rest)) = MessageParser::split_name(text) else {
            return Ok(None);
        };
        let Some(command) = bot.registries().commands.find(name) else {
            tracing::debug!("[{}] '{}' is not a command", message.channel.id, name);
            return Ok(None);
        };

        let input = Tokenizer::new(&command.args, &command.flags).tokenize(rest);
        let prefix = prefix.to_string();
        Ok(Some(CommandContext {
            message,
            command,
            prefix,
            input,
            bot: bot.clone(),
        }))
    }

    /// Process one message end to end
    pub async fn dispatch(&self, bot: &Arc<BotContext>, message: Message) -> DispatchOutcome {
        let channel_id = message.channel.id.clone();
        let ctx = match self.resolve(bot, message).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => return DispatchOutcome::Ignored,
            Err(e) => {
                tracing::warn!("[{}] Unable to resolve command: {}", channel_id, e);
                return DispatchOutcome::Ignored;
            }
        };

        if let FilterOutcome::Dropped(filter) = self.filters.run(&ctx).await {
            return DispatchOutcome::Dropped(filter);
        }

        if ctx.flag_set("help") {
            let embed = help::command_help(&ctx.prefix, &ctx.command);
            send_best_effort(&ctx, Response::embed(embed)).await;
            return DispatchOutcome::Help;
        }

        let missing = ctx.missing_args();
        if !missing.is_empty() {
            let embed = help::missing_args(&ctx.prefix, &ctx.command, &missing);
            send_best_effort(&ctx, Response::embed(embed)).await;
            return DispatchOutcome::MissingArgs(missing);
        }

        self.execute(ctx).await
    }

    async fn execute(&self, ctx: CommandContext) -> DispatchOutcome {
        tracing::debug!("[{}] Running {} for {}", ctx.message.channel.id, ctx.command.name, ctx.message.author.id);
        let handler = ctx.command.handler().clone();
        let mut response = Response::new();

        let result = match AssertUnwindSafe(handler.run(&ctx, &mut response)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(BotError::Internal(format!("command {} panicked", ctx.command.name))),
        };

        match result {
            Ok(()) => {
                if let Err(e) = deliver(&ctx.bot, &ctx.message, &response).await {
                    tracing::warn!("[{}] Failed to deliver response: {}", ctx.message.channel.id, e);
                }
                DispatchOutcome::Completed
            }
            Err(err) => match user_facing(&err) {
                Some(text) => {
                    send_best_effort(&ctx, Response::message(text)).await;
                    DispatchOutcome::Completed
                }
                None => {
                    self.report(&ctx, &err).await;
                    DispatchOutcome::Failed
                }
            },
        }
    }

    /// Generic apology to the channel, full detail to the owner
    async fn report(&self, ctx: &CommandContext, err: &BotError) {
        tracing::error!("[{}] Command {} failed: {}", ctx.message.channel.id, ctx.command.name, err);
        send_best_effort(ctx, Response::message(APOLOGY)).await;

        let guild = ctx
            .message
            .guild
            .as_ref()
            .map(|g| format!("{} ({})", g.name, g.id))
            .unwrap_or_else(|| "direct message".to_string());
        let details = [
            ("Guild", guild),
            ("Channel", ctx.message.channel.id.clone()),
            ("User", format!("{} ({})", ctx.message.author.username, ctx.message.author.id)),
            ("Command", ctx.message.content.clone()),
        ];
        ctx.bot.report_failure("Unexpected error while running a command", &details, err).await;
    }
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that are meant to be read by the invoking user
fn user_facing(err: &BotError) -> Option<String> {
    match err {
        BotError::Denied(text) => Some(text.clone()),
        BotError::PermissionLevel { .. } => Some(err.to_string()),
        BotError::NotFound { entity, key } => match entity {
            Entity::Service | Entity::Guild => None,
            _ => Some(format!("The {} '{}' could not be found.", entity, key)),
        },
        _ => None,
    }
}

async fn send_best_effort(ctx: &CommandContext, response: Response) {
    if let Err(e) = deliver(&ctx.bot, &ctx.message, &response).await {
        tracing::warn!("[{}] Failed to deliver response: {}", ctx.message.channel.id, e);
    }
}

/// Resolve a response descriptor against the message that triggered it
pub async fn deliver(bot: &BotContext, origin: &Message, response: &Response) -> Result<(), BotError> {
    let target = match response.kind {
        ResponseType::None => return Ok(()),
        ResponseType::Dm => Target::User(origin.author.id.clone()),
        ResponseType::Message | ResponseType::Reply | ResponseType::Embed => {
            Target::Channel(origin.channel.id.clone())
        }
    };
    bot.transport().send(&target, response).await
}
