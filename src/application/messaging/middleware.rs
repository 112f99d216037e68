//! Filter chain run between command resolution and execution

use async_trait::async_trait;
use std::sync::Arc;

use super::context::CommandContext;
use crate::application::errors::BotError;

/// A stage deciding whether an invocation may proceed
#[async_trait]
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn allows(&self, ctx: &CommandContext) -> Result<bool, BotError>;
}

/// Result of running the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Pass,
    /// Silently dropped by the named filter
    Dropped(&'static str),
}

/// Ordered filters; the first refusal short-circuits the rest
#[derive(Clone)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    pub fn add<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub async fn run(&self, ctx: &CommandContext) -> FilterOutcome {
        for filter in &self.filters {
            match filter.allows(ctx).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("[{}] {} dropped by {}", ctx.message.channel.id, ctx.command.name, filter.name());
                    return FilterOutcome::Dropped(filter.name());
                }
                Err(e) => {
                    tracing::warn!("[{}] {} failed in {}: {}", ctx.message.channel.id, ctx.command.name, filter.name(), e);
                    return FilterOutcome::Dropped(filter.name());
                }
            }
        }
        FilterOutcome::Pass
    }
}

impl Default for FilterChain {
    /// can-send-message, command-enabled, has-permission
    fn default() -> Self {
        Self::new()
            .add(CanSendMessageFilter)
            .add(CommandEnabledFilter)
            .add(HasPermissionFilter)
    }
}

/// The bot must be allowed to post in the channel
pub struct CanSendMessageFilter;

#[async_trait]
impl Filter for CanSendMessageFilter {
    fn name(&self) -> &'static str {
        "can-send-message"
    }

    async fn allows(&self, ctx: &CommandContext) -> Result<bool, BotError> {
        ctx.bot.transport().can_send(&ctx.message.channel).await
    }
}

/// Plugin and command must be enabled for the guild
pub struct CommandEnabledFilter;

#[async_trait]
impl Filter for CommandEnabledFilter {
    fn name(&self) -> &'static str {
        "command-enabled"
    }

    async fn allows(&self, ctx: &CommandContext) -> Result<bool, BotError> {
        let Some(guild_id) = ctx.message.guild_id() else {
            return Ok(true);
        };
        ctx.bot
            .command_service()?
            .is_command_enabled(&ctx.bot, guild_id, &ctx.command.name)
            .await
    }
}

pub struct HasPermissionFilter;

#[async_trait]
impl Filter for HasPermissionFilter {
    fn name(&self) -> &'static str {
        "has-permission"
    }

    async fn allows(&self, ctx: &CommandContext) -> Result<bool, BotError> {
        ctx.bot
            .permissions()?
            .has_permission(&ctx.bot, &ctx.message, &ctx.command.name)
            .await
    }
}
