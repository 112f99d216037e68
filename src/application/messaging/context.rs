//! Invocation contexts handed to command and config action handlers

use std::collections::HashMap;
use std::sync::Arc;

use super::parser::ParsedInput;
use crate::application::context::BotContext;
use crate::application::errors::{BotError, Entity};
use crate::domain::entities::{Command, ConfigAction, Guild, Message, User, Value};

/// A message resolved to a command, with its parsed input
#[derive(Clone)]
pub struct CommandContext {
    pub message: Message,
    pub command: Arc<Command>,
    /// The prefix the message was invoked with
    pub prefix: String,
    pub input: ParsedInput,
    pub bot: Arc<BotContext>,
}

impl CommandContext {
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.input.arg(name)
    }

    pub fn flag(&self, name: &str) -> Option<&Value> {
        self.input.flag(name)
    }

    pub fn flag_set(&self, name: &str) -> bool {
        self.input.flag_set(name)
    }

    pub fn author(&self) -> &User {
        &self.message.author
    }

    pub fn guild(&self) -> Result<&Guild, BotError> {
        self.message
            .guild
            .as_ref()
            .ok_or_else(|| BotError::not_found(Entity::Guild, &self.message.channel.id))
    }

    /// Names of required args that received no value
    pub fn missing_args(&self) -> Vec<String> {
        self.command
            .required_args()
            .filter(|a| !self.input.args.contains_key(&a.name))
            .map(|a| a.name.clone())
            .collect()
    }
}

/// A config action invocation routed through the `config` command
#[derive(Clone)]
pub struct ActionContext {
    pub message: Message,
    pub action: Arc<ConfigAction>,
    pub args: HashMap<String, Value>,
    pub bot: Arc<BotContext>,
}

impl ActionContext {
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }

    /// Required arg value; absent args are a handler bug once validated
    pub fn require_arg(&self, name: &str) -> Result<&str, BotError> {
        self.arg(name)
            .ok_or_else(|| BotError::handler(format!("missing argument '{}'", name)))
    }

    pub fn guild(&self) -> Result<&Guild, BotError> {
        self.message
            .guild
            .as_ref()
            .ok_or_else(|| BotError::not_found(Entity::Guild, &self.message.channel.id))
    }
}
