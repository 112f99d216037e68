use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::Response;
use crate::application::context::BotContext;
use crate::application::errors::BotError;
use crate::application::messaging::CommandContext;

/// Prefix carried by every owner-only command name
pub const OWNER_PREFIX: &str = "owner:";

/// A parsed argument or flag value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// Positional argument declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
    /// Only meaningful on the last arg: captures the rest of the input unsplit
    pub greedy: bool,
}

impl Arg {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: false,
            default: None,
            greedy: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagType {
    Boolean,
    Int,
    Float,
    String,
}

/// Named option declaration (`--name` / `-n`)
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    pub name: String,
    pub short_alias: Option<char>,
    pub kind: FlagType,
    pub default: Option<Value>,
    pub description: String,
    pub show_in_help: bool,
}

impl Flag {
    pub fn new(name: impl Into<String>, kind: FlagType) -> Self {
        Self {
            name: name.into(),
            short_alias: None,
            kind,
            default: None,
            description: String::new(),
            show_in_help: true,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FlagType::Boolean)
    }

    pub fn with_alias(mut self, alias: char) -> Self {
        self.short_alias = Some(alias);
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.show_in_help = false;
        self
    }

    pub fn matches(&self, token: &str) -> bool {
        self.name.eq_ignore_ascii_case(token)
    }

    pub fn matches_alias(&self, alias: char) -> bool {
        self.short_alias == Some(alias)
    }
}

/// Behaviour behind a [`Command`]
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute the command, filling `response` with the reply to deliver
    async fn run(&self, ctx: &CommandContext, response: &mut Response) -> Result<(), BotError>;

    /// Called once while the bot boots
    async fn on_listen(&self, _bot: &BotContext) -> Result<(), BotError> {
        Ok(())
    }
}

/// Adapts an async closure into a [`CommandHandler`]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BotError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BotError>> + Send + 'static,
{
    async fn run(&self, ctx: &CommandContext, response: &mut Response) -> Result<(), BotError> {
        *response = (self.f)(ctx.clone()).await?;
        Ok(())
    }
}

/// Represents a bot command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub plugin_name: String,
    pub description: String,
    pub args: Vec<Arg>,
    pub flags: Vec<Flag>,
    pub permissions: Vec<String>,
    pub owner_only: bool,
    pub admin_only: bool,
    pub show_in_help: bool,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new<H: CommandHandler + 'static>(name: impl Into<String>, handler: H) -> Self {
        Self {
            name: name.into(),
            plugin_name: String::new(),
            description: String::new(),
            args: Vec::new(),
            flags: Vec::new(),
            permissions: Vec::new(),
            owner_only: false,
            admin_only: false,
            show_in_help: true,
            handler: Arc::new(handler),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.show_in_help = false;
        self
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// Applies the naming and permission invariants; idempotent
    pub fn normalize(&mut self) {
        if self.owner_only && !self.name.starts_with(OWNER_PREFIX) {
            self.name = format!("{}{}", OWNER_PREFIX, self.name);
        }
        if self.admin_only && self.permissions.is_empty() {
            self.permissions.push("admin".to_string());
        }
        if !self.flags.iter().any(|f| f.matches("help")) {
            let mut help = Flag::boolean("help")
                .with_description("Show usage for this command")
                .hidden();
            if !self.flags.iter().any(|f| f.matches_alias('h')) {
                help = help.with_alias('h');
            }
            self.flags.push(help);
        }
    }

    /// Declared permissions plus `admin` when the command is admin only
    pub fn effective_permissions(&self) -> Vec<String> {
        let mut levels = self.permissions.clone();
        if self.admin_only && !levels.iter().any(|l| l.eq_ignore_ascii_case("admin")) {
            levels.push("admin".to_string());
        }
        levels
    }

    pub fn required_args(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter().filter(|a| a.required)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("plugin_name", &self.plugin_name)
            .field("args", &self.args)
            .field("flags", &self.flags)
            .field("permissions", &self.permissions)
            .field("owner_only", &self.owner_only)
            .field("admin_only", &self.admin_only)
            .finish()
    }
}
