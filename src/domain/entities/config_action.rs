use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::{Arg, Response};
use crate::application::context::BotContext;
use crate::application::errors::BotError;
use crate::application::messaging::ActionContext;

/// Behaviour behind a [`ConfigAction`]
#[async_trait]
pub trait ConfigActionHandler: Send + Sync {
    async fn run(&self, ctx: &ActionContext, response: &mut Response) -> Result<(), BotError>;

    async fn on_listen(&self, _bot: &BotContext) -> Result<(), BotError> {
        Ok(())
    }
}

/// Guild-scoped settings mutator, invoked through the `config` command
#[derive(Clone)]
pub struct ConfigAction {
    pub name: String,
    pub plugin_name: String,
    pub description: String,
    pub args: Vec<Arg>,
    pub permissions: Vec<String>,
    pub owner_only: bool,
    pub admin_only: bool,
    handler: Arc<dyn ConfigActionHandler>,
}

impl ConfigAction {
    pub fn new<H: ConfigActionHandler + 'static>(name: impl Into<String>, handler: H) -> Self {
        Self {
            name: name.into(),
            plugin_name: String::new(),
            description: String::new(),
            args: Vec::new(),
            permissions: Vec::new(),
            owner_only: false,
            admin_only: false,
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

    pub fn handler(&self) -> &Arc<dyn ConfigActionHandler> {
        &self.handler
    }

    pub fn effective_permissions(&self) -> Vec<String> {
        let mut levels = self.permissions.clone();
        if self.admin_only && !levels.iter().any(|l| l.eq_ignore_ascii_case("admin")) {
            levels.push("admin".to_string());
        }
        levels
    }

    /// `plugin.action` as typed after the `config` command
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.plugin_name, self.name)
    }
}

impl fmt::Debug for ConfigAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigAction")
            .field("name", &self.name)
            .field("plugin_name", &self.plugin_name)
            .field("args", &self.args)
            .field("permissions", &self.permissions)
            .finish()
    }
}
