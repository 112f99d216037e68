//! Plugin, service and hook definitions

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::context::BotContext;
use crate::application::errors::BotError;
use crate::domain::entities::{Command, ConfigAction, Guild};

/// Upcast helper so registered services can be recovered as concrete types
pub trait AsAny {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A plugin-scoped singleton holding guild-scoped business logic
#[async_trait]
pub trait Service: AsAny + Send + Sync + 'static {
    /// Name the service is registered under, unique within its plugin
    fn name(&self) -> &str;

    async fn on_listen(&self, _bot: &BotContext) -> Result<(), BotError> {
        Ok(())
    }

    async fn on_join_guild(&self, _bot: &BotContext, _guild: &Guild) -> Result<(), BotError> {
        Ok(())
    }
}

/// Optional lifecycle hooks a plugin may provide
#[async_trait]
pub trait PluginHooks: Send + Sync {
    async fn on_listen(&self, _bot: &BotContext) -> Result<(), BotError> {
        Ok(())
    }

    async fn on_join_guild(&self, _bot: &BotContext, _guild: &Guild) -> Result<(), BotError> {
        Ok(())
    }

    async fn on_enabled(&self, _bot: &BotContext, _guild_id: &str) -> Result<(), BotError> {
        Ok(())
    }

    async fn on_disabled(&self, _bot: &BotContext, _guild_id: &str) -> Result<(), BotError> {
        Ok(())
    }
}

/// Data written for every guild that does not have `keyword` yet
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultData {
    pub keyword: String,
    pub data: serde_json::Value,
}

/// A named bundle of services, commands, config actions and permission levels
pub struct Plugin {
    pub name: String,
    pub description: String,
    pub dependencies: Vec<PluginDescriptor>,
    pub services: Vec<Arc<dyn Service>>,
    pub commands: Vec<Command>,
    pub config_actions: Vec<ConfigAction>,
    pub permission_levels: Vec<String>,
    pub default_data: Vec<DefaultData>,
    pub enabled_by_default: bool,
    pub hooks: Option<Arc<dyn PluginHooks>>,
    bound_to: Option<Uuid>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            dependencies: Vec::new(),
            services: Vec::new(),
            commands: Vec::new(),
            config_actions: Vec::new(),
            permission_levels: Vec::new(),
            default_data: Vec::new(),
            enabled_by_default: true,
            hooks: None,
            bound_to: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn depends_on(mut self, dependency: impl Into<PluginDescriptor>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_service<S: Service>(mut self, service: S) -> Self {
        self.services.push(Arc::new(service));
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn with_config_action(mut self, action: ConfigAction) -> Self {
        self.config_actions.push(action);
        self
    }

    pub fn with_permission_level(mut self, level: impl Into<String>) -> Self {
        self.permission_levels.push(level.into());
        self
    }

    pub fn with_default_data(mut self, keyword: impl Into<String>, data: serde_json::Value) -> Self {
        self.default_data.push(DefaultData { keyword: keyword.into(), data });
        self
    }

    pub fn with_hooks<H: PluginHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Unset guilds treat the plugin as disabled until enabled explicitly
    pub fn disabled_by_default(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }

    /// Tie this instance to one bot
    pub fn bind(mut self, bot_id: Uuid) -> Self {
        self.bound_to = Some(bot_id);
        self
    }

    pub fn bound_to(&self) -> Option<Uuid> {
        self.bound_to
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("commands", &self.commands.len())
            .field("config_actions", &self.config_actions.len())
            .field("services", &self.services.len())
            .field("permission_levels", &self.permission_levels)
            .finish()
    }
}

type PluginFactory = Box<dyn FnOnce(Uuid) -> Plugin + Send>;

/// The shapes a plugin can be handed to the loader in
pub enum PluginDescriptor {
    /// A ready plugin value
    Plugin(Plugin),
    /// Constructed with the id of the loading bot
    Factory(PluginFactory),
    /// Resolved by name through the bot's [`PluginResolver`]
    Package(String),
}

impl PluginDescriptor {
    pub fn factory<F>(factory: F) -> Self
    where
        F: FnOnce(Uuid) -> Plugin + Send + 'static,
    {
        PluginDescriptor::Factory(Box::new(factory))
    }

    /// Name if it is known without constructing the plugin
    pub fn known_name(&self) -> Option<&str> {
        match self {
            PluginDescriptor::Plugin(p) => Some(&p.name),
            PluginDescriptor::Package(name) => Some(name),
            PluginDescriptor::Factory(_) => None,
        }
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginDescriptor::Plugin(p) => write!(f, "Plugin({})", p.name),
            PluginDescriptor::Factory(_) => f.write_str("Factory(..)"),
            PluginDescriptor::Package(name) => write!(f, "Package({})", name),
        }
    }
}

impl From<Plugin> for PluginDescriptor {
    fn from(plugin: Plugin) -> Self {
        PluginDescriptor::Plugin(plugin)
    }
}

impl From<&str> for PluginDescriptor {
    fn from(package: &str) -> Self {
        PluginDescriptor::Package(package.to_string())
    }
}

impl From<String> for PluginDescriptor {
    fn from(package: String) -> Self {
        PluginDescriptor::Package(package)
    }
}

/// Turns a package name into a plugin
pub trait PluginResolver: Send + Sync {
    fn resolve(&self, package: &str) -> Option<PluginDescriptor>;
}

impl<F> PluginResolver for F
where
    F: Fn(&str) -> Option<PluginDescriptor> + Send + Sync,
{
    fn resolve(&self, package: &str) -> Option<PluginDescriptor> {
        self(package)
    }
}

/// Resolver that knows no packages
pub struct NoResolver;

impl PluginResolver for NoResolver {
    fn resolve(&self, _package: &str) -> Option<PluginDescriptor> {
        None
    }
}
