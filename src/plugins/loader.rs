//! Plugin loader - resolves descriptors and distributes plugins into the registries

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::errors::{BotError, Entity};
use crate::application::registry::{LoadedPlugin, Registries, RegistryKey, ServiceEntry};
use crate::domain::entities::PermissionLevel;
use crate::plugins::trait_def::{Plugin, PluginDescriptor, PluginResolver};

/// Loads plugins for one bot. Dependencies are loaded depth-first before
/// the plugin that declares them.
pub struct PluginLoader<'a> {
    bot_id: Uuid,
    resolver: &'a dyn PluginResolver,
    registries: &'a mut Registries,
    loading: Vec<RegistryKey>,
}

impl<'a> PluginLoader<'a> {
    pub fn new(bot_id: Uuid, resolver: &'a dyn PluginResolver, registries: &'a mut Registries) -> Self {
        Self {
            bot_id,
            resolver,
            registries,
            loading: Vec::new(),
        }
    }

    /// Load a plugin and its dependencies
    pub fn add_plugin(&mut self, descriptor: impl Into<PluginDescriptor>) -> Result<Arc<LoadedPlugin>, BotError> {
        self.load(descriptor.into(), false)
    }

    fn load(&mut self, descriptor: PluginDescriptor, as_dependency: bool) -> Result<Arc<LoadedPlugin>, BotError> {
        if let Some(name) = descriptor.known_name() {
            if let Some(existing) = self.check(name, as_dependency)? {
                return Ok(existing);
            }
        }

        let plugin = self.materialize(descriptor)?;
        if plugin.name.trim().is_empty() {
            return Err(BotError::validation(Entity::Plugin, "name"));
        }
        if let Some(existing) = self.check(&plugin.name, as_dependency)? {
            return Ok(existing);
        }

        self.loading.push(RegistryKey::new(&plugin.name));
        let result = self.register(plugin);
        self.loading.pop();
        result
    }

    /// An already loaded dependency is reused; anything else that is
    /// loaded or being loaded is an error
    fn check(&self, name: &str, as_dependency: bool) -> Result<Option<Arc<LoadedPlugin>>, BotError> {
        let key = RegistryKey::new(name);
        if self.loading.contains(&key) {
            debug!("Dependency cycle through plugin {}", name);
            return Err(BotError::validation(Entity::Plugin, "dependencies"));
        }
        match self.registries.plugins.find(key.as_str()) {
            Some(existing) if as_dependency => {
                debug!("Dependency {} already loaded", existing.name);
                Ok(Some(existing))
            }
            Some(_) => Err(BotError::already_exists(Entity::Plugin, key.as_str())),
            None => Ok(None),
        }
    }

    fn materialize(&self, descriptor: PluginDescriptor) -> Result<Plugin, BotError> {
        let plugin = match descriptor {
            PluginDescriptor::Plugin(plugin) => plugin,
            PluginDescriptor::Factory(factory) => factory(self.bot_id),
            PluginDescriptor::Package(package) => match self.resolver.resolve(&package) {
                Some(PluginDescriptor::Plugin(plugin)) => plugin,
                Some(PluginDescriptor::Factory(factory)) => factory(self.bot_id),
                Some(PluginDescriptor::Package(other)) => {
                    return Err(BotError::Load {
                        package,
                        reason: format!("resolved to another package reference '{}'", other),
                    })
                }
                None => {
                    return Err(BotError::Load {
                        package,
                        reason: "no plugin found for this package".to_string(),
                    })
                }
            },
        };

        match plugin.bound_to() {
            Some(bound) if bound != self.bot_id => Err(BotError::Type(format!(
                "plugin '{}' is bound to another bot ({})",
                plugin.name, bound
            ))),
            _ => Ok(plugin),
        }
    }

    fn register(&mut self, plugin: Plugin) -> Result<Arc<LoadedPlugin>, BotError> {
        let Plugin {
            name,
            description,
            dependencies,
            services,
            mut commands,
            mut config_actions,
            permission_levels,
            default_data,
            enabled_by_default,
            hooks,
            ..
        } = plugin;

        let mut dependency_names = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            let loaded = self.load(dependency, true)?;
            dependency_names.push(loaded.name.clone());
        }

        for command in commands.iter_mut() {
            command.plugin_name = name.clone();
            command.normalize();
        }
        for action in config_actions.iter_mut() {
            action.plugin_name = name.clone();
        }

        info!("Registering plugin: {}", name);
        let loaded = self.registries.plugins.add(LoadedPlugin {
            name: name.clone(),
            description,
            dependencies: dependency_names,
            services: services.iter().map(|s| s.name().to_string()).collect(),
            commands: commands.iter().map(|c| c.name.clone()).collect(),
            config_actions: config_actions.iter().map(|a| a.name.clone()).collect(),
            permission_levels: permission_levels.clone(),
            default_data,
            enabled_by_default,
            hooks,
        })?;

        for service in services {
            self.registries.services.add(ServiceEntry::new(&name, service))?;
        }
        for action in config_actions {
            self.registries.config_actions.add(action)?;
        }
        for command in commands {
            debug!("Registering command {} from {}", command.name, name);
            self.registries.commands.add(command)?;
        }
        for level in permission_levels {
            if self.registries.permission_levels.contains(&level) {
                debug!("Permission level {} already registered, {} reuses it", level, name);
                continue;
            }
            self.registries.permission_levels.add(PermissionLevel::new(level, &name))?;
        }

        Ok(loaded)
    }
}
