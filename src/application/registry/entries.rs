use std::fmt;
use std::sync::Arc;

use crate::plugins::trait_def::{DefaultData, PluginHooks, Service};

/// A service singleton keyed by `(plugin_name, name)`
#[derive(Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub plugin_name: String,
    pub service: Arc<dyn Service>,
}

impl ServiceEntry {
    pub fn new(plugin_name: impl Into<String>, service: Arc<dyn Service>) -> Self {
        Self {
            name: service.name().to_string(),
            plugin_name: plugin_name.into(),
            service,
        }
    }

    /// The concrete service, if it is a `T`
    pub fn downcast<T: Service>(&self) -> Option<Arc<T>> {
        self.service.clone().as_any_arc().downcast::<T>().ok()
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &self.name)
            .field("plugin_name", &self.plugin_name)
            .finish()
    }
}

/// A plugin after its components were distributed into the registries.
/// Only the names of contributed entries are kept.
#[derive(Clone, Default)]
pub struct LoadedPlugin {
    pub name: String,
    pub description: String,
    pub dependencies: Vec<String>,
    pub services: Vec<String>,
    pub commands: Vec<String>,
    pub config_actions: Vec<String>,
    pub permission_levels: Vec<String>,
    pub default_data: Vec<DefaultData>,
    pub enabled_by_default: bool,
    pub hooks: Option<Arc<dyn PluginHooks>>,
}

impl LoadedPlugin {
    /// The built-in plugin is always enabled
    pub fn is_core(&self) -> bool {
        self.name.eq_ignore_ascii_case(crate::plugins::builtin::PLUGIN_NAME)
    }
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("commands", &self.commands)
            .field("services", &self.services)
            .field("config_actions", &self.config_actions)
            .field("permission_levels", &self.permission_levels)
            .finish()
    }
}
