//! Registries - Case-insensitive stores for everything plugins contribute
//!
//! Registries only grow while plugins load and are read-only afterwards.

pub mod entries;
pub mod key;

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::{BotError, Entity};
use crate::domain::entities::{Command, ConfigAction, PermissionLevel};

pub use entries::{LoadedPlugin, ServiceEntry};
pub use key::RegistryKey;

/// Something that can live in a [`Registry`]
pub trait Entry: Send + Sync {
    const ENTITY: Entity;

    fn key(&self) -> RegistryKey;

    /// Fail with a validation error naming the first missing required field
    fn validate(&self) -> Result<(), BotError>;

    /// Apply entity invariants before storing
    fn prepare(&mut self) {}
}

/// Insertion-ordered, case-insensitive store
pub struct Registry<T> {
    entries: Vec<Arc<T>>,
    index: HashMap<RegistryKey, usize>,
}

impl<T: Entry> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn add(&mut self, mut entry: T) -> Result<Arc<T>, BotError> {
        entry.validate()?;
        entry.prepare();
        let key = entry.key();
        if self.index.contains_key(&key) {
            return Err(BotError::already_exists(T::ENTITY, key.as_str()));
        }
        let entry = Arc::new(entry);
        self.index.insert(key, self.entries.len());
        self.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn get(&self, key: &str) -> Result<Arc<T>, BotError> {
        self.find(key)
            .ok_or_else(|| BotError::not_found(T::ENTITY, key))
    }

    pub fn find(&self, key: &str) -> Option<Arc<T>> {
        self.index
            .get(&RegistryKey::new(key))
            .map(|&idx| self.entries[idx].clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(&RegistryKey::new(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Entry> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type CommandRegistry = Registry<Command>;
pub type ServiceRegistry = Registry<ServiceEntry>;
pub type ConfigActionRegistry = Registry<ConfigAction>;
pub type PermissionLevelRegistry = Registry<PermissionLevel>;
pub type PluginRegistry = Registry<LoadedPlugin>;

/// All registries owned by one bot
#[derive(Default)]
pub struct Registries {
    pub commands: CommandRegistry,
    pub services: ServiceRegistry,
    pub config_actions: ConfigActionRegistry,
    pub permission_levels: PermissionLevelRegistry,
    pub plugins: PluginRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }
}

fn require(entity: Entity, field: &str, value: &str) -> Result<(), BotError> {
    if value.trim().is_empty() {
        Err(BotError::validation(entity, field))
    } else {
        Ok(())
    }
}

impl Entry for Command {
    const ENTITY: Entity = Entity::Command;

    fn key(&self) -> RegistryKey {
        RegistryKey::new(&self.name)
    }

    fn validate(&self) -> Result<(), BotError> {
        require(Entity::Command, "name", &self.name)?;
        if self.name.contains(char::is_whitespace) {
            return Err(BotError::validation(Entity::Command, "name"));
        }
        Ok(())
    }

    fn prepare(&mut self) {
        self.normalize();
    }
}

impl Entry for ConfigAction {
    const ENTITY: Entity = Entity::ConfigAction;

    fn key(&self) -> RegistryKey {
        RegistryKey::namespaced(&self.plugin_name, &self.name)
    }

    fn validate(&self) -> Result<(), BotError> {
        require(Entity::ConfigAction, "name", &self.name)?;
        require(Entity::ConfigAction, "pluginName", &self.plugin_name)
    }
}

impl Entry for PermissionLevel {
    const ENTITY: Entity = Entity::PermissionLevel;

    fn key(&self) -> RegistryKey {
        RegistryKey::new(&self.name)
    }

    fn validate(&self) -> Result<(), BotError> {
        require(Entity::PermissionLevel, "name", &self.name)
    }
}

impl Entry for ServiceEntry {
    const ENTITY: Entity = Entity::Service;

    fn key(&self) -> RegistryKey {
        RegistryKey::namespaced(&self.plugin_name, &self.name)
    }

    fn validate(&self) -> Result<(), BotError> {
        require(Entity::Service, "name", &self.name)?;
        require(Entity::Service, "pluginName", &self.plugin_name)
    }
}

impl Entry for LoadedPlugin {
    const ENTITY: Entity = Entity::Plugin;

    fn key(&self) -> RegistryKey {
        RegistryKey::new(&self.name)
    }

    fn validate(&self) -> Result<(), BotError> {
        require(Entity::Plugin, "name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::ErrorKind;
    use crate::domain::entities::{handler_fn, Response};

    fn command(name: &str) -> Command {
        Command::new(name, handler_fn(|_ctx| async { Ok(Response::new()) }))
    }

    #[test]
    fn test_add_and_get_ignore_case() {
        let mut registry = CommandRegistry::new();
        registry.add(command("Ping")).unwrap();
        assert_eq!(registry.get("PING").unwrap().name, "Ping");
        assert!(registry.contains("ping"));
    }

    #[test]
    fn test_duplicate_differing_by_case() {
        let mut registry = CommandRegistry::new();
        registry.add(command("ping")).unwrap();
        let err = registry.add(command("PiNg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_entry_names_key() {
        let registry = CommandRegistry::new();
        match registry.get("nope") {
            Err(BotError::NotFound { entity, key }) => {
                assert_eq!(entity, Entity::Command);
                assert_eq!(key, "nope");
            }
            other => panic!("expected not found, got {:?}", other.map(|c| c.name.clone())),
        }
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut registry = CommandRegistry::new();
        match registry.add(command("")) {
            Err(BotError::Validation { field, .. }) => assert_eq!(field, "name"),
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn test_config_actions_are_namespaced() {
        struct Noop;
        #[async_trait::async_trait]
        impl crate::domain::entities::ConfigActionHandler for Noop {
            async fn run(
                &self,
                _ctx: &crate::application::messaging::ActionContext,
                _response: &mut Response,
            ) -> Result<(), BotError> {
                Ok(())
            }
        }

        let mut registry = ConfigActionRegistry::new();
        let mut a = ConfigAction::new("setPrefix", Noop);
        a.plugin_name = "core".to_string();
        let mut b = ConfigAction::new("setPrefix", Noop);
        b.plugin_name = "music".to_string();
        registry.add(a).unwrap();
        registry.add(b).unwrap();
        assert!(registry.contains("Core.SetPrefix"));
        assert!(registry.contains("music.setprefix"));

        let orphan = ConfigAction::new("orphan", Noop);
        assert!(matches!(
            registry.add(orphan),
            Err(BotError::Validation { ref field, .. }) if field == "pluginName"
        ));
    }

    #[test]
    fn test_commands_are_normalized_on_add() {
        let mut registry = CommandRegistry::new();
        registry.add(command("listGuilds").owner_only()).unwrap();
        assert!(registry.contains("owner:listguilds"));
    }
}
