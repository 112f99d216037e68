//! Shared state handed to commands, services and hooks

use once_cell::sync::OnceCell;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::errors::BotError;
use crate::application::registry::{Registries, RegistryKey};
use crate::application::report;
use crate::application::services::{CommandService, GuildSettingsService, PermissionsService, PluginService};
use crate::domain::entities::{Response, User};
use crate::domain::traits::{DataStore, GuildData, Target, Transport};
use crate::infrastructure::config::Config;
use crate::plugins::builtin;
use crate::plugins::trait_def::Service;

/// Everything a running bot owns, shared behind an `Arc`
pub struct BotContext {
    id: Uuid,
    config: Config,
    registries: Registries,
    transport: Arc<dyn Transport>,
    store: Arc<dyn DataStore>,
    owner: OnceCell<User>,
    user: OnceCell<User>,
}

impl BotContext {
    pub fn new(
        id: Uuid,
        config: Config,
        registries: Registries,
        transport: Arc<dyn Transport>,
        store: Arc<dyn DataStore>,
    ) -> Self {
        Self {
            id,
            config,
            registries,
            transport,
            store,
            owner: OnceCell::new(),
            user: OnceCell::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }

    pub fn guild_data<'a>(&'a self, guild_id: &'a str) -> GuildData<'a> {
        GuildData::new(self.store.as_ref(), guild_id)
    }

    /// Global bot owner, known once the bot has booted
    pub fn owner(&self) -> Option<&User> {
        self.owner.get()
    }

    pub(crate) fn set_owner(&self, owner: User) {
        if self.owner.set(owner).is_err() {
            tracing::debug!("Owner already resolved");
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner().is_some_and(|o| o.id == user_id)
    }

    /// The bot's own account, known once logged in
    pub fn user(&self) -> Option<&User> {
        self.user.get()
    }

    pub(crate) fn set_user(&self, user: User) {
        if self.user.set(user).is_err() {
            tracing::debug!("Bot user already resolved");
        }
    }

    /// A registered service as its concrete type
    pub fn service<T: Service>(&self, plugin_name: &str, name: &str) -> Result<Arc<T>, BotError> {
        let key = RegistryKey::namespaced(plugin_name, name);
        let entry = self.registries.services.get(key.as_str())?;
        entry
            .downcast::<T>()
            .ok_or_else(|| BotError::Type(format!("service '{}' has an unexpected type", key)))
    }

    pub fn permissions(&self) -> Result<Arc<PermissionsService>, BotError> {
        self.service(builtin::PLUGIN_NAME, PermissionsService::NAME)
    }

    pub fn plugin_service(&self) -> Result<Arc<PluginService>, BotError> {
        self.service(builtin::PLUGIN_NAME, PluginService::NAME)
    }

    pub fn command_service(&self) -> Result<Arc<CommandService>, BotError> {
        self.service(builtin::PLUGIN_NAME, CommandService::NAME)
    }

    pub fn guild_settings(&self) -> Result<Arc<GuildSettingsService>, BotError> {
        self.service(builtin::PLUGIN_NAME, GuildSettingsService::NAME)
    }

    /// Send a direct message to the owner; failures are logged, never raised
    pub async fn message_owner(&self, response: &Response) {
        let Some(owner) = self.owner() else {
            tracing::warn!("Owner unknown, dropping notification");
            return;
        };
        if let Err(e) = self.transport.send(&Target::User(owner.id.clone()), response).await {
            tracing::warn!("Failed to notify owner: {}", e);
        }
    }

    /// Report a failure to the owner with diagnostic detail
    pub async fn report_failure(&self, title: &str, details: &[(&str, String)], err: &BotError) {
        let embed = report::failure_embed(title, details, err);
        self.message_owner(&Response::embed(embed)).await;
    }
}
