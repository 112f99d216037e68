use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::application::errors::StorageError;

/// Guild-scoped key-value persistence
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Prepare the backend before first use
    async fn ready(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get(&self, guild_id: &str, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Store `value` and return what was stored
    async fn set(
        &self,
        guild_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<serde_json::Value, StorageError>;
}

/// Typed access to a [`DataStore`]
pub struct GuildData<'a> {
    store: &'a dyn DataStore,
    guild_id: &'a str,
}

impl<'a> GuildData<'a> {
    pub fn new(store: &'a dyn DataStore, guild_id: &'a str) -> Self {
        Self { store, guild_id }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(self.guild_id, key).await? {
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)?;
        self.store.set(self.guild_id, key, value).await?;
        Ok(())
    }
}
