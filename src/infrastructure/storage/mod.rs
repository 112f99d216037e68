//! File-based storage implementation

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::traits::DataStore;
use crate::infrastructure::config::{StorageBackend, StorageConfig};
use crate::infrastructure::database::SqliteStore;

type GuildMap = HashMap<String, Map<String, Value>>;

/// Guild data kept in memory, optionally mirrored to one JSON file per guild
pub struct JsonStore {
    base_path: Option<PathBuf>,
    guilds: Arc<RwLock<GuildMap>>,
}

impl JsonStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(base_path.into()),
            guilds: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Nothing is written to disk
    pub fn in_memory() -> Self {
        Self {
            base_path: None,
            guilds: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn guild_file(&self, guild_id: &str) -> Option<PathBuf> {
        self.base_path
            .as_ref()
            .map(|base| base.join(format!("{}.json", encode_file_stem(guild_id))))
    }

    async fn flush(&self, guild_id: &str, data: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(path) = self.guild_file(guild_id) {
            let bytes = serde_json::to_vec_pretty(data)?;
            tokio::fs::write(&path, bytes).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for JsonStore {
    async fn ready(&self) -> Result<(), StorageError> {
        let Some(base) = &self.base_path else {
            return Ok(());
        };
        tokio::fs::create_dir_all(base).await?;

        let mut loaded = 0usize;
        let mut guilds = self.guilds.write().await;
        let mut entries = tokio::fs::read_dir(base).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(guild_id) = path.file_stem().and_then(|s| s.to_str()).and_then(decode_file_stem) else {
                tracing::warn!("Skipping {}: not a guild data file", path.display());
                continue;
            };
            let content = tokio::fs::read(&path).await?;
            let data: Map<String, Value> = serde_json::from_slice(&content)?;
            guilds.insert(guild_id, data);
            loaded += 1;
        }
        tracing::info!("Loaded data for {} guilds from {}", loaded, base.display());
        Ok(())
    }

    async fn get(&self, guild_id: &str, key: &str) -> Result<Option<Value>, StorageError> {
        let guilds = self.guilds.read().await;
        Ok(guilds.get(guild_id).and_then(|data| data.get(key)).cloned())
    }

    async fn set(&self, guild_id: &str, key: &str, value: Value) -> Result<Value, StorageError> {
        let mut guilds = self.guilds.write().await;
        let data = guilds.entry(guild_id.to_string()).or_default();
        data.insert(key.to_string(), value.clone());
        self.flush(guild_id, data).await?;
        Ok(value)
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9_-]` so any guild id maps to a
/// distinct, portable file name
fn encode_file_stem(guild_id: &str) -> String {
    let mut out = String::with_capacity(guild_id.len());
    for byte in guild_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_file_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex = stem.get(idx + 1..idx + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Open the configured backend
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn DataStore>, StorageError> {
    let store: Arc<dyn DataStore> = match config.backend {
        StorageBackend::Memory => Arc::new(JsonStore::in_memory()),
        StorageBackend::Json => Arc::new(JsonStore::new(&config.path)),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.path)?),
    };
    tracing::info!("Using {:?} storage", config.backend);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = JsonStore::in_memory();
        store.ready().await.unwrap();
        assert_eq!(store.get("g1", "core.prefix").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_guilds_are_isolated() {
        let store = JsonStore::in_memory();
        store.set("g1", "core.prefix", json!("?")).await.unwrap();
        assert_eq!(store.get("g1", "core.prefix").await.unwrap(), Some(json!("?")));
        assert_eq!(store.get("g2", "core.prefix").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_files_are_reloaded() {
        let dir = std::env::temp_dir().join(format!("guildbot-store-{}", uuid::Uuid::new_v4()));
        let store = JsonStore::new(&dir);
        store.ready().await.unwrap();
        store.set("1234", "core.enabledPlugins", json!({"music": false})).await.unwrap();

        let reopened = JsonStore::new(&dir);
        reopened.ready().await.unwrap();
        assert_eq!(
            reopened.get("1234", "core.enabledPlugins").await.unwrap(),
            Some(json!({"music": false}))
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_guild_ids_with_punctuation_survive_reload() {
        let dir = std::env::temp_dir().join(format!("guildbot-store-{}", uuid::Uuid::new_v4()));
        let store = JsonStore::new(&dir);
        store.ready().await.unwrap();
        store.set("a.b", "core.prefix", json!("?")).await.unwrap();
        store.set("a_b", "core.prefix", json!("$")).await.unwrap();
        store.set("team/ü", "core.prefix", json!("%")).await.unwrap();

        let reopened = JsonStore::new(&dir);
        reopened.ready().await.unwrap();
        assert_eq!(reopened.get("a.b", "core.prefix").await.unwrap(), Some(json!("?")));
        assert_eq!(reopened.get("a_b", "core.prefix").await.unwrap(), Some(json!("$")));
        assert_eq!(reopened.get("team/ü", "core.prefix").await.unwrap(), Some(json!("%")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_stems_are_reversible() {
        assert_eq!(encode_file_stem("1234"), "1234");
        assert_eq!(encode_file_stem("a.b"), "a%2Eb");
        assert_eq!(decode_file_stem("a%2Eb").as_deref(), Some("a.b"));
        assert_eq!(decode_file_stem("bad%2"), None);
        assert_eq!(decode_file_stem(&encode_file_stem("team/ü")).as_deref(), Some("team/ü"));
    }
}
