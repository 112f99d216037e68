//! SQLite-backed guild data

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::application::errors::StorageError;
use crate::domain::traits::DataStore;

/// One row per `(guild_id, key)` holding a JSON value
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        Self::init_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_tables(conn: &Connection) -> Result<(), StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS guild_data (
                guild_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (guild_id, key)
            )",
            [],
        )?;
        Ok(())
    }

    /// Run `f` against the connection off the async runtime
    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StorageError::Unavailable(format!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn get(&self, guild_id: &str, key: &str) -> Result<Option<Value>, StorageError> {
        let (guild_id, key) = (guild_id.to_string(), key.to_string());
        let raw: Option<String> = self
            .blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT value FROM guild_data WHERE guild_id = ?1 AND key = ?2",
                        rusqlite::params![guild_id, key],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, guild_id: &str, key: &str, value: Value) -> Result<Value, StorageError> {
        let raw = serde_json::to_string(&value)?;
        let (guild_id, key) = (guild_id.to_string(), key.to_string());
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO guild_data (guild_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(guild_id, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                rusqlite::params![guild_id, key, raw],
            )?;
            Ok(())
        })
        .await?;
        Ok(value)
    }
}
