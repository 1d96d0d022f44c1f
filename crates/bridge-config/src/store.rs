//! Config store port and SQLite adapter, modeled on a single-row settings table.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::error::ConfigError;
use crate::model::{ConfigPatch, ConfigRecord, ConfigSnapshot};

/// The config store port. The core only ever calls `get_snapshot`; `save` is
/// the seam the (out-of-scope) UI's `POST /api/save-*` handlers call.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_snapshot(&self) -> Result<ConfigSnapshot, ConfigError>;
    async fn save(&self, patch: ConfigPatch) -> Result<ConfigSnapshot, ConfigError>;
}

/// SQLite-backed config store: one row, keyed by a fixed `id = 0`.
pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    pub async fn new(db_path: &str) -> Result<Self, ConfigError> {
        // A shared connection pool against `:memory:` would hand each
        // connection its own empty database, so in-memory stores are pinned
        // to a single connection.
        let (url, max_connections) = if db_path == ":memory:" {
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite:{}?mode=rwc", db_path), 5)
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await
            .map_err(|e| ConfigError::database("connect", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bridge_config (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                config_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| ConfigError::database("create_table", e))?;

        Ok(Self { pool })
    }

    /// Build an in-memory store, for tests that don't need a real file.
    pub async fn in_memory() -> Result<Self, ConfigError> {
        Self::new(":memory:").await
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn get_snapshot(&self) -> Result<ConfigSnapshot, ConfigError> {
        let row = sqlx::query("SELECT config_json FROM bridge_config WHERE id = 0")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ConfigError::database("get_snapshot", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("config_json");
                serde_json::from_str(&json).map_err(|e| ConfigError::Serialization(e.to_string()))
            }
            None => Ok(ConfigRecord::default()),
        }
    }

    async fn save(&self, patch: ConfigPatch) -> Result<ConfigSnapshot, ConfigError> {
        let current = self.get_snapshot().await?;
        let updated = patch.apply_to(current);
        let json = serde_json::to_string(&updated)
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO bridge_config (id, config_json, updated_at)
            VALUES (0, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                config_json = excluded.config_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| ConfigError::database("save", e))?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_row_yields_default_snapshot() {
        let store = SqliteConfigStore::in_memory().await.unwrap();
        let snapshot = store.get_snapshot().await.unwrap();
        assert_eq!(snapshot, ConfigRecord::default());
    }

    #[tokio::test]
    async fn save_then_get_round_trips_and_is_observable_without_restart() {
        let store = SqliteConfigStore::in_memory().await.unwrap();
        let patch = ConfigPatch {
            rom_name: Some("Pokemon Emerald".to_string()),
            game_override: Some(Some("pokemon_emerald".to_string())),
            ..Default::default()
        };
        let saved = store.save(patch).await.unwrap();
        assert_eq!(saved.rom_name, "Pokemon Emerald");

        let reloaded = store.get_snapshot().await.unwrap();
        assert_eq!(reloaded.rom_name, "Pokemon Emerald");
        assert_eq!(reloaded.game_override.as_deref(), Some("pokemon_emerald"));
    }

    #[tokio::test]
    async fn clearing_game_override_requires_explicit_some_none() {
        let store = SqliteConfigStore::in_memory().await.unwrap();
        store
            .save(ConfigPatch {
                game_override: Some(Some("pokemon_ruby".to_string())),
                ..Default::default()
            })
            .await
            .unwrap();

        let cleared = store
            .save(ConfigPatch {
                game_override: Some(None),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cleared.game_override, None);
    }
}
