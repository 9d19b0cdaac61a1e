//! Plain key-value store contract used by the persistent memory backend.
//! Any store exposing get/set/expire/delete is substitutable.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::core::errors::ApiError;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ApiError>;
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ApiError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), ApiError>;
    async fn delete(&self, key: &str) -> Result<(), ApiError>;
}

/// Sqlite-backed key-value store with lazy expiry. Keys past their deadline
/// behave exactly like absent keys.
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub async fn new(db_path: &Path) -> Result<Self, ApiError> {
        let conn_str = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&conn_str)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to kv db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                expires_at INTEGER
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init kv table: {}", e)))?;

        Ok(Self { pool })
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ApiError> {
        let row = sqlx::query("SELECT value, expires_at FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: Option<i64> = row.try_get("expires_at").map_err(ApiError::internal)?;
        if let Some(deadline) = expires_at {
            if Self::now() > deadline {
                self.delete(key).await?;
                return Ok(None);
            }
        }

        let value: Vec<u8> = row.try_get("value").map_err(ApiError::internal)?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO kv (key, value, expires_at) VALUES (?, ?, NULL)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), ApiError> {
        let deadline = Self::now() + ttl.as_secs() as i64;
        sqlx::query("UPDATE kv SET expires_at = ? WHERE key = ?")
            .bind(deadline)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }
}
