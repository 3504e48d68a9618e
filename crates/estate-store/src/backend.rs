//! # Storage Backends
//!
//! A string key-value store, the shape of the browser storage the dataset
//! was first kept in.
//!
//! ```text
//! ┌───────────────────────────┐
//! │   Store<B: StorageBackend>│
//! └─────────────┬─────────────┘
//!               │ read / write / remove / keys_with_prefix
//!      ┌────────┴─────────┐
//!      ▼                  ▼
//! ┌──────────────┐  ┌──────────────┐
//! │SqliteBackend │  │MemoryBackend │
//! │ kv_store     │  │ BTreeMap     │
//! │ table        │  │ (tests)      │
//! └──────────────┘  └──────────────┘
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;

/// A stored value with its last write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub updated_at: String,
}

/// Key-value storage.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Inserts or overwrites `key`.
    async fn write(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Returns whether the key existed.
    async fn remove(&self, key: &str) -> StoreResult<bool>;

    /// Entries whose key starts with `prefix`, newest first.
    async fn entries_with_prefix(&self, prefix: &str) -> StoreResult<Vec<StoredEntry>>;
}

// =============================================================================
// SQLite
// =============================================================================

/// Backend over the `kv_store` table.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteBackend { pool }
    }
}

/// Escapes `%` and `_` for a `LIKE ... ESCAPE '\'` pattern.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(key, bytes = value.len(), "kv_store write");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn entries_with_prefix(&self, prefix: &str) -> StoreResult<Vec<StoredEntry>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT key, updated_at FROM kv_store
            WHERE key LIKE ?1 ESCAPE '\'
            ORDER BY updated_at DESC, key ASC
            "#,
        )
        .bind(like_prefix(prefix))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(key, updated_at)| StoredEntry { key, updated_at })
            .collect())
    }
}

// =============================================================================
// In-Memory
// =============================================================================

/// Backend held in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, (String, String)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).map(|(value, _)| value.clone()))
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), now));
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn entries_with_prefix(&self, prefix: &str) -> StoreResult<Vec<StoredEntry>> {
        let entries = self.entries.read().await;
        let mut found: Vec<StoredEntry> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (_, updated_at))| StoredEntry {
                key: key.clone(),
                updated_at: updated_at.clone(),
            })
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.key.cmp(&b.key)));
        Ok(found)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
