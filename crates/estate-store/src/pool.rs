//! # SQLite Pool
//!
//! Opens the database file that holds the dataset, its auto-backup slot and
//! named backups, then hands out key-value backends sharing one pool.
//!
//! ```text
//!   DbConfig::new(path)             DbConfig::in_memory()
//!          │                               │
//!          └───────────┬───────────────────┘
//!                      ▼
//!          Database::new(config).await
//!            ├─ open (WAL, NORMAL sync, busy timeout)
//!            └─ run embedded migrations (kv_store table)
//!                      │
//!                      ▼
//!          db.kv_store() ──► SqliteBackend ──► Store<SqliteBackend>
//! ```
//!
//! Every save rewrites a whole dataset row, so the pool stays small; WAL
//! lets `backup list` read while a save is in flight.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

use crate::backend::SqliteBackend;
use crate::error::{StoreError, StoreResult};
use crate::migrations;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the database.
///
/// ```rust,ignore
/// let config = DbConfig::new("./data/estate.db").max_connections(2);
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created when missing. `:memory:` for a throwaway database.
    pub database_path: PathBuf,

    /// Default: 4
    pub max_connections: u32,

    /// How long a writer waits on a locked database before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A private in-memory database, gone when the pool closes.
    pub fn in_memory() -> Self {
        // Each connection to :memory: is a separate database
        DbConfig::new(MEMORY_PATH).max_connections(1)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }

    fn connect_options(&self) -> StoreResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Owns the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and, unless disabled, applies pending migrations.
    ///
    /// ## Errors
    /// - `ConnectionFailed` when the file cannot be opened or created
    /// - `MigrationFailed` when the schema cannot be brought up to date
    pub async fn new(config: DbConfig) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            // Keep the single in-memory connection alive for the pool's lifetime
            .idle_timeout(if config.is_in_memory() { None } else { Some(Duration::from_secs(300)) })
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Database opened"
        );

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Key-value backend sharing this pool.
    pub fn kv_store(&self) -> SqliteBackend {
        SqliteBackend::new(self.pool.clone())
    }

    /// Closes the pool. Backends handed out earlier fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StorageBackend;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let kv = db.kv_store();
        kv.write("crm_data", "{}").await.unwrap();
        assert_eq!(db.kv_store().read("crm_data").await.unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/estate.db")
            .max_connections(0)
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estate.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        db.kv_store().write("crm_data", r#"{"version":"4.0"}"#).await.unwrap();
        db.close().await;

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
        assert!(db.kv_store().read("crm_data").await.unwrap().is_some());
    }
}
