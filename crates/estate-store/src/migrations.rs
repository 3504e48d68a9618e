//! # Schema Migrations
//!
//! The on-disk schema is a single `kv_store` table; the dataset shape
//! itself is versioned inside the stored JSON and upgraded by
//! `estate_core::migrate` on load. SQL migrations only cover the table.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_kv_store.sql     kv_store(key, value, updated_at)
//! ```
//!
//! Files are embedded at compile time and applied in filename order. Add a
//! new `NNN_description.sql` for every change; applied files are
//! checksummed, so editing one breaks every existing database.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::StoreResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

/// Applies pending migrations. A no-op on an up-to-date database.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    let (total, applied) = migration_status(pool).await?;
    if total == applied {
        debug!(applied, "Schema up to date");
        return Ok(());
    }

    MIGRATOR.run(pool).await?;
    info!(pending = total - applied, "Schema migrated");
    Ok(())
}

/// `(embedded, applied)` migration counts.
///
/// A fresh database has no `_sqlx_migrations` table yet and reports zero
/// applied.
pub async fn migration_status(pool: &SqlitePool) -> StoreResult<(usize, usize)> {
    let applied: Option<i64> = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_optional(pool)
        .await
        .unwrap_or(None);

    Ok((MIGRATOR.migrations.len(), applied.unwrap_or(0).max(0) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_database_reports_nothing_applied() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert!(total >= 1);
        assert_eq!(applied, 0);

        run_migrations(db.pool()).await.unwrap();
        run_migrations(db.pool()).await.unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap(), (total, total));
    }
}
