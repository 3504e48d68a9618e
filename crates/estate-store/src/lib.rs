//! # estate-store: Local Persistence for Estate CRM
//!
//! Keeps the unified dataset in a SQLite key-value table and handles
//! version upgrades on load, the auto-backup slot and named backups.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Estate CRM Data Flow                             │
//! │                                                                         │
//! │  estate-cli (import, backup, clear, ...)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   estate-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Store      │    │   Backends    │    │  Database    │  │   │
//! │  │   │  (store.rs)   │    │ (backend.rs)  │    │  (pool.rs)   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ load / save   │───►│ SqliteBackend │───►│ SqlitePool   │  │   │
//! │  │   │ backups       │    │ MemoryBackend │    │ migrations   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/estate-crm/estate.db                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`backend`] - Key-value backends (SQLite, in-memory)
//! - [`store`] - Load, save and backups over a backend
//! - [`config`] - Application configuration (TOML + environment)
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use estate_store::{Database, DbConfig, Store};
//!
//! let db = Database::new(DbConfig::new("estate.db")).await?;
//! let store = Store::new(db.kv_store());
//!
//! let mut data = store.load().await?;
//! data.upsert_value(EntityKind::Customers, json!({"name": "Ali"}))?;
//! store.save(&mut data).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{MemoryBackend, SqliteBackend, StorageBackend, StoredEntry};
pub use config::{AppConfig, StorageMode};
pub use error::{StoreError, StoreResult};
pub use pool::{Database, DbConfig};
pub use store::{BackupInfo, Store};
