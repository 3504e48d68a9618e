//! Local or remote persistence, picked by `storage.mode`.

use estate_core::import::{ImportOptions, ImportOutcome};
use estate_core::{CrmData, EntityKind};
use estate_remote::{RemoteConfig, RemoteStore, RestClient};
use estate_store::{AppConfig, Database, DbConfig, SqliteBackend, StorageMode, Store};
use serde_json::Value;
use tracing::info;

use crate::error::{CliError, CliResult};

/// The configured dataset store.
#[derive(Debug)]
pub enum Backend {
    Local(Store<SqliteBackend>),
    Remote(RemoteStore),
}

/// What `clear` left behind to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearReceipt {
    /// Named local backup.
    Backup(String),
    /// Pre-clear dataset, serialized, for the caller to keep.
    Snapshot(String),
}

impl Backend {
    /// Opens the backend named by the configuration.
    pub async fn open(config: &AppConfig) -> CliResult<Self> {
        match config.storage.mode {
            StorageMode::Local => {
                let path = config.database_path();
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let db = Database::new(DbConfig::new(&path)).await?;
                info!(path = %path.display(), "Using local store");
                Ok(Backend::Local(Store::new(db.kv_store()).auto_backup(config.backup.auto_backup)))
            }
            StorageMode::Remote => {
                let client = RestClient::new(
                    RemoteConfig::new(config.remote.base_url.clone()).timeout_secs(config.remote.timeout_secs),
                )?;
                info!(url = %client.base_url(), "Using remote store");
                Ok(Backend::Remote(RemoteStore::new(client)))
            }
        }
    }

    pub fn mode(&self) -> StorageMode {
        match self {
            Backend::Local(_) => StorageMode::Local,
            Backend::Remote(_) => StorageMode::Remote,
        }
    }

    /// The local store, for operations the REST API has no route for.
    pub fn local(&self) -> CliResult<&Store<SqliteBackend>> {
        match self {
            Backend::Local(store) => Ok(store),
            Backend::Remote(_) => Err(CliError::usage("Named backups are only available in local mode")),
        }
    }

    pub async fn load(&self) -> CliResult<CrmData> {
        Ok(match self {
            Backend::Local(store) => store.load().await?,
            Backend::Remote(store) => store.load().await?,
        })
    }

    pub async fn save(&self, data: &mut CrmData) -> CliResult<()> {
        match self {
            Backend::Local(store) => store.save(data).await?,
            Backend::Remote(store) => store.save(data).await?,
        }
        Ok(())
    }

    pub async fn export_json(&self) -> CliResult<String> {
        Ok(match self {
            Backend::Local(store) => store.export_json().await?,
            Backend::Remote(store) => store.export_json().await?,
        })
    }

    pub async fn import_json(&self, text: &str, options: ImportOptions) -> CliResult<ImportOutcome> {
        Ok(match self {
            Backend::Local(store) => store.import_json(text, options).await?,
            Backend::Remote(store) => store.import_json(text, options).await?,
        })
    }

    pub async fn apply(&self, outcome: ImportOutcome) -> CliResult<ImportOutcome> {
        Ok(match self {
            Backend::Local(store) => store.apply(outcome).await?,
            Backend::Remote(store) => store.apply(outcome).await?,
        })
    }

    pub async fn upsert_record(&self, kind: EntityKind, value: Value) -> CliResult<String> {
        Ok(match self {
            Backend::Local(store) => store.upsert_record(kind, value).await?,
            Backend::Remote(store) => store.upsert_record(kind, value).await?,
        })
    }

    pub async fn delete(&self, kind: EntityKind, id: &str) -> CliResult<bool> {
        Ok(match self {
            Backend::Local(store) => store.delete(kind, id).await?,
            Backend::Remote(store) => store.delete(kind, id).await?,
        })
    }

    pub async fn clear_all_data(&self) -> CliResult<ClearReceipt> {
        match self {
            Backend::Local(store) => Ok(ClearReceipt::Backup(store.clear_all_data().await?)),
            Backend::Remote(store) => {
                let before = store.clear_all_data().await?;
                Ok(ClearReceipt::Snapshot(estate_core::import::export_json(&before)?))
            }
        }
    }
}
