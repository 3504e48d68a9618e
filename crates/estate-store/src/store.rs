//! # Persistence Façade
//!
//! Loads and saves the unified dataset, keeps the auto-backup slot current,
//! and manages named backups.
//!
//! ## Storage Keys
//! ```text
//! ┌────────────────────────────┬─────────────────────────────────────────────┐
//! │ crm_data                   │ primary dataset                             │
//! │ crm_data_auto_backup       │ single slot, overwritten on every save      │
//! │ crm_backup_<name>          │ named backups, only written on request      │
//! └────────────────────────────┴─────────────────────────────────────────────┘
//! ```
//!
//! ## Load / Save
//! ```text
//!   load ──► read crm_data ──► version == 4.0 ? ──yes──► decode
//!                                   │ no
//!                                   └──► Legacy Migrator ──► dataset
//!
//!   save ──► stamp version + lastUpdated ──► write crm_data
//!                                        └──► write crm_data_auto_backup
//! ```

use chrono::Utc;
use estate_core::ids::now_timestamp;
use estate_core::import::{export_json, import_json, ImportOptions, ImportOutcome};
use estate_core::migrate::migrate;
use estate_core::{CrmData, EntityKind, CURRENT_VERSION};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::StorageBackend;
use crate::error::{StoreError, StoreResult};

pub const DATA_KEY: &str = "crm_data";
pub const AUTO_BACKUP_KEY: &str = "crm_data_auto_backup";
pub const BACKUP_PREFIX: &str = "crm_backup_";

/// A named backup as listed to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub name: String,
    /// When the backup was written.
    pub created_at: String,
    pub version: Option<String>,
    pub total_records: usize,
}

/// Dataset persistence over a [`StorageBackend`].
#[derive(Debug)]
pub struct Store<B> {
    backend: B,
    auto_backup: bool,
}

impl<B: StorageBackend> Store<B> {
    /// Creates a store with auto-backup enabled.
    pub fn new(backend: B) -> Self {
        Store {
            backend,
            auto_backup: true,
        }
    }

    /// Enables or disables the auto-backup slot.
    pub fn auto_backup(mut self, enabled: bool) -> Self {
        self.auto_backup = enabled;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // =========================================================================
    // Load / Save
    // =========================================================================

    /// Loads the dataset. An empty store yields an empty current dataset.
    ///
    /// Payloads from older versions are migrated in memory; the upgraded
    /// shape is written back on the next save.
    pub async fn load(&self) -> StoreResult<CrmData> {
        match self.read_dataset(DATA_KEY).await? {
            Some(data) => Ok(data),
            None => {
                debug!("No stored dataset, starting empty");
                Ok(CrmData::default())
            }
        }
    }

    /// Stamps the current version and a fresh timestamp, writes the primary
    /// record, then overwrites the auto-backup slot.
    pub async fn save(&self, data: &mut CrmData) -> StoreResult<()> {
        data.version = CURRENT_VERSION.to_string();
        data.last_updated = Some(now_timestamp());
        let text = serde_json::to_string(data).map_err(|e| StoreError::Internal(e.to_string()))?;

        self.backend.write(DATA_KEY, &text).await?;
        if self.auto_backup {
            self.backend.write(AUTO_BACKUP_KEY, &text).await?;
        }

        info!(records = data.total_records(), "Dataset saved");
        Ok(())
    }

    async fn read_dataset(&self, key: &str) -> StoreResult<Option<CrmData>> {
        let Some(text) = self.backend.read(key).await? else {
            return Ok(None);
        };
        let raw: Value = serde_json::from_str(&text).map_err(|e| StoreError::corrupt(key, e))?;

        let stored_version = raw.get("version").and_then(Value::as_str).map(str::to_string);
        if stored_version.as_deref() == Some(CURRENT_VERSION) {
            let data = serde_json::from_value(raw).map_err(|e| StoreError::corrupt(key, e))?;
            return Ok(Some(data));
        }

        warn!(
            key,
            stored_version = stored_version.as_deref().unwrap_or("none"),
            "Stored dataset is outdated, migrating"
        );
        Ok(Some(migrate(raw)?))
    }

    // =========================================================================
    // Export / Import
    // =========================================================================

    /// Pretty JSON backup of the stored dataset.
    pub async fn export_json(&self) -> StoreResult<String> {
        let data = self.load().await?;
        Ok(export_json(&data)?)
    }

    /// Imports backup text into the stored dataset and saves the result.
    pub async fn import_json(&self, text: &str, options: ImportOptions) -> StoreResult<ImportOutcome> {
        let existing = self.load().await?;
        let mut outcome = import_json(text, existing, options)?;
        self.save(&mut outcome.data).await?;
        info!(summary = %outcome.summary, "Backup imported");
        Ok(outcome)
    }

    /// Applies an already reconciled dataset (e.g. a spreadsheet import).
    pub async fn apply(&self, mut outcome: ImportOutcome) -> StoreResult<ImportOutcome> {
        self.save(&mut outcome.data).await?;
        Ok(outcome)
    }

    // =========================================================================
    // Single Records
    // =========================================================================

    /// Adds or updates one record through the import path. Returns its ID.
    pub async fn upsert_record(&self, kind: EntityKind, value: Value) -> StoreResult<String> {
        let mut data = self.load().await?;
        let id = data.upsert_value(kind, value)?;
        self.save(&mut data).await?;
        Ok(id)
    }

    /// Deletes one record. Records referencing it are left alone.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        let mut data = self.load().await?;
        if !data.remove(kind, id) {
            return Ok(false);
        }
        self.save(&mut data).await?;
        info!(entity = %kind, id, "Record deleted");
        Ok(true)
    }

    /// Empties every collection, keeping settings. A named backup of the
    /// previous state is written first; its name is returned.
    pub async fn clear_all_data(&self) -> StoreResult<String> {
        let name = format!("before_clear_{}", Utc::now().format("%Y%m%d_%H%M%S"));
        self.create_backup(Some(&name)).await?;

        let mut data = self.load().await?;
        data.clear_collections();
        self.save(&mut data).await?;

        warn!(backup = %name, "All data cleared");
        Ok(name)
    }

    // =========================================================================
    // Backups
    // =========================================================================

    /// Named backups, newest first.
    pub async fn list_backups(&self) -> StoreResult<Vec<BackupInfo>> {
        let entries = self.backend.entries_with_prefix(BACKUP_PREFIX).await?;
        let mut backups = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = entry.key.trim_start_matches(BACKUP_PREFIX).to_string();
            let raw: Option<Value> = self
                .backend
                .read(&entry.key)
                .await?
                .and_then(|text| serde_json::from_str(&text).ok());

            let version = raw
                .as_ref()
                .and_then(|v| v.get("version"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let total_records = raw
                .as_ref()
                .map(|v| {
                    EntityKind::ALL
                        .iter()
                        .filter_map(|kind| v.get(kind.key()).and_then(Value::as_array))
                        .map(Vec::len)
                        .sum()
                })
                .unwrap_or(0);

            backups.push(BackupInfo {
                name,
                created_at: entry.updated_at,
                version,
                total_records,
            });
        }
        Ok(backups)
    }

    /// Writes the current dataset to a named backup. Without a name, a dated
    /// one is generated. Returns the name used.
    pub async fn create_backup(&self, name: Option<&str>) -> StoreResult<String> {
        let name = match name {
            Some(n) => validate_backup_name(n)?,
            None => format!("backup_{}", Utc::now().format("%Y%m%d_%H%M%S")),
        };

        let data = self.load().await?;
        let text = export_json(&data)?;
        self.backend.write(&backup_key(&name), &text).await?;

        info!(backup = %name, records = data.total_records(), "Backup created");
        Ok(name)
    }

    /// Replaces the dataset with a named backup and saves it.
    pub async fn restore_backup(&self, name: &str) -> StoreResult<CrmData> {
        let name = validate_backup_name(name)?;
        let mut data = self
            .read_dataset(&backup_key(&name))
            .await?
            .ok_or_else(|| StoreError::BackupNotFound(name.clone()))?;

        self.save(&mut data).await?;
        info!(backup = %name, "Backup restored");
        Ok(data)
    }

    /// Replaces the dataset with the auto-backup slot.
    pub async fn restore_auto_backup(&self) -> StoreResult<CrmData> {
        let mut data = self
            .read_dataset(AUTO_BACKUP_KEY)
            .await?
            .ok_or_else(|| StoreError::BackupNotFound("auto".to_string()))?;
        self.save(&mut data).await?;
        Ok(data)
    }

    pub async fn delete_backup(&self, name: &str) -> StoreResult<bool> {
        let name = validate_backup_name(name)?;
        let removed = self.backend.remove(&backup_key(&name)).await?;
        if removed {
            info!(backup = %name, "Backup deleted");
        }
        Ok(removed)
    }
}

fn backup_key(name: &str) -> String {
    format!("{BACKUP_PREFIX}{name}")
}

/// Backup names become storage keys: letters, digits, `-` and `_` only.
pub fn validate_backup_name(name: &str) -> StoreResult<String> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(StoreError::InvalidBackupName(name.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    fn store() -> Store<MemoryBackend> {
        Store::new(MemoryBackend::new())
    }

    #[tokio::test]
    async fn test_empty_store_loads_default() {
        let data = store().load().await.unwrap();
        assert_eq!(data.total_records(), 0);
        assert_eq!(data.version, CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_save_stamps_and_writes_auto_backup() {
        let store = store();
        let mut data = CrmData {
            version: "1.0".into(),
            ..Default::default()
        };
        store.save(&mut data).await.unwrap();

        assert_eq!(data.version, CURRENT_VERSION);
        assert!(data.last_updated.is_some());
        let primary = store.backend().read(DATA_KEY).await.unwrap();
        let auto = store.backend().read(AUTO_BACKUP_KEY).await.unwrap();
        assert!(primary.is_some());
        assert_eq!(primary, auto);
    }

    #[tokio::test]
    async fn test_auto_backup_disabled() {
        let store = Store::new(MemoryBackend::new()).auto_backup(false);
        store.save(&mut CrmData::default()).await.unwrap();
        assert!(store.backend().read(AUTO_BACKUP_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_migrates_legacy_payload() {
        let store = store();
        let legacy = json!({
            "customers": [{"id": "c1", "type": "broker", "name": "Ali", "phone": "0300"}]
        });
        store.backend().write(DATA_KEY, &legacy.to_string()).await.unwrap();

        let data = store.load().await.unwrap();
        assert_eq!(data.brokers.len(), 1);
        assert_eq!(data.brokers[0].id, "broker_c1");
        assert_eq!(data.version, CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_an_error() {
        let store = store();
        store.backend().write(DATA_KEY, "{not json").await.unwrap();
        assert!(matches!(store.load().await, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_import_then_export() {
        let store = store();
        let backup = json!({
            "version": "4.0",
            "customers": [{"id": "c1", "name": "Sara"}],
            "receipts": [{"id": "r1", "customerId": "c1", "projectId": "p0", "amount": 10, "date": "2024-03-05"}]
        });
        let outcome = store
            .import_json(&backup.to_string(), ImportOptions::merge())
            .await
            .unwrap();
        assert_eq!(outcome.summary.imported_total(), 2);

        let exported: Value = serde_json::from_str(&store.export_json().await.unwrap()).unwrap();
        assert_eq!(exported["receipts"][0]["customerName"], "Sara");
        assert_eq!(exported["receipts"][0]["receiptNumber"], "RCP-202403-0001");
        assert!(exported["exportDate"].is_string());
    }

    #[tokio::test]
    async fn test_upsert_and_delete_without_cascade() {
        let store = store();
        let cid = store
            .upsert_record(EntityKind::Customers, json!({"name": "Bilal"}))
            .await
            .unwrap();
        store
            .upsert_record(
                EntityKind::Projects,
                json!({"id": "p1", "customerId": cid, "name": "Lake City", "sale": "1,000,000"}),
            )
            .await
            .unwrap();

        assert!(store.delete(EntityKind::Customers, &cid).await.unwrap());
        assert!(!store.delete(EntityKind::Customers, &cid).await.unwrap());

        let data = store.load().await.unwrap();
        assert!(data.customers.is_empty());
        assert_eq!(data.projects[0].customer_id, cid);
        assert_eq!(data.projects[0].sale, 1_000_000.0);
    }

    #[tokio::test]
    async fn test_upsert_rejects_missing_required() {
        let err = store()
            .upsert_record(EntityKind::Receipts, json!({"amount": 5}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(_)));
    }

    #[tokio::test]
    async fn test_clear_all_data_snapshots_first() {
        let store = store();
        let mut data = CrmData::default();
        data.settings.company_name = Some("Acme Estates".into());
        data.upsert_value(EntityKind::Customers, json!({"id": "c1", "name": "Ali"}))
            .unwrap();
        store.save(&mut data).await.unwrap();

        let backup = store.clear_all_data().await.unwrap();
        let cleared = store.load().await.unwrap();
        assert_eq!(cleared.total_records(), 0);
        assert_eq!(cleared.settings.company_name.as_deref(), Some("Acme Estates"));

        let restored = store.restore_backup(&backup).await.unwrap();
        assert_eq!(restored.customers.len(), 1);
        assert_eq!(store.load().await.unwrap().customers.len(), 1);
    }

    #[tokio::test]
    async fn test_named_backups() {
        let store = store();
        let mut data = CrmData::default();
        data.upsert_value(EntityKind::Customers, json!({"id": "c1", "name": "Ali"}))
            .unwrap();
        store.save(&mut data).await.unwrap();

        let generated = store.create_backup(None).await.unwrap();
        assert!(generated.starts_with("backup_"));
        store.create_backup(Some("before-import")).await.unwrap();

        let backups = store.list_backups().await.unwrap();
        assert_eq!(backups.len(), 2);
        assert!(backups.iter().all(|b| b.total_records == 1));
        assert!(backups.iter().any(|b| b.name == "before-import"));

        assert!(matches!(
            store.create_backup(Some("../etc")).await,
            Err(StoreError::InvalidBackupName(_))
        ));
        assert!(matches!(
            store.restore_backup("missing").await,
            Err(StoreError::BackupNotFound(_))
        ));
        assert!(store.delete_backup("before-import").await.unwrap());
        assert_eq!(store.list_backups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_auto_backup() {
        let store = store();
        let mut data = CrmData::default();
        data.upsert_value(EntityKind::Brokers, json!({"id": "b1", "name": "Kamran"}))
            .unwrap();
        store.save(&mut data).await.unwrap();
        store.backend().remove(DATA_KEY).await.unwrap();

        let restored = store.restore_auto_backup().await.unwrap();
        assert_eq!(restored.brokers[0].name, "Kamran");
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = Store::new(db.kv_store());
        store
            .upsert_record(EntityKind::Customers, json!({"id": "c1", "name": "Ali"}))
            .await
            .unwrap();
        assert_eq!(store.load().await.unwrap().customers[0].name, "Ali");
    }
}
