//! # Remote Persistence Façade
//!
//! The same load / save / import surface as the local store, backed by the
//! REST API. Reconciliation still runs locally through estate-core; the
//! server only stores what it is sent.

use estate_core::ids::now_timestamp;
use estate_core::import::{export_json, import_json, ImportOptions, ImportOutcome};
use estate_core::migrate::migrate;
use estate_core::{CrmData, EntityKind, CURRENT_VERSION};
use serde_json::Value;
use tracing::{info, warn};

use crate::client::RestClient;
use crate::error::{RemoteError, RemoteResult};

#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: RestClient,
}

impl RemoteStore {
    pub fn new(client: RestClient) -> Self {
        RemoteStore { client }
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// Fetches the dataset, upgrading it if the server holds an older shape.
    pub async fn load(&self) -> RemoteResult<CrmData> {
        let raw = self.client.export_backup().await?;
        if !raw.is_object() {
            warn!("Server returned no dataset, starting empty");
            return Ok(CrmData::default());
        }
        Ok(migrate(raw)?)
    }

    /// Stamps version and timestamp, then replaces the server's dataset.
    pub async fn save(&self, data: &mut CrmData) -> RemoteResult<()> {
        data.version = CURRENT_VERSION.to_string();
        data.last_updated = Some(now_timestamp());
        let payload = serde_json::to_value(&*data)?;
        self.client.import_backup(&payload).await?;
        info!(records = data.total_records(), "Dataset saved to server");
        Ok(())
    }

    pub async fn export_json(&self) -> RemoteResult<String> {
        let data = self.load().await?;
        Ok(export_json(&data)?)
    }

    /// Reconciles backup text against the server's dataset and uploads the
    /// result.
    pub async fn import_json(&self, text: &str, options: ImportOptions) -> RemoteResult<ImportOutcome> {
        let existing = self.load().await?;
        let mut outcome = import_json(text, existing, options)?;
        self.save(&mut outcome.data).await?;
        info!(summary = %outcome.summary, "Backup imported to server");
        Ok(outcome)
    }

    /// Uploads an already reconciled dataset (e.g. a spreadsheet import).
    pub async fn apply(&self, mut outcome: ImportOutcome) -> RemoteResult<ImportOutcome> {
        self.save(&mut outcome.data).await?;
        Ok(outcome)
    }

    /// Normalizes one record locally, then updates it on the server,
    /// creating it when the server does not know the ID. Returns the ID.
    pub async fn upsert_record(&self, kind: EntityKind, value: Value) -> RemoteResult<String> {
        let mut data = self.load().await?;
        let id = data.upsert_value(kind, value)?;
        let record = record_json(&data, kind, &id)?;

        match self.client.update(kind, &id, &record).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                self.client.create(kind, &record).await?;
            }
            Err(e) => return Err(e),
        }
        info!(entity = %kind, id = %id, "Record saved to server");
        Ok(id)
    }

    /// Deletes one record. Records referencing it are left alone.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> RemoteResult<bool> {
        self.client.delete(kind, id).await
    }

    /// Empties the server's collections. Returns the dataset as it was
    /// before clearing so the caller can keep a copy.
    pub async fn clear_all_data(&self) -> RemoteResult<CrmData> {
        let before = self.load().await?;
        self.client.clear_all().await?;
        warn!(records = before.total_records(), "All server data cleared");
        Ok(before)
    }

    pub async fn health(&self) -> bool {
        self.client.health().await
    }
}

/// The stored JSON of one record, after normalization and enrichment.
fn record_json(data: &CrmData, kind: EntityKind, id: &str) -> RemoteResult<Value> {
    let mut root = serde_json::to_value(data)?;
    root.get_mut(kind.key())
        .and_then(Value::as_array_mut)
        .and_then(|records| {
            let pos = records
                .iter()
                .position(|r| r.get("id").and_then(Value::as_str) == Some(id))?;
            Some(records.swap_remove(pos))
        })
        .ok_or_else(|| RemoteError::Decode(format!("{kind} {id} missing after upsert")))
}
