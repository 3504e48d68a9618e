//! # Import Pipeline
//!
//! Turns an untrusted backup payload into a reconciled dataset.
//!
//! ## Pipeline
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌────────┐   ┌────────┐   ┌───────────┐   ┌────────┐
//! │  parse   │──►│ migrate │──►│ normalize │──►│ filter │──►│ decode │──►│ reconcile │──►│ enrich │
//! │  (JSON)  │   │ (if old)│   │ (aliases) │   │(schema)│   │ (typed)│   │(per kind) │   │        │
//! └──────────┘   └─────────┘   └───────────┘   └────────┘   └────────┘   └───────────┘   └────────┘
//!     Err             Err        never fails   rejected ──► skipped ◄── rejected
//! ```
//!
//! Only the parse step and a non-object root are errors. Everything after
//! that is counted, never thrown.
//!
//! ## Replace Semantics
//! `ImportMode::Replace` empties every collection, including ones the
//! payload does not mention. Settings are replaced only when the payload
//! carries a settings object.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::dataset::{CrmData, EntityKind, CURRENT_VERSION};
use crate::enrich::enrich_dataset;
use crate::error::{CoreError, CoreResult};
use crate::filter::{filter_record, json_type};
use crate::ids::now_timestamp;
use crate::migrate::{detect_version, migrate_value, LegacyVersion};
use crate::normalize::normalize_record;
use crate::reconcile::{reconcile, ImportMode};
use crate::types::Settings;

// =============================================================================
// Options & Summary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    pub mode: ImportMode,
    /// Leave records whose ID already exists untouched.
    pub skip_duplicates: bool,
}

impl ImportOptions {
    pub fn merge() -> Self {
        ImportOptions {
            mode: ImportMode::Merge,
            skip_duplicates: false,
        }
    }

    pub fn replace() -> Self {
        ImportOptions {
            mode: ImportMode::Replace,
            skip_duplicates: false,
        }
    }

    pub fn skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = skip;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityCounts {
    pub imported: usize,
    pub skipped: usize,
}

/// Per-entity counts reported back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportSummary {
    counts: BTreeMap<EntityKind, EntityCounts>,
}

impl ImportSummary {
    pub fn record(&mut self, kind: EntityKind, imported: usize, skipped: usize) {
        let entry = self.counts.entry(kind).or_default();
        entry.imported += imported;
        entry.skipped += skipped;
    }

    pub fn get(&self, kind: EntityKind) -> EntityCounts {
        self.counts.get(&kind).copied().unwrap_or_default()
    }

    pub fn imported_total(&self) -> usize {
        self.counts.values().map(|c| c.imported).sum()
    }

    pub fn skipped_total(&self) -> usize {
        self.counts.values().map(|c| c.skipped).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, EntityCounts)> + '_ {
        self.counts.iter().map(|(k, c)| (*k, *c))
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} records, skipped {}",
            self.imported_total(),
            self.skipped_total()
        )?;
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, c)| c.imported + c.skipped > 0)
            .map(|(kind, c)| format!("{kind} {}/{}", c.imported, c.skipped))
            .collect();
        if !parts.is_empty() {
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

/// Result of [`import_dataset`].
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub data: CrmData,
    pub summary: ImportSummary,
    /// Shape the payload was detected as before migration.
    pub source_version: LegacyVersion,
    pub settings_replaced: bool,
}

// =============================================================================
// Parse / Export
// =============================================================================

/// Parses backup text. The only step of an import that can fail.
pub fn parse_backup(text: &str) -> CoreResult<Value> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(CoreError::NotAnObject(json_type(&value).to_string()));
    }
    Ok(value)
}

/// Serializes a dataset for export, stamping `exportDate`.
pub fn export_json(data: &CrmData) -> CoreResult<String> {
    let mut snapshot = data.clone();
    snapshot.version = CURRENT_VERSION.to_string();
    snapshot.export_date = Some(now_timestamp());
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

// =============================================================================
// Decode
// =============================================================================

/// A current-shape payload decoded into typed collections.
#[derive(Debug, Clone)]
pub struct DecodedDataset {
    pub data: CrmData,
    /// Records rejected by the filter or the typed decode.
    pub rejected: BTreeMap<EntityKind, usize>,
    pub has_settings: bool,
}

/// Normalizes, filters and decodes every collection of a current-shape payload.
pub fn decode_dataset(value: Value) -> CoreResult<DecodedDataset> {
    let mut root = match value {
        Value::Object(map) => map,
        other => return Err(CoreError::NotAnObject(json_type(&other).to_string())),
    };
    let mut rejected = BTreeMap::new();
    let mut data = CrmData::default();

    if let Some(Value::String(version)) = root.remove("version") {
        data.version = version;
    }
    data.export_date = take_string(&mut root, "exportDate");
    data.last_updated = take_string(&mut root, "lastUpdated");

    data.customers = decode_collection(&mut root, EntityKind::Customers, &mut rejected);
    data.brokers = decode_collection(&mut root, EntityKind::Brokers, &mut rejected);
    data.projects = decode_collection(&mut root, EntityKind::Projects, &mut rejected);
    data.receipts = decode_collection(&mut root, EntityKind::Receipts, &mut rejected);
    data.interactions = decode_collection(&mut root, EntityKind::Interactions, &mut rejected);
    data.inventory = decode_collection(&mut root, EntityKind::Inventory, &mut rejected);
    data.master_projects = decode_collection(&mut root, EntityKind::MasterProjects, &mut rejected);
    data.commission_payments =
        decode_collection(&mut root, EntityKind::CommissionPayments, &mut rejected);

    let has_settings = match root.remove("settings") {
        Some(Value::Object(settings)) => {
            data.settings = serde_json::from_value::<Settings>(Value::Object(settings)).unwrap_or_else(|e| {
                warn!(error = %e, "Settings unreadable, using defaults");
                Settings::default()
            });
            true
        }
        _ => false,
    };

    for key in root.keys() {
        debug!(key = %key, "Unknown top-level key ignored");
    }

    Ok(DecodedDataset {
        data,
        rejected,
        has_settings,
    })
}

fn take_string(root: &mut Map<String, Value>, key: &str) -> Option<String> {
    match root.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn decode_collection<T: DeserializeOwned>(
    root: &mut Map<String, Value>,
    kind: EntityKind,
    rejected: &mut BTreeMap<EntityKind, usize>,
) -> Vec<T> {
    let items = match root.remove(kind.key()) {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            warn!(entity = %kind, found = json_type(&other), "Collection is not an array, ignored");
            Vec::new()
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        match decode_record(kind, item) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(entity = %kind, dropped, "Records rejected during import");
        *rejected.entry(kind).or_default() += dropped;
    }
    records
}

fn decode_record<T: DeserializeOwned>(kind: EntityKind, item: Value) -> Option<T> {
    let clean = sanitize_record(kind, item)?;
    serde_json::from_value(clean)
        .map_err(|e| debug!(entity = %kind, error = %e, "Record failed typed decode"))
        .ok()
}

/// Normalizes and filters one raw record. `None` means rejected.
pub fn sanitize_record(kind: EntityKind, item: Value) -> Option<Value> {
    let Value::Object(map) = item else {
        debug!(entity = %kind, "Record rejected: not an object");
        return None;
    };
    let normalized = normalize_record(kind, map);
    filter_record(&normalized, kind).map(Value::Object)
}

// =============================================================================
// Import
// =============================================================================

macro_rules! reconcile_all {
    ($data:ident, $incoming:ident, $options:ident, $summary:ident, $rejected:ident;
     $($field:ident => $kind:expr),* $(,)?) => {
        $(
            let outcome = reconcile(
                std::mem::take(&mut $incoming.$field),
                std::mem::take(&mut $data.$field),
                $options.mode,
                $options.skip_duplicates,
            );
            $data.$field = outcome.result;
            let dropped = $rejected.get(&$kind).copied().unwrap_or(0);
            $summary.record($kind, outcome.imported, outcome.skipped + dropped);
        )*
    };
}

/// Imports a raw payload into `existing`.
pub fn import_dataset(raw: Value, existing: CrmData, options: ImportOptions) -> CoreResult<ImportOutcome> {
    let source_version = detect_version(&raw);
    let upgraded = migrate_value(raw)?;
    let DecodedDataset {
        data: mut incoming,
        rejected,
        has_settings,
    } = decode_dataset(upgraded)?;

    let mut data = existing;
    let mut summary = ImportSummary::default();

    reconcile_all!(data, incoming, options, summary, rejected;
        customers => EntityKind::Customers,
        brokers => EntityKind::Brokers,
        projects => EntityKind::Projects,
        receipts => EntityKind::Receipts,
        interactions => EntityKind::Interactions,
        inventory => EntityKind::Inventory,
        master_projects => EntityKind::MasterProjects,
        commission_payments => EntityKind::CommissionPayments,
    );

    if has_settings {
        data.settings = incoming.settings;
    }
    data.version = CURRENT_VERSION.to_string();
    let data = enrich_dataset(data);

    info!(
        mode = %options.mode,
        skip_duplicates = options.skip_duplicates,
        source_version = %source_version,
        imported = summary.imported_total(),
        skipped = summary.skipped_total(),
        "Import complete"
    );

    Ok(ImportOutcome {
        data,
        summary,
        source_version,
        settings_replaced: has_settings,
    })
}

/// Parses and imports backup text in one step.
pub fn import_json(text: &str, existing: CrmData, options: ImportOptions) -> CoreResult<ImportOutcome> {
    import_dataset(parse_backup(text)?, existing, options)
}

// =============================================================================
// Programmatic Add / Delete
// =============================================================================

impl CrmData {
    /// Adds or updates one record through the same normalize + filter path
    /// as a JSON import. Returns the record ID.
    pub fn upsert_value(&mut self, kind: EntityKind, value: Value) -> CoreResult<String> {
        let now = now_timestamp();
        let mut value = match value {
            Value::Object(map) => map,
            other => return Err(CoreError::NotAnObject(json_type(&other).to_string())),
        };
        value
            .entry("createdAt")
            .or_insert_with(|| Value::String(now.clone()));
        value.insert("updatedAt".to_string(), Value::String(now));

        let clean = sanitize_record(kind, Value::Object(value)).ok_or_else(|| {
            let missing = kind.schema().required.join(", ");
            CoreError::Validation(crate::error::ValidationError::InvalidFormat {
                field: kind.key().to_string(),
                reason: format!("record must carry {missing}"),
            })
        })?;

        macro_rules! upsert {
            ($target:expr) => {{
                let record = serde_json::from_value(clean)?;
                let outcome = reconcile(vec![record], std::mem::take(&mut $target), ImportMode::Merge, false);
                $target = outcome.result;
            }};
        }

        let id = clean
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match kind {
            EntityKind::Customers => upsert!(self.customers),
            EntityKind::Brokers => upsert!(self.brokers),
            EntityKind::Projects => upsert!(self.projects),
            EntityKind::Receipts => upsert!(self.receipts),
            EntityKind::Interactions => upsert!(self.interactions),
            EntityKind::Inventory => upsert!(self.inventory),
            EntityKind::MasterProjects => upsert!(self.master_projects),
            EntityKind::CommissionPayments => upsert!(self.commission_payments),
        }

        if matches!(
            kind,
            EntityKind::Receipts | EntityKind::Projects | EntityKind::CommissionPayments
        ) {
            *self = enrich_dataset(std::mem::take(self));
        }
        debug!(entity = %kind, id = %id, "Record upserted");
        Ok(id)
    }

    /// Removes a record by ID. No cascade: dependents keep their references.
    pub fn remove(&mut self, kind: EntityKind, id: &str) -> bool {
        fn drop_id<T: crate::types::Identified>(records: &mut Vec<T>, id: &str) -> bool {
            let before = records.len();
            records.retain(|r| r.id() != id);
            records.len() != before
        }
        match kind {
            EntityKind::Customers => drop_id(&mut self.customers, id),
            EntityKind::Brokers => drop_id(&mut self.brokers, id),
            EntityKind::Projects => drop_id(&mut self.projects, id),
            EntityKind::Receipts => drop_id(&mut self.receipts, id),
            EntityKind::Interactions => drop_id(&mut self.interactions, id),
            EntityKind::Inventory => drop_id(&mut self.inventory, id),
            EntityKind::MasterProjects => drop_id(&mut self.master_projects, id),
            EntityKind::CommissionPayments => drop_id(&mut self.commission_payments, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backup() -> Value {
        json!({
            "version": "4.0",
            "customers": [
                {"id": "c1", "name": "Ali", "phone": "0300"},
                {"id": "c2", "name": "Sara"}
            ],
            "projects": [
                {"id": "p1", "customerId": "c1", "name": "Green Valley", "unit": "A-1", "sale": 1000000}
            ],
            "receipts": [
                {"id": "r1", "customerId": "c1", "projectId": "p1", "amount": 250000, "date": "2024-02-10"}
            ],
            "settings": {"currency": "PKR", "companyName": "Acme Estates"}
        })
    }

    #[test]
    fn test_import_into_empty() {
        let outcome = import_dataset(backup(), CrmData::default(), ImportOptions::merge()).unwrap();
        assert_eq!(outcome.summary.get(EntityKind::Customers).imported, 2);
        assert_eq!(outcome.summary.imported_total(), 4);
        assert_eq!(outcome.data.receipts[0].customer_name.as_deref(), Some("Ali"));
        assert_eq!(outcome.data.receipts[0].project_name.as_deref(), Some("Green Valley - A-1"));
        assert!(outcome.settings_replaced);
        assert_eq!(outcome.data.settings.company_name.as_deref(), Some("Acme Estates"));
    }

    #[test]
    fn test_rejected_records_counted_as_skipped() {
        let raw = json!({
            "version": "4.0",
            "customers": [{"id": "c1", "name": "Ali"}, {"phone": "missing name"}, "garbage"],
            "receipts": [{"id": "r1", "customerId": "c1"}]
        });
        let outcome = import_dataset(raw, CrmData::default(), ImportOptions::merge()).unwrap();
        let customers = outcome.summary.get(EntityKind::Customers);
        assert_eq!((customers.imported, customers.skipped), (1, 2));
        assert_eq!(outcome.summary.get(EntityKind::Receipts).skipped, 1);
    }

    #[test]
    fn test_null_required_rejected_by_decode() {
        let raw = json!({"version": "4.0", "customers": [{"id": "c1", "name": null}]});
        let outcome = import_dataset(raw, CrmData::default(), ImportOptions::merge()).unwrap();
        assert_eq!(outcome.summary.get(EntityKind::Customers).skipped, 1);
        assert!(outcome.data.customers.is_empty());
    }

    #[test]
    fn test_settings_kept_when_absent() {
        let mut existing = CrmData::default();
        existing.settings.company_name = Some("Keep Me".into());
        let raw = json!({"version": "4.0", "customers": []});
        let outcome = import_dataset(raw, existing, ImportOptions::merge()).unwrap();
        assert!(!outcome.settings_replaced);
        assert_eq!(outcome.data.settings.company_name.as_deref(), Some("Keep Me"));
    }

    #[test]
    fn test_parse_backup_errors() {
        assert!(matches!(parse_backup("{not json"), Err(CoreError::InvalidJson(_))));
        assert!(matches!(parse_backup("[1,2]"), Err(CoreError::NotAnObject(_))));
        assert!(parse_backup("{}").is_ok());
    }

    #[test]
    fn test_export_round_trip() {
        let outcome = import_dataset(backup(), CrmData::default(), ImportOptions::merge()).unwrap();
        let text = export_json(&outcome.data).unwrap();
        let parsed = parse_backup(&text).unwrap();
        assert_eq!(parsed["version"], CURRENT_VERSION);
        assert!(parsed["exportDate"].is_string());

        let again = import_dataset(parsed, CrmData::default(), ImportOptions::merge()).unwrap();
        assert_eq!(again.data.customers, outcome.data.customers);
        assert_eq!(again.data.receipts, outcome.data.receipts);
    }

    #[test]
    fn test_summary_display() {
        let mut summary = ImportSummary::default();
        summary.record(EntityKind::Customers, 2, 1);
        assert_eq!(summary.to_string(), "Imported 2 records, skipped 1 (customers 2/1)");
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut data = CrmData::default();
        let id = data
            .upsert_value(EntityKind::Customers, json!({"name": "Ali", "role": "admin"}))
            .unwrap();
        assert!(id.starts_with("cust_"));
        assert_eq!(data.customers.len(), 1);
        assert!(data.customers[0].created_at.is_some());

        data.upsert_value(EntityKind::Customers, json!({"id": &id, "name": "Ali Khan"}))
            .unwrap();
        assert_eq!(data.customers.len(), 1);
        assert_eq!(data.customers[0].name, "Ali Khan");

        assert!(data.remove(EntityKind::Customers, &id));
        assert!(!data.remove(EntityKind::Customers, &id));
    }

    #[test]
    fn test_upsert_rejects_missing_required() {
        let mut data = CrmData::default();
        let err = data
            .upsert_value(EntityKind::Receipts, json!({"amount": 10}))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_upsert_receipt_is_enriched() {
        let mut data = CrmData::default();
        data.upsert_value(EntityKind::Customers, json!({"id": "c1", "name": "Ali"}))
            .unwrap();
        data.upsert_value(
            EntityKind::Receipts,
            json!({"customerId": "c1", "projectId": "p1", "amount": 100, "date": "2024-05-01"}),
        )
        .unwrap();
        assert_eq!(data.receipts[0].customer_name.as_deref(), Some("Ali"));
        assert!(data.receipts[0].receipt_number.is_some());
    }
}
