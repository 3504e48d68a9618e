//! # Legacy Migrator
//!
//! Upgrades older backup shapes into the current one.
//!
//! ## Version State Machine
//! ```text
//! ┌──────────┐  broker split   ┌──────────┐ commission rates ┌──────────┐ company rep ┌──────────┐
//! │    V1    │ ──────────────► │    V2    │ ───────────────► │    V3    │ ──────────► │    V4    │
//! │ (no ver) │ customers with  │          │ 2.5 ──► 1.0      │          │ salesRep ──►│ current  │
//! │          │ type=broker ──► │          │ missing ──► 1.0  │          │ companyRep  │ "4.0"    │
//! │          │ Broker records  │          │ backfill pending │          │ rates       │          │
//! └──────────┘                 └──────────┘ commission rows  └──────────┘             └──────────┘
//! ```
//!
//! Each step works on raw JSON so shapes that no longer decode into the
//! typed model can still be read. Records are normalized first so every
//! step sees canonical field names.
//!
//! ## Determinism
//! Derived records get IDs computed from their source
//! (`broker_{customerId}`, `commission_{projectId}_broker`), so migrating
//! the same file twice yields the same IDs.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::commission::commission_amount;
use crate::dataset::{CrmData, EntityKind, CURRENT_VERSION};
use crate::enrich::enrich_dataset;
use crate::error::{CoreError, CoreResult};
use crate::filter::json_type;
use crate::ids::now_timestamp;
use crate::import::decode_dataset;
use crate::normalize::{normalize_value, parse_number, phone_digits};
use crate::{DEFAULT_COMMISSION_RATE, LEGACY_DEFAULT_COMMISSION_RATE};

// =============================================================================
// Version Detection
// =============================================================================

/// Known dataset shapes, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LegacyVersion {
    /// No `version` field: brokers live in the customer list.
    V1,
    /// Separate broker list, commission default still 2.5%.
    V2,
    /// Commission rates migrated, no company representatives.
    V3,
    /// Current shape.
    V4,
}

impl LegacyVersion {
    pub fn next(self) -> Option<Self> {
        match self {
            LegacyVersion::V1 => Some(LegacyVersion::V2),
            LegacyVersion::V2 => Some(LegacyVersion::V3),
            LegacyVersion::V3 => Some(LegacyVersion::V4),
            LegacyVersion::V4 => None,
        }
    }

    pub fn is_current(self) -> bool {
        self == LegacyVersion::V4
    }
}

impl fmt::Display for LegacyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LegacyVersion::V1 => "1.0",
            LegacyVersion::V2 => "2.0",
            LegacyVersion::V3 => "3.0",
            LegacyVersion::V4 => "4.0",
        };
        f.write_str(label)
    }
}

/// Detects the shape of a raw backup from its `version` field.
///
/// A missing or unreadable version means the oldest shape. Versions newer
/// than the current one are treated as current.
pub fn detect_version(raw: &Value) -> LegacyVersion {
    let text = match raw.get("version") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return LegacyVersion::V1,
    };
    let major = text
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .next()
        .and_then(|m| m.parse::<u32>().ok());
    match major {
        None | Some(0) | Some(1) => LegacyVersion::V1,
        Some(2) => LegacyVersion::V2,
        Some(3) => LegacyVersion::V3,
        Some(_) => LegacyVersion::V4,
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Migrates a raw backup all the way to a typed, enriched dataset.
pub fn migrate(raw: Value) -> CoreResult<CrmData> {
    let upgraded = migrate_value(raw)?;
    let decoded = decode_dataset(upgraded)?;
    Ok(enrich_dataset(decoded.data))
}

/// Structural upgrade of a raw backup, still as JSON.
///
/// Current-version payloads are returned unchanged.
pub fn migrate_value(raw: Value) -> CoreResult<Value> {
    let from = detect_version(&raw);
    let root = match raw {
        Value::Object(map) => map,
        other => return Err(CoreError::NotAnObject(json_type(&other).to_string())),
    };
    if from.is_current() {
        return Ok(Value::Object(root));
    }

    info!(from = %from, to = CURRENT_VERSION, "Migrating legacy dataset");
    let mut dataset = RawDataset::from_root(root);

    let mut version = from;
    while let Some(next) = version.next() {
        match next {
            LegacyVersion::V2 => split_brokers(&mut dataset),
            LegacyVersion::V3 => migrate_commission_rates(&mut dataset),
            LegacyVersion::V4 => add_company_reps(&mut dataset),
            LegacyVersion::V1 => {}
        }
        debug!(step = %next, "Migration step applied");
        version = next;
    }

    Ok(dataset.into_value())
}

// =============================================================================
// Raw Dataset
// =============================================================================

struct RawDataset {
    root: Map<String, Value>,
    collections: HashMap<EntityKind, Vec<Value>>,
    /// `None` when the backup carried no settings object.
    settings: Option<Map<String, Value>>,
}

impl RawDataset {
    fn from_root(mut root: Map<String, Value>) -> Self {
        let collections = EntityKind::ALL
            .into_iter()
            .map(|kind| {
                let records = match root.remove(kind.key()) {
                    Some(Value::Array(items)) => items
                        .into_iter()
                        .map(|item| normalize_value(kind, item))
                        .collect(),
                    _ => Vec::new(),
                };
                (kind, records)
            })
            .collect();
        let settings = match root.remove("settings") {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        };
        RawDataset {
            root,
            collections,
            settings,
        }
    }

    fn take(&mut self, kind: EntityKind) -> Vec<Value> {
        self.collections.remove(&kind).unwrap_or_default()
    }

    fn put(&mut self, kind: EntityKind, records: Vec<Value>) {
        self.collections.insert(kind, records);
    }

    fn objects_mut(&mut self, kind: EntityKind) -> impl Iterator<Item = &mut Map<String, Value>> {
        self.collections
            .entry(kind)
            .or_default()
            .iter_mut()
            .filter_map(Value::as_object_mut)
    }

    fn into_value(mut self) -> Value {
        for kind in EntityKind::ALL {
            let records = self.collections.remove(&kind).unwrap_or_default();
            self.root.insert(kind.key().to_string(), Value::Array(records));
        }
        if let Some(settings) = self.settings {
            self.root.insert("settings".to_string(), Value::Object(settings));
        }
        self.root
            .insert("version".to_string(), Value::String(CURRENT_VERSION.to_string()));
        Value::Object(self.root)
    }
}

fn text<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn rate_of(record: &Map<String, Value>, field: &str) -> Option<f64> {
    match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Missing ──► 1.0, legacy default 2.5 ──► 1.0, anything else kept.
fn migrated_rate(current: Option<f64>) -> f64 {
    match current {
        None => DEFAULT_COMMISSION_RATE,
        Some(rate) if rate == LEGACY_DEFAULT_COMMISSION_RATE => DEFAULT_COMMISSION_RATE,
        Some(rate) => rate,
    }
}

// =============================================================================
// V1 → V2: Broker Split
// =============================================================================

fn split_brokers(dataset: &mut RawDataset) {
    let now = now_timestamp();
    let mut customers = dataset.take(EntityKind::Customers);
    let mut brokers = dataset.take(EntityKind::Brokers);
    let mut remap: HashMap<String, String> = HashMap::new();

    for customer in customers.iter_mut().filter_map(Value::as_object_mut) {
        if text(customer, "type") != Some("broker") {
            continue;
        }
        let Some(customer_id) = text(customer, "id").map(str::to_string) else {
            continue;
        };

        let broker_id = match find_broker(&mut brokers, customer, &customer_id) {
            Some(existing) => existing,
            None => {
                let broker = broker_from_customer(customer, &customer_id, &now);
                let id = format!("broker_{customer_id}");
                brokers.push(Value::Object(broker));
                id
            }
        };

        debug!(customer = %customer_id, broker = %broker_id, "Customer split into broker");
        customer.insert("type".to_string(), json!("both"));
        customer.insert("linkedBrokerId".to_string(), json!(broker_id));
        remap.insert(customer_id, broker_id);
    }

    dataset.put(EntityKind::Customers, customers);
    dataset.put(EntityKind::Brokers, brokers);

    if remap.is_empty() {
        return;
    }
    info!(count = remap.len(), "Brokers split from customers");

    let remap_field = |record: &mut Map<String, Value>, field: &str| {
        let mapped = text(record, field).and_then(|old| remap.get(old)).cloned();
        if let Some(new_id) = mapped {
            record.insert(field.to_string(), Value::String(new_id));
        }
    };

    for project in dataset.objects_mut(EntityKind::Projects) {
        remap_field(project, "brokerId");
    }
    for interaction in dataset.objects_mut(EntityKind::Interactions) {
        remap_field(interaction, "brokerId");
    }
    for payment in dataset.objects_mut(EntityKind::CommissionPayments) {
        if text(payment, "recipientType").map_or(true, |t| t == "broker") {
            remap_field(payment, "recipientId");
        }
    }
}

/// Finds a broker already standing for `customer`, linking it back if needed.
fn find_broker(
    brokers: &mut [Value],
    customer: &Map<String, Value>,
    customer_id: &str,
) -> Option<String> {
    let derived_id = format!("broker_{customer_id}");
    let name = text(customer, "name");
    let phone = text(customer, "phone").map(phone_digits).filter(|p| !p.is_empty());

    let broker = brokers.iter_mut().filter_map(Value::as_object_mut).find(|b| {
        if text(b, "linkedCustomerId") == Some(customer_id) || text(b, "id") == Some(derived_id.as_str()) {
            return true;
        }
        let same_name = match (name, text(b, "name")) {
            (Some(ours), Some(theirs)) => ours.eq_ignore_ascii_case(theirs),
            _ => false,
        };
        let same_phone = phone.is_some() && text(b, "phone").map(phone_digits) == phone;
        same_name && same_phone
    })?;

    if text(broker, "linkedCustomerId").is_none() {
        broker.insert("linkedCustomerId".to_string(), json!(customer_id));
    }
    text(broker, "id").map(str::to_string)
}

fn broker_from_customer(customer: &Map<String, Value>, customer_id: &str, now: &str) -> Map<String, Value> {
    let mut broker = Map::new();
    broker.insert("id".to_string(), json!(format!("broker_{customer_id}")));
    for field in ["name", "phone", "email", "address", "cnic", "company", "notes", "commissionRate"] {
        if let Some(value) = customer.get(field) {
            broker.insert(field.to_string(), value.clone());
        }
    }
    broker.insert("linkedCustomerId".to_string(), json!(customer_id));
    let status = text(customer, "status").filter(|s| *s != "lead").unwrap_or("active");
    broker.insert("status".to_string(), json!(status));
    let created = text(customer, "createdAt").unwrap_or(now);
    broker.insert("createdAt".to_string(), json!(created));
    broker.insert("updatedAt".to_string(), json!(now));
    broker
}

// =============================================================================
// V2 → V3: Commission Rates
// =============================================================================

fn migrate_commission_rates(dataset: &mut RawDataset) {
    for broker in dataset.objects_mut(EntityKind::Brokers) {
        let rate = migrated_rate(rate_of(broker, "commissionRate"));
        broker.insert("commissionRate".to_string(), json!(rate));
    }

    for project in dataset.objects_mut(EntityKind::Projects) {
        let has_broker = text(project, "brokerId").is_some();
        let current = rate_of(project, "brokerCommissionRate");
        if has_broker || current.is_some() {
            project.insert("brokerCommissionRate".to_string(), json!(migrated_rate(current)));
        }
    }

    backfill_broker_commissions(dataset);

    let Some(settings) = dataset.settings.as_mut() else {
        return;
    };
    let legacy = rate_of(settings, "defaultBrokerCommissionRate")
        .or_else(|| rate_of(settings, "defaultCommissionRate"))
        .or_else(|| rate_of(settings, "commissionRate"));
    settings.remove("defaultCommissionRate");
    settings.remove("commissionRate");
    settings.insert("defaultBrokerCommissionRate".to_string(), json!(migrated_rate(legacy)));
}

/// Adds a pending commission row for every brokered project lacking one.
fn backfill_broker_commissions(dataset: &mut RawDataset) {
    let now = now_timestamp();

    let tracked: HashSet<(String, String)> = dataset
        .objects_mut(EntityKind::CommissionPayments)
        .filter(|p| text(p, "recipientType").map_or(true, |t| t == "broker"))
        .filter_map(|p| Some((text(p, "projectId")?.to_string(), text(p, "recipientId")?.to_string())))
        .collect();

    let mut derived = Vec::new();
    for project in dataset.objects_mut(EntityKind::Projects) {
        let (Some(project_id), Some(broker_id)) = (text(project, "id"), text(project, "brokerId")) else {
            continue;
        };
        let Some(rate) = rate_of(project, "brokerCommissionRate") else {
            continue;
        };
        if tracked.contains(&(project_id.to_string(), broker_id.to_string())) {
            continue;
        }
        let sale = rate_of(project, "sale").unwrap_or(0.0);
        let amount = commission_amount(sale, rate);

        let mut row = Map::new();
        row.insert("id".to_string(), json!(format!("commission_{project_id}_broker")));
        row.insert("projectId".to_string(), json!(project_id));
        row.insert("recipientId".to_string(), json!(broker_id));
        row.insert("recipientType".to_string(), json!("broker"));
        if let Some(name) = text(project, "brokerName") {
            row.insert("recipientName".to_string(), json!(name));
        }
        row.insert("amount".to_string(), json!(amount));
        row.insert("paidAmount".to_string(), json!(0.0));
        row.insert("remainingAmount".to_string(), json!(amount));
        row.insert("status".to_string(), json!("pending"));
        row.insert("payments".to_string(), json!([]));
        row.insert("createdAt".to_string(), json!(now));
        derived.push(Value::Object(row));
    }

    if !derived.is_empty() {
        info!(count = derived.len(), "Backfilled pending broker commissions");
        let mut payments = dataset.take(EntityKind::CommissionPayments);
        payments.extend(derived);
        dataset.put(EntityKind::CommissionPayments, payments);
    }
}

// =============================================================================
// V3 → V4: Company Representatives
// =============================================================================

const SALES_REP_ALIASES: [(&str, &str); 3] = [
    ("salesRepId", "companyRepId"),
    ("salesRepName", "companyRepName"),
    ("salesRepCommissionRate", "companyRepCommissionRate"),
];

fn add_company_reps(dataset: &mut RawDataset) {
    for project in dataset.objects_mut(EntityKind::Projects) {
        for (legacy, current) in SALES_REP_ALIASES {
            if let Some(value) = project.remove(legacy) {
                if !project.contains_key(current) && !value.is_null() {
                    project.insert(current.to_string(), value);
                }
            }
        }
        let has_rep = text(project, "companyRepId").is_some();
        let current = rate_of(project, "companyRepCommissionRate");
        if has_rep || current.is_some() {
            project.insert("companyRepCommissionRate".to_string(), json!(migrated_rate(current)));
        }
    }

    let Some(settings) = dataset.settings.as_mut() else {
        return;
    };
    let current = rate_of(settings, "defaultCompanyRepCommissionRate");
    settings.insert(
        "defaultCompanyRepCommissionRate".to_string(),
        json!(migrated_rate(current)),
    );
}

// =============================================================================
// Unit Tests
// =============================================================================
