//! # Normalization
//!
//! The single place where historical field names and loosely-typed values
//! are brought into the current shape. Runs once per record, before the
//! field filter, on every import and programmatic add.
//!
//! ## Steps
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ 1. alias resolution   saleValue / totalSale  ──► sale                │
//! │                       unit / unitNumber      ──► unitShopNumber      │
//! │ 2. null removal       optional keys holding null are dropped         │
//! │ 3. numeric coercion   "1,250,000" ──► 1250000                        │
//! │ 4. text coercion      3001234567  ──► "3001234567"                   │
//! │ 5. enum coercion      "Bank Transfer" ──► "bank_transfer"            │
//! │ 6. ID assignment      missing / empty id ──► {prefix}_{ms}_{rand}    │
//! │ 7. derived fields     balance, totalValue, plotFeatures list         │
//! │ 8. attachment cap     data > 2 MiB ──► attachment dropped            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::dataset::EntityKind;
use crate::ids::generate_id;
use crate::schema::EnumField;

/// Largest inline attachment payload kept, in encoded bytes.
pub const MAX_ATTACHMENT_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// Per-Kind Tables
// =============================================================================

/// `(canonical, aliases)` pairs; the first alias present wins.
fn aliases(kind: EntityKind) -> &'static [(&'static str, &'static [&'static str])] {
    match kind {
        EntityKind::Customers => &[
            ("phone", &["phoneNumber", "mobile"]),
            ("cnic", &["cnicNumber"]),
        ],
        EntityKind::Brokers => &[
            ("phone", &["phoneNumber", "mobile"]),
            ("commissionRate", &["commission"]),
        ],
        EntityKind::Projects => &[
            ("name", &["projectName"]),
            ("unit", &["unitNumber", "unitShopNumber"]),
            ("sale", &["saleValue", "totalSale", "salePrice"]),
            ("received", &["receivedAmount", "totalReceived", "paidAmount"]),
            ("customerId", &["clientId"]),
        ],
        EntityKind::Receipts => &[
            ("amount", &["paymentAmount", "amountPaid"]),
            ("method", &["paymentMethod"]),
        ],
        EntityKind::Interactions => &[
            ("followUpDate", &["nextFollowUp"]),
            ("notes", &["description"]),
        ],
        EntityKind::Inventory => &[
            ("unitShopNumber", &["unit", "unitNumber", "shopNumber"]),
            ("ratePerMarla", &["rate"]),
            ("totalValue", &["totalPrice"]),
        ],
        EntityKind::MasterProjects => &[("name", &["projectName"])],
        EntityKind::CommissionPayments => &[("paidAmount", &["paid"])],
    }
}

fn numeric_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Brokers => &["commissionRate"],
        EntityKind::Projects => &[
            "marlas",
            "ratePerMarla",
            "sale",
            "received",
            "balance",
            "brokerCommissionRate",
            "companyRepCommissionRate",
            "installmentCount",
        ],
        EntityKind::Receipts => &["amount"],
        EntityKind::Inventory => &["marlas", "ratePerMarla", "totalValue"],
        EntityKind::MasterProjects => &[
            "totalUnits",
            "totalCustomers",
            "totalSale",
            "totalReceived",
            "totalBalance",
        ],
        EntityKind::CommissionPayments => &["amount", "paidAmount", "remainingAmount"],
        EntityKind::Customers | EntityKind::Interactions => &[],
    }
}

/// Numeric fields decoded as unsigned integers.
const INTEGER_FIELDS: &[&str] = &["installmentCount", "totalUnits", "totalCustomers"];

/// Fields holding lists rather than text.
const LIST_FIELDS: &[&str] = &["projectIds", "plotFeatures"];

// =============================================================================
// Entry Points
// =============================================================================

/// Normalizes a value; non-objects are returned unchanged.
pub fn normalize_value(kind: EntityKind, value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_record(kind, map)),
        other => other,
    }
}

/// Normalizes one record in place of its historical shape.
pub fn normalize_record(kind: EntityKind, mut record: Map<String, Value>) -> Map<String, Value> {
    let schema = kind.schema();

    resolve_aliases(kind, &mut record);

    record.retain(|key, value| !value.is_null() || schema.required.contains(&key.as_str()));

    let numeric = numeric_fields(kind);
    for field in numeric {
        coerce_number(&mut record, field);
    }

    for field in schema.optional.iter().chain(schema.required) {
        if !numeric.contains(field) && !LIST_FIELDS.contains(field) && schema.enum_field(field).is_none() {
            coerce_text(&mut record, field);
        }
    }

    for enum_field in schema.enums {
        coerce_enum(&mut record, enum_field);
    }

    assign_id(kind, &mut record);

    match kind {
        EntityKind::Projects => derive_balance(&mut record),
        EntityKind::Inventory => {
            derive_total_value(&mut record);
            split_plot_features(&mut record);
        }
        EntityKind::Interactions => cap_attachments(&mut record),
        _ => {}
    }

    record
}

// =============================================================================
// Steps
// =============================================================================

fn resolve_aliases(kind: EntityKind, record: &mut Map<String, Value>) {
    for (canonical, names) in aliases(kind) {
        if record.get(*canonical).is_some_and(Value::is_null) {
            record.remove(*canonical);
        }
        for alias in *names {
            let Some(value) = record.remove(*alias) else {
                continue;
            };
            if !value.is_null() && !record.contains_key(*canonical) {
                debug!(entity = %kind, alias, canonical, "Alias resolved");
                record.insert(canonical.to_string(), value);
            }
        }
    }
}

/// Parses `"1,250,000"`, `" 3.5 "` and similar; `None` for anything else.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn coerce_number(record: &mut Map<String, Value>, field: &str) {
    let parsed = match record.get(field) {
        None => return,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s),
        Some(Value::Bool(_)) | Some(Value::Array(_)) | Some(Value::Object(_)) | Some(Value::Null) => None,
    };

    let replacement = parsed.and_then(|n| {
        if INTEGER_FIELDS.contains(&field) {
            (n >= 0.0).then(|| Value::Number(Number::from(n.round() as u64)))
        } else {
            Number::from_f64(n).map(Value::Number)
        }
    });

    match replacement {
        Some(value) => {
            record.insert(field.to_string(), value);
        }
        None => {
            debug!(field, "Unparseable number dropped");
            record.remove(field);
        }
    }
}

fn coerce_text(record: &mut Map<String, Value>, field: &str) {
    let text = match record.get(field) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return,
    };
    record.insert(field.to_string(), Value::String(text));
}

/// Comparison key: lowercase alphanumerics only.
fn enum_key(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn coerce_enum(record: &mut Map<String, Value>, enum_field: &EnumField) {
    let Some(value) = record.get(enum_field.field) else {
        return;
    };
    let matched = value.as_str().and_then(|raw| {
        let key = enum_key(raw);
        enum_field.allowed.iter().find(|allowed| enum_key(allowed) == key)
    });
    let canonical = match matched {
        Some(allowed) => *allowed,
        None => {
            debug!(field = enum_field.field, ?value, fallback = enum_field.fallback, "Unrecognised enum value");
            enum_field.fallback
        }
    };
    record.insert(enum_field.field.to_string(), Value::String(canonical.to_string()));
}

fn assign_id(kind: EntityKind, record: &mut Map<String, Value>) {
    let missing = match record.get("id") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    };
    if missing {
        record.insert("id".to_string(), Value::String(generate_id(kind.id_prefix())));
    }
}

fn number_of(record: &Map<String, Value>, field: &str) -> Option<f64> {
    record.get(field).and_then(Value::as_f64)
}

fn insert_number(record: &mut Map<String, Value>, field: &str, n: f64) {
    if let Some(number) = Number::from_f64(n) {
        record.insert(field.to_string(), Value::Number(number));
    }
}

fn derive_balance(record: &mut Map<String, Value>) {
    let sale = number_of(record, "sale");
    let received = number_of(record, "received");
    if sale.is_some() || received.is_some() {
        let balance = sale.unwrap_or(0.0) - received.unwrap_or(0.0);
        insert_number(record, "balance", balance);
    }
}

fn derive_total_value(record: &mut Map<String, Value>) {
    if record.contains_key("totalValue") {
        return;
    }
    if let (Some(marlas), Some(rate)) = (number_of(record, "marlas"), number_of(record, "ratePerMarla")) {
        insert_number(record, "totalValue", marlas * rate);
    }
}

/// Digits of a phone number: `"0300-123 4567"` and `"03001234567"` compare equal.
pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Splits `"Corner; Park Facing"` into a tag list.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_plot_features(record: &mut Map<String, Value>) {
    let tags = match record.get("plotFeatures") {
        Some(Value::String(raw)) => split_tags(raw),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|t| !t.is_empty())
            .collect(),
        Some(_) => Vec::new(),
        None => return,
    };
    record.insert(
        "plotFeatures".to_string(),
        Value::Array(tags.into_iter().map(Value::String).collect()),
    );
}

fn cap_attachments(record: &mut Map<String, Value>) {
    let Some(Value::Array(attachments)) = record.get_mut("attachments") else {
        return;
    };
    attachments.retain(|attachment| {
        let size = attachment
            .get("data")
            .and_then(Value::as_str)
            .map_or(0, str::len);
        if size > MAX_ATTACHMENT_BYTES {
            let name = attachment.get("name").and_then(Value::as_str).unwrap_or("unnamed");
            warn!(attachment = name, size, "Oversize attachment dropped");
            false
        } else {
            true
        }
    });
}
