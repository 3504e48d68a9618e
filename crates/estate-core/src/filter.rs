//! # Field Filter
//!
//! Strips a raw record down to its schema fields.
//!
//! ```text
//!   raw record ──► required present? ──no──► None (rejected)
//!                        │yes
//!                        ▼
//!              keep required ∪ optional   (unknown keys dropped)
//!              copy nested whole          (installments, contacts, ...)
//!                        │
//!                        ▼
//!                  clean record
//! ```
//!
//! Presence is tested by key, not by value: `0`, `false`, `""` and even
//! `null` count as present.

use serde_json::{Map, Value};
use tracing::debug;

use crate::dataset::EntityKind;

/// Filters one record against the schema of `kind`.
///
/// Returns `None` when any required field is absent.
pub fn filter_record(record: &Map<String, Value>, kind: EntityKind) -> Option<Map<String, Value>> {
    let schema = kind.schema();

    if let Some(missing) = schema.required.iter().find(|f| !record.contains_key(**f)) {
        debug!(entity = %kind, field = missing, "Record rejected: required field absent");
        return None;
    }

    let mut clean = Map::with_capacity(record.len());
    for field in schema.fields() {
        if let Some(value) = record.get(field) {
            clean.insert(field.to_string(), value.clone());
        }
    }

    let dropped = record.len() - clean.len();
    if dropped > 0 {
        debug!(entity = %kind, dropped, "Unknown fields stripped");
    }
    Some(clean)
}

/// Filters an arbitrary JSON value by collection key.
///
/// Unknown collection keys pass through unchanged. For known keys,
/// non-object values are rejected.
pub fn filter_value(value: Value, entity_key: &str) -> Option<Value> {
    let Some(kind) = EntityKind::from_key(entity_key) else {
        return Some(value);
    };
    match value {
        Value::Object(map) => filter_record(&map, kind).map(Value::Object),
        other => {
            debug!(entity = %kind, kind_of = json_type(&other), "Record rejected: not an object");
            None
        }
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_rejects_missing_required() {
        let record = obj(json!({"id": "r1", "customerId": "c1", "amount": 500}));
        assert!(filter_record(&record, EntityKind::Receipts).is_none());
    }

    #[test]
    fn test_falsy_required_values_are_present() {
        let record = obj(json!({"id": "", "customerId": 0, "projectId": false}));
        assert!(filter_record(&record, EntityKind::Receipts).is_some());

        let record = obj(json!({"id": "c1", "name": null}));
        assert!(filter_record(&record, EntityKind::Customers).is_some());
    }

    #[test]
    fn test_strips_unknown_fields() {
        let record = obj(json!({
            "id": "c1",
            "name": "Ali",
            "phone": "0300",
            "isAdmin": true,
            "__proto__": {"polluted": true}
        }));
        let clean = filter_record(&record, EntityKind::Customers).unwrap();
        assert_eq!(clean.len(), 3);
        assert!(!clean.contains_key("isAdmin"));
        assert!(!clean.contains_key("__proto__"));
    }

    #[test]
    fn test_nested_structures_copied_whole() {
        let installments = json!([
            {"id": "inst1", "amount": 1000, "dueDate": "2024-01-01", "extra": {"deep": [1, 2]}},
            {"id": "inst2", "amount": 1000, "paid": true}
        ]);
        let record = obj(json!({
            "id": "p1",
            "customerId": "c1",
            "installments": installments.clone()
        }));
        let clean = filter_record(&record, EntityKind::Projects).unwrap();
        assert_eq!(clean["installments"], installments);
    }

    #[test]
    fn test_does_not_invent_optional_fields() {
        let record = obj(json!({"id": "i1"}));
        let clean = filter_record(&record, EntityKind::Interactions).unwrap();
        assert_eq!(clean.len(), 1);
    }

    #[test]
    fn test_filter_value_unknown_key_passthrough() {
        let value = json!({"anything": [1, 2, 3]});
        assert_eq!(filter_value(value.clone(), "auditLog"), Some(value));
    }

    #[test]
    fn test_filter_value_rejects_non_object() {
        assert_eq!(filter_value(json!("c1"), "customers"), None);
        assert!(filter_value(json!({"id": "c1", "name": "Ali"}), "customers").is_some());
    }
}
