//! # Schema Registry
//!
//! Per-entity field sets used by the field filter and normalizer.
//!
//! ## Field Classes
//! ```text
//! ┌────────────┬──────────────────────────────────────────────────────────┐
//! │ required   │ must be present (absence, not falsiness, rejects)        │
//! │ optional   │ kept when present, never invented                        │
//! │ nested     │ non-scalar sub-structures copied through whole           │
//! │ enums      │ constrained string fields + value used when unrecognised │
//! └────────────┴──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every kind has a schema, so [`EntityKind::schema`] is an exhaustive
//! `match`. Unknown collection names from future backups have none, and
//! [`schema_for_key`] returns `None` so callers pass them through untouched.

use crate::dataset::EntityKind;

/// A constrained string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumField {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
    /// Value substituted when the input matches nothing in `allowed`.
    pub fallback: &'static str,
}

/// Field sets for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub nested: &'static [&'static str],
    pub enums: &'static [EnumField],
}

impl EntitySchema {
    /// True when `field` is in `required ∪ optional ∪ nested`.
    pub fn allows(&self, field: &str) -> bool {
        self.required.contains(&field) || self.optional.contains(&field) || self.nested.contains(&field)
    }

    pub fn is_nested(&self, field: &str) -> bool {
        self.nested.contains(&field)
    }

    pub fn enum_field(&self, field: &str) -> Option<&EnumField> {
        self.enums.iter().find(|e| e.field == field)
    }

    /// All allowed field names in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required
            .iter()
            .chain(self.optional)
            .chain(self.nested)
            .copied()
    }
}

// =============================================================================
// Enum Vocabularies
// =============================================================================

const CUSTOMER_TYPES: &[&str] = &[
    "customer",
    "broker",
    "both",
    "individual",
    "corporate",
    "government",
];
const PARTY_STATUSES: &[&str] = &["active", "inactive", "lead"];
const PROJECT_STATUSES: &[&str] = &["active", "completed", "overdue", "cancelled"];
const PAYMENT_METHODS: &[&str] = &["cash", "bank_transfer", "cheque", "online"];
const INVENTORY_STATUSES: &[&str] = &["available", "reserved", "blocked", "sold"];
const UNIT_TYPES: &[&str] = &["residential", "commercial", "apartment", "other"];
const RECIPIENT_TYPES: &[&str] = &["broker", "companyRep"];
const COMMISSION_STATUSES: &[&str] = &["pending", "partial", "paid"];

// =============================================================================
// Schemas
// =============================================================================

pub const CUSTOMERS: EntitySchema = EntitySchema {
    required: &["id", "name"],
    optional: &[
        "phone",
        "email",
        "address",
        "cnic",
        "company",
        "type",
        "status",
        "notes",
        "linkedBrokerId",
        "createdAt",
        "updatedAt",
    ],
    nested: &[],
    enums: &[
        EnumField {
            field: "type",
            allowed: CUSTOMER_TYPES,
            fallback: "customer",
        },
        EnumField {
            field: "status",
            allowed: PARTY_STATUSES,
            fallback: "active",
        },
    ],
};

pub const BROKERS: EntitySchema = EntitySchema {
    required: &["id", "name"],
    optional: &[
        "phone",
        "email",
        "address",
        "cnic",
        "company",
        "commissionRate",
        "linkedCustomerId",
        "status",
        "notes",
        "createdAt",
        "updatedAt",
    ],
    nested: &[],
    enums: &[EnumField {
        field: "status",
        allowed: PARTY_STATUSES,
        fallback: "active",
    }],
};

pub const PROJECTS: EntitySchema = EntitySchema {
    required: &["id", "customerId"],
    optional: &[
        "customerName",
        "name",
        "unit",
        "block",
        "marlas",
        "ratePerMarla",
        "sale",
        "received",
        "balance",
        "brokerId",
        "brokerName",
        "brokerCommissionRate",
        "companyRepId",
        "companyRepName",
        "companyRepCommissionRate",
        "installmentCount",
        "paymentCycle",
        "firstDueDate",
        "inventoryId",
        "status",
        "notes",
        "createdAt",
        "updatedAt",
    ],
    nested: &["installments"],
    enums: &[EnumField {
        field: "status",
        allowed: PROJECT_STATUSES,
        fallback: "active",
    }],
};

pub const RECEIPTS: EntitySchema = EntitySchema {
    required: &["id", "customerId", "projectId"],
    optional: &[
        "amount",
        "date",
        "method",
        "reference",
        "notes",
        "customerName",
        "projectName",
        "receiptNumber",
        "installmentId",
        "createdAt",
        "updatedAt",
    ],
    nested: &[],
    enums: &[EnumField {
        field: "method",
        allowed: PAYMENT_METHODS,
        fallback: "cash",
    }],
};

pub const INTERACTIONS: EntitySchema = EntitySchema {
    required: &["id"],
    optional: &[
        "customerId",
        "brokerId",
        "projectId",
        "type",
        "status",
        "priority",
        "date",
        "followUpDate",
        "subject",
        "notes",
        "outcome",
        "createdAt",
        "updatedAt",
    ],
    nested: &["contacts", "attachments"],
    enums: &[],
};

pub const INVENTORY: EntitySchema = EntitySchema {
    required: &["id", "projectName"],
    optional: &[
        "block",
        "unitShopNumber",
        "unitType",
        "marlas",
        "ratePerMarla",
        "totalValue",
        "status",
        "plotFeatures",
        "customerId",
        "projectId",
        "notes",
        "createdAt",
        "updatedAt",
    ],
    nested: &[],
    enums: &[
        EnumField {
            field: "status",
            allowed: INVENTORY_STATUSES,
            fallback: "available",
        },
        EnumField {
            field: "unitType",
            allowed: UNIT_TYPES,
            fallback: "other",
        },
    ],
};

pub const MASTER_PROJECTS: EntitySchema = EntitySchema {
    required: &["id", "name"],
    optional: &[
        "description",
        "location",
        "projectIds",
        "totalUnits",
        "totalCustomers",
        "totalSale",
        "totalReceived",
        "totalBalance",
        "createdAt",
        "updatedAt",
    ],
    nested: &[],
    enums: &[],
};

pub const COMMISSION_PAYMENTS: EntitySchema = EntitySchema {
    required: &["id", "projectId", "recipientId", "recipientType"],
    optional: &[
        "recipientName",
        "amount",
        "paidAmount",
        "remainingAmount",
        "status",
        "notes",
        "createdAt",
        "updatedAt",
    ],
    nested: &["payments"],
    enums: &[
        EnumField {
            field: "recipientType",
            allowed: RECIPIENT_TYPES,
            fallback: "broker",
        },
        EnumField {
            field: "status",
            allowed: COMMISSION_STATUSES,
            fallback: "pending",
        },
    ],
};

impl EntityKind {
    pub fn schema(&self) -> &'static EntitySchema {
        match self {
            EntityKind::Customers => &CUSTOMERS,
            EntityKind::Brokers => &BROKERS,
            EntityKind::Projects => &PROJECTS,
            EntityKind::Receipts => &RECEIPTS,
            EntityKind::Interactions => &INTERACTIONS,
            EntityKind::Inventory => &INVENTORY,
            EntityKind::MasterProjects => &MASTER_PROJECTS,
            EntityKind::CommissionPayments => &COMMISSION_PAYMENTS,
        }
    }
}

/// Schema lookup by backup key; `None` for collections this build does not know.
pub fn schema_for_key(key: &str) -> Option<&'static EntitySchema> {
    EntityKind::from_key(key).map(|kind| kind.schema())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use serde_json::{json, Value};

    fn serialized_keys(value: Value) -> Vec<String> {
        value
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn sample(kind: EntityKind) -> Value {
        let result = match kind {
            EntityKind::Customers => serde_json::to_value(Customer::default()),
            EntityKind::Brokers => serde_json::to_value(Broker::new("b1", "Zafar")),
            EntityKind::Projects => serde_json::to_value(Project::default()),
            EntityKind::Receipts => serde_json::to_value(Receipt::default()),
            EntityKind::Interactions => {
                serde_json::from_value::<Interaction>(json!({"id": "i1"}))
                    .and_then(serde_json::to_value)
            }
            EntityKind::Inventory => serde_json::to_value(InventoryItem::default()),
            EntityKind::MasterProjects => serde_json::to_value(MasterProject::default()),
            EntityKind::CommissionPayments => serde_json::to_value(CommissionPayment::default()),
        };
        result.unwrap()
    }

    #[test]
    fn test_typed_records_only_emit_schema_fields() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            for key in serialized_keys(sample(kind)) {
                assert!(schema.allows(&key), "{kind}: `{key}` missing from schema");
            }
        }
    }

    #[test]
    fn test_required_fields_always_serialized() {
        for kind in EntityKind::ALL {
            let keys = serialized_keys(sample(kind));
            for field in kind.schema().required {
                assert!(keys.iter().any(|k| k == field), "{kind}: `{field}` not emitted");
            }
        }
    }

    #[test]
    fn test_every_kind_requires_id() {
        for kind in EntityKind::ALL {
            assert!(kind.schema().required.contains(&"id"));
        }
    }

    #[test]
    fn test_nested_fields() {
        assert!(PROJECTS.is_nested("installments"));
        assert!(INTERACTIONS.is_nested("contacts"));
        assert!(!CUSTOMERS.is_nested("name"));
    }

    #[test]
    fn test_enum_fallbacks_are_allowed_values() {
        for kind in EntityKind::ALL {
            for e in kind.schema().enums {
                assert!(e.allowed.contains(&e.fallback), "{kind}.{}", e.field);
                assert!(kind.schema().allows(e.field));
            }
        }
    }

    #[test]
    fn test_schema_for_unknown_key() {
        assert!(schema_for_key("projects").is_some());
        assert!(schema_for_key("auditLog").is_none());
    }
}
