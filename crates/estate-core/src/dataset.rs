//! # Dataset
//!
//! The unified CRM dataset and the entity kinds it is made of.
//!
//! ## Backup Shape
//! ```text
//! {
//!   "version": "4.0",
//!   "customers": [...], "brokers": [...], "projects": [...],
//!   "receipts": [...], "interactions": [...], "inventory": [...],
//!   "masterProjects": [...], "commissionPayments": [...],
//!   "settings": {...},
//!   "exportDate": "...", "lastUpdated": "..."
//! }
//! ```
//! Every array is optional on input (missing = empty).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{
    Broker, CommissionPayment, Customer, Interaction, InventoryItem, MasterProject, Project,
    Receipt, Settings,
};

/// Version stamped on every save.
pub const CURRENT_VERSION: &str = "4.0";

// =============================================================================
// Entity Kind
// =============================================================================

/// One collection of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Customers,
    Brokers,
    Projects,
    Receipts,
    Interactions,
    Inventory,
    MasterProjects,
    CommissionPayments,
}

impl EntityKind {
    /// All kinds in backup order.
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Customers,
        EntityKind::Brokers,
        EntityKind::Projects,
        EntityKind::Receipts,
        EntityKind::Interactions,
        EntityKind::Inventory,
        EntityKind::MasterProjects,
        EntityKind::CommissionPayments,
    ];

    /// Key of the collection in the backup JSON (and REST path segment).
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::Customers => "customers",
            EntityKind::Brokers => "brokers",
            EntityKind::Projects => "projects",
            EntityKind::Receipts => "receipts",
            EntityKind::Interactions => "interactions",
            EntityKind::Inventory => "inventory",
            EntityKind::MasterProjects => "masterProjects",
            EntityKind::CommissionPayments => "commissionPayments",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Prefix used when generating IDs for this kind.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Customers => "cust",
            EntityKind::Brokers => "broker",
            EntityKind::Projects => "proj",
            EntityKind::Receipts => "rcpt",
            EntityKind::Interactions => "int",
            EntityKind::Inventory => "inv",
            EntityKind::MasterProjects => "mp",
            EntityKind::CommissionPayments => "comm",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("Unknown entity type: {s}"))
    }
}

// =============================================================================
// CRM Data
// =============================================================================

/// The whole dataset in its current-version shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CrmData {
    #[serde(default = "current_version")]
    pub version: String,

    #[serde(default)]
    pub customers: Vec<Customer>,

    #[serde(default)]
    pub brokers: Vec<Broker>,

    #[serde(default)]
    pub projects: Vec<Project>,

    #[serde(default)]
    pub receipts: Vec<Receipt>,

    #[serde(default)]
    pub interactions: Vec<Interaction>,

    #[serde(default)]
    pub inventory: Vec<InventoryItem>,

    #[serde(default)]
    pub master_projects: Vec<MasterProject>,

    #[serde(default)]
    pub commission_payments: Vec<CommissionPayment>,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

fn current_version() -> String {
    CURRENT_VERSION.to_string()
}

impl Default for CrmData {
    fn default() -> Self {
        CrmData {
            version: current_version(),
            customers: Vec::new(),
            brokers: Vec::new(),
            projects: Vec::new(),
            receipts: Vec::new(),
            interactions: Vec::new(),
            inventory: Vec::new(),
            master_projects: Vec::new(),
            commission_payments: Vec::new(),
            settings: Settings::default(),
            export_date: None,
            last_updated: None,
        }
    }
}

impl CrmData {
    /// Number of records in one collection.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Customers => self.customers.len(),
            EntityKind::Brokers => self.brokers.len(),
            EntityKind::Projects => self.projects.len(),
            EntityKind::Receipts => self.receipts.len(),
            EntityKind::Interactions => self.interactions.len(),
            EntityKind::Inventory => self.inventory.len(),
            EntityKind::MasterProjects => self.master_projects.len(),
            EntityKind::CommissionPayments => self.commission_payments.len(),
        }
    }

    pub fn total_records(&self) -> usize {
        EntityKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    /// Empties every collection, keeping settings.
    pub fn clear_collections(&mut self) {
        let settings = std::mem::take(&mut self.settings);
        *self = CrmData {
            settings,
            ..CrmData::default()
        };
    }

    pub fn is_current(&self) -> bool {
        self.version == CURRENT_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_kind_keys_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(EntityKind::from_key("widgets"), None);
        assert!("widgets".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_id_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = EntityKind::ALL.iter().map(|k| k.id_prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), EntityKind::ALL.len());
    }

    #[test]
    fn test_missing_arrays_default_to_empty() {
        let data: CrmData = serde_json::from_value(json!({
            "version": "4.0",
            "customers": [{"id": "c1", "name": "Ali"}]
        }))
        .unwrap();
        assert_eq!(data.customers.len(), 1);
        assert!(data.projects.is_empty());
        assert_eq!(data.settings.currency, "PKR");
        assert_eq!(data.total_records(), 1);
    }

    #[test]
    fn test_clear_collections_keeps_settings() {
        let mut data = CrmData::default();
        data.settings.company_name = Some("Acme Estates".into());
        data.customers.push(Customer {
            id: "c1".into(),
            name: "Ali".into(),
            ..Default::default()
        });

        data.clear_collections();
        assert_eq!(data.total_records(), 0);
        assert_eq!(data.settings.company_name.as_deref(), Some("Acme Estates"));
    }

    #[test]
    fn test_serializes_camel_case_keys() {
        let value = serde_json::to_value(CrmData::default()).unwrap();
        assert!(value.get("masterProjects").is_some());
        assert!(value.get("commissionPayments").is_some());
        assert!(value.get("exportDate").is_none());
    }
}
