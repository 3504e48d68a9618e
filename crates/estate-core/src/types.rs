//! # Domain Types
//!
//! Typed entity records for the CRM dataset.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌────────────┐ │
//! │  │  Customer   │◄──│  Project    │──►│   Broker    │   │ Inventory  │ │
//! │  │  id, name   │   │ customerId  │   │ commission  │   │ Item       │ │
//! │  │  type       │   │ brokerId    │   │ Rate (1.0)  │   │ marlas ×   │ │
//! │  │  status     │   │ companyRepId│   └─────────────┘   │ ratePer... │ │
//! │  └─────────────┘   │ sale/recv'd │          ▲          └────────────┘ │
//! │         ▲          │ installments│          │                          │
//! │         │          └──────┬──────┘   ┌──────┴──────┐                   │
//! │  ┌──────┴──────┐          │          │ Commission  │                   │
//! │  │  Receipt    │──────────┘          │ Payment     │                   │
//! │  │ customerName│                     │ paid/remain │                   │
//! │  │ projectName │  (denormalized)     └─────────────┘                   │
//! │  └─────────────┘                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Nested Sub-Structures
//! `installments`, `contacts`, `attachments` and commission `payments` are
//! kept as raw JSON values. They pass through filtering verbatim, so
//! whatever keys the UI stored inside them survive a backup round trip.
//!
//! ## Field Names
//! All records serialize camelCase to match the backup format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

// =============================================================================
// Identity
// =============================================================================

/// Anything keyed by a string ID inside a collection.
pub trait Identified {
    fn id(&self) -> &str;
}

macro_rules! impl_identified {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                #[inline]
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

// =============================================================================
// Enums
// =============================================================================

/// Classification of a customer record.
///
/// `Broker` and `Both` exist for the legacy shape where brokers lived in
/// the customer collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    #[default]
    Customer,
    Broker,
    Both,
    Individual,
    Corporate,
    Government,
}

/// Lifecycle status shared by customers and brokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
    Lead,
}

/// Status of a sale transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Overdue,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Overdue => "overdue",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Cheque,
    Online,
}

/// Availability of a sellable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    #[default]
    Available,
    Reserved,
    Blocked,
    Sold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    #[default]
    Residential,
    Commercial,
    Apartment,
    Other,
}

impl UnitType {
    pub const ALL: [UnitType; 4] = [
        UnitType::Residential,
        UnitType::Commercial,
        UnitType::Apartment,
        UnitType::Other,
    ];

    /// Label used in spreadsheet columns.
    pub fn label(&self) -> &'static str {
        match self {
            UnitType::Residential => "Residential",
            UnitType::Commercial => "Commercial",
            UnitType::Apartment => "Apartment",
            UnitType::Other => "Other",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(label))
    }
}

/// Who a commission is owed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum RecipientType {
    #[default]
    Broker,
    CompanyRep,
}

/// Settlement state of a commission payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// National identity card number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(rename = "type", default)]
    pub customer_type: CustomerType,

    #[serde(default)]
    pub status: CustomerStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Broker record split off from this customer during migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_broker_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

// =============================================================================
// Broker
// =============================================================================

/// A sales agent (or company representative) earning commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Broker {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Percentage of sale value (1.0 = 1%).
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_customer_id: Option<String>,

    #[serde(default)]
    pub status: CustomerStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

pub(crate) fn default_commission_rate() -> f64 {
    crate::DEFAULT_COMMISSION_RATE
}

impl Broker {
    /// Creates a broker with the default commission rate.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Broker {
            id: id.into(),
            name: name.into(),
            phone: None,
            email: None,
            address: None,
            cnic: None,
            company: None,
            commission_rate: default_commission_rate(),
            linked_customer_id: None,
            status: CustomerStatus::Active,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }
}

// =============================================================================
// Project (sale transaction)
// =============================================================================

/// One sale of one unit to one customer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,

    pub customer_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    /// Project (scheme) name, shared by every unit sold in it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Unit / shop number within the project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marlas: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_per_marla: Option<f64>,

    /// Total sale value.
    #[serde(default)]
    pub sale: f64,

    /// Cumulative payments received.
    #[serde(default)]
    pub received: f64,

    /// `sale - received`, refreshed on normalization.
    #[serde(default)]
    pub balance: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_commission_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_rep_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_rep_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_rep_commission_rate: Option<f64>,

    /// Installment schedule, kept verbatim.
    #[serde(default)]
    pub installments: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_cycle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_due_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_id: Option<String>,

    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Project {
    /// Outstanding amount. Not clamped: overpayment yields a negative balance.
    #[inline]
    pub fn outstanding(&self) -> f64 {
        self.sale - self.received
    }

    /// Display label used on receipts: `"{name} - {unit}"`.
    pub fn display_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or_default();
        match self.unit.as_deref().filter(|u| !u.is_empty()) {
            Some(unit) => format!("{name} - {unit}"),
            None => name.to_string(),
        }
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// One payment received against a project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,

    pub customer_id: String,

    pub project_id: String,

    #[serde(default)]
    pub amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default)]
    pub method: PaymentMethod,

    /// Cheque number / bank reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// `RCP-{yyyyMM}-{seq:04}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

// =============================================================================
// Interaction
// =============================================================================

/// A logged call, meeting or message with follow-up tracking.
///
/// `type`, `status` and `priority` are open vocabularies edited in the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(rename = "type", default = "default_interaction_type")]
    pub interaction_type: String,

    #[serde(default = "default_interaction_status")]
    pub status: String,

    #[serde(default = "default_interaction_priority")]
    pub priority: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,

    /// `{id, name, phone, type}` snapshots, kept verbatim.
    #[serde(default)]
    pub contacts: Vec<Value>,

    /// Inline-encoded files, capped on normalization.
    #[serde(default)]
    pub attachments: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_interaction_type() -> String {
    "call".to_string()
}

fn default_interaction_status() -> String {
    "pending".to_string()
}

fn default_interaction_priority() -> String {
    "medium".to_string()
}

// =============================================================================
// Inventory
// =============================================================================

/// A sellable plot, shop or apartment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,

    pub project_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_shop_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<UnitType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marlas: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_per_marla: Option<f64>,

    /// `marlas * ratePerMarla` unless given explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<f64>,

    #[serde(default)]
    pub status: InventoryStatus,

    /// Tags such as "Corner", "Park Facing".
    #[serde(default)]
    pub plot_features: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl InventoryItem {
    /// Explicit total value, or `marlas * ratePerMarla` when both are known.
    pub fn computed_total_value(&self) -> Option<f64> {
        self.total_value.or(match (self.marlas, self.rate_per_marla) {
            (Some(m), Some(r)) => Some(m * r),
            _ => None,
        })
    }
}

// =============================================================================
// Master Project
// =============================================================================

/// Aggregate of all projects sharing a project name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MasterProject {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub project_ids: Vec<String>,

    #[serde(default)]
    pub total_units: u32,

    #[serde(default)]
    pub total_customers: u32,

    #[serde(default)]
    pub total_sale: f64,

    #[serde(default)]
    pub total_received: f64,

    #[serde(default)]
    pub total_balance: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

// =============================================================================
// Commission Payment
// =============================================================================

/// Settlement tracking for a commission owed on one project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommissionPayment {
    pub id: String,

    pub project_id: String,

    pub recipient_id: String,

    pub recipient_type: RecipientType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,

    /// Total commission owed.
    #[serde(default)]
    pub amount: f64,

    #[serde(default)]
    pub paid_amount: f64,

    #[serde(default)]
    pub remaining_amount: f64,

    #[serde(default)]
    pub status: CommissionStatus,

    /// Individual settlements, kept verbatim.
    #[serde(default)]
    pub payments: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

// =============================================================================
// Settings
// =============================================================================

/// Process-wide CRM settings stored inside the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// ISO 4217 currency code.
    pub currency: String,

    pub company_name: Option<String>,

    pub default_broker_commission_rate: f64,

    pub default_company_rep_commission_rate: f64,

    /// Days until an interaction needs a follow-up.
    pub follow_up_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            currency: "PKR".to_string(),
            company_name: None,
            default_broker_commission_rate: crate::DEFAULT_COMMISSION_RATE,
            default_company_rep_commission_rate: crate::DEFAULT_COMMISSION_RATE,
            follow_up_days: 7,
        }
    }
}

impl_identified!(
    Customer,
    Broker,
    Project,
    Receipt,
    Interaction,
    InventoryItem,
    MasterProject,
    CommissionPayment,
);

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_type_field_is_renamed() {
        let customer: Customer = serde_json::from_value(json!({
            "id": "c1",
            "name": "Ali",
            "type": "both",
            "linkedBrokerId": "broker_c1"
        }))
        .unwrap();
        assert_eq!(customer.customer_type, CustomerType::Both);
        assert_eq!(customer.status, CustomerStatus::Active);

        let back = serde_json::to_value(&customer).unwrap();
        assert_eq!(back["type"], "both");
        assert_eq!(back["linkedBrokerId"], "broker_c1");
        assert!(back.get("phone").is_none());
    }

    #[test]
    fn test_broker_default_commission_rate() {
        let broker: Broker = serde_json::from_value(json!({"id": "b1", "name": "Zafar"})).unwrap();
        assert_eq!(broker.commission_rate, 1.0);
    }

    #[test]
    fn test_project_display_name() {
        let mut project = Project {
            name: Some("Green Valley".into()),
            unit: Some("A-12".into()),
            ..Default::default()
        };
        assert_eq!(project.display_name(), "Green Valley - A-12");

        project.unit = None;
        assert_eq!(project.display_name(), "Green Valley");
    }

    #[test]
    fn test_project_outstanding_is_not_clamped() {
        let project = Project {
            sale: 100.0,
            received: 150.0,
            ..Default::default()
        };
        assert_eq!(project.outstanding(), -50.0);
    }

    #[test]
    fn test_inventory_computed_total_value() {
        let mut item = InventoryItem {
            marlas: Some(5.0),
            rate_per_marla: Some(200_000.0),
            ..Default::default()
        };
        assert_eq!(item.computed_total_value(), Some(1_000_000.0));

        item.total_value = Some(900_000.0);
        assert_eq!(item.computed_total_value(), Some(900_000.0));
    }

    #[test]
    fn test_recipient_type_serializes_camel_case() {
        assert_eq!(
            serde_json::to_value(RecipientType::CompanyRep).unwrap(),
            json!("companyRep")
        );
        assert_eq!(
            serde_json::to_value(PaymentMethod::BankTransfer).unwrap(),
            json!("bank_transfer")
        );
    }

    #[test]
    fn test_unit_type_from_label() {
        assert_eq!(UnitType::from_label("commercial"), Some(UnitType::Commercial));
        assert_eq!(UnitType::from_label(" Apartment "), Some(UnitType::Apartment));
        assert_eq!(UnitType::from_label("Villa"), None);
    }

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = serde_json::from_value(json!({"currency": "USD"})).unwrap();
        assert_eq!(settings.currency, "USD");
        assert_eq!(settings.default_broker_commission_rate, 1.0);
        assert_eq!(settings.follow_up_days, 7);
    }
}
