//! # Bulk Transactions
//!
//! Turns rows of the transactions sheet into sale records (projects) with
//! generated installment schedules.
//!
//! ## Reference Resolution
//! ```text
//!   "Customer Name/Phone" = "0300-1234567"
//!          │
//!          ├── looks like a phone? ── yes ──► match on phone digits
//!          │                          no  ──► match on name (case-insensitive)
//!          │
//!          └── no match ──► create Customer / Broker, reuse it for later rows
//! ```
//!
//! Commission rates on a row apply to that sale only; the broker record keeps
//! its stored default.

use chrono::NaiveDate;
use estate_core::ids::{generate_id, now_timestamp};
use estate_core::import::{import_dataset, ImportOptions};
use estate_core::normalize::phone_digits;
use estate_core::schedule::{generate_installments, PaymentCycle};
use estate_core::validation::{
    validate_date, validate_installments, validate_percentage, validate_positive, validate_required,
};
use estate_core::{
    Broker, CrmData, Customer, CustomerStatus, CustomerType, InventoryItem, InventoryStatus, Project,
    ProjectStatus, ValidationError, CURRENT_VERSION,
};
use serde_json::json;
use tracing::{debug, info};

use crate::error::SheetResult;
use crate::reader::{Row, Sheet};
use crate::{ParsedRows, RowCheck, RowError, SheetImport};

const CUSTOMER: &[&str] = &["Customer Name/Phone", "Customer Name", "Customer Phone", "Customer"];
const PROJECT_NAME: &[&str] = &["Project Name", "Project"];
const UNIT: &[&str] = &["Unit/Shop Number", "Unit/Shop#", "Unit Number", "Unit"];
const SALE_VALUE: &[&str] = &["Sale Value", "Sale", "Total Value"];
const INSTALLMENTS: &[&str] = &["Installments", "Installment Count"];
const FIRST_DUE_DATE: &[&str] = &["First Due Date", "Due Date"];
const BROKER: &[&str] = &["Broker Name/Phone", "Broker Name", "Broker"];
const BROKER_RATE: &[&str] = &["Broker Commission %", "Broker Commission"];
const COMPANY_REP: &[&str] = &["Company Rep Name/Phone", "Company Rep Name", "Company Rep"];
const COMPANY_REP_RATE: &[&str] = &["Company Rep Commission %", "Company Rep Commission"];
const MARLAS: &[&str] = &["Marlas"];
const RATE_PER_MARLA: &[&str] = &["Rate Per Marla"];
const PAYMENT_CYCLE: &[&str] = &["Payment Cycle", "Cycle"];
const STATUS: &[&str] = &["Status"];
const NOTES: &[&str] = &["Notes"];

/// A validated transactions-sheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub row: usize,
    /// Customer name or phone number.
    pub customer: String,
    pub project_name: String,
    pub unit: String,
    pub sale: f64,
    pub installments: u32,
    pub first_due: NaiveDate,
    pub broker: Option<String>,
    pub broker_rate: Option<f64>,
    pub company_rep: Option<String>,
    pub company_rep_rate: Option<f64>,
    pub marlas: Option<f64>,
    pub rate_per_marla: Option<f64>,
    pub cycle: PaymentCycle,
    pub status: ProjectStatus,
    pub notes: Option<String>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Validates every row of the transactions sheet.
pub fn parse_transactions(sheet: &Sheet) -> ParsedRows<TransactionRow> {
    let mut parsed = ParsedRows::default();
    for row in &sheet.rows {
        match parse_row(row) {
            Ok(tx) => parsed.data.push(tx),
            Err(errors) => {
                debug!(row = row.number, ?errors, "Transaction row rejected");
                parsed.errors.push(RowError {
                    row: row.number,
                    errors,
                });
            }
        }
    }
    parsed
}

fn percentage(field: &str, value: Option<f64>) -> Result<f64, ValidationError> {
    let out_of_range = || ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0.0,
        max: 100.0,
    };
    value.ok_or_else(out_of_range).and_then(|v| validate_percentage(field, v))
}

fn parse_status(raw: &str) -> Result<ProjectStatus, ValidationError> {
    const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Active,
        ProjectStatus::Completed,
        ProjectStatus::Overdue,
        ProjectStatus::Cancelled,
    ];
    let raw = raw.trim();
    ALL.into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(raw))
        .ok_or_else(|| ValidationError::NotAllowed {
            field: "Status".to_string(),
            allowed: ALL.iter().map(|s| s.as_str().to_string()).collect(),
        })
}

fn parse_cycle(raw: &str) -> Result<PaymentCycle, ValidationError> {
    raw.parse().map_err(|_| ValidationError::NotAllowed {
        field: "Payment Cycle".to_string(),
        allowed: [
            PaymentCycle::Monthly,
            PaymentCycle::Quarterly,
            PaymentCycle::HalfYearly,
            PaymentCycle::Yearly,
        ]
        .iter()
        .map(|c| c.as_str().to_string())
        .collect(),
    })
}

fn parse_row(row: &Row) -> Result<TransactionRow, Vec<String>> {
    let mut check = RowCheck::default();
    let text = |headers: &[&str]| row.text(headers);

    let customer = check.ok(validate_required("Customer Name/Phone", text(CUSTOMER).as_deref()).map(str::to_string));
    let project_name = check.ok(validate_required("Project Name", text(PROJECT_NAME).as_deref()).map(str::to_string));
    let unit = check.ok(validate_required("Unit/Shop Number", text(UNIT).as_deref()).map(str::to_string));
    let sale = check.ok(validate_positive("Sale Value", row.number(SALE_VALUE).flatten()));
    let installments = check.ok(validate_installments("Installments", row.number(INSTALLMENTS).flatten()));
    let first_due = match text(FIRST_DUE_DATE) {
        Some(raw) => check.ok(validate_date("First Due Date", &raw)),
        None => check.ok::<NaiveDate>(Err(ValidationError::required("First Due Date"))),
    };

    let broker_rate = row
        .number(BROKER_RATE)
        .and_then(|n| check.ok(percentage("Broker Commission %", n)));
    let company_rep_rate = row
        .number(COMPANY_REP_RATE)
        .and_then(|n| check.ok(percentage("Company Rep Commission %", n)));
    let marlas = row
        .number(MARLAS)
        .and_then(|n| check.ok(validate_positive("Marlas", n)));
    let rate_per_marla = row
        .number(RATE_PER_MARLA)
        .and_then(|n| check.ok(validate_positive("Rate Per Marla", n)));
    let cycle = match text(PAYMENT_CYCLE) {
        Some(raw) => check.ok(parse_cycle(&raw)),
        None => Some(PaymentCycle::default()),
    };
    let status = match text(STATUS) {
        Some(raw) => check.ok(parse_status(&raw)),
        None => Some(ProjectStatus::Active),
    };

    check.finish()?;
    match (customer, project_name, unit, sale, installments, first_due, cycle, status) {
        (
            Some(customer),
            Some(project_name),
            Some(unit),
            Some(sale),
            Some(installments),
            Some(first_due),
            Some(cycle),
            Some(status),
        ) => Ok(TransactionRow {
            row: row.number,
            customer,
            project_name,
            unit,
            sale,
            installments,
            first_due,
            broker: text(BROKER),
            broker_rate,
            company_rep: text(COMPANY_REP),
            company_rep_rate,
            marlas,
            rate_per_marla,
            cycle,
            status,
            notes: text(NOTES),
        }),
        _ => Err(vec!["Row could not be read".to_string()]),
    }
}

// =============================================================================
// Reference Resolution
// =============================================================================

/// A reference is a phone number when it has no letters and enough digits.
fn looks_like_phone(reference: &str) -> bool {
    !reference.chars().any(char::is_alphabetic) && phone_digits(reference).len() >= 7
}

fn matches_reference(reference: &str, name: &str, phone: Option<&str>) -> bool {
    if looks_like_phone(reference) {
        let digits = phone_digits(reference);
        phone.map(phone_digits).is_some_and(|p| p == digits)
    } else {
        name.trim().eq_ignore_ascii_case(reference.trim())
    }
}

/// Records created or updated by a bulk transaction import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkTransactions {
    pub customers: Vec<Customer>,
    pub brokers: Vec<Broker>,
    pub projects: Vec<Project>,
    /// Units marked sold by the new projects.
    pub inventory: Vec<InventoryItem>,
}

struct Resolver<'a> {
    data: &'a CrmData,
    out: BulkTransactions,
}

impl<'a> Resolver<'a> {
    fn customer(&mut self, reference: &str) -> String {
        let existing = self
            .data
            .customers
            .iter()
            .chain(&self.out.customers)
            .find(|c| matches_reference(reference, &c.name, c.phone.as_deref()));
        if let Some(customer) = existing {
            return customer.id.clone();
        }

        let phone = looks_like_phone(reference).then(|| reference.to_string());
        let customer = Customer {
            id: generate_id("cust"),
            name: reference.trim().to_string(),
            phone,
            customer_type: CustomerType::Customer,
            status: CustomerStatus::Active,
            created_at: Some(now_timestamp()),
            ..Default::default()
        };
        debug!(id = %customer.id, reference, "Customer auto-created");
        let id = customer.id.clone();
        self.out.customers.push(customer);
        id
    }

    /// Resolves a broker or company rep; both live in the broker list.
    /// Returns the ID and the stored commission rate.
    fn broker(&mut self, reference: &str, default_rate: f64) -> (String, f64) {
        let existing = self
            .data
            .brokers
            .iter()
            .chain(&self.out.brokers)
            .find(|b| matches_reference(reference, &b.name, b.phone.as_deref()));
        if let Some(broker) = existing {
            return (broker.id.clone(), broker.commission_rate);
        }

        let mut broker = Broker::new(generate_id("broker"), reference.trim());
        broker.phone = looks_like_phone(reference).then(|| reference.to_string());
        broker.commission_rate = default_rate;
        broker.created_at = Some(now_timestamp());
        debug!(id = %broker.id, reference, "Broker auto-created");
        let resolved = (broker.id.clone(), broker.commission_rate);
        self.out.brokers.push(broker);
        resolved
    }

    /// Claims an available inventory unit matching the sale, if any.
    fn claim_unit(&mut self, tx: &TransactionRow, customer_id: &str, project_id: &str) -> Option<String> {
        let claimed: Vec<&str> = self.out.inventory.iter().map(|i| i.id.as_str()).collect();
        let unit = self.data.inventory.iter().find(|item| {
            item.status == InventoryStatus::Available
                && !claimed.contains(&item.id.as_str())
                && item.project_name.trim().eq_ignore_ascii_case(tx.project_name.trim())
                && item
                    .unit_shop_number
                    .as_deref()
                    .is_some_and(|u| u.trim().eq_ignore_ascii_case(tx.unit.trim()))
        })?;

        let mut sold = unit.clone();
        sold.status = InventoryStatus::Sold;
        sold.customer_id = Some(customer_id.to_string());
        sold.project_id = Some(project_id.to_string());
        sold.updated_at = Some(now_timestamp());
        let id = sold.id.clone();
        self.out.inventory.push(sold);
        Some(id)
    }
}

/// Resolves references and builds the records for `rows` against `data`.
///
/// Unknown customers and brokers are created once and reused by later rows.
pub fn build_transactions(rows: &[TransactionRow], data: &CrmData) -> BulkTransactions {
    let mut resolver = Resolver {
        data,
        out: BulkTransactions::default(),
    };
    let settings = &data.settings;

    for tx in rows {
        let customer_id = resolver.customer(&tx.customer);
        let project_id = generate_id("proj");

        let broker = tx
            .broker
            .as_deref()
            .map(|r| resolver.broker(r, settings.default_broker_commission_rate));
        let rep = tx
            .company_rep
            .as_deref()
            .map(|r| resolver.broker(r, settings.default_company_rep_commission_rate));
        let inventory_id = resolver.claim_unit(tx, &customer_id, &project_id);

        let project = Project {
            id: project_id,
            customer_id,
            name: Some(tx.project_name.clone()),
            unit: Some(tx.unit.clone()),
            marlas: tx.marlas,
            rate_per_marla: tx.rate_per_marla,
            sale: tx.sale,
            received: 0.0,
            balance: tx.sale,
            broker_commission_rate: broker.as_ref().map(|(_, stored)| tx.broker_rate.unwrap_or(*stored)),
            broker_id: broker.map(|(id, _)| id),
            company_rep_commission_rate: rep.as_ref().map(|(_, stored)| tx.company_rep_rate.unwrap_or(*stored)),
            company_rep_id: rep.map(|(id, _)| id),
            installments: generate_installments(tx.sale, tx.installments, tx.first_due, tx.cycle),
            installment_count: Some(tx.installments),
            payment_cycle: Some(tx.cycle.as_str().to_string()),
            first_due_date: Some(tx.first_due.format("%Y-%m-%d").to_string()),
            inventory_id,
            status: tx.status,
            notes: tx.notes.clone(),
            created_at: Some(now_timestamp()),
            ..Default::default()
        };
        resolver.out.projects.push(project);
    }

    resolver.out
}

/// Parses `sheet`, resolves references and merges everything into `existing`.
pub fn import_transactions(sheet: &Sheet, existing: CrmData) -> SheetResult<SheetImport> {
    let ParsedRows { data: rows, errors } = parse_transactions(sheet);
    let bulk = build_transactions(&rows, &existing);

    let payload = json!({
        "version": CURRENT_VERSION,
        "customers": bulk.customers,
        "brokers": bulk.brokers,
        "projects": bulk.projects,
        "inventory": bulk.inventory,
    });
    let outcome = import_dataset(payload, existing, ImportOptions::merge())?;

    info!(
        projects = bulk.projects.len(),
        customers_created = bulk.customers.len(),
        brokers_created = bulk.brokers.len(),
        rejected_rows = errors.len(),
        "Transactions sheet imported"
    );
    Ok(SheetImport { outcome, errors })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_csv;
    use crate::template::{template_csv, TemplateKind};

    const HEADER: &str = "Customer Name/Phone,Project Name,Unit/Shop Number,Sale Value,Installments,First Due Date,\
Broker Name/Phone,Broker Commission %,Company Rep Name/Phone,Company Rep Commission %,Payment Cycle,Status\n";

    fn sheet(body: &str) -> Sheet {
        read_csv(format!("{HEADER}{body}").as_bytes()).unwrap()
    }

    fn existing() -> CrmData {
        let mut data = CrmData::default();
        data.customers.push(Customer {
            id: "c1".into(),
            name: "Ali Raza".into(),
            phone: Some("0300-1234567".into()),
            ..Default::default()
        });
        let mut broker = Broker::new("b1", "Kamran");
        broker.commission_rate = 1.5;
        data.brokers.push(broker);
        data.inventory.push(InventoryItem {
            id: "inv1".into(),
            project_name: "Green Valley".into(),
            unit_shop_number: Some("A-12".into()),
            total_value: Some(2_500_000.0),
            ..Default::default()
        });
        data
    }

    #[test]
    fn test_parse_valid_row() {
        let parsed = parse_transactions(&sheet(
            "Ali Raza,Green Valley,A-12,\"2,500,000\",12,2024-01-31,,,,,quarterly,\n",
        ));
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let tx = &parsed.data[0];
        assert_eq!(tx.row, 2);
        assert_eq!(tx.sale, 2_500_000.0);
        assert_eq!(tx.cycle, PaymentCycle::Quarterly);
        assert_eq!(tx.status, ProjectStatus::Active);
    }

    #[test]
    fn test_row_errors_are_located() {
        let parsed = parse_transactions(&sheet(
            "Ali,Green Valley,A-1,100,12,2024-01-31,,,,,,\n,Green Valley,A-2,-5,0,someday,,150,,,weekly,sold\n",
        ));
        assert_eq!(parsed.data.len(), 1);
        let RowError { row, errors } = &parsed.errors[0];
        assert_eq!(*row, 3);
        assert!(errors.contains(&"Customer Name/Phone is required".to_string()));
        assert!(errors.contains(&"Sale Value must be a positive number".to_string()));
        assert!(errors.contains(&"Installments must be a positive number".to_string()));
        assert!(errors.contains(&"Broker Commission % must be between 0 and 100".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("First Due Date has invalid format")));
        assert!(errors.iter().any(|e| e.starts_with("Payment Cycle must be one of")));
        assert!(errors.iter().any(|e| e.starts_with("Status must be one of")));
    }

    #[test]
    fn test_resolves_by_phone_and_name() {
        let parsed = parse_transactions(&sheet(
            "03001234567,Green Valley,A-12,2500000,10,2024-01-31,kamran,,,,,\n",
        ));
        let bulk = build_transactions(&parsed.data, &existing());
        assert!(bulk.customers.is_empty());
        assert!(bulk.brokers.is_empty());
        let project = &bulk.projects[0];
        assert_eq!(project.customer_id, "c1");
        assert_eq!(project.broker_id.as_deref(), Some("b1"));
        assert_eq!(project.broker_commission_rate, Some(1.5));
    }

    #[test]
    fn test_auto_creates_once_per_reference() {
        let parsed = parse_transactions(&sheet(
            "Bilal,Lake City,1,1000000,4,2024-03-01,0321-7654321,,Usman,,,\n\
             bilal,Lake City,2,1000000,4,2024-03-01,03217654321,,usman,,,\n",
        ));
        let bulk = build_transactions(&parsed.data, &existing());
        assert_eq!(bulk.customers.len(), 1);
        assert_eq!(bulk.customers[0].name, "Bilal");
        assert_eq!(bulk.brokers.len(), 2);
        assert_eq!(bulk.brokers[0].phone.as_deref(), Some("0321-7654321"));
        assert_eq!(bulk.projects[0].customer_id, bulk.projects[1].customer_id);
        assert_eq!(bulk.projects[0].broker_id, bulk.projects[1].broker_id);
        assert_eq!(bulk.projects[0].company_rep_commission_rate, Some(1.0));
    }

    #[test]
    fn test_row_rate_overrides_only_the_sale() {
        let parsed = parse_transactions(&sheet(
            "Ali Raza,Green Valley,A-12,2500000,10,2024-01-31,Kamran,2,Kamran,0.5,,\n",
        ));
        let data = existing();
        let bulk = build_transactions(&parsed.data, &data);
        let project = &bulk.projects[0];
        assert_eq!(project.broker_commission_rate, Some(2.0));
        assert_eq!(project.company_rep_commission_rate, Some(0.5));
        assert_eq!(data.brokers[0].commission_rate, 1.5);
    }

    #[test]
    fn test_schedule_and_inventory_claim() {
        let parsed = parse_transactions(&sheet(
            "Ali Raza,green valley,a-12,1000000,3,2024-01-31,,,,,,\n",
        ));
        let bulk = build_transactions(&parsed.data, &existing());
        let project = &bulk.projects[0];
        assert_eq!(project.installments.len(), 3);
        assert_eq!(project.installments[2]["amount"], 333_333.34);
        assert_eq!(project.inventory_id.as_deref(), Some("inv1"));
        assert_eq!(bulk.inventory[0].status, InventoryStatus::Sold);
        assert_eq!(bulk.inventory[0].project_id.as_deref(), Some(project.id.as_str()));
    }

    #[test]
    fn test_import_merges_into_dataset() {
        let parsed = sheet(
            "Ali Raza,Green Valley,A-12,2500000,10,2024-01-31,Kamran,,,,,\n\
             Sara,Green Valley,A-13,abc,10,2024-01-31,,,,,,\n",
        );
        let result = import_transactions(&parsed, existing()).unwrap();
        let data = &result.outcome.data;

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 3);
        assert_eq!(data.projects.len(), 1);
        assert_eq!(data.projects[0].customer_name.as_deref(), Some("Ali Raza"));
        assert_eq!(data.projects[0].broker_name.as_deref(), Some("Kamran"));
        assert_eq!(data.inventory[0].status, InventoryStatus::Sold);
        assert_eq!(data.customers.len(), 1);
    }

    #[test]
    fn test_template_example_row_parses() {
        let text = template_csv(TemplateKind::Transactions, true).unwrap();
        let parsed = parse_transactions(&read_csv(text.as_bytes()).unwrap());
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.data[0].broker.as_deref(), Some("03001234567"));
    }
}
