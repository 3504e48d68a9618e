//! # Cross-Reference Enricher
//!
//! Fills denormalized display fields from referenced records.
//!
//! ## Rule
//! A field is only written when it is falsy (absent or empty). Re-running
//! enrichment on its own output changes nothing, which is what lets the
//! same backup be imported repeatedly without churn.
//!
//! ```text
//!   Receipt.customerName  ◄── Customer.name            ("" on miss)
//!   Receipt.projectName   ◄── "{Project.name} - {Project.unit}"
//!   Receipt.receiptNumber ◄── RCP-{yyyyMM}-{index+1:04}
//!   Project.customerName  ◄── Customer.name
//!   Project.brokerName    ◄── Broker.name
//!   Commission.recipientName ◄── Broker.name
//! ```

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use tracing::debug;

use crate::dataset::CrmData;
use crate::ids::parse_date;
use crate::types::{Broker, CommissionPayment, Customer, Identified, Project, Receipt};

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, str::is_empty)
}

fn index_by_id<T: Identified>(records: &[T]) -> HashMap<&str, &T> {
    records.iter().map(|r| (r.id(), r)).collect()
}

/// Generates a receipt number for the receipt at `index` in its batch.
///
/// Uses `created_at`, falling back to `date` when `created_at` is blank.
/// When neither parses, returns `RCP-{epochMillis}-{index+1}`.
pub fn receipt_number(created_at: Option<&str>, date: Option<&str>, index: usize) -> String {
    let source = created_at.filter(|s| !s.is_empty()).or(date);
    match source.and_then(parse_date) {
        Some(day) => format!("RCP-{}{:02}-{:04}", day.year(), day.month(), index + 1),
        None => format!("RCP-{}-{}", Utc::now().timestamp_millis(), index + 1),
    }
}

/// Fills `customerName`, `projectName` and `receiptNumber` on each receipt.
pub fn enrich_receipts(
    receipts: Vec<Receipt>,
    customers: &[Customer],
    projects: &[Project],
) -> Vec<Receipt> {
    let customers = index_by_id(customers);
    let projects = index_by_id(projects);

    receipts
        .into_iter()
        .enumerate()
        .map(|(index, mut receipt)| {
            if is_blank(&receipt.customer_name) {
                let name = customers
                    .get(receipt.customer_id.as_str())
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| {
                        debug!(receipt = %receipt.id, customer = %receipt.customer_id, "Receipt customer not found");
                        String::new()
                    });
                receipt.customer_name = Some(name);
            }

            if is_blank(&receipt.project_name) {
                let name = projects
                    .get(receipt.project_id.as_str())
                    .map(|p| p.display_name())
                    .unwrap_or_default();
                receipt.project_name = Some(name);
            }

            if is_blank(&receipt.receipt_number) {
                receipt.receipt_number = Some(receipt_number(
                    receipt.created_at.as_deref(),
                    receipt.date.as_deref(),
                    index,
                ));
            }

            receipt
        })
        .collect()
}

/// Fills customer, broker and company-rep names on projects.
pub fn enrich_projects(projects: Vec<Project>, customers: &[Customer], brokers: &[Broker]) -> Vec<Project> {
    let customers = index_by_id(customers);
    let brokers = index_by_id(brokers);

    projects
        .into_iter()
        .map(|mut project| {
            if is_blank(&project.customer_name) {
                if let Some(c) = customers.get(project.customer_id.as_str()) {
                    project.customer_name = Some(c.name.clone());
                }
            }
            if is_blank(&project.broker_name) {
                if let Some(b) = project.broker_id.as_deref().and_then(|id| brokers.get(id)) {
                    project.broker_name = Some(b.name.clone());
                }
            }
            if is_blank(&project.company_rep_name) {
                if let Some(b) = project.company_rep_id.as_deref().and_then(|id| brokers.get(id)) {
                    project.company_rep_name = Some(b.name.clone());
                }
            }
            project
        })
        .collect()
}

/// Fills `recipientName` on commission payments.
pub fn enrich_commission_payments(
    payments: Vec<CommissionPayment>,
    brokers: &[Broker],
) -> Vec<CommissionPayment> {
    let brokers = index_by_id(brokers);
    payments
        .into_iter()
        .map(|mut payment| {
            if is_blank(&payment.recipient_name) {
                if let Some(b) = brokers.get(payment.recipient_id.as_str()) {
                    payment.recipient_name = Some(b.name.clone());
                }
            }
            payment
        })
        .collect()
}

/// Runs every enrichment over a whole dataset.
pub fn enrich_dataset(mut data: CrmData) -> CrmData {
    let projects = enrich_projects(std::mem::take(&mut data.projects), &data.customers, &data.brokers);
    data.projects = projects;
    let receipts = enrich_receipts(std::mem::take(&mut data.receipts), &data.customers, &data.projects);
    data.receipts = receipts;
    let payments = enrich_commission_payments(std::mem::take(&mut data.commission_payments), &data.brokers);
    data.commission_payments = payments;
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    fn project(id: &str, name: &str, unit: Option<&str>) -> Project {
        Project {
            id: id.into(),
            customer_id: "c1".into(),
            name: Some(name.into()),
            unit: unit.map(Into::into),
            ..Default::default()
        }
    }

    fn receipt(id: &str, created_at: Option<&str>) -> Receipt {
        Receipt {
            id: id.into(),
            customer_id: "c1".into(),
            project_id: "p1".into(),
            amount: 50_000.0,
            created_at: created_at.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_fills_names_and_number() {
        let out = enrich_receipts(
            vec![receipt("r1", Some("2024-03-15T09:00:00.000Z"))],
            &[customer("c1", "Ali")],
            &[project("p1", "Green Valley", Some("A-12"))],
        );
        assert_eq!(out[0].customer_name.as_deref(), Some("Ali"));
        assert_eq!(out[0].project_name.as_deref(), Some("Green Valley - A-12"));
        assert_eq!(out[0].receipt_number.as_deref(), Some("RCP-202403-0001"));
    }

    #[test]
    fn test_missing_reference_yields_empty_string() {
        let out = enrich_receipts(vec![receipt("r1", Some("2024-01-01"))], &[], &[]);
        assert_eq!(out[0].customer_name.as_deref(), Some(""));
        assert_eq!(out[0].project_name.as_deref(), Some(""));
    }

    #[test]
    fn test_existing_values_untouched() {
        let mut r = receipt("r1", Some("2024-01-01"));
        r.customer_name = Some("Legacy Name".into());
        r.receipt_number = Some("RCP-000001".into());
        let out = enrich_receipts(vec![r], &[customer("c1", "Ali")], &[]);
        assert_eq!(out[0].customer_name.as_deref(), Some("Legacy Name"));
        assert_eq!(out[0].receipt_number.as_deref(), Some("RCP-000001"));
    }

    #[test]
    fn test_index_sequence_and_date_fallback() {
        let mut second = receipt("r2", None);
        second.date = Some("2023-11-02".into());
        let out = enrich_receipts(vec![receipt("r1", Some("2024-03-15")), second], &[], &[]);
        assert_eq!(out[1].receipt_number.as_deref(), Some("RCP-202311-0002"));
    }

    #[test]
    fn test_unparseable_date_fallback() {
        let number = receipt_number(Some("someday"), None, 4);
        assert!(number.starts_with("RCP-"));
        assert!(number.ends_with("-5"));
    }

    #[test]
    fn test_idempotent() {
        let customers = [customer("c1", "Ali")];
        let projects = [project("p1", "Green Valley", None)];
        let once = enrich_receipts(vec![receipt("r1", None), receipt("r2", Some("2024-01-01"))], &customers, &projects);
        let twice = enrich_receipts(once.clone(), &customers, &projects);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_enrich_projects_and_commissions() {
        let mut p = project("p1", "GV", None);
        p.broker_id = Some("b1".into());
        let brokers = [Broker::new("b1", "Zafar")];
        let out = enrich_projects(vec![p], &[customer("c1", "Ali")], &brokers);
        assert_eq!(out[0].customer_name.as_deref(), Some("Ali"));
        assert_eq!(out[0].broker_name.as_deref(), Some("Zafar"));
        assert!(out[0].company_rep_name.is_none());

        let payment = CommissionPayment {
            id: "x".into(),
            project_id: "p1".into(),
            recipient_id: "b1".into(),
            ..Default::default()
        };
        let out = enrich_commission_payments(vec![payment], &brokers);
        assert_eq!(out[0].recipient_name.as_deref(), Some("Zafar"));
    }
}
