//! Master projects and commission reporting.

use std::io::Write;

use estate_core::commission::{commission_accruals, settle_commission};
use estate_core::master::{aggregate_master_projects, refresh_master_projects};
use estate_core::RecipientType;

use crate::backend::Backend;
use crate::error::CliResult;

fn recipient_label(recipient: RecipientType) -> &'static str {
    match recipient {
        RecipientType::Broker => "broker",
        RecipientType::CompanyRep => "company rep",
    }
}

/// Prints projects grouped by name. With `save`, the grouping is also
/// written back as the dataset's master-project list.
pub async fn master_projects(backend: &Backend, save: bool, out: &mut dyn Write) -> CliResult<()> {
    let mut data = backend.load().await?;
    let masters = aggregate_master_projects(&data.projects);

    writeln!(
        out,
        "{:<28} {:>6} {:>10} {:>16} {:>16} {:>16}",
        "PROJECT", "UNITS", "CUSTOMERS", "SALE", "RECEIVED", "BALANCE"
    )?;
    for master in &masters {
        writeln!(
            out,
            "{:<28} {:>6} {:>10} {:>16.2} {:>16.2} {:>16.2}",
            master.name,
            master.total_units,
            master.total_customers,
            master.total_sale,
            master.total_received,
            master.total_balance
        )?;
    }

    if save {
        refresh_master_projects(&mut data);
        backend.save(&mut data).await?;
        writeln!(out, "Saved {} master projects", data.master_projects.len())?;
    }
    Ok(())
}

pub async fn accruals(backend: &Backend, outstanding_only: bool, out: &mut dyn Write) -> CliResult<()> {
    let data = backend.load().await?;
    let rows: Vec<_> = commission_accruals(&data)
        .into_iter()
        .filter(|a| !outstanding_only || a.outstanding > 0.0)
        .collect();

    writeln!(
        out,
        "{:<28} {:<12} {:<24} {:>6} {:>14} {:>14} {:>14}",
        "PROJECT", "TYPE", "RECIPIENT", "RATE", "OWED", "PAID", "OUTSTANDING"
    )?;
    for row in &rows {
        writeln!(
            out,
            "{:<28} {:<12} {:<24} {:>5.2}% {:>14.2} {:>14.2} {:>14.2}",
            row.project_name,
            recipient_label(row.recipient_type),
            row.recipient_name.as_deref().unwrap_or(&row.recipient_id),
            row.rate,
            row.owed,
            row.paid,
            row.outstanding
        )?;
    }
    let outstanding: f64 = rows.iter().map(|r| r.outstanding).sum();
    writeln!(out, "Total outstanding: {:.2}", outstanding)?;
    Ok(())
}

pub async fn pay_commission(
    backend: &Backend,
    project_id: &str,
    recipient: RecipientType,
    amount: f64,
    date: Option<&str>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let mut data = backend.load().await?;
    let row = settle_commission(&mut data, project_id, recipient, amount, date)?;
    backend.save(&mut data).await?;

    writeln!(
        out,
        "Paid {:.2} to {} on {}: {:.2} of {:.2} settled ({:?})",
        amount,
        recipient_label(recipient),
        project_id,
        row.paid_amount,
        row.amount,
        row.status
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{local_backend, text};
    use crate::error::ErrorCode;
    use estate_core::EntityKind;
    use serde_json::json;

    async fn seeded() -> Backend {
        let backend = local_backend().await;
        backend
            .upsert_record(EntityKind::Brokers, json!({"id": "b1", "name": "Kamran", "commissionRate": 2}))
            .await
            .unwrap();
        backend
            .upsert_record(EntityKind::Customers, json!({"id": "c1", "name": "Sara"}))
            .await
            .unwrap();
        backend
            .upsert_record(
                EntityKind::Projects,
                json!({
                    "id": "p1", "customerId": "c1", "name": "Lake City", "unit": "A-101",
                    "sale": 1_000_000, "received": 200_000,
                    "brokerId": "b1", "brokerCommissionRate": 2
                }),
            )
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_accruals_and_settlement() {
        let backend = seeded().await;

        let mut buf = Vec::new();
        pay_commission(&backend, "p1", RecipientType::Broker, 5_000.0, None, &mut buf)
            .await
            .unwrap();
        assert!(text(&buf).contains("5000.00 of 20000.00"), "{}", text(&buf));

        let mut buf = Vec::new();
        accruals(&backend, true, &mut buf).await.unwrap();
        assert!(text(&buf).contains("Total outstanding: 15000.00"), "{}", text(&buf));

        let err = pay_commission(&backend, "p1", RecipientType::Broker, 50_000.0, None, &mut Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_master_projects_save() {
        let backend = seeded().await;
        let mut buf = Vec::new();
        master_projects(&backend, true, &mut buf).await.unwrap();
        assert!(text(&buf).contains("Lake City"));
        assert_eq!(backend.load().await.unwrap().master_projects.len(), 1);
    }
}
