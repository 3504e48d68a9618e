//! # Commission Math
//!
//! Owed amounts, partial settlement and accrual reporting for brokers and
//! company representatives.
//!
//! ## Settlement States
//! ```text
//!               pay(x), 0 < paid < amount            pay(rest)
//!   ┌─────────┐ ──────────────────────────► ┌─────────┐ ─────────► ┌──────┐
//!   │ pending │                             │ partial │            │ paid │
//!   └─────────┘ ─────────────────────────────────────────────────► └──────┘
//!                          pay(amount)
//! ```
//! Overpayment and non-positive amounts are rejected; the row is left
//! unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use ts_rs::TS;

use crate::dataset::CrmData;
use crate::error::{CoreError, CoreResult};
use crate::ids::{generate_id, now_timestamp};
use crate::types::{CommissionPayment, CommissionStatus, Project, RecipientType};

/// Tolerance when comparing currency amounts.
const MONEY_EPSILON: f64 = 0.005;

/// Rounds to two decimal places.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `sale * rate / 100`, rounded to two decimals.
///
/// ## Example
/// ```rust
/// use estate_core::commission::commission_amount;
///
/// assert_eq!(commission_amount(2_000_000.0, 1.0), 20_000.0);
/// assert_eq!(commission_amount(1_250_000.0, 2.5), 31_250.0);
/// ```
pub fn commission_amount(sale: f64, rate: f64) -> f64 {
    round_money(sale * rate / 100.0)
}

impl CommissionPayment {
    /// Creates a pending row for the commission owed on `project`.
    pub fn pending_for(
        project: &Project,
        recipient_type: RecipientType,
        recipient_id: impl Into<String>,
        rate: f64,
    ) -> Self {
        let amount = commission_amount(project.sale, rate);
        CommissionPayment {
            id: generate_id("comm"),
            project_id: project.id.clone(),
            recipient_id: recipient_id.into(),
            recipient_type,
            recipient_name: match recipient_type {
                RecipientType::Broker => project.broker_name.clone(),
                RecipientType::CompanyRep => project.company_rep_name.clone(),
            },
            amount,
            paid_amount: 0.0,
            remaining_amount: amount,
            status: CommissionStatus::Pending,
            payments: Vec::new(),
            notes: None,
            created_at: Some(now_timestamp()),
            updated_at: None,
        }
    }

    /// Records a partial or final settlement.
    ///
    /// ## Errors
    /// `InvalidPaymentAmount` when `amount` is not positive or exceeds the
    /// remaining commission.
    pub fn record_payment(
        &mut self,
        amount: f64,
        date: Option<&str>,
        notes: Option<&str>,
    ) -> CoreResult<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "amount must be greater than zero".to_string(),
            });
        }
        let remaining = self.amount - self.paid_amount;
        if amount > remaining + MONEY_EPSILON {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!("{amount:.2} exceeds remaining commission of {remaining:.2}"),
            });
        }

        let now = now_timestamp();
        self.payments.push(json!({
            "id": generate_id("cpay"),
            "amount": round_money(amount),
            "date": date.map(str::to_string).unwrap_or_else(|| now.clone()),
            "notes": notes,
            "createdAt": now,
        }));
        self.paid_amount = round_money(self.paid_amount + amount);
        self.updated_at = Some(now);
        self.refresh_status();
        Ok(())
    }

    /// Recomputes `remainingAmount` and `status` from `amount` and `paidAmount`.
    pub fn refresh_status(&mut self) {
        self.remaining_amount = round_money((self.amount - self.paid_amount).max(0.0));
        self.status = if self.paid_amount <= 0.0 {
            CommissionStatus::Pending
        } else if self.remaining_amount <= MONEY_EPSILON {
            CommissionStatus::Paid
        } else {
            CommissionStatus::Partial
        };
    }
}

// =============================================================================
// Accruals
// =============================================================================

/// Owed vs paid commission for one project and recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommissionAccrual {
    pub project_id: String,
    pub project_name: String,
    pub recipient_id: String,
    pub recipient_type: RecipientType,
    pub recipient_name: Option<String>,
    pub rate: f64,
    pub owed: f64,
    pub paid: f64,
    /// `owed - paid`.
    pub outstanding: f64,
}

/// Lists accrued commission for every brokered or represented project.
///
/// Rates fall back to the dataset settings when a project carries none.
pub fn commission_accruals(data: &CrmData) -> Vec<CommissionAccrual> {
    let mut paid: HashMap<(&str, &str, RecipientType), f64> = HashMap::new();
    for payment in &data.commission_payments {
        *paid
            .entry((
                payment.project_id.as_str(),
                payment.recipient_id.as_str(),
                payment.recipient_type,
            ))
            .or_default() += payment.paid_amount;
    }

    let mut accruals = Vec::new();
    for project in &data.projects {
        let candidates = [
            (
                RecipientType::Broker,
                project.broker_id.as_deref(),
                project.broker_name.clone(),
                project
                    .broker_commission_rate
                    .unwrap_or(data.settings.default_broker_commission_rate),
            ),
            (
                RecipientType::CompanyRep,
                project.company_rep_id.as_deref(),
                project.company_rep_name.clone(),
                project
                    .company_rep_commission_rate
                    .unwrap_or(data.settings.default_company_rep_commission_rate),
            ),
        ];

        for (recipient_type, recipient_id, recipient_name, rate) in candidates {
            let Some(recipient_id) = recipient_id.filter(|id| !id.is_empty()) else {
                continue;
            };
            let owed = commission_amount(project.sale, rate);
            let settled = paid
                .get(&(project.id.as_str(), recipient_id, recipient_type))
                .copied()
                .unwrap_or(0.0);
            accruals.push(CommissionAccrual {
                project_id: project.id.clone(),
                project_name: project.display_name(),
                recipient_id: recipient_id.to_string(),
                recipient_type,
                recipient_name,
                rate,
                owed,
                paid: round_money(settled),
                outstanding: round_money(owed - settled),
            });
        }
    }
    accruals
}

// =============================================================================
// Settlement
// =============================================================================

/// Records a payment against the commission owed on `project_id` to its
/// broker or company rep, creating the pending row first when none exists.
///
/// ## Errors
/// - `NotFound` when the project is unknown or has no recipient of that type
/// - `InvalidPaymentAmount` from [`CommissionPayment::record_payment`]
pub fn settle_commission(
    data: &mut CrmData,
    project_id: &str,
    recipient_type: RecipientType,
    amount: f64,
    date: Option<&str>,
) -> CoreResult<CommissionPayment> {
    let project = data
        .projects
        .iter()
        .find(|p| p.id == project_id)
        .ok_or_else(|| CoreError::NotFound {
            entity: "Project".to_string(),
            id: project_id.to_string(),
        })?;

    let (recipient_id, rate) = match recipient_type {
        RecipientType::Broker => (
            project.broker_id.clone(),
            project
                .broker_commission_rate
                .unwrap_or(data.settings.default_broker_commission_rate),
        ),
        RecipientType::CompanyRep => (
            project.company_rep_id.clone(),
            project
                .company_rep_commission_rate
                .unwrap_or(data.settings.default_company_rep_commission_rate),
        ),
    };
    let recipient_id = recipient_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CoreError::NotFound {
            entity: match recipient_type {
                RecipientType::Broker => "Broker for project".to_string(),
                RecipientType::CompanyRep => "Company rep for project".to_string(),
            },
            id: project_id.to_string(),
        })?;

    let existing = data.commission_payments.iter().position(|row| {
        row.project_id == project_id && row.recipient_id == recipient_id && row.recipient_type == recipient_type
    });
    let index = match existing {
        Some(index) => index,
        None => {
            let row = CommissionPayment::pending_for(project, recipient_type, recipient_id, rate);
            data.commission_payments.push(row);
            data.commission_payments.len() - 1
        }
    };

    let row = &mut data.commission_payments[index];
    if let Err(e) = row.record_payment(amount, date, None) {
        if existing.is_none() {
            data.commission_payments.pop();
        }
        return Err(e);
    }
    Ok(data.commission_payments[index].clone())
}
