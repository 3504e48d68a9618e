//! # Installment Schedules
//!
//! Splits a sale value into dated installments.
//!
//! ```text
//!   sale 1,000,000 × 3 installments, monthly from 2024-01-31
//!   ┌────┬────────────┬───────────┐
//!   │ #1 │ 2024-01-31 │ 333,333.33│
//!   │ #2 │ 2024-02-29 │ 333,333.33│   (month-end clamped)
//!   │ #3 │ 2024-03-31 │ 333,333.34│   ◄── last one absorbs rounding
//!   └────┴────────────┴───────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use serde_json::{json, Value};

use crate::commission::round_money;
use crate::ids::generate_id;

/// How often installments fall due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentCycle {
    #[default]
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl PaymentCycle {
    pub fn months(&self) -> u32 {
        match self {
            PaymentCycle::Monthly => 1,
            PaymentCycle::Quarterly => 3,
            PaymentCycle::HalfYearly => 6,
            PaymentCycle::Yearly => 12,
        }
    }

    /// Value stored on the project record.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentCycle::Monthly => "monthly",
            PaymentCycle::Quarterly => "quarterly",
            PaymentCycle::HalfYearly => "half-yearly",
            PaymentCycle::Yearly => "yearly",
        }
    }
}

impl fmt::Display for PaymentCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "monthly" | "month" => Ok(PaymentCycle::Monthly),
            "quarterly" | "quarter" => Ok(PaymentCycle::Quarterly),
            "halfyearly" | "biannual" | "semiannual" => Ok(PaymentCycle::HalfYearly),
            "yearly" | "annual" | "annually" => Ok(PaymentCycle::Yearly),
            _ => Err(format!("Unknown payment cycle: {s}")),
        }
    }
}

/// Builds `count` installments summing exactly to `total`.
///
/// Each entry is a JSON object with `id`, `number`, `amount`, `dueDate`,
/// `paidAmount` and `status`, matching what the UI stores on a project.
pub fn generate_installments(
    total: f64,
    count: u32,
    first_due: NaiveDate,
    cycle: PaymentCycle,
) -> Vec<Value> {
    if count == 0 {
        return Vec::new();
    }
    let base = round_money(total / f64::from(count));
    let last = round_money(total - base * f64::from(count - 1));

    (0..count)
        .map(|i| {
            let due = first_due
                .checked_add_months(Months::new(i * cycle.months()))
                .unwrap_or(first_due);
            let amount = if i + 1 == count { last } else { base };
            json!({
                "id": generate_id("inst"),
                "number": i + 1,
                "amount": amount,
                "dueDate": due.format("%Y-%m-%d").to_string(),
                "paidAmount": 0.0,
                "status": "pending",
            })
        })
        .collect()
}
