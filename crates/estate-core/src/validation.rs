//! # Validation Module
//!
//! Field validators shared by the spreadsheet bridge and record forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Row validation (THIS MODULE)                                 │
//! │  ├── Required columns, positive numbers, enum membership               │
//! │  └── Errors collected per row, row keeps going                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Normalization + field filter                                 │
//! │  ├── Alias resolution, numeric coercion                                │
//! │  └── Required-field presence, unknown-field stripping                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Typed decode                                                  │
//! │  └── Records that still do not fit are counted as skipped              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use estate_core::validation::{validate_positive, validate_required};
//!
//! assert!(validate_required("Project Name", Some("Green Valley")).is_ok());
//! assert!(validate_positive("Marlas", None).is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::ids::parse_date;
use crate::types::UnitType;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound on installments in one schedule (30 years monthly).
pub const MAX_INSTALLMENTS: u32 = 360;

// =============================================================================
// Text Validators
// =============================================================================

/// Validates that a text value is present and non-blank; returns it trimmed.
pub fn validate_required<'a>(field: &str, value: Option<&'a str>) -> ValidationResult<&'a str> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ValidationError::required(field)),
    }
}

/// Validates a unit type label (`Residential`, `Commercial`, ...).
pub fn validate_unit_type(field: &str, value: &str) -> ValidationResult<UnitType> {
    UnitType::from_label(value).ok_or_else(|| ValidationError::NotAllowed {
        field: field.to_string(),
        allowed: UnitType::ALL.iter().map(|t| t.label().to_string()).collect(),
    })
}

/// Validates a date in any format accepted by [`parse_date`].
pub fn validate_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    parse_date(value).ok_or_else(|| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("'{}' is not a date (use YYYY-MM-DD)", value.trim()),
    })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a number strictly greater than zero.
///
/// `None` (absent or unparseable) fails the same way as a non-positive
/// value, so `"abc"` reads as "must be a positive number".
pub fn validate_positive(field: &str, value: Option<f64>) -> ValidationResult<f64> {
    match value {
        Some(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(ValidationError::positive(field)),
    }
}

/// Validates a number zero or greater.
pub fn validate_non_negative(field: &str, value: Option<f64>) -> ValidationResult<f64> {
    match value {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        }),
    }
}

/// Validates a commission percentage in `0..=100`.
pub fn validate_percentage(field: &str, value: f64) -> ValidationResult<f64> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: 100.0,
        })
    }
}

/// Validates an installment count in `1..=MAX_INSTALLMENTS`.
pub fn validate_installments(field: &str, value: Option<f64>) -> ValidationResult<u32> {
    let count = validate_positive(field, value)?;
    if count.fract() != 0.0 || count > f64::from(MAX_INSTALLMENTS) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1.0,
            max: f64::from(MAX_INSTALLMENTS),
        });
    }
    Ok(count as u32)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("Block", Some("  A ")), Ok("A"));
        assert!(validate_required("Block", Some("   ")).is_err());
        assert_eq!(
            validate_required("Block", None).unwrap_err().to_string(),
            "Block is required"
        );
    }

    #[test]
    fn test_validate_positive() {
        assert_eq!(validate_positive("Marlas", Some(5.0)), Ok(5.0));
        assert!(validate_positive("Marlas", Some(0.0)).is_err());
        assert!(validate_positive("Marlas", Some(-1.0)).is_err());
        assert_eq!(
            validate_positive("Marlas", None).unwrap_err().to_string(),
            "Marlas must be a positive number"
        );
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("Received", Some(0.0)).is_ok());
        assert!(validate_non_negative("Received", Some(-0.5)).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage("Broker Commission %", 2.5).is_ok());
        assert!(validate_percentage("Broker Commission %", 100.0).is_ok());
        assert!(validate_percentage("Broker Commission %", 150.0).is_err());
    }

    #[test]
    fn test_validate_unit_type() {
        assert_eq!(validate_unit_type("Unit Type", "commercial"), Ok(UnitType::Commercial));
        let err = validate_unit_type("Unit Type", "Villa").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unit Type must be one of: Residential, Commercial, Apartment, Other"
        );
    }

    #[test]
    fn test_validate_installments() {
        assert_eq!(validate_installments("Installments", Some(12.0)), Ok(12));
        assert!(validate_installments("Installments", Some(2.5)).is_err());
        assert!(validate_installments("Installments", Some(0.0)).is_err());
        assert!(validate_installments("Installments", Some(361.0)).is_err());
    }

    #[test]
    fn test_validate_date() {
        assert!(validate_date("First Due Date", "2024-06-01").is_ok());
        assert!(validate_date("First Due Date", "next month").is_err());
    }
}
