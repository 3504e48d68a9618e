//! # Error Types
//!
//! Domain-specific error types for estate-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  estate-core errors (this file)                                        │
//! │  ├── CoreError        - Parse failures, invalid amounts                │
//! │  └── ValidationError  - Field/row validation failures                  │
//! │                                                                         │
//! │  estate-sheets  └── SheetError   - Unreadable workbook                 │
//! │  estate-store   └── StoreError   - Storage backend failures            │
//! │  estate-remote  └── RemoteError  - Timeout / network / server          │
//! │                                                                         │
//! │  Flow: ValidationError → collected per row/record (never thrown)       │
//! │        CoreError       → surfaced as a one-line summary                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. The reconciliation pipeline never returns `Err`; rejected records are counted
//! 2. Only the outermost parse step produces a `CoreError`
//! 3. Validation messages are user-facing ("Marlas must be a positive number")

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The backup payload is not valid JSON.
    ///
    /// ## When This Occurs
    /// - User picked a file that is not a backup
    /// - File was truncated while copying
    #[error("Backup is not valid JSON: {0}")]
    InvalidJson(String),

    /// The backup payload is JSON but not an object.
    #[error("Backup must be a JSON object, got {0}")]
    NotAnObject(String),

    /// A commission payment amount is invalid.
    ///
    /// ## When This Occurs
    /// - Paying zero or a negative amount
    /// - Paying more than the remaining commission
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Record could not be found by ID.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::InvalidJson(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Display strings are shown verbatim next to the spreadsheet row number,
/// so they read as sentences about a column.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be a number greater than zero.
    #[error("{field} must be a positive number")]
    MustBePositive { field: String },

    /// Value must be a number zero or greater.
    #[error("{field} must be a non-negative number")]
    MustBeNonNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Invalid format (e.g., unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", .allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::positive("Marlas").to_string(),
            "Marlas must be a positive number"
        );
        assert_eq!(
            ValidationError::required("Project Name").to_string(),
            "Project Name is required"
        );

        let err = ValidationError::NotAllowed {
            field: "Unit Type".to_string(),
            allowed: vec!["Residential".into(), "Commercial".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unit Type must be one of: Residential, Commercial"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::InvalidJson(_)));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core: CoreError = ValidationError::required("id").into();
        assert!(matches!(core, CoreError::Validation(_)));
    }
}
