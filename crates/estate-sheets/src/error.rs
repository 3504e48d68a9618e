//! # Spreadsheet Errors
//!
//! File-level failures only. Row-level problems are values
//! ([`crate::RowError`]) and never surface here.

use thiserror::Error;

/// Errors that make a whole file unusable.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The workbook could not be opened or decoded.
    ///
    /// ## When This Occurs
    /// - Corrupt or password-protected workbook
    /// - File renamed to `.xlsx` but is something else
    #[error("Could not read workbook {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// Extension is not one we can read.
    #[error("Unsupported file type '.{0}' (use .xlsx, .xls, .ods or .csv)")]
    UnsupportedFormat(String),

    /// The workbook has no worksheets.
    #[error("Workbook contains no sheets")]
    NoSheets,

    /// Header row present but no data rows, or no header at all.
    #[error("Spreadsheet has no data rows")]
    Empty,

    /// CSV decoding or encoding failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsed rows could not be merged into the dataset.
    #[error("Import failed: {0}")]
    Import(#[from] estate_core::CoreError),
}

/// Convenience type alias for Results with SheetError.
pub type SheetResult<T> = Result<T, SheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            SheetError::UnsupportedFormat("pdf".into()).to_string(),
            "Unsupported file type '.pdf' (use .xlsx, .xls, .ods or .csv)"
        );
        assert_eq!(SheetError::Empty.to_string(), "Spreadsheet has no data rows");
    }
}
