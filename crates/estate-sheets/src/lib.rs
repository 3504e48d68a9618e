//! # estate-sheets: Spreadsheet Bridge for Estate CRM
//!
//! Converts between tabular workbooks and entity records.
//!
//! ## Data Flow
//! ```text
//! ┌──────────────┐  read_sheet   ┌─────────┐  parse_*   ┌───────────────────────┐
//! │ .xlsx / .csv │ ────────────► │  Sheet  │ ─────────► │ ParsedRows<T>         │
//! └──────────────┘               │ (rows   │  per-row   │  data   : valid rows  │
//!                                │  keyed  │  checks    │  errors : RowError[]  │
//!                                │  by     │            └──────────┬────────────┘
//!                                │  header)│                       │ import_*
//!                                └─────────┘                       ▼
//!                                                  estate-core import (merge mode)
//! ```
//!
//! Row problems never abort a file. A row that fails validation is left out
//! of `data` and reported with its spreadsheet row number (header = row 1).
//! Only file-level failures are errors.
//!
//! ## Modules
//!
//! - [`reader`] - First-sheet reader for workbooks and CSV
//! - [`template`] - Column layouts and CSV templates
//! - [`inventory`] - Inventory sheet parsing, import and export
//! - [`transactions`] - Bulk sale import with name-or-phone references

pub mod error;
pub mod inventory;
pub mod reader;
pub mod template;
pub mod transactions;

pub use error::{SheetError, SheetResult};
pub use reader::{read_sheet, CellValue, Row, Sheet};
pub use template::TemplateKind;

use estate_core::{ImportOutcome, ValidationError};
use serde::Serialize;

// =============================================================================
// Row Results
// =============================================================================

/// Validation failures of one spreadsheet row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-indexed spreadsheet row (first data row = 2).
    pub row: usize,
    pub errors: Vec<String>,
}

/// Output of a row parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRows<T> {
    pub data: Vec<T>,
    pub errors: Vec<RowError>,
}

impl<T> Default for ParsedRows<T> {
    fn default() -> Self {
        ParsedRows {
            data: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Result of merging a sheet into a dataset.
#[derive(Debug, Clone)]
pub struct SheetImport {
    pub outcome: ImportOutcome,
    /// Rows left out of the import.
    pub errors: Vec<RowError>,
}

/// Collects every validation failure of a row instead of stopping at the first.
#[derive(Debug, Default)]
pub(crate) struct RowCheck {
    errors: Vec<String>,
}

impl RowCheck {
    pub(crate) fn ok<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(e.to_string());
                None
            }
        }
    }

    pub(crate) fn finish(self) -> Result<(), Vec<String>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
