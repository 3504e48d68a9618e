//! # Sheet Reader
//!
//! Loads the first worksheet of a workbook (or a CSV file) into rows keyed by
//! header text.
//!
//! ```text
//!   row 1  │ Project Name │ Block │ Unit/Shop# │ Total Value │   ◄── headers
//!   row 2  │ Green Valley │ A     │ 12         │ 2500000     │   ◄── Row { number: 2 }
//!   row 3  │              │       │            │             │   (blank, skipped)
//!   row 4  │ Lake City    │ C     │ 7          │ 1800000     │   ◄── Row { number: 4 }
//! ```
//!
//! Header lookup ignores case, spaces and punctuation, so `Unit/Shop#`,
//! `unit shop #` and `UNIT-SHOP` all address the same column.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Days, NaiveDate};
use estate_core::normalize::parse_number;
use tracing::debug;

use crate::error::{SheetError, SheetResult};

// =============================================================================
// Cells
// =============================================================================

/// A decoded spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Builds a cell from raw text; blank text is `Empty`.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Cell rendered as text. Whole numbers lose their `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    /// Cell read as a number. Text like `"2,500,000"` parses; `"abc"` is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::from_text(s),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
                Some(date) => CellValue::Text(date.format("%Y-%m-%d").to_string()),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from_text(s),
        }
    }
}

/// Converts an Excel serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Day 0 is 1899-12-30 once Excel's phantom 1900-02-29 is accounted for.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// Normalized header key: lowercase ASCII alphanumerics only.
pub fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// =============================================================================
// Rows
// =============================================================================

/// One data row, keyed by normalized header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// 1-indexed spreadsheet row number (header row = 1).
    pub number: usize,
    cells: HashMap<String, CellValue>,
}

impl Row {
    pub fn new(number: usize) -> Self {
        Row {
            number,
            cells: HashMap::new(),
        }
    }

    pub fn insert(&mut self, header: &str, value: CellValue) {
        let key = header_key(header);
        if !key.is_empty() {
            self.cells.insert(key, value);
        }
    }

    /// First non-empty cell among `headers` (aliases of one column).
    pub fn get(&self, headers: &[&str]) -> Option<&CellValue> {
        headers
            .iter()
            .filter_map(|h| self.cells.get(&header_key(h)))
            .find(|cell| !cell.is_empty())
    }

    pub fn text(&self, headers: &[&str]) -> Option<String> {
        self.get(headers).and_then(CellValue::as_text)
    }

    /// `None` when the column is blank; `Some(None)` when it holds non-numeric text.
    pub fn number(&self, headers: &[&str]) -> Option<Option<f64>> {
        self.get(headers).map(CellValue::as_number)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_empty)
    }
}

/// The decoded first sheet of a file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    /// Builds a sheet from a header row and raw data rows.
    ///
    /// `first_row` is the spreadsheet row number of the header. Blank rows
    /// are dropped but keep their place in the numbering.
    pub fn from_grid(headers: Vec<String>, grid: Vec<Vec<CellValue>>, first_row: usize) -> Self {
        let rows = grid
            .into_iter()
            .enumerate()
            .map(|(i, cells)| {
                let mut row = Row::new(first_row + i + 1);
                for (header, cell) in headers.iter().zip(cells) {
                    row.insert(header, cell);
                }
                row
            })
            .filter(|row| !row.is_blank())
            .collect();
        Sheet { headers, rows }
    }
}

// =============================================================================
// File Readers
// =============================================================================

/// Reads the first sheet of `path`, dispatching on the file extension.
///
/// # Errors
/// File-level failures only: unreadable file, unsupported extension, no
/// sheets, or no data rows.
pub fn read_sheet(path: &Path) -> SheetResult<Sheet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let sheet = match ext.as_str() {
        "csv" => read_csv(std::fs::File::open(path)?)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
        other => return Err(SheetError::UnsupportedFormat(other.to_string())),
    };

    debug!(path = %path.display(), rows = sheet.rows.len(), "Sheet loaded");
    Ok(sheet)
}

/// Reads CSV text. The first record is the header row.
pub fn read_csv<R: Read>(source: R) -> SheetResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SheetError::Empty);
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(i + 2);
        let mut row = Row::new(number);
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header, CellValue::from_text(field));
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(SheetError::Empty);
    }
    Ok(Sheet { headers, rows })
}

fn read_workbook(path: &Path) -> SheetResult<Sheet> {
    let unreadable = |reason: String| SheetError::Unreadable {
        path: path.display().to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let first = sheet_names.first().ok_or(SheetError::NoSheets)?;
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| unreadable(e.to_string()))?;

    // Ranges start at the first used cell, not necessarily A1.
    let header_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut grid = range.rows();
    let headers: Vec<String> = match grid.next() {
        Some(cells) => cells
            .iter()
            .map(|c| CellValue::from(c).as_text().unwrap_or_default())
            .collect(),
        None => return Err(SheetError::Empty),
    };

    let data: Vec<Vec<CellValue>> = grid
        .map(|cells| cells.iter().map(CellValue::from).collect())
        .collect();
    let sheet = Sheet::from_grid(headers, data, header_row);

    if sheet.rows.is_empty() {
        return Err(SheetError::Empty);
    }
    Ok(sheet)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_header_key() {
        assert_eq!(header_key("Unit/Shop#"), "unitshop");
        assert_eq!(header_key(" Rate per Marla "), "ratepermarla");
        assert_eq!(header_key("Broker Commission %"), "brokercommission");
    }

    #[test]
    fn test_cell_text_and_number() {
        assert_eq!(CellValue::Number(12.0).as_text().as_deref(), Some("12"));
        assert_eq!(CellValue::Number(12.5).as_text().as_deref(), Some("12.5"));
        assert_eq!(CellValue::from_text(" 2,500,000 ").as_number(), Some(2_500_000.0));
        assert_eq!(CellValue::from_text("abc").as_number(), None);
        assert_eq!(CellValue::from_text("   "), CellValue::Empty);
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(excel_serial_to_date(45292.0), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(excel_serial_to_date(0.0), None);
    }

    #[test]
    fn test_read_csv_numbers_rows_from_two() {
        let text = "Project Name,Block\nGreen Valley,A\n,\nLake City,C\n";
        let sheet = read_csv(text.as_bytes()).unwrap();
        assert_eq!(sheet.headers, vec!["Project Name", "Block"]);
        let numbers: Vec<usize> = sheet.rows.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![2, 4]);
        assert_eq!(sheet.rows[1].text(&["project name"]).as_deref(), Some("Lake City"));
    }

    #[test]
    fn test_read_csv_header_only_is_empty() {
        let err = read_csv("Project Name,Block\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SheetError::Empty));
    }

    #[test]
    fn test_row_aliases() {
        let mut row = Row::new(2);
        row.insert("Unit/Shop Number", CellValue::Empty);
        row.insert("Unit", CellValue::Text("7".into()));
        assert_eq!(row.text(&["Unit/Shop Number", "Unit"]).as_deref(), Some("7"));
        assert_eq!(row.number(&["Marlas"]), None);
    }

    #[test]
    fn test_from_grid_skips_blank_rows() {
        let sheet = Sheet::from_grid(
            vec!["A".into()],
            vec![vec![CellValue::Empty], vec![CellValue::Number(1.0)]],
            1,
        );
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].number, 3);
    }

    #[test]
    fn test_read_sheet_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("stock.CSV");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "Project Name\nGreen Valley").unwrap();
        assert_eq!(read_sheet(&csv_path).unwrap().rows.len(), 1);

        let pdf = dir.path().join("stock.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();
        assert!(matches!(read_sheet(&pdf), Err(SheetError::UnsupportedFormat(ext)) if ext == "pdf"));

        let broken = dir.path().join("broken.xlsx");
        std::fs::write(&broken, b"not a zip").unwrap();
        assert!(matches!(read_sheet(&broken), Err(SheetError::Unreadable { .. })));
    }
}
