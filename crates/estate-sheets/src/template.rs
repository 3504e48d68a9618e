//! # Import Templates
//!
//! Column layouts of the two bulk-import sheets, and CSV templates built from
//! them. The parsers read the same constants, so a generated template always
//! round-trips through its parser.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::error::SheetResult;

/// One template column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub header: &'static str,
    pub required: bool,
    /// Value shown in the example row.
    pub example: &'static str,
}

const fn required(header: &'static str, example: &'static str) -> Column {
    Column {
        header,
        required: true,
        example,
    }
}

const fn optional(header: &'static str, example: &'static str) -> Column {
    Column {
        header,
        required: false,
        example,
    }
}

pub const INVENTORY_COLUMNS: &[Column] = &[
    required("Project Name", "Green Valley"),
    required("Block", "A"),
    required("Unit/Shop#", "12"),
    required("Total Value", "2500000"),
    optional("Unit Type", "Residential"),
    optional("Marlas", "5"),
    optional("Rate per Marla", "500000"),
    optional("Plot Features", "Corner; Park Facing"),
];

pub const TRANSACTION_COLUMNS: &[Column] = &[
    required("Customer Name/Phone", "Ali Raza"),
    required("Project Name", "Green Valley"),
    required("Unit/Shop Number", "A-12"),
    required("Sale Value", "2500000"),
    required("Installments", "12"),
    required("First Due Date", "2024-01-31"),
    optional("Broker Name/Phone", "03001234567"),
    optional("Broker Commission %", "1"),
    optional("Company Rep Name/Phone", "Usman"),
    optional("Company Rep Commission %", "0.5"),
    optional("Marlas", "5"),
    optional("Rate Per Marla", "500000"),
    optional("Payment Cycle", "monthly"),
    optional("Status", "active"),
    optional("Notes", ""),
];

/// Which import sheet a template is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Inventory,
    Transactions,
}

impl TemplateKind {
    pub fn columns(&self) -> &'static [Column] {
        match self {
            TemplateKind::Inventory => INVENTORY_COLUMNS,
            TemplateKind::Transactions => TRANSACTION_COLUMNS,
        }
    }

    /// Suggested download name.
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::Inventory => "inventory_template.csv",
            TemplateKind::Transactions => "transactions_template.csv",
        }
    }

    pub fn required_headers(&self) -> impl Iterator<Item = &'static str> {
        self.columns().iter().filter(|c| c.required).map(|c| c.header)
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Inventory => f.write_str("inventory"),
            TemplateKind::Transactions => f.write_str("transactions"),
        }
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inventory" => Ok(TemplateKind::Inventory),
            "transactions" | "transaction" | "projects" => Ok(TemplateKind::Transactions),
            other => Err(format!("Unknown template: {other} (use inventory or transactions)")),
        }
    }
}

/// Writes the header row, and optionally one example row, as CSV.
pub fn write_template<W: Write>(kind: TemplateKind, out: W, with_example: bool) -> SheetResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(kind.columns().iter().map(|c| c.header))?;
    if with_example {
        writer.write_record(kind.columns().iter().map(|c| c.example))?;
    }
    writer.flush()?;
    Ok(())
}

/// Template as an in-memory CSV string.
pub fn template_csv(kind: TemplateKind, with_example: bool) -> SheetResult<String> {
    let mut buf = Vec::new();
    write_template(kind, &mut buf, with_example)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_csv;

    #[test]
    fn test_header_only_template() {
        let text = template_csv(TemplateKind::Inventory, false).unwrap();
        assert_eq!(
            text.trim_end(),
            "Project Name,Block,Unit/Shop#,Total Value,Unit Type,Marlas,Rate per Marla,Plot Features"
        );
    }

    #[test]
    fn test_example_row_matches_headers() {
        for kind in [TemplateKind::Inventory, TemplateKind::Transactions] {
            let text = template_csv(kind, true).unwrap();
            let sheet = read_csv(text.as_bytes()).unwrap();
            assert_eq!(sheet.headers.len(), kind.columns().len());
            assert_eq!(sheet.rows.len(), 1);
            assert_eq!(sheet.rows[0].number, 2);
        }
    }

    #[test]
    fn test_required_headers() {
        let required: Vec<&str> = TemplateKind::Transactions.required_headers().collect();
        assert_eq!(required.len(), 6);
        assert!(required.contains(&"First Due Date"));
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Inventory".parse::<TemplateKind>(), Ok(TemplateKind::Inventory));
        assert!("receipts".parse::<TemplateKind>().is_err());
    }
}
