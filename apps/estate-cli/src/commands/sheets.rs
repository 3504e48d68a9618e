//! Spreadsheet templates, imports and the inventory export.

use std::io::Write;
use std::path::{Path, PathBuf};

use estate_sheets::template::template_csv;
use estate_sheets::{inventory, read_sheet, transactions, RowError, SheetImport, TemplateKind};

use super::emit;
use crate::backend::Backend;
use crate::error::CliResult;

/// Writes a template to `path`, or to the template's own file name.
pub fn template(kind: TemplateKind, path: Option<&Path>, example: bool, out: &mut dyn Write) -> CliResult<()> {
    let text = template_csv(kind, example)?;
    let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(kind.file_name()));
    emit(Some(&path), &text, out)
}

pub async fn import_inventory(backend: &Backend, file: &Path, out: &mut dyn Write) -> CliResult<()> {
    let sheet = read_sheet(file)?;
    let existing = backend.load().await?;
    let result = inventory::import_inventory(&sheet, existing)?;
    finish_import(backend, result, out).await
}

pub async fn import_transactions(backend: &Backend, file: &Path, out: &mut dyn Write) -> CliResult<()> {
    let sheet = read_sheet(file)?;
    let existing = backend.load().await?;
    let result = transactions::import_transactions(&sheet, existing)?;
    finish_import(backend, result, out).await
}

/// Reports row errors and saves the merged dataset when anything changed.
async fn finish_import(backend: &Backend, result: SheetImport, out: &mut dyn Write) -> CliResult<()> {
    report_row_errors(&result.errors, out)?;

    if result.outcome.summary.imported_total() == 0 {
        writeln!(out, "Nothing imported")?;
        return Ok(());
    }
    let outcome = backend.apply(result.outcome).await?;
    writeln!(out, "{}", outcome.summary)?;
    Ok(())
}

fn report_row_errors(errors: &[RowError], out: &mut dyn Write) -> CliResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    writeln!(out, "{} row(s) skipped:", errors.len())?;
    for error in errors {
        writeln!(out, "  Row {}: {}", error.row, error.errors.join("; "))?;
    }
    Ok(())
}

pub async fn export_inventory(backend: &Backend, path: Option<&Path>, out: &mut dyn Write) -> CliResult<()> {
    let data = backend.load().await?;
    let mut buf = Vec::new();
    inventory::export_inventory(&data.inventory, &mut buf)?;
    emit(path, &String::from_utf8_lossy(&buf), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{local_backend, text};

    #[test]
    fn test_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.csv");
        let mut buf = Vec::new();
        template(TemplateKind::Inventory, Some(&path), true, &mut buf).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        assert!(csv.lines().next().unwrap().starts_with("Project Name,"));
        assert_eq!(csv.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_inventory_import_reports_bad_rows() {
        let backend = local_backend().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("units.csv");
        std::fs::write(
            &file,
            "Project Name,Block,Unit/Shop#,Total Value,Marlas\n\
             Lake City,A,101,2500000,5\n\
             Lake City,A,102,,-3\n",
        )
        .unwrap();

        let mut buf = Vec::new();
        import_inventory(&backend, &file, &mut buf).await.unwrap();
        let report = text(&buf);
        assert!(report.contains("1 row(s) skipped"), "{report}");
        assert!(report.contains("Row 3:"), "{report}");

        let data = backend.load().await.unwrap();
        assert_eq!(data.inventory.len(), 1);
        assert_eq!(data.inventory[0].unit_shop_number.as_deref(), Some("101"));

        let mut buf = Vec::new();
        export_inventory(&backend, None, &mut buf).await.unwrap();
        assert!(text(&buf).contains("Lake City"));
    }

    #[tokio::test]
    async fn test_transactions_import_creates_parties() {
        let backend = local_backend().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sales.csv");
        std::fs::write(
            &file,
            "Customer Name/Phone,Project Name,Unit/Shop Number,Sale Value,Installments,First Due Date,Broker Name/Phone\n\
             Sara Malik,Lake City,A-101,1200000,12,2024-01-15,Kamran Estates\n",
        )
        .unwrap();

        let mut buf = Vec::new();
        import_transactions(&backend, &file, &mut buf).await.unwrap();

        let data = backend.load().await.unwrap();
        assert_eq!(data.customers[0].name, "Sara Malik");
        assert_eq!(data.brokers[0].name, "Kamran Estates");
        assert_eq!(data.projects[0].installments.len(), 12);
    }
}
