//! # Inventory Sheets
//!
//! Parses the inventory import sheet into [`InventoryItem`]s, merges them into
//! a dataset, and exports inventory back to the same layout.
//!
//! Re-importing a sheet updates units in place: a row matching an existing
//! unit (same project, block and unit number) keeps that unit's ID, status
//! and sale linkage.

use std::collections::HashMap;
use std::io::Write;

use estate_core::ids::{generate_id, now_timestamp};
use estate_core::import::{import_dataset, ImportOptions};
use estate_core::normalize::split_tags;
use estate_core::validation::{validate_positive, validate_required, validate_unit_type};
use estate_core::{CrmData, InventoryItem, InventoryStatus, ValidationError, CURRENT_VERSION};
use serde_json::json;
use tracing::{debug, info};

use crate::error::SheetResult;
use crate::reader::{Row, Sheet};
use crate::template::INVENTORY_COLUMNS;
use crate::{ParsedRows, RowCheck, RowError, SheetImport};

const PROJECT_NAME: &[&str] = &["Project Name", "Project"];
const BLOCK: &[&str] = &["Block"];
const UNIT: &[&str] = &["Unit/Shop#", "Unit/Shop Number", "Unit Number", "Unit"];
const TOTAL_VALUE: &[&str] = &["Total Value", "Value"];
const UNIT_TYPE: &[&str] = &["Unit Type", "Type"];
const MARLAS: &[&str] = &["Marlas", "Size"];
const RATE_PER_MARLA: &[&str] = &["Rate per Marla", "Rate"];
const PLOT_FEATURES: &[&str] = &["Plot Features", "Features"];

// =============================================================================
// Parsing
// =============================================================================

/// Validates every row; valid rows become inventory items.
pub fn parse_inventory(sheet: &Sheet) -> ParsedRows<InventoryItem> {
    let mut parsed = ParsedRows::default();
    for row in &sheet.rows {
        match parse_row(row) {
            Ok(item) => parsed.data.push(item),
            Err(errors) => {
                debug!(row = row.number, ?errors, "Inventory row rejected");
                parsed.errors.push(RowError {
                    row: row.number,
                    errors,
                });
            }
        }
    }
    parsed
}

fn parse_row(row: &Row) -> Result<InventoryItem, Vec<String>> {
    let mut check = RowCheck::default();

    let project_name = check.ok(validate_required("Project Name", row.text(PROJECT_NAME).as_deref()).map(str::to_string));
    let block = check.ok(validate_required("Block", row.text(BLOCK).as_deref()).map(str::to_string));
    let unit = check.ok(validate_required("Unit/Shop#", row.text(UNIT).as_deref()).map(str::to_string));

    let unit_type = row
        .text(UNIT_TYPE)
        .and_then(|label| check.ok(validate_unit_type("Unit Type", &label)));
    let marlas = row
        .number(MARLAS)
        .and_then(|n| check.ok(validate_positive("Marlas", n)));
    let rate_per_marla = row
        .number(RATE_PER_MARLA)
        .and_then(|n| check.ok(validate_positive("Rate per Marla", n)));

    let total_value = match row.number(TOTAL_VALUE) {
        Some(n) => check.ok(validate_positive("Total Value", n)),
        None => check.ok::<f64>(Err(ValidationError::required("Total Value"))),
    };

    let plot_features = row
        .text(PLOT_FEATURES)
        .map(|raw| split_tags(&raw))
        .unwrap_or_default();

    check.finish()?;
    Ok(InventoryItem {
        id: generate_id("inv"),
        project_name: project_name.unwrap_or_default(),
        block,
        unit_shop_number: unit,
        unit_type,
        marlas,
        rate_per_marla,
        total_value,
        status: InventoryStatus::Available,
        plot_features,
        created_at: Some(now_timestamp()),
        ..Default::default()
    })
}

// =============================================================================
// Import
// =============================================================================

fn unit_key(item: &InventoryItem) -> (String, String, String) {
    let norm = |s: Option<&str>| s.unwrap_or_default().trim().to_lowercase();
    (
        norm(Some(&item.project_name)),
        norm(item.block.as_deref()),
        norm(item.unit_shop_number.as_deref()),
    )
}

/// Parses `sheet` and merges the valid rows into `existing`.
///
/// Rows go through the same normalize, filter and reconcile path as a JSON
/// import in merge mode.
pub fn import_inventory(sheet: &Sheet, existing: CrmData) -> SheetResult<SheetImport> {
    let ParsedRows { data, errors } = parse_inventory(sheet);

    let known: HashMap<_, &InventoryItem> = existing.inventory.iter().map(|i| (unit_key(i), i)).collect();
    let items: Vec<InventoryItem> = data
        .into_iter()
        .map(|mut item| {
            if let Some(current) = known.get(&unit_key(&item)) {
                item.id = current.id.clone();
                item.status = current.status;
                item.customer_id = current.customer_id.clone();
                item.project_id = current.project_id.clone();
                item.notes = current.notes.clone();
                item.created_at = current.created_at.clone();
                item.updated_at = Some(now_timestamp());
            }
            item
        })
        .collect();

    let payload = json!({ "version": CURRENT_VERSION, "inventory": items });
    let outcome = import_dataset(payload, existing, ImportOptions::merge())?;

    info!(
        imported = outcome.summary.imported_total(),
        rejected_rows = errors.len(),
        "Inventory sheet imported"
    );
    Ok(SheetImport { outcome, errors })
}

// =============================================================================
// Export
// =============================================================================

/// Writes inventory in the import layout, so the file can be edited and
/// imported again.
pub fn export_inventory<W: Write>(items: &[InventoryItem], out: W) -> SheetResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(INVENTORY_COLUMNS.iter().map(|c| c.header))?;

    let number = |n: Option<f64>| n.map(|v| v.to_string()).unwrap_or_default();
    for item in items {
        writer.write_record([
            item.project_name.clone(),
            item.block.clone().unwrap_or_default(),
            item.unit_shop_number.clone().unwrap_or_default(),
            number(item.computed_total_value()),
            item.unit_type.map(|t| t.label().to_string()).unwrap_or_default(),
            number(item.marlas),
            number(item.rate_per_marla),
            item.plot_features.join("; "),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_csv;
    use estate_core::UnitType;

    const HEADER: &str = "Project Name,Block,Unit/Shop#,Total Value,Unit Type,Marlas,Rate per Marla,Plot Features\n";

    fn sheet(body: &str) -> Sheet {
        read_csv(format!("{HEADER}{body}").as_bytes()).unwrap()
    }

    #[test]
    fn test_valid_row() {
        let parsed = parse_inventory(&sheet("Green Valley,A,12,2500000,commercial,5,500000,Corner; Park Facing\n"));
        assert!(parsed.errors.is_empty());
        let item = &parsed.data[0];
        assert!(item.id.starts_with("inv_"));
        assert_eq!(item.unit_type, Some(UnitType::Commercial));
        assert_eq!(item.total_value, Some(2_500_000.0));
        assert_eq!(item.plot_features, vec!["Corner", "Park Facing"]);
    }

    #[test]
    fn test_non_numeric_marlas_rejects_only_that_row() {
        let parsed = parse_inventory(&sheet(
            "Green Valley,A,12,2500000,,abc,,\nGreen Valley,A,13,2600000,,,,\n",
        ));
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].unit_shop_number.as_deref(), Some("13"));
        assert_eq!(
            parsed.errors,
            vec![RowError {
                row: 2,
                errors: vec!["Marlas must be a positive number".to_string()],
            }]
        );
    }

    #[test]
    fn test_collects_every_error_of_a_row() {
        let parsed = parse_inventory(&sheet(",A,,,Villa,,,\n"));
        let errors = &parsed.errors[0].errors;
        assert!(errors.contains(&"Project Name is required".to_string()));
        assert!(errors.contains(&"Unit/Shop# is required".to_string()));
        assert!(errors.contains(&"Total Value is required".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("Unit Type must be one of")));
    }

    #[test]
    fn test_blank_total_value_rejected_even_with_marlas_and_rate() {
        let parsed = parse_inventory(&sheet("Lake City,C,7,,,4,250000,\n"));
        assert!(parsed.data.is_empty());
        assert_eq!(
            parsed.errors,
            vec![RowError {
                row: 2,
                errors: vec!["Total Value is required".to_string()],
            }]
        );
    }

    #[test]
    fn test_reimport_updates_in_place() {
        let first = import_inventory(&sheet("Green Valley,A,12,2500000,,,,\n"), CrmData::default()).unwrap();
        let mut data = first.outcome.data;
        data.inventory[0].status = InventoryStatus::Sold;
        let id = data.inventory[0].id.clone();

        let second = import_inventory(&sheet("green valley,A,12,2700000,,,,\n"), data).unwrap();
        let inventory = &second.outcome.data.inventory;
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].id, id);
        assert_eq!(inventory[0].status, InventoryStatus::Sold);
        assert_eq!(inventory[0].total_value, Some(2_700_000.0));
    }

    #[test]
    fn test_export_reimports() {
        let parsed = parse_inventory(&sheet("Green Valley,A,12,2500000,Residential,5,500000,Corner\n"));
        let mut buf = Vec::new();
        export_inventory(&parsed.data, &mut buf).unwrap();
        let again = parse_inventory(&read_csv(buf.as_slice()).unwrap());
        assert!(again.errors.is_empty());
        assert_eq!(again.data[0].plot_features, parsed.data[0].plot_features);
        assert_eq!(again.data[0].total_value, parsed.data[0].total_value);
    }
}
