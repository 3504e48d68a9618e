//! Backup export/import and single-record edits.

use std::io::Write;
use std::path::Path;

use chrono::Utc;
use estate_core::import::ImportOptions;
use estate_core::EntityKind;
use serde_json::Value;

use super::emit;
use crate::backend::{Backend, ClearReceipt};
use crate::error::{CliError, CliResult};

pub async fn export(backend: &Backend, path: Option<&Path>, out: &mut dyn Write) -> CliResult<()> {
    let text = backend.export_json().await?;
    emit(path, &text, out)
}

pub async fn import(
    backend: &Backend,
    file: &Path,
    replace: bool,
    skip_duplicates: bool,
    out: &mut dyn Write,
) -> CliResult<()> {
    let text = std::fs::read_to_string(file)?;
    let options = if replace {
        ImportOptions::replace()
    } else {
        ImportOptions::merge()
    }
    .skip_duplicates(skip_duplicates);

    let outcome = backend.import_json(&text, options).await?;

    if !outcome.source_version.is_current() {
        writeln!(out, "Upgraded backup from version {}", outcome.source_version)?;
    }
    writeln!(out, "{}", outcome.summary)?;
    if outcome.settings_replaced {
        writeln!(out, "Settings replaced from backup")?;
    }
    Ok(())
}

pub async fn add(backend: &Backend, kind: EntityKind, json: &str, out: &mut dyn Write) -> CliResult<()> {
    let value: Value = serde_json::from_str(json)?;
    let id = backend.upsert_record(kind, value).await?;
    writeln!(out, "Saved {kind} {id}")?;
    Ok(())
}

pub async fn delete(backend: &Backend, kind: EntityKind, id: &str, out: &mut dyn Write) -> CliResult<()> {
    if !backend.delete(kind, id).await? {
        return Err(CliError::not_found(kind.key(), id));
    }
    writeln!(out, "Deleted {kind} {id}")?;
    Ok(())
}

pub async fn clear(backend: &Backend, confirmed: bool, out: &mut dyn Write) -> CliResult<()> {
    if !confirmed {
        return Err(CliError::usage("clear removes every record; pass --yes to confirm"));
    }

    match backend.clear_all_data().await? {
        ClearReceipt::Backup(name) => {
            writeln!(out, "All data cleared. Previous data saved as backup '{name}'")?;
        }
        ClearReceipt::Snapshot(text) => {
            let file = format!("estate-before-clear-{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
            std::fs::write(&file, text)?;
            writeln!(out, "All server data cleared. Previous data written to {file}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{local_backend, text};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_import_legacy_backup_and_export() {
        let backend = local_backend().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("legacy.json");
        std::fs::write(
            &file,
            r#"{"customers": [{"id": "c1", "type": "broker", "name": "Ali", "phone": "0300"}]}"#,
        )
        .unwrap();

        let mut buf = Vec::new();
        import(&backend, &file, false, false, &mut buf).await.unwrap();
        let report = text(&buf);
        assert!(report.contains("Upgraded backup from version 1.0"), "{report}");

        let out_file = dir.path().join("export.json");
        let mut buf = Vec::new();
        export(&backend, Some(&out_file), &mut buf).await.unwrap();
        let exported: Value = serde_json::from_str(&std::fs::read_to_string(&out_file).unwrap()).unwrap();
        assert_eq!(exported["version"], "4.0");
        assert_eq!(exported["brokers"][0]["name"], "Ali");
    }

    #[tokio::test]
    async fn test_add_then_delete() {
        let backend = local_backend().await;
        let mut buf = Vec::new();
        add(&backend, EntityKind::Brokers, r#"{"id": "b1", "name": "Kamran"}"#, &mut buf)
            .await
            .unwrap();
        assert!(text(&buf).contains("Saved brokers b1"));

        delete(&backend, EntityKind::Brokers, "b1", &mut buf).await.unwrap();
        let err = delete(&backend, EntityKind::Brokers, "b1", &mut buf).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_json() {
        let backend = local_backend().await;
        let err = add(&backend, EntityKind::Customers, "{name:", &mut Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_clear_needs_confirmation() {
        let backend = local_backend().await;
        let err = clear(&backend, false, &mut Vec::new()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Usage);

        let mut buf = Vec::new();
        clear(&backend, true, &mut buf).await.unwrap();
        assert!(text(&buf).contains("before_clear_"));
    }
}
