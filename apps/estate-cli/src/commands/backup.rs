//! Named backups and the auto-backup slot (local mode).

use std::io::Write;

use crate::args::BackupCommand;
use crate::backend::Backend;
use crate::error::{CliError, CliResult};

pub async fn run(backend: &Backend, action: BackupCommand, out: &mut dyn Write) -> CliResult<()> {
    let store = backend.local()?;

    match action {
        BackupCommand::List => {
            let backups = store.list_backups().await?;
            if backups.is_empty() {
                writeln!(out, "No backups")?;
                return Ok(());
            }
            writeln!(out, "{:<32} {:<27} {:>8} {:>8}", "NAME", "CREATED", "VERSION", "RECORDS")?;
            for backup in backups {
                writeln!(
                    out,
                    "{:<32} {:<27} {:>8} {:>8}",
                    backup.name,
                    backup.created_at,
                    backup.version.as_deref().unwrap_or("-"),
                    backup.total_records
                )?;
            }
        }
        BackupCommand::Create { name } => {
            let name = store.create_backup(name.as_deref()).await?;
            writeln!(out, "Created backup '{name}'")?;
        }
        BackupCommand::Restore { name } => {
            let data = store.restore_backup(&name).await?;
            writeln!(out, "Restored '{name}' ({} records)", data.total_records())?;
        }
        BackupCommand::RestoreAuto => {
            let data = store.restore_auto_backup().await?;
            writeln!(out, "Restored auto-backup ({} records)", data.total_records())?;
        }
        BackupCommand::Delete { name } => {
            if !store.delete_backup(&name).await? {
                return Err(CliError::not_found("Backup", &name));
            }
            writeln!(out, "Deleted backup '{name}'")?;
        }
    }
    Ok(())
}
