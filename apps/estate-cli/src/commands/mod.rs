//! # Command Handlers
//!
//! Each handler takes the opened [`Backend`] and a writer for its report,
//! delegating all reconciliation to the library crates.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  data.rs     export, import, add, delete, clear                        │
//! │  sheets.rs   template, import-inventory, import-transactions,          │
//! │              export-inventory                                          │
//! │  backup.rs   backup list / create / restore / restore-auto / delete    │
//! │  reports.rs  master-projects, accruals, pay-commission                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod backup;
pub mod data;
pub mod reports;
pub mod sheets;

use std::io::Write;
use std::path::Path;

use crate::args::Command;
use crate::backend::Backend;
use crate::error::{CliError, CliResult};

/// Runs a command that needs the dataset.
pub async fn run(command: Command, backend: &Backend, out: &mut dyn Write) -> CliResult<()> {
    match command {
        Command::Export { out: path } => data::export(backend, path.as_deref(), out).await,
        Command::Import {
            file,
            replace,
            skip_duplicates,
        } => data::import(backend, &file, replace, skip_duplicates, out).await,
        Command::Add { kind, json } => data::add(backend, kind.into(), &json, out).await,
        Command::Delete { kind, id } => data::delete(backend, kind.into(), &id, out).await,
        Command::Clear { confirmed } => data::clear(backend, confirmed, out).await,
        Command::Template { kind, out: path, example } => sheets::template(kind.into(), path.as_deref(), example, out),
        Command::ImportInventory { file } => sheets::import_inventory(backend, &file, out).await,
        Command::ImportTransactions { file } => sheets::import_transactions(backend, &file, out).await,
        Command::ExportInventory { out: path } => sheets::export_inventory(backend, path.as_deref(), out).await,
        Command::Backup { action } => backup::run(backend, action, out).await,
        Command::MasterProjects { save } => reports::master_projects(backend, save, out).await,
        Command::Accruals { outstanding_only } => reports::accruals(backend, outstanding_only, out).await,
        Command::PayCommission {
            project_id,
            recipient,
            amount,
            date,
        } => reports::pay_commission(backend, &project_id, recipient.into(), amount, date.as_deref(), out).await,
        Command::Health => health(backend, out).await,
        Command::Config { .. } => Err(CliError::usage(
            "This command does not use the dataset",
        )),
    }
}

async fn health(backend: &Backend, out: &mut dyn Write) -> CliResult<()> {
    match backend {
        Backend::Remote(store) => {
            if store.health().await {
                writeln!(out, "Server at {} is healthy", store.client().base_url())?;
                Ok(())
            } else {
                Err(CliError::new(
                    crate::error::ErrorCode::NetworkError,
                    format!("Server at {} is not reachable", store.client().base_url()),
                ))
            }
        }
        Backend::Local(_) => {
            writeln!(out, "Local mode: no server to check")?;
            Ok(())
        }
    }
}

/// Writes `text` to `path`, or to `out` when no path is given.
pub(crate) fn emit(path: Option<&Path>, text: &str, out: &mut dyn Write) -> CliResult<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)?;
            writeln!(out, "Wrote {}", path.display())?;
        }
        None => {
            out.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
