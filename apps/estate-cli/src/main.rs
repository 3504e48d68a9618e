//! # Estate CLI
//!
//! Command-line front end for the CRM dataset: JSON backup import and
//! export, spreadsheet imports, named backups and commission reporting.
//!
//! ## Startup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. init_tracing()          stderr, RUST_LOG or the default filter    │
//! │  2. Cli::parse()            clap prints usage errors, exit status 2    │
//! │  3. AppConfig::load()       defaults < estate.toml < ESTATE_* env      │
//! │  4. Backend::open()         SQLite store or REST client                │
//! │  5. commands::run()         report on stdout                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod args;
mod backend;
mod commands;
mod error;

use std::io::Write;

use clap::Parser;
use estate_store::AppConfig;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command, ConfigCommand};
use crate::backend::Backend;
use crate::error::CliResult;

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    debug!(command = ?cli.command, "Parsed arguments");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Config {
            action: ConfigCommand::Init,
        } => {
            // Write defaults plus any environment overrides
            let config = AppConfig::load_or_default(cli.config_path.clone());
            config.save(cli.config_path.clone())?;
            let path = cli.config_path.or_else(AppConfig::default_config_path);
            if let Some(path) = path {
                writeln!(out, "Wrote {}", path.display())?;
            }
            Ok(())
        }
        Command::Config {
            action: ConfigCommand::Show,
        } => {
            let config = AppConfig::load(cli.config_path)?;
            let text = toml::to_string_pretty(&config)
                .map_err(|e| error::CliError::new(error::ErrorCode::ConfigError, e.to_string()))?;
            write!(out, "{text}")?;
            Ok(())
        }
        command => {
            let config = AppConfig::load(cli.config_path)?;
            let backend = Backend::open(&config).await?;
            info!(mode = ?backend.mode(), "Backend ready");
            commands::run(command, &backend, &mut out).await
        }
    }
}

/// Logs go to stderr so reports on stdout stay clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,estate=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
