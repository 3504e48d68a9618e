//! Command-line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use estate_core::normalize::parse_number;
use estate_core::{EntityKind, RecipientType};
use estate_sheets::TemplateKind;

#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "estate", version, about = "Estate CRM data import, export and reconciliation")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Config file (defaults to estate.toml in the platform config dir)
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Write a JSON backup (stdout by default)
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Import a JSON backup (merge by default)
    Import {
        file: PathBuf,
        /// Clear every collection before importing
        #[arg(long)]
        replace: bool,
        /// Keep existing records when IDs collide
        #[arg(long)]
        skip_duplicates: bool,
    },

    /// Add or update one record
    Add {
        #[arg(value_enum)]
        kind: EntityArg,
        /// Record as a JSON object
        json: String,
    },

    /// Delete one record (records referencing it are kept)
    Delete {
        #[arg(value_enum)]
        kind: EntityArg,
        id: String,
    },

    /// Empty every collection; settings are kept
    Clear {
        /// Confirm the clear
        #[arg(long = "yes")]
        confirmed: bool,
    },

    /// Write a spreadsheet import template
    Template {
        #[arg(value_enum)]
        kind: TemplateArg,
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Include one example row
        #[arg(long)]
        example: bool,
    },

    /// Import inventory rows (.xlsx, .xls, .ods, .csv)
    ImportInventory { file: PathBuf },

    /// Import sales with installment schedules
    ImportTransactions { file: PathBuf },

    /// Write inventory as CSV
    ExportInventory {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Named backups and the auto-backup slot (local mode)
    Backup {
        #[command(subcommand)]
        action: BackupCommand,
    },

    /// Projects grouped by name
    MasterProjects {
        /// Store the grouping as the dataset's master projects
        #[arg(long)]
        save: bool,
    },

    /// Commission owed vs paid
    Accruals {
        /// Only rows with an outstanding balance
        #[arg(long = "outstanding")]
        outstanding_only: bool,
    },

    /// Record a commission payment
    PayCommission {
        project_id: String,
        #[arg(value_enum)]
        recipient: RecipientArg,
        /// Amount, thousands separators allowed
        #[arg(value_parser = parse_amount)]
        amount: f64,
        /// Payment date (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<String>,
    },

    /// Show or write the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Check the REST backend (remote mode)
    Health,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum BackupCommand {
    List,
    /// Snapshot the dataset; a dated name is generated when omitted
    Create { name: Option<String> },
    Restore { name: String },
    /// Restore the copy written on the last save
    RestoreAuto,
    Delete { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Init,
}

// =============================================================================
// Value Enums
// =============================================================================

/// Entity collections, named by their backup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityArg {
    Customers,
    Brokers,
    Projects,
    Receipts,
    Interactions,
    Inventory,
    #[value(name = "masterProjects", alias = "master-projects")]
    MasterProjects,
    #[value(name = "commissionPayments", alias = "commission-payments")]
    CommissionPayments,
}

impl From<EntityArg> for EntityKind {
    fn from(arg: EntityArg) -> Self {
        match arg {
            EntityArg::Customers => EntityKind::Customers,
            EntityArg::Brokers => EntityKind::Brokers,
            EntityArg::Projects => EntityKind::Projects,
            EntityArg::Receipts => EntityKind::Receipts,
            EntityArg::Interactions => EntityKind::Interactions,
            EntityArg::Inventory => EntityKind::Inventory,
            EntityArg::MasterProjects => EntityKind::MasterProjects,
            EntityArg::CommissionPayments => EntityKind::CommissionPayments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecipientArg {
    Broker,
    #[value(name = "rep", alias = "company-rep")]
    CompanyRep,
}

impl From<RecipientArg> for RecipientType {
    fn from(arg: RecipientArg) -> Self {
        match arg {
            RecipientArg::Broker => RecipientType::Broker,
            RecipientArg::CompanyRep => RecipientType::CompanyRep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateArg {
    Inventory,
    Transactions,
}

impl From<TemplateArg> for TemplateKind {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::Inventory => TemplateKind::Inventory,
            TemplateArg::Transactions => TemplateKind::Transactions,
        }
    }
}

fn parse_amount(raw: &str) -> Result<f64, String> {
    parse_number(raw).ok_or_else(|| format!("invalid amount: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(line: &str) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("estate").chain(line.split_whitespace()))
    }

    #[test]
    fn test_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_flags() {
        let cli = parse("import backup.json --replace --config /tmp/estate.toml").unwrap();
        assert_eq!(cli.config_path, Some(PathBuf::from("/tmp/estate.toml")));
        assert_eq!(
            cli.command,
            Command::Import {
                file: PathBuf::from("backup.json"),
                replace: true,
                skip_duplicates: false,
            }
        );
    }

    #[test]
    fn test_no_arguments_shows_help() {
        let err = parse("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
    }

    #[test]
    fn test_template_and_entities() {
        assert_eq!(
            parse("template inventory -o inv.csv --example").unwrap().command,
            Command::Template {
                kind: TemplateArg::Inventory,
                out: Some(PathBuf::from("inv.csv")),
                example: true,
            }
        );

        let cli = parse("delete masterProjects mp_lake-city").unwrap();
        let Command::Delete { kind, id } = cli.command else {
            panic!("expected delete");
        };
        assert_eq!(EntityKind::from(kind), EntityKind::MasterProjects);
        assert_eq!(id, "mp_lake-city");
        assert!(parse("delete master-projects x").is_ok());
    }

    #[test]
    fn test_pay_commission() {
        assert_eq!(
            parse("pay-commission p1 rep 25,000 --date 2024-05-01").unwrap().command,
            Command::PayCommission {
                project_id: "p1".into(),
                recipient: RecipientArg::CompanyRep,
                amount: 25_000.0,
                date: Some("2024-05-01".into()),
            }
        );
        assert_eq!(
            RecipientType::from(RecipientArg::CompanyRep),
            RecipientType::CompanyRep
        );
        assert!(parse("pay-commission p1 agent 10").is_err());
        assert!(parse("pay-commission p1 broker lots").is_err());
    }

    #[test]
    fn test_nested_subcommands() {
        assert_eq!(
            parse("backup restore monthly").unwrap().command,
            Command::Backup {
                action: BackupCommand::Restore { name: "monthly".into() },
            }
        );
        assert_eq!(
            parse("config show").unwrap().command,
            Command::Config {
                action: ConfigCommand::Show,
            }
        );
    }

    #[test]
    fn test_usage_errors() {
        for line in ["import", "frobnicate", "backup", "backup restore", "export --verbose", "export -o", "add widgets {}"] {
            assert!(parse(line).is_err(), "{line}");
        }
    }
}
