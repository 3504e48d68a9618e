//! # Seed Data Generator
//!
//! Populates a local database with a small, realistic CRM dataset for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./estate_dev.db
//! cargo run -p estate-store --bin seed
//!
//! # More customers per society
//! cargo run -p estate-store --bin seed -- --count 12
//!
//! # Specify database path
//! cargo run -p estate-store --bin seed -- --db ./data/estate.db
//! ```
//!
//! ## Generated Data
//! - Brokers and one company representative
//! - Plot and shop inventory across three societies
//! - Customers, each buying one unit on monthly installments
//! - A down-payment receipt per sale

use chrono::{Months, NaiveDate};
use estate_core::master::refresh_master_projects;
use estate_core::schedule::{generate_installments, PaymentCycle};
use estate_core::{CrmData, EntityKind, InventoryStatus};
use estate_store::{Database, DbConfig, Store};
use serde_json::json;
use std::env;
use tracing_subscriber::EnvFilter;

/// Societies with their blocks.
const SOCIETIES: &[(&str, &[&str])] = &[
    ("Lake City", &["A", "B", "C"]),
    ("Bahria Orchard", &["Overseas", "Eastern"]),
    ("DHA Phase 9", &["Prism", "Town"]),
];

const CUSTOMER_NAMES: &[&str] = &[
    "Ali Raza",
    "Sara Malik",
    "Bilal Ahmed",
    "Ayesha Khan",
    "Usman Tariq",
    "Hina Javed",
    "Faisal Iqbal",
    "Zainab Qureshi",
    "Hamza Sheikh",
    "Maryam Butt",
];

/// Brokers with their commission rates (percent).
const BROKERS: &[(&str, f64)] = &[("Kamran Estates", 1.0), ("Prime Realtors", 1.5), ("City Links", 2.0)];

/// Plot sizes in marlas.
const SIZES: &[f64] = &[3.0, 5.0, 7.0, 10.0, 20.0];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,estate=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 4;
    let mut db_path = String::from("./estate_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(4);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Estate CRM Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Customers per society (default: 4)");
                println!("  -d, --db <PATH>    Database file path (default: ./estate_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Estate CRM Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Customers per society: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let store = Store::new(db.kv_store());
    println!("✓ Connected to database");

    let existing = store.load().await?;
    if existing.total_records() > 0 {
        println!("⚠ Database already has {} records", existing.total_records());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut data = generate(count)?;
    refresh_master_projects(&mut data);
    store.save(&mut data).await?;

    println!();
    for kind in EntityKind::ALL {
        println!("  {:<20} {}", kind.key(), data.count(kind));
    }
    println!();
    println!("✓ Seeded {} records in {:?}", data.total_records(), start.elapsed());

    Ok(())
}

/// Builds the dataset through the same path as manual entry.
fn generate(count: usize) -> Result<CrmData, Box<dyn std::error::Error>> {
    let mut data = CrmData::default();
    let start = NaiveDate::from_ymd_opt(2024, 1, 10).ok_or("invalid start date")?;

    let mut broker_ids = Vec::new();
    for (idx, (name, rate)) in BROKERS.iter().enumerate() {
        let id = data.upsert_value(
            EntityKind::Brokers,
            json!({
                "name": name,
                "phone": format!("0300-55{:05}", idx * 37),
                "commissionRate": rate,
            }),
        )?;
        broker_ids.push(id);
    }
    let rep_id = data.upsert_value(
        EntityKind::Brokers,
        json!({"name": "Nadia Company Rep", "phone": "0321-4000000", "commissionRate": 0.5}),
    )?;

    let mut seed = 0usize;
    for (society, blocks) in SOCIETIES {
        for (block_idx, block) in blocks.iter().enumerate() {
            for unit in 1..=(count + 2) {
                let marlas = SIZES[(seed + unit) % SIZES.len()];
                let rate = 150_000.0 + ((seed * 7_919) % 10) as f64 * 25_000.0;
                let unit_type = if block_idx == 0 && unit % 5 == 0 { "commercial" } else { "residential" };
                data.upsert_value(
                    EntityKind::Inventory,
                    json!({
                        "projectName": society,
                        "block": block,
                        "unitShopNumber": format!("{}-{}", block, 100 + unit),
                        "unitType": unit_type,
                        "marlas": marlas,
                        "ratePerMarla": rate,
                        "totalValue": marlas * rate,
                        "plotFeatures": if unit % 3 == 0 { json!(["corner"]) } else { json!([]) },
                    }),
                )?;
                seed += 1;
            }
        }
    }

    for (society_idx, (society, _)) in SOCIETIES.iter().enumerate() {
        for n in 0..count {
            let name = CUSTOMER_NAMES[(society_idx * count + n) % CUSTOMER_NAMES.len()];
            let customer_id = data.upsert_value(
                EntityKind::Customers,
                json!({
                    "name": name,
                    "phone": format!("0333-{:07}", 1_000_000 + society_idx * 1_000 + n),
                    "status": "active",
                }),
            )?;

            let Some(unit) = data
                .inventory
                .iter_mut()
                .find(|item| item.project_name == *society && item.customer_id.is_none())
            else {
                break;
            };
            let sale = unit.total_value.unwrap_or_default();
            let unit_number = unit.unit_shop_number.clone();
            let block = unit.block.clone();
            let marlas = unit.marlas;
            let rate = unit.rate_per_marla;
            unit.customer_id = Some(customer_id.clone());
            let unit_id = unit.id.clone();

            let first_due = start
                .checked_add_months(Months::new((n % 6) as u32))
                .ok_or("date out of range")?;
            let down_payment = (sale * 0.2).round();
            let installments = generate_installments(sale - down_payment, 24, first_due, PaymentCycle::Monthly);
            let broker_id = &broker_ids[n % broker_ids.len()];

            let project_id = data.upsert_value(
                EntityKind::Projects,
                json!({
                    "customerId": customer_id,
                    "name": society,
                    "block": block,
                    "unit": unit_number,
                    "marlas": marlas,
                    "ratePerMarla": rate,
                    "sale": sale,
                    "received": down_payment,
                    "brokerId": broker_id,
                    "companyRepId": rep_id,
                    "installments": installments,
                    "installmentCount": 24,
                    "status": "active",
                }),
            )?;

            if let Some(item) = data.inventory.iter_mut().find(|item| item.id == unit_id) {
                item.project_id = Some(project_id.clone());
                item.status = InventoryStatus::Sold;
            }

            data.upsert_value(
                EntityKind::Receipts,
                json!({
                    "customerId": customer_id,
                    "projectId": project_id,
                    "amount": down_payment,
                    "date": first_due.format("%Y-%m-%d").to_string(),
                    "method": "bank_transfer",
                    "notes": "Down payment",
                }),
            )?;
        }
    }

    Ok(data)
}
