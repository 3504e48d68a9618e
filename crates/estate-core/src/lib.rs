//! # estate-core: Pure Reconciliation Logic for Estate CRM
//!
//! This crate is the **heart** of Estate CRM. It contains the data
//! reconciliation and import/merge engine as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Estate CRM Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Front ends (estate-cli, form-driven UI)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌──────────────┐  ┌───────────▼──────────┐  ┌──────────────────────┐  │
//! │  │estate-sheets │  │    estate-store      │  │   estate-remote      │  │
//! │  │ xlsx / csv   │  │ Store (local k/v)    │  │ RemoteStore (REST)   │  │
//! │  └──────┬───────┘  └───────────┬──────────┘  └──────────┬───────────┘  │
//! │         │                      │                        │              │
//! │  ┌──────▼──────────────────────▼────────────────────────▼───────────┐  │
//! │  │               ★ estate-core (THIS CRATE) ★                        │  │
//! │  │                                                                   │  │
//! │  │  schema ─► filter ─► reconcile ─► enrich      migrate (V1..V4)   │  │
//! │  │  normalize          import pipeline           commission, master │  │
//! │  │                                                                   │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS             │  │
//! │  └───────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity records (Customer, Broker, Project, Receipt, ...)
//! - [`dataset`] - `CrmData` and `EntityKind`
//! - [`schema`] - Required / optional / nested field sets per entity
//! - [`filter`] - Field filter (reject on missing required, strip unknown)
//! - [`normalize`] - Alias resolution and value coercion
//! - [`reconcile`] - Replace / merge reconciliation
//! - [`enrich`] - Denormalized names and receipt numbers
//! - [`migrate`] - Legacy dataset migration
//! - [`import`] - The end-to-end import pipeline
//! - [`commission`] - Commission settlement and accruals
//! - [`master`] - Master-project aggregation
//! - [`schedule`] - Installment schedules
//! - [`validation`] - Field validators for spreadsheet rows
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic apart from generated IDs and timestamps
//! 2. **No I/O**: storage, network and file access live in sibling crates
//! 3. **Never Throw Mid-Pipeline**: rejected records are counted, not raised
//!
//! ## Example Usage
//!
//! ```rust
//! use estate_core::import::{import_json, ImportOptions};
//! use estate_core::CrmData;
//!
//! let backup = r#"{
//!     "customers": [{"id": "c1", "type": "broker", "name": "Ali", "phone": "0300"}]
//! }"#;
//!
//! let outcome = import_json(backup, CrmData::default(), ImportOptions::merge()).unwrap();
//! assert_eq!(outcome.data.brokers[0].name, "Ali");
//! assert_eq!(outcome.data.brokers[0].commission_rate, 1.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commission;
pub mod dataset;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod ids;
pub mod import;
pub mod master;
pub mod migrate;
pub mod normalize;
pub mod reconcile;
pub mod schedule;
pub mod schema;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use dataset::{CrmData, EntityKind, CURRENT_VERSION};
pub use error::{CoreError, CoreResult, ValidationError};
pub use import::{ImportOptions, ImportOutcome, ImportSummary};
pub use reconcile::ImportMode;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Commission percentage used when none is recorded.
///
/// ## Business Reason
/// A missing rate must never silently mean zero commission when a broker
/// is attached to a sale.
pub const DEFAULT_COMMISSION_RATE: f64 = 1.0;

/// Default rate of pre-3.0 datasets, rewritten to [`DEFAULT_COMMISSION_RATE`]
/// during migration.
pub const LEGACY_DEFAULT_COMMISSION_RATE: f64 = 2.5;
