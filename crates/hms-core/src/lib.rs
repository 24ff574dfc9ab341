//! # hms-core: Pure Domain Logic for the Hospital Service
//!
//! Every business rule of the hospital backend lives here as plain
//! functions and value types with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        HMS Architecture                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        React SPA / hms-client (resolver + offline cache)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    hms-server (axum)                            │   │
//! │  │    /api/auth  /api/inventory  /api/sales  /api/billing  ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ hms-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ billing │ │ reports │ │ patients│  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐               │   │
//! │  │   │ ledger  │ │ catalog │ │  valid  │ │  cache  │               │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘               │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           hms-db (Store trait, SQLite + in-memory)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InventoryItem, PatientRecord, LedgerEntry, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//! - [`catalog`] - Add-item validation
//! - [`billing`] - Service catalog, line pricing, discharge detection
//! - [`ledger`] - Ledger drafts, references and filters
//! - [`patients`] - Registration and patient search
//! - [`reports`] - Dashboard and report aggregations
//! - [`cache`] - Last-write-wins merge for offline copies
//!
//! ## Example Usage
//!
//! ```rust
//! use hms_core::billing::{bill_total, resolve_line, BillLine};
//!
//! let lines = vec![
//!     resolve_line(&BillLine::service("Consultation", 1)).unwrap(),
//!     resolve_line(&BillLine::service("Blood Test", 2)).unwrap(),
//! ];
//!
//! // $50 + 2 x $75
//! assert_eq!(bill_total(&lines).unwrap().cents(), 20_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod ledger;
pub mod money;
pub mod patients;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{ItemDraft, NewItem};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{LedgerDraft, LedgerFilter};
pub use money::Money;
pub use patients::{NewPatient, PatientQuery, PatientRegistration, StatusFilter};
pub use reports::ReportSettings;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted for one sale, restock or bill line.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Largest stock level accepted when adding an item.
pub const MAX_STOCK: i64 = 1_000_000_000;

/// Maximum length of names and other free-text fields.
pub const MAX_NAME_LEN: usize = 200;

pub const MIN_AGE: i64 = 1;
pub const MAX_AGE: i64 = 120;

/// Category assigned to catalog items added without one.
pub const DEFAULT_CATEGORY: &str = "general";

pub const UNASSIGNED_DOCTOR: &str = "Unassigned";

pub const DEFAULT_DEPARTMENT: &str = "General";

// =============================================================================
// Property Tests
// =============================================================================
