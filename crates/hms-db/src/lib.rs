//! # hms-db: Storage Layer for the Hospital Service
//!
//! Everything the service stores goes through the [`Store`] trait. Two
//! adapters implement it: SQLite through sqlx, and plain collections in
//! process memory.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Data Flow                                │
//! │                                                                         │
//! │  axum handler (POST /api/sales)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     hms-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ Arc<dyn Store>│    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (store.rs)   │    │ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqliteStore ──┼───►│ InventoryRepo │    │ 0001_init    │  │   │
//! │  │   │ MemoryStore   │    │ LedgerRepo    │    │              │  │   │
//! │  │   │               │    │ PatientRepo   │    │              │  │   │
//! │  │   │               │    │ UserRepo      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          SQLite file (hms.db)   or   process memory             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The `Store` trait and `StorageMode`
//! - [`sqlite`] / [`memory`] - The two adapters
//! - [`select`] - Startup store selection with in-memory fallback
//! - [`seed`] - First-run demo data
//! - [`credentials`] - Argon2 password hashing
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - SQL for each table group
//! - [`error`] - Database and store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hms_db::{select_store, StorageSettings};
//!
//! let store = select_store(&StorageSettings::default()).await?;
//! let (sale, item) = store.record_sale("Syringes (10ml)", 10, Utc::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credentials;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;
pub mod select;
pub mod sqlite;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use pool::{Database, DbConfig};
pub use seed::{seed_if_empty, SeedReport};
pub use select::{select_store, StoragePreference, StorageSettings};
pub use sqlite::SqliteStore;
pub use store::{StorageMode, Store};
