//! # Repositories
//!
//! One repository per table group. Each holds a clone of the pool; methods
//! that must share a transaction take a `&mut SqliteConnection` instead.

pub mod inventory;
pub mod ledger;
pub mod patient;
pub mod user;

pub use inventory::InventoryRepository;
pub use ledger::LedgerRepository;
pub use patient::PatientRepository;
pub use user::UserRepository;
