//! # In-Memory Store
//!
//! Process-local adapter used when no database is reachable, or when
//! memory mode is configured.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RwLock<State>                                                          │
//! │                                                                         │
//! │  reads  (list, get, query)      → shared read guard                     │
//! │  writes (sale, login, register) → one exclusive write guard for the     │
//! │                                   whole check-then-write sequence       │
//! │                                                                         │
//! │  record_sale:  lock ─► check stock ─► decrement ─► append ─► unlock     │
//! │                nothing is observable between the steps                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;
use crate::store::{StorageMode, Store};
use hms_core::patients::next_patient_id;
use hms_core::validation::{restocked_level, validate_quantity};
use hms_core::{
    CoreError, InventoryItem, ItemDraft, LedgerDraft, LedgerEntry, LedgerFilter, PatientQuery,
    PatientRecord, PatientRegistration, UserAccount,
};

#[derive(Debug, Default)]
struct State {
    items: Vec<InventoryItem>,
    ledger: Vec<LedgerEntry>,
    patients: Vec<PatientRecord>,
    users: Vec<UserAccount>,
}

impl State {
    fn item_mut(&mut self, name: &str) -> StoreResult<&mut InventoryItem> {
        self.items
            .iter_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| CoreError::ItemNotFound(name.to_string()).into())
    }

    fn decrement(&mut self, name: &str, quantity: i64, now: DateTime<Utc>) -> StoreResult<InventoryItem> {
        validate_quantity(quantity)?;
        let item = self.item_mut(name)?;

        if !item.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                name: item.name.clone(),
                available: item.stock,
                requested: quantity,
            }
            .into());
        }

        item.stock -= quantity;
        item.updated_at = now;
        Ok(item.clone())
    }

    /// Ledger is kept sorted by date; equal dates keep append order.
    fn append(&mut self, entry: LedgerEntry) {
        let at = self.ledger.partition_point(|e| e.date <= entry.date);
        self.ledger.insert(at, entry);
    }
}

/// [`Store`] backed by plain collections behind one async lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Memory
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>> {
        Ok(self.state.read().await.items.clone())
    }

    async fn get_item(&self, name: &str) -> StoreResult<Option<InventoryItem>> {
        let state = self.state.read().await;
        Ok(state.items.iter().find(|i| i.name == name).cloned())
    }

    async fn add_item(&self, draft: ItemDraft, now: DateTime<Utc>) -> StoreResult<InventoryItem> {
        let mut state = self.state.write().await;

        if state.items.iter().any(|i| i.name == draft.name) {
            return Err(CoreError::DuplicateItem(draft.name).into());
        }

        let item = draft.into_item(now);
        debug!(name = %item.name, "Inserting inventory item");
        state.items.push(item.clone());
        Ok(item)
    }

    async fn restock(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryItem> {
        validate_quantity(quantity)?;
        let mut state = self.state.write().await;
        let item = state.item_mut(name)?;
        item.stock = restocked_level(item.stock, item.price, quantity)?;
        item.updated_at = now;
        Ok(item.clone())
    }

    async fn decrement(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryItem> {
        self.state.write().await.decrement(name, quantity, now)
    }

    async fn record_sale(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<(LedgerEntry, InventoryItem)> {
        validate_quantity(quantity)?;
        let mut state = self.state.write().await;

        // Build the entry before touching stock so a bad draft changes nothing.
        let current = state
            .items
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| CoreError::ItemNotFound(name.to_string()))?;
        let entry = LedgerDraft::sale(current, quantity).into_entry(now)?;

        let item = state.decrement(name, quantity, now)?;
        state.append(entry.clone());
        Ok((entry, item))
    }

    async fn append_entry(&self, draft: LedgerDraft, now: DateTime<Utc>) -> StoreResult<LedgerEntry> {
        let entry = draft.into_entry(now)?;
        debug!(id = %entry.id, reference = %entry.reference, "Appending ledger entry");
        self.state.write().await.append(entry.clone());
        Ok(entry)
    }

    async fn query_ledger(&self, filter: &LedgerFilter) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state
            .ledger
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn list_patients(&self, query: &PatientQuery) -> StoreResult<Vec<PatientRecord>> {
        let state = self.state.read().await;
        Ok(state
            .patients
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }

    async fn get_patient(&self, id: &str) -> StoreResult<Option<PatientRecord>> {
        let state = self.state.read().await;
        Ok(state.patients.iter().find(|p| p.id == id).cloned())
    }

    async fn register_patient(
        &self,
        registration: PatientRegistration,
        now: DateTime<Utc>,
    ) -> StoreResult<PatientRecord> {
        let mut state = self.state.write().await;
        let id = next_patient_id(state.patients.iter().map(|p| p.id.as_str()));
        let patient = registration.admit(id, now);
        debug!(id = %patient.id, "Registered patient");
        state.patients.push(patient.clone());
        Ok(patient)
    }

    async fn discharge_patient(
        &self,
        id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<PatientRecord> {
        let mut state = self.state.write().await;
        let patient = state
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::PatientNotFound(id.to_string()))?;

        if patient.discharge(date, now) {
            debug!(id = %id, %date, "Patient discharged");
        }
        Ok(patient.clone())
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserAccount>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn record_login(&self, username: &str, at: DateTime<Utc>) -> StoreResult<UserAccount> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| CoreError::UserNotFound(username.to_string()))?;

        user.login_count += 1;
        user.last_login = Some(at);
        user.login_history.push(at);
        debug!(username = %username, "Login recorded");
        Ok(user.clone())
    }

    async fn put_user(&self, mut account: UserAccount) -> StoreResult<()> {
        account.login_count = 0;
        account.last_login = None;
        account.login_history.clear();

        let mut state = self.state.write().await;
        match state.users.iter_mut().find(|u| u.username == account.username) {
            Some(existing) => {
                account.id = existing.id.clone();
                account.created_at = existing.created_at;
                *existing = account;
            }
            None => state.users.push(account),
        }
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        Ok(self.state.read().await.users.clone())
    }
}
