//! # SQLite Store
//!
//! [`Store`] adapter over the sqlx repositories.
//!
//! Multi-step operations share one transaction:
//!
//! ```text
//! record_sale:   BEGIN
//!                  UPDATE inventory_items ... WHERE stock >= qty RETURNING
//!                  INSERT ledger_entries / ledger_lines
//!                COMMIT            (any error → ROLLBACK on drop)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::error::{DbError, StoreResult};
use crate::pool::{Database, DbConfig};
use crate::repository::{inventory, ledger};
use crate::store::{StorageMode, Store};
use hms_core::validation::validate_quantity;
use hms_core::{
    InventoryItem, ItemDraft, LedgerDraft, LedgerEntry, LedgerFilter, PatientQuery,
    PatientRecord, PatientRegistration, UserAccount,
};

/// [`Store`] backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Wraps an open database.
    pub fn new(db: Database) -> Self {
        SqliteStore { db }
    }

    /// Opens (and migrates) the database described by `config`.
    pub async fn connect(config: DbConfig) -> StoreResult<Self> {
        let db = Database::new(config).await?;
        Ok(SqliteStore { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Sqlite
    }

    async fn health_check(&self) -> bool {
        self.db.health_check().await
    }

    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>> {
        Ok(self.db.inventory().list().await?)
    }

    async fn get_item(&self, name: &str) -> StoreResult<Option<InventoryItem>> {
        Ok(self.db.inventory().get_by_name(name).await?)
    }

    async fn add_item(&self, draft: ItemDraft, now: DateTime<Utc>) -> StoreResult<InventoryItem> {
        let item = draft.into_item(now);
        self.db.inventory().insert(&item).await
    }

    async fn restock(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryItem> {
        validate_quantity(quantity)?;
        self.db.inventory().restock(name, quantity, now).await
    }

    async fn decrement(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryItem> {
        validate_quantity(quantity)?;
        let mut conn = self.db.pool().acquire().await?;
        inventory::decrement(&mut conn, name, quantity, now).await
    }

    async fn record_sale(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<(LedgerEntry, InventoryItem)> {
        validate_quantity(quantity)?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::transaction)?;

        let item = inventory::decrement(&mut tx, name, quantity, now).await?;

        // The RETURNING row carries the post-sale stock; the price and
        // category are what the sale was made at.
        let entry = LedgerDraft::sale(&item, quantity).into_entry(now)?;
        ledger::insert_entry(&mut tx, &entry).await?;

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(item = %name, quantity, reference = %entry.reference, "Sale committed");
        Ok((entry, item))
    }

    async fn append_entry(&self, draft: LedgerDraft, now: DateTime<Utc>) -> StoreResult<LedgerEntry> {
        let entry = draft.into_entry(now)?;
        self.db.ledger().append(&entry).await?;
        Ok(entry)
    }

    async fn query_ledger(&self, filter: &LedgerFilter) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self.db.ledger().query(filter).await?)
    }

    async fn list_patients(&self, query: &PatientQuery) -> StoreResult<Vec<PatientRecord>> {
        Ok(self.db.patients().list(query).await?)
    }

    async fn get_patient(&self, id: &str) -> StoreResult<Option<PatientRecord>> {
        Ok(self.db.patients().get_by_id(id).await?)
    }

    async fn register_patient(
        &self,
        registration: PatientRegistration,
        now: DateTime<Utc>,
    ) -> StoreResult<PatientRecord> {
        Ok(self.db.patients().register(registration, now).await?)
    }

    async fn discharge_patient(
        &self,
        id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<PatientRecord> {
        self.db.patients().discharge(id, date, now).await
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserAccount>> {
        Ok(self.db.users().find(username).await?)
    }

    async fn record_login(&self, username: &str, at: DateTime<Utc>) -> StoreResult<UserAccount> {
        self.db.users().record_login(username, at).await
    }

    async fn put_user(&self, account: UserAccount) -> StoreResult<()> {
        info!(username = %account.username, "Writing user account");
        Ok(self.db.users().upsert(&account).await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        Ok(self.db.users().list().await?)
    }
}
