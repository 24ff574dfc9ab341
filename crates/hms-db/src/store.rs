//! # Store Capability
//!
//! The one interface request handlers see. Two adapters implement it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Arc<dyn Store>                                  │
//! │                              │                                          │
//! │            ┌─────────────────┴─────────────────┐                        │
//! │            ▼                                   ▼                        │
//! │   ┌─────────────────┐                 ┌─────────────────┐               │
//! │   │  SqliteStore    │                 │  MemoryStore    │               │
//! │   │  ─────────────  │                 │  ─────────────  │               │
//! │   │  sqlx pool      │                 │  RwLock<State>  │               │
//! │   │  conditional    │                 │  one write lock │               │
//! │   │  UPDATE + tx    │                 │  per operation  │               │
//! │   └─────────────────┘                 └─────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Which adapter runs is decided once at startup by
//! [`crate::select::select_store`] and never changes afterwards.
//!
//! ## Atomicity Guarantees
//! - [`Store::decrement`] never drives stock below zero, even under
//!   concurrent calls for the same item.
//! - [`Store::record_sale`] decrements and appends as one unit: either
//!   both happen or neither does.
//! - [`Store::record_login`] increments the counter and appends the
//!   history timestamp as one unit.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::StoreResult;
use hms_core::{
    InventoryItem, ItemDraft, LedgerDraft, LedgerEntry, LedgerFilter, PatientQuery,
    PatientRecord, PatientRegistration, UserAccount,
};

/// Which adapter is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Sqlite,
    Memory,
}

impl StorageMode {
    /// Human-readable label used in the startup log.
    pub fn label(&self) -> &'static str {
        match self {
            StorageMode::Sqlite => "SQLite mode",
            StorageMode::Memory => "In-memory mode",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Sqlite => write!(f, "sqlite"),
            StorageMode::Memory => write!(f, "memory"),
        }
    }
}

/// Storage capability shared by every request handler.
///
/// All methods take `now` from the caller instead of reading the clock,
/// so tests can pin time.
#[async_trait]
pub trait Store: Send + Sync {
    fn mode(&self) -> StorageMode;

    /// Checks the backing store is usable.
    async fn health_check(&self) -> bool;

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// All items in insertion order.
    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>>;

    async fn get_item(&self, name: &str) -> StoreResult<Option<InventoryItem>>;

    /// Creates an item. Fails with `DuplicateItem` if the name exists.
    async fn add_item(&self, draft: ItemDraft, now: DateTime<Utc>) -> StoreResult<InventoryItem>;

    /// Adds `quantity > 0` units.
    async fn restock(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryItem>;

    /// Removes `quantity > 0` units if at least that many are on hand.
    async fn decrement(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryItem>;

    /// Decrements stock and appends the matching sale entry as one unit.
    async fn record_sale(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<(LedgerEntry, InventoryItem)>;

    // -------------------------------------------------------------------------
    // Ledger
    // -------------------------------------------------------------------------

    /// Finalizes and appends `draft`. There is no update or delete.
    async fn append_entry(&self, draft: LedgerDraft, now: DateTime<Utc>) -> StoreResult<LedgerEntry>;

    /// Entries matching `filter`, oldest first.
    async fn query_ledger(&self, filter: &LedgerFilter) -> StoreResult<Vec<LedgerEntry>>;

    // -------------------------------------------------------------------------
    // Patients
    // -------------------------------------------------------------------------

    /// Patients matching `query`, in id order.
    async fn list_patients(&self, query: &PatientQuery) -> StoreResult<Vec<PatientRecord>>;

    async fn get_patient(&self, id: &str) -> StoreResult<Option<PatientRecord>>;

    /// Registers a patient under the next free id.
    async fn register_patient(
        &self,
        registration: PatientRegistration,
        now: DateTime<Utc>,
    ) -> StoreResult<PatientRecord>;

    /// Admitted → Discharged on `date`. A discharged patient is returned
    /// unchanged.
    async fn discharge_patient(
        &self,
        id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<PatientRecord>;

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserAccount>>;

    /// Counts one successful login for `username` at `at`.
    async fn record_login(&self, username: &str, at: DateTime<Utc>) -> StoreResult<UserAccount>;

    /// Inserts or replaces an account by username, clearing its login
    /// counter and history.
    async fn put_user(&self, account: UserAccount) -> StoreResult<()>;

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>>;
}

// =============================================================================
// Contract Tests (run against both adapters)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::MemoryStore;
    use crate::pool::DbConfig;
    use crate::sqlite::SqliteStore;
    use chrono::TimeZone;
    use hms_core::{
        BillStatus, CoreError, EntryKind, LineItem, Money, NewItem, NewPatient, PatientStatus,
        PaymentMethod, Role, UserType, ValidationError,
    };
    use std::sync::Arc;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()
    }

    async fn adapters() -> Vec<Arc<dyn Store>> {
        let sqlite = SqliteStore::connect(DbConfig::in_memory()).await.unwrap();
        vec![Arc::new(MemoryStore::new()), Arc::new(sqlite)]
    }

    fn draft(name: &str, stock: i64, price: i64) -> ItemDraft {
        NewItem::new(name, stock, Money::from_major(price), "surgical")
            .validate()
            .unwrap()
    }

    fn registration(name: &str) -> PatientRegistration {
        NewPatient {
            name: Some(name.to_string()),
            age: Some(40),
            contact: Some("555-000-0000".to_string()),
            diagnosis: Some("Observation".to_string()),
            ..NewPatient::default()
        }
        .validate()
        .unwrap()
    }

    fn account(username: &str) -> UserAccount {
        UserAccount {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: crate::credentials::hash_password("secret123").unwrap(),
            role: Role::User,
            user_type: UserType::Nurse,
            department: "general".to_string(),
            is_active: true,
            login_count: 0,
            last_login: None,
            login_history: Vec::new(),
            created_at: at(1),
        }
    }

    fn is_insufficient(err: &StoreError) -> bool {
        matches!(err.as_domain(), Some(CoreError::InsufficientStock { .. }))
    }

    #[tokio::test]
    async fn test_add_and_list_preserve_insertion_order() {
        for store in adapters().await {
            store.add_item(draft("Wheelchairs", 12, 350), at(1)).await.unwrap();
            store.add_item(draft("Antibiotics", 85, 45), at(2)).await.unwrap();

            let names: Vec<String> = store
                .list_items()
                .await
                .unwrap()
                .into_iter()
                .map(|i| i.name)
                .collect();
            assert_eq!(names, vec!["Wheelchairs", "Antibiotics"], "{}", store.mode());
        }
    }

    #[tokio::test]
    async fn test_duplicate_add_leaves_first_item() {
        for store in adapters().await {
            store.add_item(draft("Gauze", 10, 8), at(1)).await.unwrap();
            let err = store.add_item(draft("Gauze", 99, 1), at(2)).await.unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::DuplicateItem(_))));

            let item = store.get_item("Gauze").await.unwrap().unwrap();
            assert_eq!(item.stock, 10);
            assert_eq!(item.price, Money::from_major(8));
        }
    }

    #[tokio::test]
    async fn test_restock_and_decrement() {
        for store in adapters().await {
            store.add_item(draft("Masks", 5, 12), at(1)).await.unwrap();

            let item = store.restock("Masks", 10, at(2)).await.unwrap();
            assert_eq!(item.stock, 15);
            assert_eq!(item.updated_at, at(2));

            let item = store.decrement("Masks", 15, at(3)).await.unwrap();
            assert_eq!(item.stock, 0);

            let err = store.decrement("Masks", 1, at(3)).await.unwrap_err();
            assert!(is_insufficient(&err));
            assert_eq!(store.get_item("Masks").await.unwrap().unwrap().stock, 0);
        }
    }

    #[tokio::test]
    async fn test_restock_stops_at_limits() {
        use hms_core::money::MAX_MONEY_CENTS;
        use hms_core::MAX_STOCK;

        for store in adapters().await {
            let near_full = NewItem::new("Swabs", MAX_STOCK - 5, Money::from_cents(1), "disposable")
                .validate()
                .unwrap();
            store.add_item(near_full, at(1)).await.unwrap();

            let item = store.restock("Swabs", 5, at(2)).await.unwrap();
            assert_eq!(item.stock, MAX_STOCK);

            let err = store.restock("Swabs", 1, at(3)).await.unwrap_err();
            assert!(matches!(
                err.as_domain(),
                Some(CoreError::Validation(ValidationError::OutOfRange { .. }))
            ));
            let item = store.get_item("Swabs").await.unwrap().unwrap();
            assert_eq!(item.stock, MAX_STOCK);
            assert_eq!(item.updated_at, at(2));

            let pricey = NewItem::new("Scanner", 99_999_999, Money::from_cents(MAX_MONEY_CENTS), "equipment")
                .validate()
                .unwrap();
            store.add_item(pricey, at(1)).await.unwrap();
            store.restock("Scanner", 1, at(2)).await.unwrap();
            let err = store.restock("Scanner", 1, at(3)).await.unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
            assert_eq!(store.get_item("Scanner").await.unwrap().unwrap().stock, 100_000_000);
        }
    }

    #[tokio::test]
    async fn test_quantity_and_name_errors() {
        for store in adapters().await {
            store.add_item(draft("Masks", 5, 12), at(1)).await.unwrap();

            for qty in [0, -3] {
                let err = store.restock("Masks", qty, at(2)).await.unwrap_err();
                assert!(matches!(
                    err.as_domain(),
                    Some(CoreError::Validation(ValidationError::MustBePositive { .. }))
                ));
                let err = store.decrement("Masks", qty, at(2)).await.unwrap_err();
                assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
            }

            let err = store.restock("Nope", 1, at(2)).await.unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::ItemNotFound(_))));
            let err = store.decrement("Nope", 1, at(2)).await.unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::ItemNotFound(_))));
        }
    }

    #[tokio::test]
    async fn test_record_sale_scenario() {
        for store in adapters().await {
            store.add_item(draft("Syringes (10ml)", 120, 5), at(1)).await.unwrap();

            let (entry, item) = store.record_sale("Syringes (10ml)", 10, at(2)).await.unwrap();
            assert_eq!(item.stock, 110);
            assert_eq!(entry.kind, EntryKind::Sale);
            assert_eq!(entry.total, Money::from_major(50));
            assert_eq!(entry.product_name.as_deref(), Some("Syringes (10ml)"));
            assert_eq!(entry.date, at(2));

            let err = store.record_sale("Syringes (10ml)", 200, at(3)).await.unwrap_err();
            assert!(is_insufficient(&err));

            let ledger = store.query_ledger(&LedgerFilter::all()).await.unwrap();
            assert_eq!(ledger.len(), 1, "failed sale must not append");
            assert_eq!(store.get_item("Syringes (10ml)").await.unwrap().unwrap().stock, 110);
        }
    }

    #[tokio::test]
    async fn test_record_sale_unknown_item_appends_nothing() {
        for store in adapters().await {
            let err = store.record_sale("Ghost", 1, at(2)).await.unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::ItemNotFound(_))));
            assert!(store.query_ledger(&LedgerFilter::all()).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_append_entry_rules() {
        for store in adapters().await {
            let empty = LedgerDraft {
                id: None,
                reference: None,
                kind: EntryKind::Bill,
                patient_id: Some("P1001".to_string()),
                patient_name: None,
                product_name: None,
                items: vec![],
                date: None,
                status: BillStatus::Paid,
                payment_method: PaymentMethod::Cash,
            };
            let err = store.append_entry(empty.clone(), at(1)).await.unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::InvalidLedgerEntry(_))));

            let line = LineItem::new("Blood Test", "Laboratory", Money::from_major(75), 2).unwrap();
            let unreferenced = LedgerDraft {
                patient_id: None,
                items: vec![line.clone()],
                ..empty.clone()
            };
            let err = store.append_entry(unreferenced, at(1)).await.unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::InvalidLedgerEntry(_))));

            let entry = store
                .append_entry(LedgerDraft { items: vec![line], ..empty }, at(4))
                .await
                .unwrap();
            assert_eq!(entry.total, Money::from_major(150));
            assert_eq!(entry.date, at(4));
            assert!(entry.reference.starts_with("B-20260304-"));

            let stored = store.query_ledger(&LedgerFilter::all()).await.unwrap();
            assert_eq!(stored, vec![entry]);
        }
    }

    #[tokio::test]
    async fn test_query_ledger_filters() {
        for store in adapters().await {
            store.add_item(draft("Gauze", 100, 8), at(1)).await.unwrap();
            let patient = store.register_patient(registration("Emma Johnson"), at(1)).await.unwrap();

            store.record_sale("Gauze", 1, at(3)).await.unwrap();
            let line = LineItem::new("ECG", "Cardiology", Money::from_major(90), 1).unwrap();
            let bill = store
                .append_entry(LedgerDraft::bill(&patient, vec![line], PaymentMethod::Card), at(5))
                .await
                .unwrap();
            store.record_sale("Gauze", 2, at(7)).await.unwrap();

            let by_range = LedgerFilter {
                from: Some(at(4).date_naive()),
                to: Some(at(7).date_naive()),
                ..LedgerFilter::all()
            };
            assert_eq!(store.query_ledger(&by_range).await.unwrap().len(), 2);

            let by_text = LedgerFilter {
                text: Some("emma".to_string()),
                ..LedgerFilter::all()
            };
            let found = store.query_ledger(&by_text).await.unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, bill.id);
            assert_eq!(found[0].items.len(), 1);

            let by_kind = LedgerFilter {
                kind: Some(EntryKind::Sale),
                ..LedgerFilter::all()
            };
            let sales = store.query_ledger(&by_kind).await.unwrap();
            assert_eq!(sales.len(), 2);
            assert!(sales[0].date < sales[1].date);

            let by_patient = LedgerFilter::for_patient(patient.id.clone());
            assert_eq!(store.query_ledger(&by_patient).await.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_patient_registration_and_discharge() {
        for store in adapters().await {
            let first = store.register_patient(registration("John Smith"), at(1)).await.unwrap();
            let second = store.register_patient(registration("Emma Johnson"), at(1)).await.unwrap();
            assert_eq!(first.id, "P1001");
            assert_eq!(second.id, "P1002");
            assert_eq!(first.status, PatientStatus::Admitted);
            assert_eq!(first.admission_date, at(1).date_naive());

            let discharged = store
                .discharge_patient("P1002", at(9).date_naive(), at(9))
                .await
                .unwrap();
            assert_eq!(discharged.status, PatientStatus::Discharged);
            assert_eq!(discharged.discharge_date, Some(at(9).date_naive()));

            // Second discharge keeps the first date
            let again = store
                .discharge_patient("P1002", at(12).date_naive(), at(12))
                .await
                .unwrap();
            assert_eq!(again.discharge_date, Some(at(9).date_naive()));

            let err = store
                .discharge_patient("P9999", at(9).date_naive(), at(9))
                .await
                .unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::PatientNotFound(_))));

            let admitted = PatientQuery {
                status: hms_core::StatusFilter::Admitted,
                ..PatientQuery::default()
            };
            let listed = store.list_patients(&admitted).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].id, "P1001");

            let text = PatientQuery {
                text: Some("p1002".to_string()),
                ..PatientQuery::default()
            };
            assert_eq!(store.list_patients(&text).await.unwrap()[0].name, "Emma Johnson");
        }
    }

    #[tokio::test]
    async fn test_user_upsert_and_login() {
        for store in adapters().await {
            store.put_user(account("nurse")).await.unwrap();
            assert!(store.find_user("ghost").await.unwrap().is_none());

            store.record_login("nurse", at(2)).await.unwrap();
            let user = store.record_login("nurse", at(3)).await.unwrap();
            assert_eq!(user.login_count, 2);
            assert_eq!(user.last_login, Some(at(3)));
            assert_eq!(user.login_history, vec![at(2), at(3)]);

            // Reset clears the counter and history but keeps one account
            store.put_user(account("nurse")).await.unwrap();
            let users = store.list_users().await.unwrap();
            assert_eq!(users.len(), 1);
            assert_eq!(users[0].login_count, 0);
            assert!(users[0].login_history.is_empty());

            let err = store.record_login("ghost", at(3)).await.unwrap_err();
            assert!(matches!(err.as_domain(), Some(CoreError::UserNotFound(_))));
        }
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    async fn file_backed() -> (tempfile::TempDir, Vec<Arc<dyn Store>>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hms.db");
        let sqlite = SqliteStore::connect(DbConfig::new(path.to_string_lossy()))
            .await
            .unwrap();
        (dir, vec![Arc::new(MemoryStore::new()), Arc::new(sqlite)])
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let (_dir, stores) = file_backed().await;
        for store in stores {
            store.add_item(draft("Ventilators", 100, 50), at(1)).await.unwrap();

            let a = tokio::spawn({
                let store = store.clone();
                async move { store.record_sale("Ventilators", 60, at(2)).await }
            });
            let b = tokio::spawn({
                let store = store.clone();
                async move { store.record_sale("Ventilators", 60, at(2)).await }
            });
            let results = [a.await.unwrap(), b.await.unwrap()];

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{}", store.mode());
            assert!(results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(is_insufficient));

            assert_eq!(store.get_item("Ventilators").await.unwrap().unwrap().stock, 40);
            assert_eq!(store.query_ledger(&LedgerFilter::all()).await.unwrap().len(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_logins_are_all_counted() {
        const LOGINS: usize = 16;

        let (_dir, stores) = file_backed().await;
        for store in stores {
            store.put_user(account("doctor")).await.unwrap();

            let mut handles = Vec::with_capacity(LOGINS);
            for i in 0..LOGINS {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    let when = at(2) + chrono::Duration::seconds(i as i64);
                    store.record_login("doctor", when).await
                }));
            }
            for handle in handles {
                handle.await.unwrap().unwrap();
            }

            let user = store.find_user("doctor").await.unwrap().unwrap();
            assert_eq!(user.login_count, LOGINS as i64, "{}", store.mode());
            assert_eq!(user.login_history.len(), LOGINS);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_get_distinct_ids() {
        let (_dir, stores) = file_backed().await;
        for store in stores {
            let mut handles = Vec::new();
            for i in 0..8 {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    store
                        .register_patient(registration(&format!("Patient {i}")), at(1))
                        .await
                }));
            }

            let mut ids = Vec::new();
            for handle in handles {
                ids.push(handle.await.unwrap().unwrap().id);
            }
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), 8, "{}", store.mode());
        }
    }

    #[derive(Debug, Clone)]
    enum StockOp {
        Restock(i64),
        Decrement(i64),
    }

    fn stock_op() -> impl proptest::strategy::Strategy<Value = StockOp> {
        use proptest::prelude::*;
        prop_oneof![
            (1i64..50).prop_map(StockOp::Restock),
            (1i64..80).prop_map(StockOp::Decrement),
        ]
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(24))]

        /// Both adapters track `initial + restocks - sales` exactly and
        /// refuse any decrement that would take stock below zero.
        #[test]
        fn stock_matches_model_on_every_adapter(
            initial in 0i64..100,
            ops in proptest::collection::vec(stock_op(), 0..40),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                for store in adapters().await {
                    store.add_item(draft("Gauze", initial, 3), at(1)).await.unwrap();
                    let mut expected = initial;

                    for op in &ops {
                        match *op {
                            StockOp::Restock(q) => {
                                let item = store.restock("Gauze", q, at(2)).await.unwrap();
                                expected += q;
                                assert_eq!(item.stock, expected);
                            }
                            StockOp::Decrement(q) if q <= expected => {
                                let item = store.decrement("Gauze", q, at(2)).await.unwrap();
                                expected -= q;
                                assert_eq!(item.stock, expected);
                            }
                            StockOp::Decrement(q) => {
                                let err = store.decrement("Gauze", q, at(2)).await.unwrap_err();
                                assert!(is_insufficient(&err), "{:?} on {:?}", err, store.mode());
                            }
                        }

                        let stock = store.get_item("Gauze").await.unwrap().unwrap().stock;
                        assert!(stock >= 0);
                        assert_eq!(stock, expected, "{:?}", store.mode());
                    }
                }
            });
        }
    }
}
