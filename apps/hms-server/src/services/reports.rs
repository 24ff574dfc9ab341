//! Dashboard and report builders: load one snapshot of the catalog and
//! ledger, then hand both to the pure functions in `hms_core::reports`.

use chrono::{DateTime, Utc};

use hms_core::reports::{self, AdminDashboard, SalesReport, UserDashboard};
use hms_core::{InventoryItem, LedgerEntry, LedgerFilter, ReportSettings};
use hms_db::{Store, StoreResult};

async fn snapshot(store: &dyn Store) -> StoreResult<(Vec<InventoryItem>, Vec<LedgerEntry>)> {
    let items = store.list_items().await?;
    let entries = store.query_ledger(&LedgerFilter::all()).await?;
    Ok((items, entries))
}

pub async fn admin_dashboard(
    store: &dyn Store,
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> StoreResult<AdminDashboard> {
    let (items, entries) = snapshot(store).await?;
    Ok(reports::admin_dashboard(&items, &entries, settings, now))
}

pub async fn user_dashboard(store: &dyn Store, settings: &ReportSettings) -> StoreResult<UserDashboard> {
    let (items, entries) = snapshot(store).await?;
    Ok(reports::user_dashboard(&items, &entries, settings))
}

pub async fn sales_report(store: &dyn Store) -> StoreResult<SalesReport> {
    let entries = store.query_ledger(&LedgerFilter::all()).await?;
    Ok(reports::sales_report(&entries))
}

/// Items with `0 < stock < threshold`, in catalog order.
pub async fn low_stock(store: &dyn Store, threshold: i64) -> StoreResult<Vec<InventoryItem>> {
    let items = store.list_items().await?;
    Ok(reports::low_stock(&items, threshold)
        .into_iter()
        .cloned()
        .collect())
}
