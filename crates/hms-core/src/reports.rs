//! # Reporting Aggregations
//!
//! Read-side metrics for the dashboards and the sales report. Every
//! function here takes snapshots of the catalog and ledger and never
//! mutates anything.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  store.list_items()   store.query_ledger(all)                           │
//! │        │                      │                                         │
//! │        └──────────┬───────────┘                                         │
//! │                   ▼                                                     │
//! │   admin_dashboard() / user_dashboard() / sales_report()                │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │   AdminDashboard / UserDashboard / SalesReport (camelCase JSON)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tie Breaking
//! Ledger snapshots are ordered oldest first. Wherever two candidates
//! compare equal (best sellers, stock extrema) the first one encountered
//! wins, so results are deterministic for a given snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{EntryKind, InventoryItem, LedgerEntry};

// =============================================================================
// Settings
// =============================================================================

/// Tunables for the dashboards. Loaded from the server config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Items with `0 < stock < threshold` are "low".
    pub low_stock_threshold: i64,
    /// Size of the "recent" revenue window, in days.
    pub recent_window_days: i64,
    pub best_sellers_limit: usize,
    pub recent_sales_limit: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            low_stock_threshold: 5,
            recent_window_days: 30,
            best_sellers_limit: 3,
            recent_sales_limit: 5,
        }
    }
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// The `days` days leading up to `now`, inclusive of `now`.
    ///
    /// A span reaching past the representable range starts at
    /// `DateTime::<Utc>::MIN_UTC`.
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        let start = Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = now
            .checked_add_signed(Duration::seconds(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        DateWindow { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

// =============================================================================
// Output Shapes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockEntry {
    pub name: String,
    #[ts(type = "number")]
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BestSeller {
    pub name: String,
    #[ts(type = "number")]
    pub sold_quantity: i64,
}

/// A sale as shown in the "recent sales" list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleSummary {
    pub id: String,
    pub reference: String,
    pub product: String,
    #[ts(type = "number")]
    pub quantity: i64,
    /// Unit price at the time of sale.
    #[ts(type = "number")]
    pub price: Money,
    #[ts(type = "number")]
    pub total: Money,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

impl SaleSummary {
    fn from_entry(entry: &LedgerEntry) -> Self {
        let product = entry
            .product_name
            .clone()
            .or_else(|| entry.items.first().map(|l| l.description.clone()))
            .unwrap_or_default();

        SaleSummary {
            id: entry.id.clone(),
            reference: entry.reference.clone(),
            product,
            quantity: entry.total_quantity(),
            price: entry.items.first().map(|l| l.unit_price).unwrap_or_default(),
            total: entry.total,
            date: entry.date,
        }
    }
}

/// `GET /api/dashboard`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminDashboard {
    /// Revenue over the recent window.
    #[ts(type = "number")]
    pub total_sales: Money,
    #[ts(type = "number")]
    pub inventory_value: Money,
    pub low_stock_items: Vec<LowStockEntry>,
    pub best_sellers: Vec<BestSeller>,
    pub least_in_stock: Option<InventoryItem>,
    pub most_in_stock: Option<InventoryItem>,
    pub recent_sales: Vec<SaleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NamedQuantity {
    pub name: String,
    #[ts(type = "number")]
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NamedPrice {
    pub name: String,
    #[ts(type = "number")]
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockLevel {
    pub name: String,
    #[ts(type = "number")]
    pub stock: i64,
}

/// `GET /api/user-dashboard`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserDashboard {
    pub best_seller: NamedQuantity,
    pub our_preference: NamedPrice,
    pub recently_added: Option<InventoryItem>,
    pub low_stock_items: Vec<StockLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductSales {
    pub product: String,
    #[ts(type = "number")]
    pub quantity: i64,
    #[ts(type = "number")]
    pub revenue: Money,
}

/// `GET /api/reports/sales`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesReport {
    #[ts(type = "number")]
    pub total_revenue: Money,
    pub sales_data: Vec<ProductSales>,
}

// =============================================================================
// Aggregations
// =============================================================================

/// `Σ price * stock` over the catalog. Saturates at `i64::MAX` cents.
///
/// ## Example
/// ```rust
/// use hms_core::reports::inventory_value;
///
/// assert_eq!(inventory_value(&[]).cents(), 0);
/// ```
pub fn inventory_value(items: &[InventoryItem]) -> Money {
    items.iter().map(InventoryItem::stock_value).sum()
}

/// Items with `0 < stock < threshold`, in catalog order.
pub fn low_stock(items: &[InventoryItem], threshold: i64) -> Vec<&InventoryItem> {
    items.iter().filter(|i| i.is_low_stock(threshold)).collect()
}

/// Groups every line across `entries` by description, keeping the order
/// in which descriptions first appear.
pub fn tally_lines<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Vec<ProductSales> {
    let mut tally: Vec<ProductSales> = Vec::new();

    for line in entries.into_iter().flat_map(|e| e.items.iter()) {
        match tally.iter_mut().find(|t| t.product == line.description) {
            Some(t) => {
                t.quantity = t.quantity.saturating_add(line.quantity);
                t.revenue += line.line_total;
            }
            None => tally.push(ProductSales {
                product: line.description.clone(),
                quantity: line.quantity,
                revenue: line.line_total,
            }),
        }
    }

    tally
}

/// Top `limit` products by sold quantity. Only sale entries count.
///
/// The sort is stable, so equal quantities keep first-encountered order.
pub fn best_sellers(entries: &[LedgerEntry], limit: usize) -> Vec<BestSeller> {
    let mut tally = tally_lines(entries.iter().filter(|e| e.kind == EntryKind::Sale));
    tally.sort_by(|a, b| b.quantity.cmp(&a.quantity));

    tally
        .into_iter()
        .take(limit)
        .map(|t| BestSeller {
            name: t.product,
            sold_quantity: t.quantity,
        })
        .collect()
}

/// Sum of entry totals, optionally restricted to a window. Saturates
/// instead of wrapping.
pub fn total_revenue(entries: &[LedgerEntry], window: Option<&DateWindow>) -> Money {
    entries
        .iter()
        .filter(|e| window.map_or(true, |w| w.contains(e.date)))
        .map(|e| e.total)
        .sum()
}

/// Item with the lowest stock. First one wins on ties.
pub fn least_in_stock(items: &[InventoryItem]) -> Option<&InventoryItem> {
    items.iter().fold(None, |best, item| match best {
        Some(b) if b.stock <= item.stock => Some(b),
        _ => Some(item),
    })
}

/// Item with the highest stock. First one wins on ties.
pub fn most_in_stock(items: &[InventoryItem]) -> Option<&InventoryItem> {
    items.iter().fold(None, |best, item| match best {
        Some(b) if b.stock >= item.stock => Some(b),
        _ => Some(item),
    })
}

/// Highest-priced item. First one wins on ties.
pub fn most_expensive(items: &[InventoryItem]) -> Option<&InventoryItem> {
    items.iter().fold(None, |best, item| match best {
        Some(b) if b.price >= item.price => Some(b),
        _ => Some(item),
    })
}

/// Newest item by `created_at`. First one wins on ties.
pub fn most_recently_added(items: &[InventoryItem]) -> Option<&InventoryItem> {
    items.iter().fold(None, |best, item| match best {
        Some(b) if b.created_at >= item.created_at => Some(b),
        _ => Some(item),
    })
}

/// Newest `limit` sale entries, newest first.
pub fn recent_sales(entries: &[LedgerEntry], limit: usize) -> Vec<SaleSummary> {
    let mut sales: Vec<&LedgerEntry> = entries.iter().filter(|e| e.kind == EntryKind::Sale).collect();
    // stable: same-timestamp entries stay in ledger order before reversal
    sales.sort_by_key(|e| e.date);

    sales
        .into_iter()
        .rev()
        .take(limit)
        .map(SaleSummary::from_entry)
        .collect()
}

// =============================================================================
// Report Builders
// =============================================================================

/// Builds the admin dashboard from catalog and ledger snapshots.
pub fn admin_dashboard(
    items: &[InventoryItem],
    entries: &[LedgerEntry],
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> AdminDashboard {
    let window = DateWindow::last_days(now, settings.recent_window_days);

    AdminDashboard {
        total_sales: total_revenue(entries, Some(&window)),
        inventory_value: inventory_value(items),
        low_stock_items: low_stock(items, settings.low_stock_threshold)
            .into_iter()
            .map(|i| LowStockEntry {
                name: i.name.clone(),
                quantity: i.stock,
            })
            .collect(),
        best_sellers: best_sellers(entries, settings.best_sellers_limit),
        least_in_stock: least_in_stock(items).cloned(),
        most_in_stock: most_in_stock(items).cloned(),
        recent_sales: recent_sales(entries, settings.recent_sales_limit),
    }
}

/// Builds the staff dashboard.
pub fn user_dashboard(
    items: &[InventoryItem],
    entries: &[LedgerEntry],
    settings: &ReportSettings,
) -> UserDashboard {
    let best_seller = best_sellers(entries, 1)
        .into_iter()
        .next()
        .map(|b| NamedQuantity {
            name: b.name,
            quantity: b.sold_quantity,
        })
        .unwrap_or_else(|| NamedQuantity {
            name: "No products sold yet".to_string(),
            quantity: 0,
        });

    let our_preference = most_expensive(items)
        .map(|i| NamedPrice {
            name: i.name.clone(),
            price: i.price,
        })
        .unwrap_or_else(|| NamedPrice {
            name: "No items in inventory".to_string(),
            price: Money::zero(),
        });

    UserDashboard {
        best_seller,
        our_preference,
        recently_added: most_recently_added(items).cloned(),
        low_stock_items: low_stock(items, settings.low_stock_threshold)
            .into_iter()
            .map(|i| StockLevel {
                name: i.name.clone(),
                stock: i.stock,
            })
            .collect(),
    }
}

/// Builds the sales report over the whole ledger.
pub fn sales_report(entries: &[LedgerEntry]) -> SalesReport {
    SalesReport {
        total_revenue: total_revenue(entries, None),
        sales_data: tally_lines(entries),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
