//! # Sale Workflow
//!
//! ```text
//! process_sale("Syringes (10ml)", 10)
//!      │
//!      ├─ validate name + quantity            → ValidationError
//!      ├─ store.record_sale (one unit)        → ItemNotFound / InsufficientStock
//!      │     decrement stock
//!      │     append sale entry (price * quantity)
//!      └─ snapshot catalog for the response
//! ```

use chrono::{DateTime, Utc};
use tracing::info;

use hms_core::validation::{require_text, validate_quantity};
use hms_core::{InventoryItem, LedgerEntry};
use hms_db::{Store, StoreResult};

/// Result of a completed sale.
#[derive(Debug, Clone)]
pub struct SaleOutcome {
    pub sale: LedgerEntry,
    /// The sold item after the decrement.
    pub item: InventoryItem,
    /// Catalog snapshot taken after the sale.
    pub inventory: Vec<InventoryItem>,
}

/// Sells `quantity` units of `product_name`.
///
/// Stock and ledger change together or not at all.
pub async fn process_sale(
    store: &dyn Store,
    product_name: Option<&str>,
    quantity: Option<i64>,
    now: DateTime<Utc>,
) -> StoreResult<SaleOutcome> {
    let name = require_text("productName", product_name)?;
    let quantity = quantity.ok_or_else(|| hms_core::ValidationError::required("quantity"))?;
    validate_quantity(quantity)?;

    let (sale, item) = store.record_sale(&name, quantity, now).await?;

    info!(
        item = %name,
        quantity,
        total = %sale.total,
        remaining = item.stock,
        "Sale processed"
    );

    let inventory = store.list_items().await?;
    Ok(SaleOutcome {
        sale,
        item,
        inventory,
    })
}
