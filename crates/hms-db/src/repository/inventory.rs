//! # Inventory Repository
//!
//! Database operations for the inventory catalog.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, check, write                                       │
//! │     SELECT stock ...; (stock >= qty?) UPDATE ... SET stock = 7      │
//! │                                                                     │
//! │  ✅ CORRECT: one conditional statement                              │
//! │     UPDATE inventory_items SET stock = stock - ?1                   │
//! │     WHERE name = ?2 AND stock >= ?1                                 │
//! │                                                                     │
//! │  Two concurrent sales of 60 against stock 100:                      │
//! │  Sale A: WHERE 100 >= 60 → stock 40                                │
//! │  Sale B: WHERE  40 >= 60 → 0 rows → InsufficientStock              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult, StoreResult};
use hms_core::money::MAX_STOCK_VALUE_CENTS;
use hms_core::validation::restocked_level;
use hms_core::{CoreError, InventoryItem, Money, ValidationError, MAX_STOCK};

const ITEM_COLUMNS: &str = "id, name, stock, price_cents, category, created_at, updated_at";

/// Row shape of `inventory_items`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub id: String,
    pub name: String,
    pub stock: i64,
    pub price_cents: i64,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ItemRow> for InventoryItem {
    fn from(row: ItemRow) -> Self {
        InventoryItem {
            id: row.id,
            name: row.name,
            stock: row.stock,
            price: Money::from_cents(row.price_cents),
            category: row.category,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Lists every item in insertion order.
    pub async fn list(&self) -> DbResult<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    /// Gets an item by exact name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        find_by_name(&mut conn, name).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts a new item.
    ///
    /// ## Errors
    /// - `DuplicateItem` if the name is taken (UNIQUE index)
    pub async fn insert(&self, item: &InventoryItem) -> StoreResult<InventoryItem> {
        debug!(name = %item.name, "Inserting inventory item");

        let result = sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, name, stock, price_cents, category, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.stock)
        .bind(item.price.cents())
        .bind(&item.category)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await;

        match result.map_err(DbError::from) {
            Ok(_) => Ok(item.clone()),
            Err(DbError::UniqueViolation { .. }) => {
                Err(CoreError::DuplicateItem(item.name.clone()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Adds `quantity` units to an item's stock.
    ///
    /// The bounds are part of the UPDATE, so concurrent restocks can never
    /// push an item past `MAX_STOCK` together.
    ///
    /// ## Errors
    /// - `ItemNotFound` if no item has this name
    /// - `Validation` if the new stock, or its value, would exceed the limits
    pub async fn restock(
        &self,
        name: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<InventoryItem> {
        debug!(name = %name, quantity, "Restocking item");

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE inventory_items
            SET stock = stock + ?1, updated_at = ?3
            WHERE name = ?2
              AND stock <= ?4 - ?1
              AND price_cents * (stock + ?1) <= ?5
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(quantity)
        .bind(name)
        .bind(now)
        .bind(MAX_STOCK)
        .bind(MAX_STOCK_VALUE_CENTS)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        let mut conn = self.pool.acquire().await?;
        match find_by_name(&mut conn, name).await? {
            None => Err(CoreError::ItemNotFound(name.to_string()).into()),
            Some(item) => {
                let err = restocked_level(item.stock, item.price, quantity).err().unwrap_or(
                    ValidationError::OutOfRange {
                        field: "stock".to_string(),
                        min: 0,
                        max: MAX_STOCK,
                    },
                );
                Err(err.into())
            }
        }
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn find_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> DbResult<Option<InventoryItem>> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE name = ?1"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(InventoryItem::from))
}

/// Decrements stock by `quantity` only if at least that much is on hand.
///
/// A single conditional UPDATE, so two concurrent callers can never both
/// succeed against the same units.
///
/// ## Errors
/// - `ItemNotFound` if no item has this name
/// - `InsufficientStock` if stock < quantity (stock unchanged)
pub(crate) async fn decrement(
    conn: &mut SqliteConnection,
    name: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> StoreResult<InventoryItem> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        r#"
        UPDATE inventory_items
        SET stock = stock - ?1, updated_at = ?3
        WHERE name = ?2 AND stock >= ?1
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(quantity)
    .bind(name)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = row {
        return Ok(row.into());
    }

    // Nothing updated: tell "missing" apart from "not enough".
    match find_by_name(conn, name).await? {
        None => Err(CoreError::ItemNotFound(name.to_string()).into()),
        Some(item) => Err(CoreError::InsufficientStock {
            name: item.name,
            available: item.stock,
            requested: quantity,
        }
        .into()),
    }
}
