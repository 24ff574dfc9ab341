//! # Ledger Repository
//!
//! Append and query operations for the billing ledger.
//!
//! ## Append-Only
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ledger_entries ──1:N──► ledger_lines                                   │
//! │                                                                         │
//! │  INSERT  ✅                                                             │
//! │  UPDATE  ❌ trigger: RAISE(ABORT, 'ledger entries are append-only')     │
//! │  DELETE  ❌ trigger: RAISE(ABORT, 'ledger entries are append-only')     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! There is deliberately no update or delete method in this file.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use hms_core::{
    BillStatus, EntryKind, LedgerEntry, LedgerFilter, LineItem, Money, PaymentMethod,
};

#[derive(Debug, Clone, sqlx::FromRow)]
struct EntryRow {
    id: String,
    reference: String,
    kind: EntryKind,
    patient_id: Option<String>,
    patient_name: Option<String>,
    product_name: Option<String>,
    total_cents: i64,
    date: DateTime<Utc>,
    status: BillStatus,
    payment_method: PaymentMethod,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct LineRow {
    entry_id: String,
    description: String,
    category: String,
    unit_price_cents: i64,
    quantity: i64,
    line_total_cents: i64,
}

impl EntryRow {
    fn into_entry(self, items: Vec<LineItem>) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            reference: self.reference,
            kind: self.kind,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            product_name: self.product_name,
            items,
            total: Money::from_cents(self.total_cents),
            date: self.date,
            status: self.status,
            payment_method: self.payment_method,
        }
    }
}

impl From<LineRow> for LineItem {
    fn from(row: LineRow) -> Self {
        LineItem {
            description: row.description,
            category: row.category,
            unit_price: Money::from_cents(row.unit_price_cents),
            quantity: row.quantity,
            line_total: Money::from_cents(row.line_total_cents),
        }
    }
}

/// Shared WHERE clause for entry queries. Every parameter is optional:
/// ?1 from, ?2 to, ?3 kind, ?4 patient id, ?5 lowercase search text.
const FILTER_CLAUSE: &str = r#"
    (?1 IS NULL OR substr(e.date, 1, 10) >= ?1)
    AND (?2 IS NULL OR substr(e.date, 1, 10) <= ?2)
    AND (?3 IS NULL OR e.kind = ?3)
    AND (?4 IS NULL OR e.patient_id = ?4)
    AND (?5 IS NULL OR instr(lower(
            e.reference || char(31) || e.id || char(31) ||
            coalesce(e.patient_id, '') || char(31) ||
            coalesce(e.patient_name, '') || char(31) ||
            coalesce(e.product_name, '')
        ), ?5) > 0)
"#;

/// Repository for ledger database operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Appends one finalized entry and its lines atomically.
    pub async fn append(&self, entry: &LedgerEntry) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        insert_entry(&mut tx, entry).await?;
        tx.commit().await.map_err(DbError::transaction)?;
        Ok(())
    }

    /// Returns entries matching `filter`, oldest first.
    pub async fn query(&self, filter: &LedgerFilter) -> DbResult<Vec<LedgerEntry>> {
        let text = filter
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let entries = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT e.id, e.reference, e.kind, e.patient_id, e.patient_name,
                   e.product_name, e.total_cents, e.date, e.status, e.payment_method
            FROM ledger_entries e
            WHERE {FILTER_CLAUSE}
            ORDER BY e.date, e.seq
            "#
        ))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.kind)
        .bind(filter.patient_id.as_deref())
        .bind(text.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, LineRow>(&format!(
            r#"
            SELECT l.entry_id, l.description, l.category, l.unit_price_cents,
                   l.quantity, l.line_total_cents
            FROM ledger_lines l
            JOIN ledger_entries e ON e.id = l.entry_id
            WHERE {FILTER_CLAUSE}
            ORDER BY l.entry_id, l.line_no
            "#
        ))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.kind)
        .bind(filter.patient_id.as_deref())
        .bind(text.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let mut by_entry: HashMap<String, Vec<LineItem>> = HashMap::new();
        for line in lines {
            by_entry
                .entry(line.entry_id.clone())
                .or_default()
                .push(line.into());
        }

        debug!(count = entries.len(), "Ledger query");

        Ok(entries
            .into_iter()
            .map(|row| {
                let items = by_entry.remove(&row.id).unwrap_or_default();
                row.into_entry(items)
            })
            .collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Inserts an entry and its lines on an existing connection or transaction.
pub(crate) async fn insert_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
    debug!(id = %entry.id, reference = %entry.reference, "Appending ledger entry");

    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, reference, kind, patient_id, patient_name, product_name,
            total_cents, date, status, payment_method
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.reference)
    .bind(entry.kind)
    .bind(entry.patient_id.as_deref())
    .bind(entry.patient_name.as_deref())
    .bind(entry.product_name.as_deref())
    .bind(entry.total.cents())
    .bind(entry.date)
    .bind(entry.status)
    .bind(entry.payment_method)
    .execute(&mut *conn)
    .await?;

    for (line_no, line) in entry.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO ledger_lines (
                entry_id, line_no, description, category,
                unit_price_cents, quantity, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.id)
        .bind(line_no as i64)
        .bind(&line.description)
        .bind(&line.category)
        .bind(line.unit_price.cents())
        .bind(line.quantity)
        .bind(line.line_total.cents())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
