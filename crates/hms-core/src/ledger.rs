//! # Ledger Drafts & Filters
//!
//! Building immutable ledger entries and matching them for history views.
//!
//! A [`LedgerDraft`] is what the workflows assemble; the store turns it
//! into a [`LedgerEntry`] with [`LedgerDraft::into_entry`], which fills in
//! the id, reference and timestamp and recomputes every total.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::bill_total;
use crate::error::{CoreError, CoreResult};
use crate::types::{
    BillStatus, EntryKind, InventoryItem, LedgerEntry, LineItem, PatientRecord, PaymentMethod,
};

// =============================================================================
// Draft
// =============================================================================

/// A ledger entry that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerDraft {
    pub id: Option<String>,
    pub reference: Option<String>,
    pub kind: EntryKind,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub product_name: Option<String>,
    pub items: Vec<LineItem>,
    pub date: Option<DateTime<Utc>>,
    pub status: BillStatus,
    pub payment_method: PaymentMethod,
}

impl LedgerDraft {
    /// Sale of `quantity` units of `item` at its current price.
    pub fn sale(item: &InventoryItem, quantity: i64) -> Self {
        let line = LineItem {
            description: item.name.clone(),
            category: item.category.clone(),
            unit_price: item.price,
            quantity,
            line_total: item.price * quantity,
        };

        LedgerDraft {
            id: None,
            reference: None,
            kind: EntryKind::Sale,
            patient_id: None,
            patient_name: None,
            product_name: Some(item.name.clone()),
            items: vec![line],
            date: None,
            status: BillStatus::Paid,
            payment_method: PaymentMethod::Cash,
        }
    }

    /// Service bill for `patient`.
    pub fn bill(patient: &PatientRecord, items: Vec<LineItem>, payment_method: PaymentMethod) -> Self {
        LedgerDraft {
            id: None,
            reference: None,
            kind: EntryKind::Bill,
            patient_id: Some(patient.id.clone()),
            patient_name: Some(patient.name.clone()),
            product_name: None,
            items,
            date: None,
            status: BillStatus::Paid,
            payment_method,
        }
    }

    /// Validates the draft and finalizes it.
    ///
    /// ## Rules
    /// - At least one line item
    /// - A patient or product reference
    /// - Missing id / reference / date are assigned here
    /// - Line totals and the entry total are recomputed, never trusted
    /// - No line total or entry total above `MAX_MONEY_CENTS`
    pub fn into_entry(self, now: DateTime<Utc>) -> CoreResult<LedgerEntry> {
        if self.items.is_empty() {
            return Err(CoreError::InvalidLedgerEntry(
                "at least one line item is required".to_string(),
            ));
        }

        let has_reference = [&self.patient_id, &self.product_name]
            .iter()
            .any(|r| r.as_deref().is_some_and(|s| !s.trim().is_empty()));
        if !has_reference {
            return Err(CoreError::InvalidLedgerEntry(
                "a patient or product reference is required".to_string(),
            ));
        }

        let date = self.date.unwrap_or(now);
        let items = self
            .items
            .into_iter()
            .map(LineItem::recompute)
            .collect::<Result<Vec<LineItem>, _>>()?;
        let total = bill_total(&items)?;
        let id = self.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let reference = self
            .reference
            .unwrap_or_else(|| generate_reference(self.kind, date, &id));

        Ok(LedgerEntry {
            id,
            reference,
            kind: self.kind,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            product_name: self.product_name,
            items,
            total,
            date,
            status: self.status,
            payment_method: self.payment_method,
        })
    }
}

/// Generates a reference in format `K-YYYYMMDD-NNNN`.
///
/// ## Format
/// - K: `S` for sales, `B` for bills
/// - YYYYMMDD: entry date
/// - NNNN: derived from the entry id
///
/// ## Example
/// `B-20260131-4821`
///
/// References are for people reading receipts; the id stays the key.
pub fn generate_reference(kind: EntryKind, date: DateTime<Utc>, id: &str) -> String {
    let seq = id
        .bytes()
        .filter(u8::is_ascii_hexdigit)
        .take(8)
        .fold(0u32, |acc, b| {
            let digit = (b as char).to_digit(16).unwrap_or(0);
            acc.wrapping_mul(16).wrapping_add(digit)
        })
        % 10_000;

    format!("{}-{}-{:04}", kind.reference_prefix(), date.format("%Y%m%d"), seq)
}

// =============================================================================
// Filter
// =============================================================================

/// Criteria for querying the ledger. All fields are optional and combine
/// with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFilter {
    /// First calendar day included (UTC).
    pub from: Option<NaiveDate>,
    /// Last calendar day included (UTC).
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring over reference, id, patient and product.
    #[serde(alias = "q")]
    pub text: Option<String>,
    pub kind: Option<EntryKind>,
    pub patient_id: Option<String>,
}

impl LedgerFilter {
    /// Filter matching every entry.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only entries for `patient_id`.
    pub fn for_patient(patient_id: impl Into<String>) -> Self {
        LedgerFilter {
            patient_id: Some(patient_id.into()),
            ..Self::default()
        }
    }

    /// Checks whether `entry` satisfies every criterion.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        let day = entry.date.date_naive();

        if self.from.is_some_and(|from| day < from) {
            return false;
        }
        if self.to.is_some_and(|to| day > to) {
            return false;
        }
        if self.kind.is_some_and(|kind| kind != entry.kind) {
            return false;
        }
        if let Some(patient_id) = &self.patient_id {
            if entry.patient_id.as_deref() != Some(patient_id.as_str()) {
                return false;
            }
        }

        match self.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => {
                let needle = text.to_lowercase();
                [
                    Some(entry.reference.as_str()),
                    Some(entry.id.as_str()),
                    entry.patient_id.as_deref(),
                    entry.patient_name.as_deref(),
                    entry.product_name.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
