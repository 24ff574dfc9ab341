//! # Domain Types
//!
//! Core domain types shared by the store adapters, the HTTP API and the
//! client library.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InventoryItem   │   │  LedgerEntry    │   │ PatientRecord   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id ("P1001")   │       │
//! │  │  name (unique)  │   │  reference      │   │  status         │       │
//! │  │  stock          │   │  kind           │   │  admission_date │       │
//! │  │  price          │   │  items[]        │   │  discharge_date │       │
//! │  └─────────────────┘   │  total          │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  UserAccount    │   │   EntryKind     │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  username       │   │  Sale           │   │  Cash           │       │
//! │  │  password_hash  │   │  Bill           │   │  Card           │       │
//! │  │  login_count    │   └─────────────────┘   │  Insurance      │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Every type serializes with camelCase keys, the shape the React
//! frontend already consumes. TypeScript definitions are exported with
//! `ts-rs`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Inventory Item
// =============================================================================

/// A stocked supply item (consumables, medication, equipment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name. This is the business key; lookups match it exactly.
    pub name: String,

    /// Units on hand. Never negative.
    #[ts(type = "number")]
    pub stock: i64,

    /// Unit price.
    #[ts(type = "number")]
    pub price: Money,

    /// Free-form grouping such as "surgical" or "medication".
    pub category: String,

    /// When the item was added to the catalog.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When stock last changed.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Value of the units on hand (`price * stock`).
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.price * self.stock
    }

    /// `0 < stock < threshold`. Items that are completely out of stock are
    /// not "low", they are gone.
    #[inline]
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock > 0 && self.stock < threshold
    }

    /// Checks if `quantity` units can be sold right now.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Patient
// =============================================================================

/// Admission state of a patient.
///
/// ```text
///   register ──► Admitted ──(discharge-class bill)──► Discharged
/// ```
/// There is no transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
pub enum PatientStatus {
    Admitted,
    Discharged,
}

impl PatientStatus {
    /// Lowercase label, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Admitted => "admitted",
            PatientStatus::Discharged => "discharged",
        }
    }
}

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PatientRecord {
    /// Business identifier, `"P"` followed by a sequence number.
    pub id: String,

    pub name: String,

    /// Age in years, 1 to 120.
    pub age: u8,

    pub gender: String,

    /// Phone number or other contact detail.
    pub contact: String,

    pub address: String,

    pub diagnosis: String,

    #[ts(as = "String")]
    pub admission_date: NaiveDate,

    /// Set once, by the first discharge-class bill.
    #[ts(as = "Option<String>")]
    pub discharge_date: Option<NaiveDate>,

    pub status: PatientStatus,

    /// Attending doctor, `"Unassigned"` until one is set.
    pub doctor: String,

    pub department: String,

    /// Last modification, used by the client cache for last-write-wins.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    /// Moves the patient to `Discharged` on `date`.
    ///
    /// Returns `true` if the status changed. A patient that is already
    /// discharged keeps the original discharge date.
    pub fn discharge(&mut self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        if self.status == PatientStatus::Discharged {
            return false;
        }

        self.status = PatientStatus::Discharged;
        self.discharge_date = Some(date);
        self.updated_at = now;
        true
    }

    /// Numeric part of the id (`"P1004"` → `Some(1004)`).
    pub fn sequence_number(&self) -> Option<u64> {
        self.id.strip_prefix('P').and_then(|n| n.parse().ok())
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// What produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EntryKind {
    /// Over-the-counter sale of a catalog item (stock decremented).
    Sale,
    /// Service/treatment bill for a patient (no stock involved).
    Bill,
}

impl EntryKind {
    /// Prefix used in human-readable references.
    pub fn reference_prefix(&self) -> char {
        match self {
            EntryKind::Sale => 'S',
            EntryKind::Bill => 'B',
        }
    }
}

/// Settlement state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BillStatus {
    Paid,
    Pending,
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Paid
    }
}

/// How an entry was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// One priced line on a sale or bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    /// Product name for sales, service name for bills.
    pub description: String,

    pub category: String,

    #[ts(type = "number")]
    pub unit_price: Money,

    #[ts(type = "number")]
    pub quantity: i64,

    /// Always `unit_price * quantity`.
    #[ts(type = "number")]
    pub line_total: Money,
}

/// An immutable record in the billing ledger.
///
/// Entries are only ever appended. Nothing in the system updates or
/// deletes one after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable reference, e.g. `B-20260131-0042`.
    pub reference: String,

    pub kind: EntryKind,

    /// Billed patient (bills only).
    pub patient_id: Option<String>,

    /// Patient name at billing time, kept for history search.
    pub patient_name: Option<String>,

    /// Sold product (sales only).
    pub product_name: Option<String>,

    pub items: Vec<LineItem>,

    /// Sum of all line totals.
    #[ts(type = "number")]
    pub total: Money,

    #[ts(as = "String")]
    pub date: DateTime<Utc>,

    pub status: BillStatus,

    pub payment_method: PaymentMethod,
}

impl LedgerEntry {
    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Users
// =============================================================================

/// Access level used for UI gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    User,
}

/// Staff category of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserType {
    Doctor,
    Nurse,
    Receptionist,
    Staff,
}

/// A stored user account, including the password hash.
///
/// Not serializable on purpose: use [`UserAccount::profile`] for anything
/// that leaves the process.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string. Never plaintext.
    pub password_hash: String,
    pub role: Role,
    pub user_type: UserType,
    pub department: String,
    /// Carried for future lockout support; not enforced at login.
    pub is_active: bool,
    pub login_count: i64,
    pub last_login: Option<DateTime<Utc>>,
    /// Successful login timestamps, oldest first.
    pub login_history: Vec<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Returns the public view of this account, without the password hash.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            role: self.role,
            user_type: self.user_type,
            department: self.department.clone(),
            is_active: self.is_active,
            login_count: self.login_count,
            last_login: self.last_login,
            login_history: self.login_history.clone(),
        }
    }
}

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub username: String,
    pub role: Role,
    pub user_type: UserType,
    pub department: String,
    pub is_active: bool,
    #[ts(type = "number")]
    pub login_count: i64,
    #[ts(as = "Option<String>")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(as = "Vec<String>")]
    pub login_history: Vec<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(stock: i64, price_cents: i64) -> InventoryItem {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        InventoryItem {
            id: "item-1".to_string(),
            name: "Syringes (10ml)".to_string(),
            stock,
            price: Money::from_cents(price_cents),
            category: "disposable".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    fn patient() -> PatientRecord {
        PatientRecord {
            id: "P1004".to_string(),
            name: "Sarah Wilson".to_string(),
            age: 28,
            gender: "female".to_string(),
            contact: "555-456-7890".to_string(),
            address: "101 Cedar Ln".to_string(),
            diagnosis: "Bronchitis".to_string(),
            admission_date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            discharge_date: None,
            status: PatientStatus::Admitted,
            doctor: "Unassigned".to_string(),
            department: "General".to_string(),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_stock_value_and_low_stock() {
        let i = item(120, 500);
        assert_eq!(i.stock_value().cents(), 60_000);
        assert!(!i.is_low_stock(10));

        assert!(item(3, 500).is_low_stock(5));
        assert!(!item(5, 500).is_low_stock(5));
        assert!(!item(0, 500).is_low_stock(5));
    }

    #[test]
    fn test_can_sell() {
        let i = item(10, 500);
        assert!(i.can_sell(10));
        assert!(!i.can_sell(11));
    }

    #[test]
    fn test_discharge_is_one_way_and_keeps_first_date() {
        let mut p = patient();
        let first = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let later = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();

        assert!(p.discharge(first, now));
        assert_eq!(p.status, PatientStatus::Discharged);
        assert_eq!(p.discharge_date, Some(first));

        assert!(!p.discharge(later, now));
        assert_eq!(p.discharge_date, Some(first));
    }

    #[test]
    fn test_sequence_number() {
        assert_eq!(patient().sequence_number(), Some(1004));

        let mut odd = patient();
        odd.id = "X-1".to_string();
        assert_eq!(odd.sequence_number(), None);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let json = serde_json::to_value(item(120, 500)).unwrap();
        assert_eq!(json["name"], "Syringes (10ml)");
        assert_eq!(json["price"], 5);
        assert!(json.get("createdAt").is_some());

        let json = serde_json::to_value(patient()).unwrap();
        assert_eq!(json["status"], "Admitted");
        assert!(json["dischargeDate"].is_null());
    }

    #[test]
    fn test_profile_strips_password_hash() {
        let account = UserAccount {
            id: "u1".to_string(),
            username: "nurse".to_string(),
            password_hash: "$argon2id$v=19$...".to_string(),
            role: Role::User,
            user_type: UserType::Nurse,
            department: "general".to_string(),
            is_active: true,
            login_count: 2,
            last_login: None,
            login_history: vec![],
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&account.profile()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"userType\":\"nurse\""));
        assert!(json.contains("\"loginCount\":2"));
    }
}
