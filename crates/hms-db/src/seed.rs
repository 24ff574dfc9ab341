//! # First-Run Seed Data
//!
//! Demo catalog, patients and staff accounts loaded into an empty store.
//! Each collection is seeded only when it has no rows, so a partially
//! populated database is topped up rather than duplicated.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::credentials::hash_password;
use crate::error::StoreResult;
use crate::store::Store;
use hms_core::{Money, NewItem, NewPatient, PatientQuery, Role, UserAccount, UserType};

/// name, stock, price, category
const SEED_ITEMS: &[(&str, i64, i64, &str)] = &[
    ("Surgical Bandages", 75, 15, "surgical"),
    ("Syringes (10ml)", 120, 5, "disposable"),
    ("IV Fluids (1L)", 40, 25, "medication"),
    ("Medical Gloves", 300, 10, "disposable"),
    ("Surgical Masks", 250, 12, "surgical"),
    ("Sterile Gauze", 180, 8, "surgical"),
    ("Defibrillator", 3, 2500, "emergency"),
    ("Patient Monitors", 8, 1200, "equipment"),
    ("Ventilators", 5, 5000, "emergency"),
    ("Wheelchairs", 12, 350, "equipment"),
    ("Ibuprofen (200mg)", 120, 15, "medication"),
    ("Antibiotics", 85, 45, "medication"),
    ("Blood Pressure Cuffs", 25, 70, "equipment"),
];

/// name, age, gender, diagnosis, contact, address
const SEED_PATIENTS: &[(&str, i64, &str, &str, &str, &str)] = &[
    ("John Smith", 45, "male", "Hypertension", "555-123-4567", "123 Main St"),
    ("Emma Johnson", 35, "female", "Diabetes Type 2", "555-234-5678", "456 Oak Ave"),
    ("Robert Davis", 60, "male", "Arthritis", "555-345-6789", "789 Pine Rd"),
    ("Sarah Wilson", 28, "female", "Bronchitis", "555-456-7890", "101 Cedar Ln"),
    ("Michael Brown", 52, "male", "Heart Disease", "555-567-8901", "202 Elm St"),
];

/// username, password, role, user type, department
const SEED_USERS: &[(&str, &str, Role, UserType, &str)] = &[
    ("admin", "admin123", Role::Admin, UserType::Doctor, "administration"),
    ("doctor", "doctor123", Role::User, UserType::Doctor, "cardiology"),
    ("nurse", "nurse123", Role::User, UserType::Nurse, "general"),
    ("receptionist", "reception123", Role::User, UserType::Receptionist, "frontdesk"),
];

/// What [`seed_if_empty`] inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub items: usize,
    pub patients: usize,
    pub users: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        self.items == 0 && self.patients == 0 && self.users == 0
    }
}

/// Builds a fresh account with a hashed password and no login history.
pub fn new_account(
    username: &str,
    password: &str,
    role: Role,
    user_type: UserType,
    department: &str,
    now: DateTime<Utc>,
) -> StoreResult<UserAccount> {
    Ok(UserAccount {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        password_hash: hash_password(password)?,
        role,
        user_type,
        department: department.to_string(),
        is_active: true,
        login_count: 0,
        last_login: None,
        login_history: Vec::new(),
        created_at: now,
    })
}

/// Seeds every empty collection of `store`.
pub async fn seed_if_empty(store: &dyn Store, now: DateTime<Utc>) -> StoreResult<SeedReport> {
    let mut report = SeedReport::default();

    if store.list_items().await?.is_empty() {
        for (name, stock, price, category) in SEED_ITEMS {
            let draft = NewItem::new(name, *stock, Money::from_major(*price), category).validate()?;
            store.add_item(draft, now).await?;
            report.items += 1;
        }
    }

    if store.list_patients(&PatientQuery::default()).await?.is_empty() {
        for (name, age, gender, diagnosis, contact, address) in SEED_PATIENTS {
            let form = NewPatient {
                name: Some(name.to_string()),
                age: Some(*age),
                gender: Some(gender.to_string()),
                contact: Some(contact.to_string()),
                address: Some(address.to_string()),
                diagnosis: Some(diagnosis.to_string()),
                doctor: None,
                department: None,
            };
            store.register_patient(form.validate()?, now).await?;
            report.patients += 1;
        }
    }

    if store.list_users().await?.is_empty() {
        for (username, password, role, user_type, department) in SEED_USERS {
            let account = new_account(username, password, *role, *user_type, department, now)?;
            store.put_user(account).await?;
            report.users += 1;
        }
    }

    if !report.is_empty() {
        info!(
            items = report.items,
            patients = report.patients,
            users = report.users,
            "Seeded empty store"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::verify_password;
    use crate::memory::MemoryStore;
    use crate::pool::DbConfig;
    use crate::sqlite::SqliteStore;
    use hms_core::PatientStatus;

    #[tokio::test]
    async fn test_seed_populates_memory_store() {
        let store = MemoryStore::new();
        let report = seed_if_empty(&store, Utc::now()).await.unwrap();
        assert_eq!(report, SeedReport { items: 13, patients: 5, users: 4 });

        let syringes = store.get_item("Syringes (10ml)").await.unwrap().unwrap();
        assert_eq!(syringes.stock, 120);
        assert_eq!(syringes.price, Money::from_major(5));

        let patients = store.list_patients(&PatientQuery::default()).await.unwrap();
        let ids: Vec<&str> = patients.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P1001", "P1002", "P1003", "P1004", "P1005"]);
        assert!(patients.iter().all(|p| p.status == PatientStatus::Admitted));
        assert_eq!(patients[2].diagnosis, "Arthritis");
    }

    #[tokio::test]
    async fn test_seed_is_idempotent_on_sqlite() {
        let store = SqliteStore::connect(DbConfig::in_memory()).await.unwrap();
        seed_if_empty(&store, Utc::now()).await.unwrap();

        let second = seed_if_empty(&store, Utc::now()).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.list_items().await.unwrap().len(), 13);
        assert_eq!(store.list_users().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_seeded_passwords_are_hashed() {
        let store = MemoryStore::new();
        seed_if_empty(&store, Utc::now()).await.unwrap();

        let admin = store.find_user("admin").await.unwrap().unwrap();
        assert_ne!(admin.password_hash, "admin123");
        assert!(verify_password("admin123", &admin.password_hash));
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.login_count, 0);

        let receptionist = store.find_user("receptionist").await.unwrap().unwrap();
        assert!(verify_password("reception123", &receptionist.password_hash));
        assert_eq!(receptionist.department, "frontdesk");
    }
}
