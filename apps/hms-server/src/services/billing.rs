//! # Billing Workflow
//!
//! Service bills for patients, and the discharge side effect.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. resolve + validate lines        (nothing written yet)               │
//! │  2. load patient                    (PatientNotFound → nothing written) │
//! │  3. append bill to ledger           ◄── authoritative record            │
//! │  4. discharge patient, if any line is a discharge-class service         │
//! │                                                                         │
//! │  Crash between 3 and 4: bill exists, patient still Admitted.            │
//! │  reconcile_discharges() at the next start finishes step 4.              │
//! │  The reverse (discharged without a bill) cannot happen.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use hms_core::billing::{requires_discharge, resolve_line, BillLine};
use hms_core::validation::require_text;
use hms_core::{
    CoreError, EntryKind, LedgerDraft, LedgerEntry, LedgerFilter, LineItem, PatientRecord,
    PatientStatus, PaymentMethod, ValidationError,
};
use hms_db::{Store, StoreResult};

/// `POST /api/billing` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRequest {
    pub patient_id: Option<String>,
    #[serde(default)]
    pub items: Vec<BillLine>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone)]
pub struct BillOutcome {
    pub bill: LedgerEntry,
    /// The patient after any discharge.
    pub patient: PatientRecord,
}

/// Generates a bill and applies the discharge transition if required.
pub async fn generate_bill(
    store: &dyn Store,
    request: BillRequest,
    now: DateTime<Utc>,
) -> StoreResult<BillOutcome> {
    let patient_id = require_text("patientId", request.patient_id.as_deref())?;
    if request.items.is_empty() {
        return Err(ValidationError::required("items").into());
    }

    let lines = request
        .items
        .iter()
        .map(resolve_line)
        .collect::<Result<Vec<LineItem>, _>>()?;

    let patient = store
        .get_patient(&patient_id)
        .await?
        .ok_or_else(|| CoreError::PatientNotFound(patient_id.clone()))?;

    let discharge = requires_discharge(&lines);
    let draft = LedgerDraft::bill(&patient, lines, request.payment_method.unwrap_or_default());
    let bill = store.append_entry(draft, now).await?;

    info!(
        reference = %bill.reference,
        patient = %patient.id,
        total = %bill.total,
        "Bill generated"
    );

    let patient = if discharge {
        store
            .discharge_patient(&patient.id, bill.date.date_naive(), now)
            .await?
    } else {
        patient
    };

    Ok(BillOutcome { bill, patient })
}

/// Re-applies discharges for discharge-class bills whose patient is still
/// admitted. Returns how many patients were discharged.
pub async fn reconcile_discharges(store: &dyn Store, now: DateTime<Utc>) -> StoreResult<usize> {
    let bills = store
        .query_ledger(&LedgerFilter {
            kind: Some(EntryKind::Bill),
            ..LedgerFilter::all()
        })
        .await?;

    let mut repaired = 0;
    for bill in bills.iter().filter(|b| requires_discharge(&b.items)) {
        let Some(patient_id) = bill.patient_id.as_deref() else {
            continue;
        };

        match store.get_patient(patient_id).await? {
            Some(patient) if patient.status == PatientStatus::Admitted => {
                store
                    .discharge_patient(patient_id, bill.date.date_naive(), now)
                    .await?;
                warn!(patient = %patient_id, bill = %bill.reference, "Applied missed discharge");
                repaired += 1;
            }
            Some(_) => {}
            None => warn!(patient = %patient_id, bill = %bill.reference, "Bill references unknown patient"),
        }
    }

    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hms_core::{Money, NewPatient};
    use hms_db::MemoryStore;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, 14, 30, 0).unwrap()
    }

    async fn store_with_patient() -> (MemoryStore, PatientRecord) {
        let store = MemoryStore::new();
        let form = NewPatient {
            name: Some("Sarah Wilson".to_string()),
            age: Some(28),
            contact: Some("555-456-7890".to_string()),
            diagnosis: Some("Bronchitis".to_string()),
            ..NewPatient::default()
        };
        let patient = store
            .register_patient(form.validate().unwrap(), at(1))
            .await
            .unwrap();
        (store, patient)
    }

    fn request(patient_id: &str, items: Vec<BillLine>) -> BillRequest {
        BillRequest {
            patient_id: Some(patient_id.to_string()),
            items,
            payment_method: None,
        }
    }

    #[tokio::test]
    async fn test_bill_totals_catalog_prices() {
        let (store, patient) = store_with_patient().await;

        let outcome = generate_bill(
            &store,
            request(&patient.id, vec![BillLine::service("Consultation", 1), BillLine::service("Blood Test", 2)]),
            at(3),
        )
        .await
        .unwrap();

        assert_eq!(outcome.bill.total, Money::from_major(200));
        assert_eq!(outcome.bill.payment_method, PaymentMethod::Cash);
        assert_eq!(outcome.bill.patient_name.as_deref(), Some("Sarah Wilson"));
        assert_eq!(outcome.patient.status, PatientStatus::Admitted);
    }

    #[tokio::test]
    async fn test_discharge_bill_discharges_patient() {
        let (store, patient) = store_with_patient().await;

        let outcome = generate_bill(
            &store,
            request(&patient.id, vec![BillLine::service("Final Discharge Processing", 1)]),
            at(4),
        )
        .await
        .unwrap();

        assert_eq!(outcome.patient.status, PatientStatus::Discharged);
        assert_eq!(outcome.patient.discharge_date, Some(outcome.bill.date.date_naive()));

        let stored = store.get_patient(&patient.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PatientStatus::Discharged);
    }

    #[tokio::test]
    async fn test_unknown_patient_writes_nothing() {
        let (store, _) = store_with_patient().await;

        let err = generate_bill(&store, request("P4242", vec![BillLine::service("ECG", 1)]), at(4))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::PatientNotFound(_))));
        assert!(store.query_ledger(&LedgerFilter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let (store, patient) = store_with_patient().await;

        let err = generate_bill(&store, request(&patient.id, vec![]), at(4))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let unknown = BillLine::service("Aromatherapy", 1);
        let err = generate_bill(&store, request(&patient.id, vec![unknown]), at(4))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::NotAllowed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reconcile_applies_missed_discharge() {
        let (store, patient) = store_with_patient().await;

        // Simulate a crash after the ledger write: append directly.
        let line = LineItem::new("Final Discharge Processing", "Administrative", Money::from_major(100), 1)
            .unwrap();
        let draft = LedgerDraft::bill(&patient, vec![line], PaymentMethod::Insurance);
        let bill = store.append_entry(draft, at(6)).await.unwrap();

        assert_eq!(reconcile_discharges(&store, at(7)).await.unwrap(), 1);
        let repaired = store.get_patient(&patient.id).await.unwrap().unwrap();
        assert_eq!(repaired.status, PatientStatus::Discharged);
        assert_eq!(repaired.discharge_date, Some(bill.date.date_naive()));

        // Nothing left to repair
        assert_eq!(reconcile_discharges(&store, at(8)).await.unwrap(), 0);
    }
}
