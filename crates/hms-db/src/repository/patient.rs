//! # Patient Repository
//!
//! Registration, lookup and discharge of patients.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult, StoreResult};
use hms_core::{CoreError, PatientQuery, PatientRecord, PatientRegistration, PatientStatus};

const PATIENT_COLUMNS: &str = "id, name, age, gender, contact, address, diagnosis, \
     admission_date, discharge_date, status, doctor, department, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct PatientRow {
    id: String,
    name: String,
    age: i64,
    gender: String,
    contact: String,
    address: String,
    diagnosis: String,
    admission_date: NaiveDate,
    discharge_date: Option<NaiveDate>,
    status: PatientStatus,
    doctor: String,
    department: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PatientRow> for PatientRecord {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let age = u8::try_from(row.age)
            .map_err(|_| DbError::Internal(format!("patient {} has invalid age {}", row.id, row.age)))?;

        Ok(PatientRecord {
            id: row.id,
            name: row.name,
            age,
            gender: row.gender,
            contact: row.contact,
            address: row.address,
            diagnosis: row.diagnosis,
            admission_date: row.admission_date,
            discharge_date: row.discharge_date,
            status: row.status,
            doctor: row.doctor,
            department: row.department,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for patient database operations.
#[derive(Debug, Clone)]
pub struct PatientRepository {
    pool: SqlitePool,
}

impl PatientRepository {
    /// Creates a new PatientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PatientRepository { pool }
    }

    /// Lists patients matching `query`, in id order.
    ///
    /// Text matching is done with [`PatientQuery::matches`] so both
    /// adapters apply exactly the same rule.
    pub async fn list(&self, query: &PatientQuery) -> DbResult<Vec<PatientRecord>> {
        let rows = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut patients = Vec::with_capacity(rows.len());
        for row in rows {
            let patient = PatientRecord::try_from(row)?;
            if query.matches(&patient) {
                patients.push(patient);
            }
        }

        Ok(patients)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PatientRecord>> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PatientRecord::try_from).transpose()
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Registers a patient with the next free id.
    ///
    /// The id is computed and inserted by one statement, so concurrent
    /// registrations cannot collide; `seq` is UNIQUE as a backstop.
    pub async fn register(
        &self,
        registration: PatientRegistration,
        now: DateTime<Utc>,
    ) -> DbResult<PatientRecord> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            INSERT INTO patients (
                id, seq, name, age, gender, contact, address, diagnosis,
                admission_date, discharge_date, status, doctor, department, updated_at
            )
            SELECT 'P' || next.seq, next.seq, ?1, ?2, ?3, ?4, ?5, ?6,
                   ?7, NULL, 'admitted', ?8, ?9, ?10
            FROM (SELECT MAX(COALESCE(MAX(seq), 1000), 1000) + 1 AS seq FROM patients) AS next
            RETURNING {PATIENT_COLUMNS}
            "#
        ))
        .bind(&registration.name)
        .bind(i64::from(registration.age))
        .bind(&registration.gender)
        .bind(&registration.contact)
        .bind(&registration.address)
        .bind(&registration.diagnosis)
        .bind(now.date_naive())
        .bind(&registration.doctor)
        .bind(&registration.department)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let patient = PatientRecord::try_from(row)?;
        debug!(id = %patient.id, "Registered patient");
        Ok(patient)
    }

    /// Moves an admitted patient to Discharged.
    ///
    /// Already-discharged patients are returned unchanged, keeping their
    /// original discharge date.
    ///
    /// ## Errors
    /// - `PatientNotFound` if the id is unknown
    pub async fn discharge(
        &self,
        id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<PatientRecord> {
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET status = 'discharged', discharge_date = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'admitted'
            "#,
        )
        .bind(id)
        .bind(date)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!(id = %id, %date, "Patient discharged");
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::PatientNotFound(id.to_string()).into())
    }
}
