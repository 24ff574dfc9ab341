//! # Patient Registration Rules
//!
//! Validation of new registrations, id allocation and search matching.
//! Storage lives in hms-db; everything here is pure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::types::{PatientRecord, PatientStatus};
use crate::validation::{require_text, validate_age, ValidationResult};
use crate::{DEFAULT_DEPARTMENT, UNASSIGNED_DOCTOR};

/// Patient ids start after this number (`P1001` is the first).
pub const PATIENT_ID_BASE: u64 = 1000;

// =============================================================================
// Registration
// =============================================================================

/// Registration form as submitted. Every field is optional so that a
/// missing field is reported as a validation error, not a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub diagnosis: Option<String>,
    pub doctor: Option<String>,
    pub department: Option<String>,
}

/// A registration that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRegistration {
    pub name: String,
    pub age: u8,
    pub gender: String,
    pub contact: String,
    pub address: String,
    pub diagnosis: String,
    pub doctor: String,
    pub department: String,
}

fn optional_text(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

impl NewPatient {
    /// Checks required fields and ranges.
    ///
    /// ## Rules
    /// - `name`, `contact`, `diagnosis` required
    /// - `age` required, 1 to 120
    /// - `gender` defaults to "unspecified", `department` to "General",
    ///   `doctor` to "Unassigned"
    pub fn validate(&self) -> ValidationResult<PatientRegistration> {
        let name = require_text("name", self.name.as_deref())?;
        let age = self.age.ok_or_else(|| ValidationError::required("age"))?;
        let age = validate_age(age)?;
        let contact = require_text("contact", self.contact.as_deref())?;
        let diagnosis = require_text("diagnosis", self.diagnosis.as_deref())?;

        Ok(PatientRegistration {
            name,
            age,
            gender: optional_text(&self.gender, "unspecified"),
            contact,
            address: optional_text(&self.address, ""),
            diagnosis,
            doctor: optional_text(&self.doctor, UNASSIGNED_DOCTOR),
            department: optional_text(&self.department, DEFAULT_DEPARTMENT),
        })
    }
}

impl PatientRegistration {
    /// Creates the admitted record for this registration.
    pub fn admit(self, id: String, now: DateTime<Utc>) -> PatientRecord {
        PatientRecord {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            contact: self.contact,
            address: self.address,
            diagnosis: self.diagnosis,
            admission_date: now.date_naive(),
            discharge_date: None,
            status: PatientStatus::Admitted,
            doctor: self.doctor,
            department: self.department,
            updated_at: now,
        }
    }
}

/// Next free patient id given the ids already in use.
///
/// Uses the highest numeric suffix rather than a count, so ids stay unique
/// even if numbering ever has gaps.
///
/// ## Example
/// ```rust
/// use hms_core::patients::next_patient_id;
///
/// assert_eq!(next_patient_id(Vec::<&str>::new()), "P1001");
/// assert_eq!(next_patient_id(["P1001", "P1005", "P1002"]), "P1006");
/// ```
pub fn next_patient_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix('P').and_then(|n| n.parse::<u64>().ok()))
        .max()
        .unwrap_or(PATIENT_ID_BASE)
        .max(PATIENT_ID_BASE);

    format!("P{}", highest + 1)
}

// =============================================================================
// Search
// =============================================================================

/// Status filter used by the patient list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Admitted,
    Discharged,
}

impl StatusFilter {
    /// Checks whether `status` passes this filter.
    pub fn accepts(&self, status: PatientStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Admitted => status == PatientStatus::Admitted,
            StatusFilter::Discharged => status == PatientStatus::Discharged,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Admitted => write!(f, "admitted"),
            StatusFilter::Discharged => write!(f, "discharged"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "admitted" => Ok(StatusFilter::Admitted),
            "discharged" => Ok(StatusFilter::Discharged),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["all".into(), "admitted".into(), "discharged".into()],
            }),
        }
    }
}

/// Patient list query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientQuery {
    /// Case-insensitive substring over name, id and diagnosis.
    #[serde(alias = "q")]
    pub text: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
}

impl PatientQuery {
    /// Checks whether `patient` matches.
    pub fn matches(&self, patient: &PatientRecord) -> bool {
        if !self.status.accepts(patient.status) {
            return false;
        }

        match self.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => {
                let needle = text.to_lowercase();
                [&patient.name, &patient.id, &patient.diagnosis]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn form() -> NewPatient {
        NewPatient {
            name: Some(" Ada Lovelace ".to_string()),
            age: Some(36),
            gender: Some("female".to_string()),
            contact: Some("555-000-1111".to_string()),
            address: None,
            diagnosis: Some("Migraine".to_string()),
            doctor: None,
            department: None,
        }
    }

    #[test]
    fn test_validate_applies_defaults() {
        let reg = form().validate().unwrap();
        assert_eq!(reg.name, "Ada Lovelace");
        assert_eq!(reg.doctor, UNASSIGNED_DOCTOR);
        assert_eq!(reg.department, DEFAULT_DEPARTMENT);
        assert_eq!(reg.address, "");
    }

    #[test]
    fn test_validate_rejects_missing_and_out_of_range() {
        assert!(NewPatient { name: None, ..form() }.validate().is_err());
        assert!(NewPatient { contact: Some(" ".into()), ..form() }.validate().is_err());
        assert!(NewPatient { diagnosis: None, ..form() }.validate().is_err());
        assert!(NewPatient { age: None, ..form() }.validate().is_err());
        assert!(NewPatient { age: Some(0), ..form() }.validate().is_err());
        assert!(NewPatient { age: Some(121), ..form() }.validate().is_err());
    }

    #[test]
    fn test_admit() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 9, 30, 0).unwrap();
        let p = form().validate().unwrap().admit("P1006".to_string(), now);

        assert_eq!(p.status, PatientStatus::Admitted);
        assert_eq!(p.admission_date, now.date_naive());
        assert_eq!(p.discharge_date, None);
        assert_eq!(p.updated_at, now);
    }

    #[test]
    fn test_next_patient_id() {
        assert_eq!(next_patient_id(["P1001", "P1002"]), "P1003");
        assert_eq!(next_patient_id(["legacy", "P0007"]), "P1001");
        assert_eq!(next_patient_id(["P1009", "P1003"]), "P1010");
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("Admitted".parse::<StatusFilter>().unwrap(), StatusFilter::Admitted);
        assert_eq!("".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert!("pending".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_query_matches() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 9, 30, 0).unwrap();
        let mut p = form().validate().unwrap().admit("P1006".to_string(), now);

        let by_name = PatientQuery { text: Some("lovelace".into()), status: StatusFilter::All };
        let by_id = PatientQuery { text: Some("p1006".into()), status: StatusFilter::All };
        let by_diag = PatientQuery { text: Some("MIGR".into()), status: StatusFilter::All };
        let discharged = PatientQuery { text: None, status: StatusFilter::Discharged };

        assert!(by_name.matches(&p));
        assert!(by_id.matches(&p));
        assert!(by_diag.matches(&p));
        assert!(!discharged.matches(&p));

        p.discharge(now.date_naive(), now);
        assert!(discharged.matches(&p));
    }
}
