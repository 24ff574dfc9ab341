//! # Billing Rules
//!
//! Line-item pricing, the medical service catalog, and discharge-class
//! detection.
//!
//! ## Bill Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BillLine { service: "MRI Scan", quantity: 1 }                          │
//! │       │                                                                 │
//! │       ▼  resolve_line()                                                │
//! │  unit price / category missing? ──► look up SERVICE_CATALOG            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LineItem { "MRI Scan", "Radiology", $450.00, 1, $450.00 }              │
//! │       │                                                                 │
//! │       ▼  bill_total()                                                  │
//! │  LedgerDraft::bill(patient, lines) ──► store.append_entry()            │
//! │       │                                                                 │
//! │       ▼  requires_discharge()                                          │
//! │  any line named "...discharge..." or "...final..."?                    │
//! │       └── yes ──► store.discharge_patient(id, bill date)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, MAX_MONEY_CENTS};
use crate::types::LineItem;
use crate::validation::{require_text, validate_quantity, validate_unit_price, ValidationResult};

/// Keywords that mark a service line as discharge-class (case-insensitive
/// substring match on the service name).
pub const DISCHARGE_KEYWORDS: &[&str] = &["discharge", "final"];

/// Category used for billed services that are not in the catalog.
pub const DEFAULT_SERVICE_CATEGORY: &str = "General";

// =============================================================================
// Service Catalog
// =============================================================================

/// A billable medical service with its list price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MedicalService {
    pub name: &'static str,
    pub category: &'static str,
    pub price: Money,
}

/// Standard price list offered on the billing screen.
pub const SERVICE_CATALOG: &[MedicalService] = &[
    MedicalService { name: "Consultation", category: "General", price: Money::from_major(50) },
    MedicalService { name: "Blood Test", category: "Laboratory", price: Money::from_major(75) },
    MedicalService { name: "X-Ray Scan", category: "Radiology", price: Money::from_major(120) },
    MedicalService { name: "MRI Scan", category: "Radiology", price: Money::from_major(450) },
    MedicalService { name: "ECG", category: "Cardiology", price: Money::from_major(90) },
    MedicalService { name: "Surgery - Minor", category: "Surgical", price: Money::from_major(1200) },
    MedicalService { name: "Surgery - Major", category: "Surgical", price: Money::from_major(5000) },
    MedicalService {
        name: "Room Charges - General (per day)",
        category: "Accommodation",
        price: Money::from_major(200),
    },
    MedicalService {
        name: "Room Charges - Private (per day)",
        category: "Accommodation",
        price: Money::from_major(500),
    },
    MedicalService {
        name: "Room Charges - ICU (per day)",
        category: "Accommodation",
        price: Money::from_major(1000),
    },
    MedicalService { name: "Medication", category: "Pharmacy", price: Money::from_major(45) },
    MedicalService {
        name: "Final Discharge Processing",
        category: "Administrative",
        price: Money::from_major(100),
    },
];

/// Finds a catalog service by name (case-insensitive, exact).
pub fn find_service(name: &str) -> Option<&'static MedicalService> {
    let name = name.trim();
    SERVICE_CATALOG
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

// =============================================================================
// Line Items
// =============================================================================

impl LineItem {
    /// Builds a validated line with `line_total = unit_price * quantity`.
    pub fn new(
        description: impl Into<String>,
        category: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> ValidationResult<LineItem> {
        let description = description.into();
        let description = require_text("service", Some(&description))?;
        validate_quantity(quantity)?;
        validate_unit_price(unit_price)?;

        LineItem {
            description,
            category: category.into(),
            unit_price,
            quantity,
            line_total: Money::zero(),
        }
        .recompute()
    }

    /// Recomputes `line_total` from price and quantity.
    ///
    /// ## Errors
    /// `OutOfRange` when the line total exceeds [`MAX_MONEY_CENTS`].
    pub fn recompute(mut self) -> ValidationResult<LineItem> {
        self.line_total = self
            .unit_price
            .checked_mul(self.quantity)
            .ok_or_else(|| amount_out_of_range("lineTotal"))?
            .ensure_within_limit("lineTotal")?;
        Ok(self)
    }

    /// True when this line names a discharge-class service.
    pub fn is_discharge_service(&self) -> bool {
        is_discharge_service(&self.description)
    }
}

/// One requested bill line, as sent by the billing screen.
///
/// `unit_price` and `category` may be omitted for catalog services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLine {
    pub service: Option<String>,
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<Money>,
    #[serde(default)]
    pub category: Option<String>,
}

impl BillLine {
    /// Convenience constructor for a catalog service.
    pub fn service(name: impl Into<String>, quantity: i64) -> Self {
        BillLine {
            service: Some(name.into()),
            quantity: Some(quantity),
            unit_price: None,
            category: None,
        }
    }
}

/// Resolves a requested line against the catalog and validates it.
///
/// ## Rules
/// - `service` and `quantity` are required
/// - A missing unit price is taken from the catalog; an unknown service
///   without a price is rejected
/// - A missing category comes from the catalog, else `"General"`
pub fn resolve_line(line: &BillLine) -> ValidationResult<LineItem> {
    let service = require_text("service", line.service.as_deref())?;
    let quantity = line.quantity.ok_or_else(|| ValidationError::required("quantity"))?;
    let catalog = find_service(&service);

    let unit_price = match (line.unit_price, catalog) {
        (Some(price), _) => price,
        (None, Some(s)) => s.price,
        (None, None) => {
            return Err(ValidationError::NotAllowed {
                field: "service".to_string(),
                allowed: SERVICE_CATALOG.iter().map(|s| s.name.to_string()).collect(),
            })
        }
    };

    let category = line
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| catalog.map(|s| s.category.to_string()))
        .unwrap_or_else(|| DEFAULT_SERVICE_CATEGORY.to_string());

    LineItem::new(service, category, unit_price, quantity)
}

// =============================================================================
// Totals & Discharge
// =============================================================================

/// Sum of all line totals, recomputed from price and quantity.
///
/// ## Errors
/// `OutOfRange` when the total exceeds [`MAX_MONEY_CENTS`]. Totals are
/// never clamped, so an entry is either exact or not written.
pub fn bill_total(items: &[LineItem]) -> ValidationResult<Money> {
    items
        .iter()
        .try_fold(Money::zero(), |total, line| {
            line.unit_price
                .checked_mul(line.quantity)
                .and_then(|line_total| total.checked_add(line_total))
        })
        .ok_or_else(|| amount_out_of_range("total"))?
        .ensure_within_limit("total")
}

fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: -MAX_MONEY_CENTS,
        max: MAX_MONEY_CENTS,
    }
}

/// True when `service` contains any discharge keyword.
///
/// ## Example
/// ```rust
/// use hms_core::billing::is_discharge_service;
///
/// assert!(is_discharge_service("Final Discharge Processing"));
/// assert!(is_discharge_service("discharge summary"));
/// assert!(!is_discharge_service("Blood Test"));
/// ```
pub fn is_discharge_service(service: &str) -> bool {
    let lower = service.to_lowercase();
    DISCHARGE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// True when any line is a discharge-class service.
pub fn requires_discharge(items: &[LineItem]) -> bool {
    items.iter().any(LineItem::is_discharge_service)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_total() {
        let line = LineItem::new("X-Ray Scan", "Radiology", Money::from_major(120), 2).unwrap();
        assert_eq!(line.line_total.cents(), 24_000);
    }

    #[test]
    fn test_line_item_rejects_bad_input() {
        assert!(LineItem::new("", "General", Money::from_major(1), 1).is_err());
        assert!(LineItem::new("ECG", "Cardiology", Money::from_major(90), 0).is_err());
        assert!(LineItem::new("ECG", "Cardiology", Money::from_cents(-1), 1).is_err());
    }

    #[test]
    fn test_line_and_bill_limits() {
        let max = Money::from_cents(MAX_MONEY_CENTS);
        assert!(LineItem::new("Surgery - Major", "Surgical", max, 1).is_ok());
        assert!(matches!(
            LineItem::new("Surgery - Major", "Surgical", max, 2),
            Err(ValidationError::OutOfRange { .. })
        ));

        let line = LineItem::new("Surgery - Major", "Surgical", max, 1).unwrap();
        assert!(bill_total(&[line.clone()]).is_ok());
        assert!(bill_total(&vec![line; 9300]).is_err());
    }

    #[test]
    fn test_resolve_line_from_catalog() {
        let line = resolve_line(&BillLine::service("mri scan", 1)).unwrap();
        assert_eq!(line.description, "mri scan");
        assert_eq!(line.category, "Radiology");
        assert_eq!(line.unit_price, Money::from_major(450));
    }

    #[test]
    fn test_resolve_line_explicit_price_wins() {
        let line = resolve_line(&BillLine {
            service: Some("Physiotherapy".to_string()),
            quantity: Some(3),
            unit_price: Some(Money::from_cents(3550)),
            category: None,
        })
        .unwrap();

        assert_eq!(line.category, DEFAULT_SERVICE_CATEGORY);
        assert_eq!(line.line_total.cents(), 10_650);
    }

    #[test]
    fn test_resolve_line_unknown_service_without_price() {
        let err = resolve_line(&BillLine::service("Teleportation", 1)).unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));

        let missing_qty = BillLine {
            quantity: None,
            ..BillLine::service("ECG", 1)
        };
        assert!(resolve_line(&missing_qty).is_err());
    }

    #[test]
    fn test_bill_total() {
        let items = vec![
            LineItem::new("Consultation", "General", Money::from_major(50), 1).unwrap(),
            LineItem::new("Medication", "Pharmacy", Money::from_cents(4550), 3).unwrap(),
        ];
        assert_eq!(bill_total(&items).unwrap().cents(), 5000 + 13_650);
        assert_eq!(bill_total(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_discharge_detection() {
        let routine = LineItem::new("Blood Test", "Laboratory", Money::from_major(75), 1).unwrap();
        let discharge =
            LineItem::new("Final Discharge Processing", "Administrative", Money::from_major(100), 1)
                .unwrap();

        assert!(!requires_discharge(&[routine.clone()]));
        assert!(requires_discharge(&[routine, discharge]));
        assert!(is_discharge_service("PATIENT DISCHARGE"));
        assert!(is_discharge_service("final review"));
    }

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(find_service("ECG").map(|s| s.price), Some(Money::from_major(90)));
        assert!(find_service("Nonexistent").is_none());
        assert!(SERVICE_CATALOG.iter().any(|s| is_discharge_service(s.name)));
    }
}
