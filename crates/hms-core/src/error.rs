//! # Error Types
//!
//! Domain-specific error types for hms-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hms-core errors (this file)                                           │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  hms-db errors (separate crate)                                        │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── StoreError       - CoreError | DbError, returned by every Store   │
//! │                                                                         │
//! │  HTTP API errors (in hms-server)                                       │
//! │  └── ApiError         - What the client sees (status + JSON body)      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → ApiError → Client    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item name, patient id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to exactly one HTTP status

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// These represent business rule violations. The HTTP layer translates
/// each variant into a status code and a user-facing message.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Inventory item cannot be found.
    ///
    /// ## When This Occurs
    /// - Restocking or selling a name that is not in the catalog
    /// - Names are matched exactly, so "syringes (10ml)" does not match
    ///   "Syringes (10ml)"
    #[error("Item not found in inventory: {0}")]
    ItemNotFound(String),

    /// Patient cannot be found.
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    /// User account cannot be found (maintenance tooling only).
    ///
    /// The login path never surfaces this; it reports `InvalidCredentials`.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Insufficient stock to complete a sale.
    ///
    /// ## User Workflow
    /// ```text
    /// POST /api/sales { productName: "Ventilators", quantity: 7 }
    ///      │
    ///      ▼
    /// Conditional decrement: stock=5, requested=7
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Ventilators", available: 5, requested: 7 }
    ///      │
    ///      ▼
    /// 400 "Insufficient stock for Ventilators: available 5, requested 7"
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// An item with this name already exists in the catalog.
    #[error("Item already exists in inventory: {0}")]
    DuplicateItem(String),

    /// Username/password pair did not match.
    ///
    /// Deliberately carries no detail: unknown user and wrong password
    /// are indistinguishable to the caller.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Ledger entry is structurally unusable (no lines or no reference).
    #[error("Invalid ledger entry: {0}")]
    InvalidLedgerEntry(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any store is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., too many decimal places, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for a `Required` error on `field`.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Syringes (10ml)".to_string(),
            available: 110,
            requested: 200,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Syringes (10ml): available 110, requested 200"
        );
        assert_eq!(CoreError::InvalidCredentials.to_string(), "Invalid credentials");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("username").to_string(), "username is required");

        let err = ValidationError::OutOfRange {
            field: "age".to_string(),
            min: 1,
            max: 120,
        };
        assert_eq!(err.to_string(), "age must be between 1 and 120");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
