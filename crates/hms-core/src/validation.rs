//! # Validation Module
//!
//! Input validation utilities shared by the HTTP layer and the stores.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                 │
//! │  ├── JSON shape (deserialization, Money precision)                     │
//! │  └── Required fields present                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Ranges (quantity, age, price)                                     │
//! │  └── Lengths and trimming                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store                                                        │
//! │  ├── UNIQUE item names                                                 │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  └── Conditional decrement                                             │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use hms_core::validation::{validate_item_name, validate_quantity};
//!
//! let name = validate_item_name("  Medical Gloves ").unwrap();
//! assert_eq!(name, "Medical Gloves");
//!
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::{Money, MAX_MONEY_CENTS, MAX_STOCK_VALUE_CENTS};
use crate::{MAX_AGE, MAX_ITEM_QUANTITY, MAX_NAME_LEN, MAX_STOCK, MIN_AGE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Trims `value` and rejects it when empty or missing.
///
/// ## Example
/// ```rust
/// use hms_core::validation::require_text;
///
/// assert_eq!(require_text("username", Some(" admin ")).unwrap(), "admin");
/// assert!(require_text("username", Some("   ")).is_err());
/// assert!(require_text("username", None).is_err());
/// ```
pub fn require_text(field: &str, value: Option<&str>) -> ValidationResult<String> {
    let value = value.map(str::trim).unwrap_or_default();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates an inventory item name and returns it trimmed.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_item_name(name: &str) -> ValidationResult<String> {
    require_text("name", Some(name))
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (matches everything)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale, restock or line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  POST /api/inventory/restock { name, quantity: -5 }                     │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(-5) ← THIS FUNCTION                                 │
/// │       │                                                                 │
/// │       ├── qty <= 0? → 400 "quantity must be positive"                  │
/// │       │                                                                 │
/// │       ├── qty > max? → 400 "quantity must be between ..."              │
/// │       │                                                                 │
/// │       └── OK → store.restock(...)                                      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an initial stock level. Zero is allowed.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

/// Validates a catalog price: strictly positive, at most
/// [`MAX_MONEY_CENTS`].
///
/// ## Example
/// ```rust
/// use hms_core::money::Money;
/// use hms_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(500)).is_ok());
/// assert!(validate_price(Money::zero()).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }
    price.ensure_within_limit("price")?;

    Ok(())
}

/// Validates a billed unit price. Zero is allowed (waived services).
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.cents() > MAX_MONEY_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "unitPrice".to_string(),
            min: 0,
            max: MAX_MONEY_CENTS,
        });
    }

    Ok(())
}

/// Checks that `price * stock` stays within [`MAX_STOCK_VALUE_CENTS`].
///
/// ## Example
/// ```rust
/// use hms_core::money::Money;
/// use hms_core::validation::validate_stock_value;
///
/// assert!(validate_stock_value(Money::from_major(5), 120).is_ok());
/// assert!(validate_stock_value(Money::from_cents(10_000_000_000), 1_000_000_000).is_err());
/// ```
pub fn validate_stock_value(price: Money, stock: i64) -> ValidationResult<()> {
    match price.checked_mul(stock) {
        Some(value) if value.cents() <= MAX_STOCK_VALUE_CENTS => Ok(()),
        _ => Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK_VALUE_CENTS / price.cents().max(1),
        }),
    }
}

/// Stock level after adding `quantity` units to `current`.
///
/// ## Errors
/// - `quantity` outside `1..=MAX_ITEM_QUANTITY`
/// - resulting stock above [`MAX_STOCK`]
/// - resulting stock value above [`MAX_STOCK_VALUE_CENTS`]
pub fn restocked_level(current: i64, price: Money, quantity: i64) -> ValidationResult<i64> {
    validate_quantity(quantity)?;

    let stock = current
        .checked_add(quantity)
        .filter(|s| *s <= MAX_STOCK)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        })?;
    validate_stock_value(price, stock)?;

    Ok(stock)
}

/// Validates a patient age and narrows it to `u8`.
pub fn validate_age(age: i64) -> ValidationResult<u8> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(ValidationError::OutOfRange {
            field: "age".to_string(),
            min: MIN_AGE,
            max: MAX_AGE,
        });
    }

    u8::try_from(age).map_err(|_| ValidationError::OutOfRange {
        field: "age".to_string(),
        min: MIN_AGE,
        max: MAX_AGE,
    })
}

/// Validates a low-stock threshold supplied in a query string.
pub fn validate_threshold(threshold: i64) -> ValidationResult<()> {
    if threshold < 1 {
        return Err(ValidationError::MustBePositive {
            field: "threshold".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("name", Some("Wheelchairs")).unwrap(), "Wheelchairs");
        assert!(require_text("name", Some("")).is_err());
        assert!(require_text("name", None).is_err());
        assert!(require_text("name", Some(&"A".repeat(300))).is_err());
    }

    #[test]
    fn test_validate_item_name_trims() {
        assert_eq!(validate_item_name("  Sterile Gauze ").unwrap(), "Sterile Gauze");
        assert!(validate_item_name("   ").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(200).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_stock() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(300).is_ok());
        assert!(validate_stock(-1).is_err());
    }

    #[test]
    fn test_validate_prices() {
        assert!(validate_price(Money::from_cents(1)).is_ok());
        assert!(validate_price(Money::zero()).is_err());
        assert!(validate_price(Money::from_cents(-100)).is_err());

        assert!(validate_unit_price(Money::zero()).is_ok());
        assert!(validate_unit_price(Money::from_cents(-1)).is_err());

        let max = Money::from_cents(MAX_MONEY_CENTS);
        let over = Money::from_cents(MAX_MONEY_CENTS + 1);
        assert!(validate_price(max).is_ok());
        assert!(validate_unit_price(max).is_ok());
        assert!(matches!(validate_price(over), Err(ValidationError::OutOfRange { .. })));
        assert!(validate_unit_price(over).is_err());
    }

    #[test]
    fn test_stock_value_limit() {
        let max_price = Money::from_cents(MAX_MONEY_CENTS);
        assert!(validate_stock_value(max_price, 100_000_000).is_ok());
        assert!(validate_stock_value(max_price, 100_000_001).is_err());
        assert!(validate_stock_value(max_price, MAX_STOCK).is_err());
        assert!(validate_stock_value(Money::from_cents(1), MAX_STOCK).is_ok());
    }

    #[test]
    fn test_restocked_level() {
        let price = Money::from_major(2);
        assert_eq!(restocked_level(10, price, 5).unwrap(), 15);
        assert_eq!(restocked_level(MAX_STOCK - 1, Money::from_cents(1), 1).unwrap(), MAX_STOCK);

        assert!(restocked_level(10, price, 0).is_err());
        assert!(matches!(
            restocked_level(MAX_STOCK, Money::from_cents(1), 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(restocked_level(i64::MAX, Money::from_cents(1), 1).is_err());
        assert!(restocked_level(99_999_999, Money::from_cents(MAX_MONEY_CENTS), 2).is_err());
    }

    #[test]
    fn test_validate_age() {
        assert_eq!(validate_age(1).unwrap(), 1);
        assert_eq!(validate_age(120).unwrap(), 120);
        assert!(validate_age(0).is_err());
        assert!(validate_age(121).is_err());
        assert!(validate_age(-3).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  smith ").unwrap(), "smith");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }
}
