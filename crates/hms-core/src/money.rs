//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A bill with 3 x $0.10 gauze and 7 x $0.20 swabs summed in floats      │
//! │  drifts by fractions of a cent and stops matching the ledger.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    All arithmetic (price * quantity, bill totals, inventory value)     │
//! │    is exact i64 math. Floats only exist at the JSON boundary.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! The HTTP API speaks decimal currency numbers (`"price": 12.5`), so
//! `Money` serializes as a JSON number in major units and deserializes
//! from one, rejecting anything finer than a cent.
//!
//! ## Usage
//! ```rust
//! use hms_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let total = price * 3;               // $32.97
//! assert_eq!(total.cents(), 3297);
//!
//! let parsed = Money::try_from_decimal(12.5).unwrap();
//! assert_eq!(parsed.cents(), 1250);
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::error::ValidationError;

/// Largest accepted absolute amount: $100,000,000.00.
///
/// Applies to prices, line totals and ledger totals. Keeps
/// `amount * MAX_ITEM_QUANTITY` well inside i64.
pub const MAX_MONEY_CENTS: i64 = 10_000_000_000;

/// Largest value of one catalog item's units on hand (`price * stock`):
/// $10,000,000,000,000.00.
pub const MAX_STOCK_VALUE_CENTS: i64 = 1_000_000_000_000_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Custom serde**: decimal number on the wire, cents in memory and in SQL
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  InventoryItem.price ──► LineItem.unit_price ──► LineItem.line_total   │
/// │                                                       │                 │
/// │  MedicalService.price ───────────────────────────────┤                 │
/// │                                                       ▼                 │
/// │                                  LedgerEntry.total ──► Reports          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use hms_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// Used for seed data and the service catalog, where every price is
    /// a whole number.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Converts a decimal amount from the wire into cents.
    ///
    /// ## Rules
    /// - Must be finite
    /// - At most two decimal places (`12.345` is rejected)
    /// - Absolute value at most [`MAX_MONEY_CENTS`]
    ///
    /// ## Example
    /// ```rust
    /// use hms_core::money::Money;
    ///
    /// assert_eq!(Money::try_from_decimal(5.0).unwrap().cents(), 500);
    /// assert_eq!(Money::try_from_decimal(0.1).unwrap().cents(), 10);
    /// assert!(Money::try_from_decimal(1.005).is_err());
    /// ```
    pub fn try_from_decimal(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: "must be a finite number".to_string(),
            });
        }

        let scaled = value * 100.0;
        let cents = scaled.round();

        // Binary floats cannot represent most decimals exactly; anything
        // within a millionth of a cent is treated as exact.
        if (scaled - cents).abs() > 1e-6 {
            return Err(ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: "must have at most two decimal places".to_string(),
            });
        }

        if cents.abs() > MAX_MONEY_CENTS as f64 {
            return Err(ValidationError::OutOfRange {
                field: "amount".to_string(),
                min: -MAX_MONEY_CENTS / 100,
                max: MAX_MONEY_CENTS / 100,
            });
        }

        Ok(Money(cents as i64))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    ///
    /// ## Example
    /// ```rust
    /// use hms_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).dollars(), 10);
    /// ```
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion, always non-negative.
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the amount as a decimal number (for the JSON boundary only).
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero money.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if amount is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if amount is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if amount is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, saturating at the i64 bounds.
    ///
    /// Read-side aggregates only. Anything that gets stored goes through
    /// [`Money::checked_mul`].
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `self * qty`, or `None` on i64 overflow.
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self + other`, or `None` on i64 overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums `amounts`, or `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Checks that this amount is at most [`MAX_MONEY_CENTS`] in absolute
    /// value.
    ///
    /// ## Example
    /// ```rust
    /// use hms_core::money::{Money, MAX_MONEY_CENTS};
    ///
    /// assert!(Money::from_cents(MAX_MONEY_CENTS).ensure_within_limit("total").is_ok());
    /// assert!(Money::from_cents(MAX_MONEY_CENTS + 1).ensure_within_limit("total").is_err());
    /// ```
    pub fn ensure_within_limit(&self, field: &str) -> Result<Self, ValidationError> {
        if self.0.checked_abs().map_or(true, |abs| abs > MAX_MONEY_CENTS) {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: -MAX_MONEY_CENTS,
                max: MAX_MONEY_CENTS,
            });
        }
        Ok(*self)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Serde (decimal on the wire)
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Whole amounts stay integers so `{"price": 5}` round-trips as-is.
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.to_decimal())
        }
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount with at most two decimal places")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        if v.abs() > MAX_MONEY_CENTS / 100 {
            return Err(E::custom("amount out of range"));
        }
        Ok(Money::from_major(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        let v = i64::try_from(v).map_err(|_| E::custom("amount out of range"))?;
        self.visit_i64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::try_from_decimal(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        let parsed: f64 = v
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("'{}' is not a number", v)))?;
        self.visit_f64(parsed)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_and_major() {
        assert_eq!(Money::from_cents(1099).cents(), 1099);
        assert_eq!(Money::from_major(25).cents(), 2500);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);

        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!((b * 4).cents(), 1000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_overflow_is_checked_or_saturated() {
        let big = Money::from_cents(MAX_MONEY_CENTS);

        assert_eq!(big.checked_mul(1_000_000_000), None);
        assert_eq!(big.checked_mul(3), Some(Money::from_cents(3 * MAX_MONEY_CENTS)));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::checked_sum([big, big]), Some(Money::from_cents(2 * MAX_MONEY_CENTS)));
        assert_eq!(Money::checked_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]), None);

        assert_eq!((big * 1_000_000_000).cents(), i64::MAX);
        let total: Money = [Money::from_cents(i64::MAX), big].iter().sum();
        assert_eq!(total.cents(), i64::MAX);

        assert!(big.ensure_within_limit("total").is_ok());
        assert!((big + Money::from_cents(1)).ensure_within_limit("total").is_err());
        assert!(Money::from_cents(i64::MIN).ensure_within_limit("total").is_err());
    }

    #[test]
    fn test_try_from_decimal() {
        assert_eq!(Money::try_from_decimal(5.0).unwrap().cents(), 500);
        assert_eq!(Money::try_from_decimal(12.5).unwrap().cents(), 1250);
        assert_eq!(Money::try_from_decimal(0.29).unwrap().cents(), 29);
        assert_eq!(Money::try_from_decimal(0.1 + 0.2).unwrap().cents(), 30);

        assert!(Money::try_from_decimal(1.005).is_err());
        assert!(Money::try_from_decimal(f64::NAN).is_err());
        assert!(Money::try_from_decimal(f64::INFINITY).is_err());
        assert!(Money::try_from_decimal(1e12).is_err());
    }

    #[test]
    fn test_serialize_as_decimal_number() {
        assert_eq!(serde_json::to_string(&Money::from_major(5)).unwrap(), "5");
        assert_eq!(serde_json::to_string(&Money::from_cents(1250)).unwrap(), "12.5");
    }

    #[test]
    fn test_deserialize_from_json_number_or_string() {
        let m: Money = serde_json::from_str("15").unwrap();
        assert_eq!(m.cents(), 1500);

        let m: Money = serde_json::from_str("12.75").unwrap();
        assert_eq!(m.cents(), 1275);

        let m: Money = serde_json::from_str("\"8.5\"").unwrap();
        assert_eq!(m.cents(), 850);

        assert!(serde_json::from_str::<Money>("1.234").is_err());
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert_eq!(Money::default(), Money::zero());
    }
}
