//! # Catalog Rules
//!
//! Validation for items entering the inventory catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::InventoryItem;
use crate::validation::{
    validate_item_name, validate_price, validate_stock, validate_stock_value, ValidationResult,
};
use crate::DEFAULT_CATEGORY;

/// Add-item form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: Option<String>,
    pub stock: Option<i64>,
    pub price: Option<Money>,
    pub category: Option<String>,
}

/// An add-item request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub name: String,
    pub stock: i64,
    pub price: Money,
    pub category: String,
}

impl NewItem {
    pub fn new(name: &str, stock: i64, price: Money, category: &str) -> Self {
        NewItem {
            name: Some(name.to_string()),
            stock: Some(stock),
            price: Some(price),
            category: Some(category.to_string()),
        }
    }

    /// ## Rules
    /// - `name` required, trimmed, at most 200 characters
    /// - `stock` required, `0..=MAX_STOCK`
    /// - `price` required, `0 < price <= MAX_MONEY_CENTS`
    /// - `price * stock` at most `MAX_STOCK_VALUE_CENTS`
    /// - `category` defaults to `"general"`
    pub fn validate(&self) -> ValidationResult<ItemDraft> {
        let name = validate_item_name(self.name.as_deref().unwrap_or_default())?;
        let stock = self.stock.ok_or_else(|| ValidationError::required("stock"))?;
        validate_stock(stock)?;
        let price = self.price.ok_or_else(|| ValidationError::required("price"))?;
        validate_price(price)?;
        validate_stock_value(price, stock)?;

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();

        Ok(ItemDraft {
            name,
            stock,
            price,
            category,
        })
    }
}

impl ItemDraft {
    /// Creates the catalog item with a fresh id.
    pub fn into_item(self, now: DateTime<Utc>) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            stock: self.stock,
            price: self.price,
            category: self.category,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_defaults_category() {
        let draft = NewItem {
            name: Some("  Sterile Gauze ".to_string()),
            stock: Some(0),
            price: Some(Money::from_major(8)),
            category: None,
        }
        .validate()
        .unwrap();

        assert_eq!(draft.name, "Sterile Gauze");
        assert_eq!(draft.category, DEFAULT_CATEGORY);
        assert_eq!(draft.stock, 0);
    }

    #[test]
    fn test_validate_rejects() {
        let ok = NewItem::new("Gloves", 10, Money::from_major(1), "disposable");
        assert!(ok.validate().is_ok());

        assert!(NewItem { name: None, ..ok.clone() }.validate().is_err());
        assert!(NewItem { stock: None, ..ok.clone() }.validate().is_err());
        assert!(NewItem { stock: Some(-1), ..ok.clone() }.validate().is_err());
        assert!(NewItem { price: Some(Money::zero()), ..ok.clone() }.validate().is_err());
        assert!(NewItem { price: None, ..ok }.validate().is_err());
    }

    #[test]
    fn test_validate_value_limits() {
        use crate::money::MAX_MONEY_CENTS;
        use crate::MAX_STOCK;

        let max_price = Money::from_cents(MAX_MONEY_CENTS);
        assert!(NewItem::new("Scanner", 1, max_price, "equipment").validate().is_ok());
        assert!(NewItem::new("Swabs", MAX_STOCK, Money::from_cents(1), "disposable")
            .validate()
            .is_ok());

        let err = NewItem::new("Scanner", MAX_STOCK, max_price, "equipment")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert!(NewItem::new("Swabs", MAX_STOCK + 1, Money::from_cents(1), "disposable")
            .validate()
            .is_err());
        assert!(NewItem::new("Scanner", 1, Money::from_cents(MAX_MONEY_CENTS + 1), "equipment")
            .validate()
            .is_err());
    }

    #[test]
    fn test_into_item() {
        let now = Utc::now();
        let item = NewItem::new("Gloves", 10, Money::from_major(1), "disposable")
            .validate()
            .unwrap()
            .into_item(now);

        assert_eq!(item.created_at, now);
        assert_eq!(item.updated_at, now);
        assert!(!item.id.is_empty());
    }
}
