//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{LineItemId, Money, ProductId, UserId, VariantKey};

/// A persisted cart line. One per `(user_id, product_id, variant)` slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: LineItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    #[serde(flatten)]
    pub variant: VariantKey,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLineItem {
    pub fn new(user_id: UserId, product_id: ProductId, variant: VariantKey, quantity: u32) -> Self {
        let now = Utc::now();
        Self { id: LineItemId::new(), user_id, product_id, variant, quantity, created_at: now, updated_at: now }
    }

    pub fn occupies(&self, product_id: ProductId, variant: &VariantKey) -> bool {
        self.product_id == product_id && &self.variant == variant
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.updated_at = Utc::now();
    }

    pub fn line_total(&self, unit_price: &Money) -> Money { unit_price.multiply(self.quantity) }
}

/// Name and price the client had on hand. Only used to label messages.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: Option<Decimal>,
}

/// One line of the client-side cart, as sent at sync time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalCartItem {
    pub product_id: ProductId,
    /// Signed so that a corrupted client value can be rejected per item.
    pub quantity: i64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub product: Option<ProductSnapshot>,
}

impl LocalCartItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self { product_id, quantity, color: None, size: None, product: None }
    }

    pub fn with_variant(mut self, color: Option<&str>, size: Option<&str>) -> Self {
        self.color = color.map(str::to_string);
        self.size = size.map(str::to_string);
        self
    }

    pub fn with_snapshot(mut self, name: impl Into<String>, price: Option<Decimal>) -> Self {
        self.product = Some(ProductSnapshot { name: name.into(), price });
        self
    }

    pub fn variant(&self) -> VariantKey { VariantKey::new(self.color.as_deref(), self.size.as_deref()) }

    pub fn snapshot_name(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.name.as_str()).filter(|n| !n.is_empty())
    }

    /// The quantity as a positive count, or `None` when it cannot be one.
    pub fn positive_quantity(&self) -> Option<u32> {
        u32::try_from(self.quantity).ok().filter(|q| *q > 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    InvalidQuantity,
    ProductUnavailable,
    InsufficientStock,
    CatalogUnavailable,
}

/// A local item that sync could not apply. The stored slot is left as it was.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub variant: VariantKey,
    pub product_name: Option<String>,
    pub reason: RejectionReason,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_line_item_slot() {
        let product = ProductId::new();
        let item = CartLineItem::new(UserId::parse("u1").unwrap(), product, VariantKey::new(Some("Red"), None), 2);
        assert!(item.occupies(product, &VariantKey::new(Some("Red"), Some(""))));
        assert!(!item.occupies(product, &VariantKey::none()));
        assert_eq!(item.created_at, item.updated_at);
    }
    #[test]
    fn test_line_total() {
        let item = CartLineItem::new(UserId::parse("u1").unwrap(), ProductId::new(), VariantKey::none(), 3);
        assert_eq!(item.line_total(&Money::usd(Decimal::new(250, 2))).amount(), Decimal::new(750, 2));
    }
    #[test]
    fn test_local_item_quantity() {
        let p = ProductId::new();
        assert_eq!(LocalCartItem::new(p, 3).positive_quantity(), Some(3));
        assert_eq!(LocalCartItem::new(p, 0).positive_quantity(), None);
        assert_eq!(LocalCartItem::new(p, -2).positive_quantity(), None);
        assert_eq!(LocalCartItem::new(p, i64::MAX).positive_quantity(), None);
    }
    #[test]
    fn test_local_item_deserializes_without_optional_fields() {
        let json = format!(r#"{{"product_id":"{}","quantity":2}}"#, ProductId::new());
        let item: LocalCartItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item.variant(), VariantKey::none());
        assert_eq!(item.snapshot_name(), None);
    }
}
