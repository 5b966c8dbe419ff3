//! Boundaries to the systems the cart depends on.
//!
//! Every call here may suspend and may fail; callers decide whether a
//! failure is per-item or fatal.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::aggregates::CartLineItem;
use crate::domain::value_objects::{LineItemId, ProductId, UserId, VariantKey};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("line item not found")]
    NotFound,

    #[error("cart store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self { Self::Unavailable(err.to_string()) }
}

/// Current stock position of a product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockLevel {
    pub available: u32,
    pub is_active: bool,
    pub name: String,
}

impl StockLevel {
    pub fn can_fulfil(&self, quantity: u32) -> bool { self.is_active && self.available >= quantity }
}

/// Durable per-user cart lines.
///
/// `upsert_slot` and `compare_and_set_slot` must be atomic per
/// `(user, product, variant)`: two concurrent calls for the same slot never
/// produce two rows.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// All lines of a user in creation order.
    async fn list(&self, user: &UserId) -> Result<Vec<CartLineItem>, StoreError>;

    async fn find_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
    ) -> Result<Option<CartLineItem>, StoreError>;

    /// A line by id, only if `user` owns it.
    async fn get(&self, id: LineItemId, user: &UserId) -> Result<Option<CartLineItem>, StoreError>;

    /// Replaces the quantity of an existing slot or creates it. Never adds.
    async fn upsert_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
        quantity: u32,
    ) -> Result<CartLineItem, StoreError>;

    /// Writes `quantity` only if the slot still holds `expected`, where `None`
    /// means the slot must not exist yet. Returns `None` when the slot moved
    /// on, leaving it untouched.
    async fn compare_and_set_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
        expected: Option<u32>,
        quantity: u32,
    ) -> Result<Option<CartLineItem>, StoreError>;

    async fn delete(&self, id: LineItemId, user: &UserId) -> Result<(), StoreError>;

    /// Removes every line of a user and returns how many were removed.
    async fn clear(&self, user: &UserId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait StockOracle: Send + Sync {
    async fn get_stock(&self, product: ProductId) -> Result<StockLevel, CatalogError>;
}

#[async_trait]
pub trait PriceBook: Send + Sync {
    async fn current_price(&self, product: ProductId) -> Result<Decimal, CatalogError>;
}
