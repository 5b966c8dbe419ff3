//! Postgres cart store and catalog reader.
//!
//! Absent variant selectors are stored as `''` so that the unique constraint
//! on `(user_id, product_id, color, size)` covers the "no variant" slot too.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::CartLineItem;
use crate::domain::ports::{CartStore, CatalogError, PriceBook, StockLevel, StockOracle, StoreError};
use crate::domain::value_objects::{LineItemId, ProductId, UserId, VariantKey};

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    user_id: String,
    product_id: Uuid,
    color: String,
    size: String,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartLineItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let user_id = UserId::parse(row.user_id)
            .map_err(|e| StoreError::Unavailable(format!("corrupt cart row {}: {e}", row.id)))?;
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| StoreError::Unavailable(format!("corrupt cart row {}: quantity {}", row.id, row.quantity)))?;
        Ok(CartLineItem {
            id: LineItemId::from_uuid(row.id),
            user_id,
            product_id: ProductId::from_uuid(row.product_id),
            variant: VariantKey::new(Some(&row.color), Some(&row.size)),
            quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const CART_COLUMNS: &str = "id, user_id, product_id, color, size, quantity, created_at, updated_at";

pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn selectors(variant: &VariantKey) -> (&str, &str) {
    (variant.color().unwrap_or(""), variant.size().unwrap_or(""))
}

fn to_db_quantity(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity).map_err(|_| StoreError::Unavailable(format!("quantity {quantity} out of range")))
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn list(&self, user: &UserId) -> Result<Vec<CartLineItem>, StoreError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CartLineItem::try_from).collect()
    }

    async fn find_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
    ) -> Result<Option<CartLineItem>, StoreError> {
        let (color, size) = selectors(variant);
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 AND product_id = $2 AND color = $3 AND size = $4"
        ))
        .bind(user.as_str())
        .bind(product.as_uuid())
        .bind(color)
        .bind(size)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CartLineItem::try_from).transpose()
    }

    async fn get(&self, id: LineItemId, user: &UserId) -> Result<Option<CartLineItem>, StoreError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CartLineItem::try_from).transpose()
    }

    async fn upsert_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
        quantity: u32,
    ) -> Result<CartLineItem, StoreError> {
        let (color, size) = selectors(variant);
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "INSERT INTO cart_items (id, user_id, product_id, color, size, quantity, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             ON CONFLICT (user_id, product_id, color, size) \
             DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW() \
             RETURNING {CART_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(user.as_str())
        .bind(product.as_uuid())
        .bind(color)
        .bind(size)
        .bind(to_db_quantity(quantity)?)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn compare_and_set_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
        expected: Option<u32>,
        quantity: u32,
    ) -> Result<Option<CartLineItem>, StoreError> {
        let (color, size) = selectors(variant);
        let row = match expected {
            Some(expected) => {
                sqlx::query_as::<_, CartItemRow>(&format!(
                    "UPDATE cart_items SET quantity = $5, updated_at = NOW() \
                     WHERE user_id = $1 AND product_id = $2 AND color = $3 AND size = $4 AND quantity = $6 \
                     RETURNING {CART_COLUMNS}"
                ))
                .bind(user.as_str())
                .bind(product.as_uuid())
                .bind(color)
                .bind(size)
                .bind(to_db_quantity(quantity)?)
                .bind(to_db_quantity(expected)?)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CartItemRow>(&format!(
                    "INSERT INTO cart_items (id, user_id, product_id, color, size, quantity, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
                     ON CONFLICT (user_id, product_id, color, size) DO NOTHING \
                     RETURNING {CART_COLUMNS}"
                ))
                .bind(Uuid::now_v7())
                .bind(user.as_str())
                .bind(product.as_uuid())
                .bind(color)
                .bind(size)
                .bind(to_db_quantity(quantity)?)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        row.map(CartLineItem::try_from).transpose()
    }

    async fn delete(&self, id: LineItemId, user: &UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn clear(&self, user: &UserId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    name: String,
    price: i64,
    inventory_quantity: i32,
    status: String,
}

/// Reads stock and prices from the catalog's `products` table. Prices are
/// stored in minor units.
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn product(&self, id: ProductId) -> Result<ProductRow, CatalogError> {
        sqlx::query_as::<_, ProductRow>("SELECT name, price, inventory_quantity, status FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }
}

#[async_trait]
impl StockOracle for PgCatalog {
    async fn get_stock(&self, product: ProductId) -> Result<StockLevel, CatalogError> {
        let row = self.product(product).await?;
        Ok(StockLevel {
            available: u32::try_from(row.inventory_quantity).unwrap_or(0),
            is_active: row.status == "active",
            name: row.name,
        })
    }
}

#[async_trait]
impl PriceBook for PgCatalog {
    async fn current_price(&self, product: ProductId) -> Result<Decimal, CatalogError> {
        Ok(Decimal::new(self.product(product).await?.price, 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(color: &str, size: &str, quantity: i32) -> CartItemRow {
        CartItemRow {
            id: Uuid::now_v7(),
            user_id: "u1".to_string(),
            product_id: Uuid::now_v7(),
            color: color.to_string(),
            size: size.to_string(),
            quantity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_blank_columns_map_to_no_variant() {
        let item = CartLineItem::try_from(row("", "", 2)).unwrap();
        assert_eq!(item.variant, VariantKey::none());
        assert_eq!(selectors(&item.variant), ("", ""));
    }

    #[test]
    fn test_variant_columns_round_trip() {
        let item = CartLineItem::try_from(row("Red", "M", 1)).unwrap();
        assert_eq!(selectors(&item.variant), ("Red", "M"));
    }

    #[test]
    fn test_negative_quantity_row_is_rejected() {
        assert!(matches!(CartLineItem::try_from(row("", "", -1)), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_quantity_range() {
        assert_eq!(to_db_quantity(7).unwrap(), 7);
        assert!(to_db_quantity(u32::MAX).is_err());
    }
}
