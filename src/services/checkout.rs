//! Cart summary and the checkout gate.

use serde::Serialize;
use tracing::instrument;

use super::{label, CartService};
use crate::domain::aggregates::CartLineItem;
use crate::domain::ports::CatalogError;
use crate::domain::value_objects::{Money, UserId};
use crate::{CartError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Total units across all lines.
    pub item_count: u32,
    /// Number of lines.
    pub unique_item_count: usize,
    pub subtotal: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutValidation {
    pub items: Vec<CartLineItem>,
    pub summary: CartSummary,
}

impl CartService {
    /// Summarize the stored cart using current catalog prices.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn summarize(&self, user: &UserId) -> Result<CartSummary> {
        let items = self.store.list(user).await?;
        self.project(&items).await
    }

    /// Check every line of the cart and report all problems together.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn validate_for_checkout(&self, user: &UserId) -> Result<CheckoutValidation> {
        let items = self.store.list(user).await?;
        if items.is_empty() {
            return Err(CartError::validation("Cart is empty"));
        }

        let mut problems = Vec::new();
        for item in &items {
            match self.stock.get_stock(item.product_id).await {
                Ok(stock) if !stock.is_active => {
                    problems.push(format!("{} is no longer available", label(&stock.name, &item.variant)));
                }
                Ok(stock) if stock.available < item.quantity => {
                    problems.push(format!(
                        "Only {} of {} available, {} in cart",
                        stock.available,
                        label(&stock.name, &item.variant),
                        item.quantity
                    ));
                }
                Ok(_) => {}
                Err(CatalogError::NotFound(id)) => problems.push(format!("Product {id} is no longer available")),
                Err(CatalogError::Unavailable(msg)) => return Err(CartError::CatalogUnavailable(msg)),
            }
        }

        if !problems.is_empty() {
            tracing::info!(problems = problems.len(), "cart failed checkout validation");
            return Err(CartError::Validation(problems));
        }

        let summary = self.project(&items).await?;
        Ok(CheckoutValidation { items, summary })
    }

    async fn project(&self, items: &[CartLineItem]) -> Result<CartSummary> {
        let mut subtotal = Money::zero(&self.currency);
        for item in items {
            match self.prices.current_price(item.product_id).await {
                Ok(price) => {
                    let line = item.line_total(&Money::new(price, &self.currency));
                    subtotal = accumulate(subtotal, &line, item);
                }
                Err(CatalogError::NotFound(id)) => {
                    tracing::warn!(product_id = %id, "no current price, line left out of subtotal");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(CartSummary {
            item_count: items.iter().fold(0u32, |acc, i| acc.saturating_add(i.quantity)),
            unique_item_count: items.len(),
            subtotal,
        })
    }
}

/// Adds a line to the subtotal. A line in another currency is left out and
/// logged, the same way an unpriced line is.
fn accumulate(subtotal: Money, line: &Money, item: &CartLineItem) -> Money {
    match subtotal.add(line) {
        Ok(total) => total,
        Err(e) => {
            tracing::warn!(
                product_id = %item.product_id,
                line_currency = line.currency(),
                subtotal_currency = subtotal.currency(),
                error = %e,
                "line priced in another currency, left out of subtotal"
            );
            subtotal
        }
    }
}
