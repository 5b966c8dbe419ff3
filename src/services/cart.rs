//! User-initiated cart edits.

use tracing::instrument;

use super::{ensure_fulfillable, CartService};
use crate::domain::aggregates::CartLineItem;
use crate::domain::events::{CartEvent, WriteCause};
use crate::domain::ports::StoreError;
use crate::domain::value_objects::{LineItemId, ProductId, UserId, VariantKey};
use crate::{CartError, Result};

/// Reads and conditional writes of one slot before an add gives up.
const MAX_SLOT_ATTEMPTS: u32 = 32;

impl CartService {
    pub async fn list_cart(&self, user: &UserId) -> Result<Vec<CartLineItem>> {
        Ok(self.store.list(user).await?)
    }

    /// Add `quantity` units of a slot. Adding to an existing slot accumulates.
    ///
    /// Nothing is written unless the accumulated quantity is in stock. The
    /// write only lands if the slot still holds the quantity it was read
    /// with; otherwise the slot is read again and stock checked again.
    #[instrument(skip(self), fields(user_id = %user, product_id = %product))]
    pub async fn add_to_cart(
        &self,
        user: &UserId,
        product: ProductId,
        quantity: u32,
        variant: VariantKey,
    ) -> Result<CartLineItem> {
        if quantity == 0 {
            return Err(CartError::validation("quantity must be greater than zero"));
        }

        let stock = self.stock.get_stock(product).await?;
        ensure_fulfillable(&stock, product, quantity)?;

        for attempt in 0..MAX_SLOT_ATTEMPTS {
            let previous = self.store.find_slot(user, product, &variant).await?.map(|i| i.quantity);
            let total = previous.map_or(quantity, |existing| existing.saturating_add(quantity));
            if previous.is_some() || attempt > 0 {
                let current = self.stock.get_stock(product).await?;
                ensure_fulfillable(&current, product, total)?;
            }

            let Some(item) = self.store.compare_and_set_slot(user, product, &variant, previous, total).await? else {
                tracing::debug!(attempt, ?previous, "slot changed while adding, retrying");
                continue;
            };
            tracing::debug!(?previous, quantity = item.quantity, "added to cart");
            self.emit(CartEvent::SlotWritten {
                user_id: user.clone(),
                line_item_id: item.id,
                product_id: product,
                variant,
                previous_quantity: previous,
                quantity: item.quantity,
                cause: WriteCause::AddToCart,
            });
            return Ok(item);
        }

        tracing::warn!(attempts = MAX_SLOT_ATTEMPTS, "slot kept changing, giving up");
        Err(CartError::StoreUnavailable(format!("cart slot for product {product} is under contention")))
    }

    /// Set the quantity of an existing line. Zero removes the line and returns `None`.
    #[instrument(skip(self), fields(user_id = %user, line_item_id = %id))]
    pub async fn set_quantity(&self, user: &UserId, id: LineItemId, quantity: u32) -> Result<Option<CartLineItem>> {
        let existing = self
            .store
            .get(id, user)
            .await?
            .ok_or_else(|| CartError::NotFound(format!("line item {id}")))?;

        if quantity == 0 {
            self.remove_item(user, id).await?;
            return Ok(None);
        }

        let stock = self.stock.get_stock(existing.product_id).await?;
        ensure_fulfillable(&stock, existing.product_id, quantity)?;

        let item = self.store.upsert_slot(user, existing.product_id, &existing.variant, quantity).await?;
        self.emit(CartEvent::SlotWritten {
            user_id: user.clone(),
            line_item_id: item.id,
            product_id: item.product_id,
            variant: item.variant.clone(),
            previous_quantity: Some(existing.quantity),
            quantity: item.quantity,
            cause: WriteCause::SetQuantity,
        });
        Ok(Some(item))
    }

    #[instrument(skip(self), fields(user_id = %user, line_item_id = %id))]
    pub async fn remove_item(&self, user: &UserId, id: LineItemId) -> Result<()> {
        self.store.delete(id, user).await.map_err(|e| match e {
            StoreError::NotFound => CartError::NotFound(format!("line item {id}")),
            other => other.into(),
        })?;
        self.emit(CartEvent::ItemRemoved { user_id: user.clone(), line_item_id: id });
        Ok(())
    }

    /// Remove every line. Called once an order has been placed from the cart.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn clear_cart(&self, user: &UserId) -> Result<u64> {
        let removed = self.store.clear(user).await?;
        self.emit(CartEvent::CartCleared { user_id: user.clone(), removed });
        Ok(removed)
    }
}
