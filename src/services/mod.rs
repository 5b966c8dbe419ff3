//! Cart application service.
//!
//! `CartService` ties the cart store, the catalog and the event sink
//! together. Its operations are split by concern:
//! - `cart`: user-initiated edits (add, set quantity, remove, clear)
//! - `sync`: reconciling a client cart with the stored one
//! - `checkout`: summary projection and the checkout gate

mod cart;
mod checkout;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::domain::events::{CartEvent, EventSink, TracingEventSink};
use crate::domain::ports::{CartStore, PriceBook, StockLevel, StockOracle};
use crate::domain::resolver::ResolutionPolicy;
use crate::domain::value_objects::{ProductId, VariantKey};
use crate::CartError;

pub use checkout::{CartSummary, CheckoutValidation};
pub use sync::{LineSource, MergedLine, SyncReport};

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    stock: Arc<dyn StockOracle>,
    prices: Arc<dyn PriceBook>,
    events: Arc<dyn EventSink>,
    policy: ResolutionPolicy,
    currency: String,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>, stock: Arc<dyn StockOracle>, prices: Arc<dyn PriceBook>) -> Self {
        Self {
            store,
            stock,
            prices,
            events: Arc::new(TracingEventSink),
            policy: ResolutionPolicy::default(),
            currency: "USD".to_string(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    pub fn policy(&self) -> ResolutionPolicy { self.policy }

    fn emit(&self, event: CartEvent) { self.events.emit(&event); }
}

/// "Mug" or "Mug (Red / M)".
pub(crate) fn label(name: &str, variant: &VariantKey) -> String {
    if variant.is_empty() { name.to_string() } else { format!("{name} ({variant})") }
}

/// Checks a user-requested quantity against a stock level.
fn ensure_fulfillable(stock: &StockLevel, product: ProductId, quantity: u32) -> Result<(), CartError> {
    if !stock.is_active {
        return Err(CartError::NotFound(format!("product {product} ({}) is not available", stock.name)));
    }
    if stock.available < quantity {
        return Err(CartError::InsufficientStock {
            available: stock.available,
            requested: quantity,
            product_name: stock.name.clone(),
        });
    }
    Ok(())
}
