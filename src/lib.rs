//! OpenSASE Cart Sync
//!
//! Keeps a visitor's client-side cart and their stored cart in agreement.
//!
//! ## Features
//! - Accumulating add-to-cart with stock checks
//! - Idempotent guest/offline cart sync with conflict resolution
//! - Cart summary priced from the live catalog
//! - Checkout validation that reports every problem at once
//! - Postgres and in-memory cart stores

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod services;

use thiserror::Error;

use crate::domain::ports::{CatalogError, StoreError};

pub use crate::config::Config;
pub use crate::domain::aggregates::{CartLineItem, LocalCartItem, ProductSnapshot, RejectionReason, RejectionRecord};
pub use crate::domain::events::{CartEvent, EventSink, TracingEventSink};
pub use crate::domain::ports::{CartStore, PriceBook, StockLevel, StockOracle};
pub use crate::domain::resolver::{MergeConflict, Resolution, ResolutionPolicy, ResolutionReason, MAX_REASONABLE_QTY};
pub use crate::domain::value_objects::{LineItemId, Money, ProductId, UserId, VariantKey};
pub use crate::services::{CartService, CartSummary, CheckoutValidation, LineSource, MergedLine, SyncReport};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CartError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient stock for {product_name}: {available} available, {requested} requested")]
    InsufficientStock { available: u32, requested: u32, product_name: String },

    #[error("cart store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

impl CartError {
    pub fn validation(message: impl Into<String>) -> Self { Self::Validation(vec![message.into()]) }
}

impl From<StoreError> for CartError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("line item".to_string()),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<CatalogError> for CartError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => Self::NotFound(format!("product {id}")),
            CatalogError::Unavailable(msg) => Self::CatalogUnavailable(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, CartError>;
