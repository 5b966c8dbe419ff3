//! Aggregates module
pub mod cart;

pub use cart::{CartLineItem, LocalCartItem, ProductSnapshot, RejectionReason, RejectionRecord};
