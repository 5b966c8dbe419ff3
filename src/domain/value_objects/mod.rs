//! Value Objects for the cart domain

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of the cart owner, as resolved by the auth gateway.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(value: impl Into<String>) -> Result<Self, UserIdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(UserIdError::Empty); }
        if value.len() > 128 { return Err(UserIdError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum UserIdError { Empty, TooLong }
impl std::error::Error for UserIdError {}
impl fmt::Display for UserIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "user id empty"), Self::TooLong => write!(f, "user id too long") }
    }
}

/// Reference to a catalog product. The catalog owns the product itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

impl ProductId {
    pub fn new() -> Self { Self(Uuid::now_v7()) }
    pub const fn from_uuid(id: Uuid) -> Self { Self(id) }
    pub const fn as_uuid(&self) -> Uuid { self.0 }
}

impl Default for ProductId { fn default() -> Self { Self::new() } }

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Stable identifier of a persisted cart line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(Uuid);

impl LineItemId {
    pub fn new() -> Self { Self(Uuid::now_v7()) }
    pub const fn from_uuid(id: Uuid) -> Self { Self(id) }
    pub const fn as_uuid(&self) -> Uuid { self.0 }
}

impl Default for LineItemId { fn default() -> Self { Self::new() } }

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Variant selector of a cart slot.
///
/// Blank selectors are normalized away, so a missing color and an empty
/// color name the same slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    color: Option<String>,
    size: Option<String>,
}

impl VariantKey {
    pub fn new(color: Option<&str>, size: Option<&str>) -> Self {
        Self { color: normalize(color), size: normalize(size) }
    }
    pub fn none() -> Self { Self::default() }
    pub fn color(&self) -> Option<&str> { self.color.as_deref() }
    pub fn size(&self) -> Option<&str> { self.size.as_deref() }
    pub fn is_empty(&self) -> bool { self.color.is_none() && self.size.is_none() }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.color(), self.size()) {
            (None, None) => write!(f, "default"),
            (Some(c), None) => write!(f, "{c}"),
            (None, Some(s)) => write!(f, "{s}"),
            (Some(c), Some(s)) => write!(f, "{c} / {s}"),
        }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("USD") } }

#[derive(Debug, Clone)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}
