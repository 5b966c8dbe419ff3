//! In-memory cart store and catalog.
//!
//! Used by the test suite and for embedding the service without Postgres.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::aggregates::CartLineItem;
use crate::domain::events::{CartEvent, EventSink};
use crate::domain::ports::{CartStore, CatalogError, PriceBook, StockLevel, StockOracle, StoreError};
use crate::domain::value_objects::{LineItemId, ProductId, UserId, VariantKey};

/// Cart store keeping every user's lines in one map.
///
/// Each mutation holds the write lock for its whole read-modify-write, which
/// gives the per-slot atomicity the slot writes require.
#[derive(Default)]
pub struct InMemoryCartStore {
    carts: RwLock<HashMap<UserId, Vec<CartLineItem>>>,
    unavailable: AtomicBool,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn list(&self, user: &UserId) -> Result<Vec<CartLineItem>, StoreError> {
        self.check_available()?;
        Ok(self.carts.read().await.get(user).cloned().unwrap_or_default())
    }

    async fn find_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
    ) -> Result<Option<CartLineItem>, StoreError> {
        self.check_available()?;
        let carts = self.carts.read().await;
        Ok(carts
            .get(user)
            .and_then(|items| items.iter().find(|i| i.occupies(product, variant)))
            .cloned())
    }

    async fn get(&self, id: LineItemId, user: &UserId) -> Result<Option<CartLineItem>, StoreError> {
        self.check_available()?;
        let carts = self.carts.read().await;
        Ok(carts.get(user).and_then(|items| items.iter().find(|i| i.id == id)).cloned())
    }

    async fn upsert_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
        quantity: u32,
    ) -> Result<CartLineItem, StoreError> {
        self.check_available()?;
        let mut carts = self.carts.write().await;
        let items = carts.entry(user.clone()).or_default();
        if let Some(existing) = items.iter_mut().find(|i| i.occupies(product, variant)) {
            existing.set_quantity(quantity);
            return Ok(existing.clone());
        }
        let item = CartLineItem::new(user.clone(), product, variant.clone(), quantity);
        items.push(item.clone());
        Ok(item)
    }

    async fn compare_and_set_slot(
        &self,
        user: &UserId,
        product: ProductId,
        variant: &VariantKey,
        expected: Option<u32>,
        quantity: u32,
    ) -> Result<Option<CartLineItem>, StoreError> {
        self.check_available()?;
        let mut carts = self.carts.write().await;
        let items = carts.entry(user.clone()).or_default();
        if let Some(existing) = items.iter_mut().find(|i| i.occupies(product, variant)) {
            if expected != Some(existing.quantity) {
                return Ok(None);
            }
            existing.set_quantity(quantity);
            return Ok(Some(existing.clone()));
        }
        if expected.is_some() {
            return Ok(None);
        }
        let item = CartLineItem::new(user.clone(), product, variant.clone(), quantity);
        items.push(item.clone());
        Ok(Some(item))
    }

    async fn delete(&self, id: LineItemId, user: &UserId) -> Result<(), StoreError> {
        self.check_available()?;
        let mut carts = self.carts.write().await;
        let items = carts.get_mut(user).ok_or(StoreError::NotFound)?;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn clear(&self, user: &UserId) -> Result<u64, StoreError> {
        self.check_available()?;
        let removed = self.carts.write().await.remove(user).map_or(0, |items| items.len());
        Ok(removed as u64)
    }
}

#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub name: String,
    pub price: Decimal,
    pub available: u32,
    pub is_active: bool,
}

/// Catalog backed by a map, serving both stock and price lookups.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, CatalogEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active product and return its id.
    pub async fn add_product(&self, name: &str, price: Decimal, available: u32) -> ProductId {
        let id = ProductId::new();
        self.upsert(id, CatalogEntry { name: name.to_string(), price, available, is_active: true }).await;
        id
    }

    pub async fn upsert(&self, id: ProductId, entry: CatalogEntry) {
        self.products.write().await.insert(id, entry);
    }

    pub async fn set_stock(&self, id: ProductId, available: u32) {
        if let Some(entry) = self.products.write().await.get_mut(&id) {
            entry.available = available;
        }
    }

    pub async fn set_price(&self, id: ProductId, price: Decimal) {
        if let Some(entry) = self.products.write().await.get_mut(&id) {
            entry.price = price;
        }
    }

    pub async fn deactivate(&self, id: ProductId) {
        if let Some(entry) = self.products.write().await.get_mut(&id) {
            entry.is_active = false;
        }
    }

    pub async fn remove(&self, id: ProductId) {
        self.products.write().await.remove(&id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    async fn entry(&self, id: ProductId) -> Result<CatalogEntry, CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("in-memory catalog marked unavailable".to_string()));
        }
        self.products.read().await.get(&id).cloned().ok_or(CatalogError::NotFound(id))
    }
}

#[async_trait]
impl StockOracle for InMemoryCatalog {
    async fn get_stock(&self, product: ProductId) -> Result<StockLevel, CatalogError> {
        let entry = self.entry(product).await?;
        Ok(StockLevel { available: entry.available, is_active: entry.is_active, name: entry.name })
    }
}

#[async_trait]
impl PriceBook for InMemoryCatalog {
    async fn current_price(&self, product: ProductId) -> Result<Decimal, CatalogError> {
        Ok(self.entry(product).await?.price)
    }
}

/// Keeps every emitted event, for assertions.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<CartEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CartEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(CartEvent::kind).collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &CartEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
