//! Shared fixtures for service and API tests.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::ports::CartStore;
use crate::domain::resolver::ResolutionPolicy;
use crate::domain::value_objects::{ProductId, UserId, VariantKey};
use crate::infrastructure::{InMemoryCartStore, InMemoryCatalog, RecordingEventSink};
use crate::services::CartService;

pub(crate) struct Harness {
    pub service: CartService,
    pub store: Arc<InMemoryCartStore>,
    pub catalog: Arc<InMemoryCatalog>,
    pub events: Arc<RecordingEventSink>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryCartStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let events = Arc::new(RecordingEventSink::new());
        let service = CartService::new(store.clone(), catalog.clone(), catalog.clone())
            .with_events(events.clone())
            .with_policy(ResolutionPolicy::default());
        Self { service, store, catalog, events }
    }

    pub async fn product(&self, name: &str, price_cents: i64, available: u32) -> ProductId {
        self.catalog.add_product(name, Decimal::new(price_cents, 2), available).await
    }

    /// Write a stored line directly, bypassing stock checks.
    pub async fn persist(&self, user: &UserId, product: ProductId, quantity: u32) {
        self.store.upsert_slot(user, product, &VariantKey::none(), quantity).await.unwrap();
    }

    pub async fn quantity(&self, user: &UserId, product: ProductId) -> Option<u32> {
        self.store.find_slot(user, product, &VariantKey::none()).await.unwrap().map(|i| i.quantity)
    }
}

pub(crate) fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}
