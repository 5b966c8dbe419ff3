//! Adapters for the cart ports: Postgres, in-memory and NATS.

pub mod memory;
pub mod nats;
pub mod postgres;

pub use memory::{InMemoryCartStore, InMemoryCatalog, RecordingEventSink};
pub use nats::NatsEventSink;
pub use postgres::{PgCartStore, PgCatalog};
