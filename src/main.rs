//! OpenSASE Cart - cart synchronization service

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use opensase_cart::api::{self, AppState};
use opensase_cart::domain::events::{EventSink, TracingEventSink};
use opensase_cart::infrastructure::{NatsEventSink, PgCartStore, PgCatalog};
use opensase_cart::{CartService, Config, ResolutionPolicy};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::info!(?config, "configuration loaded");

    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let events: Arc<dyn EventSink> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => {
                tracing::info!(%url, subject = %config.events_subject, "publishing cart events to NATS");
                Arc::new(NatsEventSink::new(client, config.events_subject.clone()))
            }
            Err(e) => {
                tracing::warn!(error = %e, %url, "NATS unreachable, cart events go to the log only");
                Arc::new(TracingEventSink)
            }
        },
        None => Arc::new(TracingEventSink),
    };

    let catalog = Arc::new(PgCatalog::new(db.clone()));
    let cart = CartService::new(Arc::new(PgCartStore::new(db)), catalog.clone(), catalog)
        .with_events(events)
        .with_policy(ResolutionPolicy::with_ceiling(config.max_reasonable_quantity))
        .with_currency(&config.currency);

    let app = api::router(AppState::new(cart));
    let addr = config.socket_addr();
    tracing::info!("🚀 OpenSASE Cart listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
