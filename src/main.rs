//! Bazaar Setu - B2B marketplace backend

use anyhow::Result;
use bazaar_setu::config::Config;
use bazaar_setu::messaging::{EventPublisher, NatsPublisher, NoopPublisher};
use bazaar_setu::store::{InMemoryStore, PgStore};
use bazaar_setu::{http, Marketplace};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client)),
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable, events will be dropped");
                Arc::new(NoopPublisher)
            }
        },
        None => Arc::new(NoopPublisher),
    };

    let marketplace = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections, config.lock_timeout).await?;
            store.migrate().await?;
            tracing::info!("using PostgreSQL store");
            Marketplace::new(store, events, &config.currency)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Marketplace::new(InMemoryStore::new(config.lock_timeout), events, &config.currency)
        }
    };

    let app = http::router(marketplace);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Bazaar Setu listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
