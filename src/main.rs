//! Storefront Orders service binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use storefront_orders::messaging::{EventPublisher, LogPublisher, NatsPublisher};
use storefront_orders::storage::postgres::PgDatabase;
use storefront_orders::{http, telemetry, AppState, Config};

async fn event_publisher(nats_url: Option<&str>) -> Arc<dyn EventPublisher> {
    let Some(url) = nats_url else {
        return Arc::new(LogPublisher);
    };
    match NatsPublisher::connect(url).await {
        Ok(publisher) => {
            info!(url, "publishing domain events to NATS");
            Arc::new(publisher)
        }
        Err(e) => {
            warn!(url, error = %e, "NATS unavailable, domain events will only be logged");
            Arc::new(LogPublisher)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init(config.log_format)?;

    let db = PgDatabase::connect(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to database")?;
    let events = event_publisher(config.nats_url.as_deref()).await;
    let state = AppState::new(Arc::new(db), config.pricing(), events, config.debug);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "storefront-orders listening");

    axum::serve(listener, http::router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
