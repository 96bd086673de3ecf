mod cache;
mod config;
mod db;
mod enrichment;
mod errors;
mod models;
mod pipeline;
mod reconcile;
mod routes;
mod state;
mod storage;
mod store;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::AtsCache;
use crate::config::Config;
use crate::db::create_pool;
use crate::enrichment::EnrichmentClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::StorageLocator;
use crate::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set, using the in-process store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let enrichment = EnrichmentClient::new(&config.enrichment_api_url, config.enrichment_timeout)
        .context("Failed to build enrichment HTTP client")?
        .with_max_attempts(config.enrichment_max_attempts);
    info!("Enrichment client initialized ({})", config.enrichment_api_url);

    let state = AppState {
        store,
        enrichment: Arc::new(enrichment),
        cache: Arc::new(AtsCache::new()),
        storage: StorageLocator::new(&config.storage_public_url, &config.storage_bucket),
        config: config.clone(),
    };
    state
        .cache
        .refresh(state.store.as_ref())
        .await
        .context("Initial cache load failed")?;

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
