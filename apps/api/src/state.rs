use std::sync::Arc;

use tracing::error;

use crate::cache::AtsCache;
use crate::config::Config;
use crate::enrichment::EnrichmentService;
use crate::storage::StorageLocator;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres in production, in-process when no database is configured.
    pub store: Arc<dyn Store>,
    pub enrichment: Arc<dyn EnrichmentService>,
    pub cache: Arc<AtsCache>,
    pub storage: StorageLocator,
    pub config: Config,
}

impl AppState {
    /// Reloads the cached view after a committed write. A failed reload is
    /// logged; the write itself already succeeded.
    pub async fn refresh_cache(&self) {
        if let Err(e) = self.cache.refresh(self.store.as_ref()).await {
            error!(error = %e, "Failed to refresh ATS cache");
        }
    }
}
