//! Server bootstrap
//!
//! Connects the configured filter store, initializes the filter service,
//! and runs the HTTP server.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::core::filters::registry::FilterRegistry;
use crate::server::server::HttpServer;
use crate::server::state::AppState;
use crate::services::FilterService;
use crate::storage::database::SeaOrmFilterStore;
use crate::storage::memory::MemoryFilterStore;
use crate::storage::store::FilterStore;
use crate::utils::error::Result;

/// Build the filter service from configuration
pub async fn build_filter_service(config: &Config) -> Result<Arc<FilterService>> {
    let store: Arc<dyn FilterStore> = if config.database.enabled {
        let store = SeaOrmFilterStore::new(&config.database).await?;
        store.migrate().await?;
        Arc::new(store)
    } else {
        info!("Database disabled; using in-memory filter store");
        Arc::new(MemoryFilterStore::new())
    };

    let registry = Arc::new(FilterRegistry::new());
    let service = FilterService::new(store, registry);
    service.initialize()?;
    Ok(Arc::new(service))
}

/// Run the server with the given configuration
pub async fn run_server(config: Config) -> Result<()> {
    let filters = build_filter_service(&config).await?;
    let state = AppState::new(config.clone(), filters);

    info!("API Endpoints:");
    info!("   GET  /health - Health check");
    info!("   GET  /api/admin/filters/types - Filter type discovery");
    info!("   GET  /api/admin/filters - Organization filter list");
    info!("   POST /api/admin/filters - Create or update a filter");
    info!("   GET  /api/admin/filters/violations - Violation audit trail");
    info!("   POST /rpc/echo - Filtered echo endpoint");

    HttpServer::new(state.config.as_ref().clone(), state).start().await
}
