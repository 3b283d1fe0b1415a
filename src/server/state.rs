//! Application state shared across HTTP handlers

use std::sync::Arc;

use crate::config::Config;
use crate::services::FilterService;

/// HTTP server state shared across handlers
///
/// All fields are wrapped in Arc for efficient sharing across threads.
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration (shared read-only)
    pub config: Arc<Config>,
    /// Content filtering service
    pub filters: Arc<FilterService>,
}

impl AppState {
    /// Create a new AppState with shared resources
    pub fn new(config: Config, filters: Arc<FilterService>) -> Self {
        Self {
            config: Arc::new(config),
            filters,
        }
    }
}
