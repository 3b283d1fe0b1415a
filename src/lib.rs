//! # filtergate
//!
//! Content filtering and policy enforcement pipeline for API gateways.
//! Scans inbound requests (and optionally outbound responses) for content
//! violating tenant-defined policy and resolves a verdict per message:
//! allow, warn, audit, or block, optionally rewriting the payload.
//!
//! ## Features
//!
//! - **Pluggable filters**: deny (vocabulary/pattern), regex
//!   (scan-and-transform), resource (URL/network policy), and PII
//!   (detection and masking behind a detector seam)
//! - **Per-tenant configuration**: each organization owns its filter set,
//!   cached and reloaded on change
//! - **Ordered composition**: filters run in priority order over evolving
//!   content with most-severe-action conflict resolution
//! - **Violation auditing**: append-only, paginated audit trail per
//!   organization
//! - **HTTP adapter**: Actix middleware that buffers, filters, and rewrites
//!   request and response bodies
//!
//! ## Library usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use filtergate::core::filters::{FilterContent, FilterContext, FilterDirection, FilterRegistry};
//! use filtergate::services::FilterService;
//! use filtergate::storage::MemoryFilterStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = FilterService::new(
//!         Arc::new(MemoryFilterStore::new()),
//!         Arc::new(FilterRegistry::new()),
//!     );
//!     service.initialize()?;
//!
//!     let ctx = FilterContext::new("req-1", "org-1", FilterDirection::Inbound);
//!     let content = FilterContent::from_raw("Please review https://example.com");
//!     let (result, _content) = service.process_content(&ctx, &content).await?;
//!     println!("blocked: {}", result.blocked);
//!     Ok(())
//! }
//! ```
//!
//! ## Gateway mode
//!
//! ```rust,no_run
//! use filtergate::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/gateway.yaml").await?;
//!     filtergate::server::run_server(config).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

// Public module exports
pub mod config;
pub mod core;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use utils::error::{GatewayError, Result};

pub use crate::core::filters::{
    Filter, FilterAction, FilterContent, FilterContext, FilterDirection, FilterManager,
    FilterRegistry, FilterResult, FilterType, FilterViolation,
};
pub use services::FilterService;
pub use storage::{ContentFilterRecord, FilterStore, FilterViolationRecord};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(NAME, "filtergate");
    }
}
