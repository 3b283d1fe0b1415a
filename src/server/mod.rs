//! HTTP server implementation
//!
//! This module provides the HTTP server, routing, and the content filtering
//! middleware pair.

pub mod builder;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use builder::{build_filter_service, run_server};
pub use server::HttpServer;
pub use state::AppState;
