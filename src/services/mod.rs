//! Service layer
//!
//! Long-lived facades built over the core pipeline and storage contracts.

pub mod filter_service;

pub use filter_service::FilterService;
