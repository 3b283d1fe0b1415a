//! Utility modules for the Gateway
//!
//! - **error**: crate-wide error type and HTTP error mapping

pub mod error;

pub use error::{GatewayError, Result};
