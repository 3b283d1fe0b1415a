//! Core gateway functionality
//!
//! Contains the content filtering pipeline.

pub mod filters;
