//! SeaORM entity definitions for the filter configuration store

pub mod content_filter;
pub mod filter_violation;

pub use content_filter::Entity as ContentFilter;
pub use filter_violation::Entity as FilterViolation;
