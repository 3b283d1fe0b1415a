//! Content filtering pipeline
//!
//! The filtering core: value types and the filter contract, the four
//! built-in plugins, the factory registry, and the manager that composes
//! filters over one piece of content.
//!
//! Dependency order: types -> plugins -> registry -> manager; the
//! per-organization service facade lives in [`crate::services`].

pub mod manager;
pub mod plugins;
pub mod registry;
pub mod types;

pub use manager::{FilterManager, FilterMetrics, FilterMetricsSnapshot, merge_results};
pub use plugins::{
    DenyFilter, DenyFilterFactory, PiiDetector, PiiFilter, PiiFilterFactory, PiiMatch,
    RegexFilter, RegexFilterFactory, RegexPiiDetector, ResourceFilter, ResourceFilterFactory,
};
pub use registry::FilterRegistry;
pub use types::{
    ConfigMap, Filter, FilterAction, FilterCapabilities, FilterContent, FilterContext,
    FilterDirection, FilterFactory, FilterInfo, FilterResult, FilterType, FilterViolation,
    TransportKind,
};
