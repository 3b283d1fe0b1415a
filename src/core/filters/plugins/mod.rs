//! Built-in content filter plugins
//!
//! Each plugin pairs a serde config model with an atomically swappable
//! compiled form: `configure` builds the whole compiled state up front and
//! swaps it in only on success, so a failed reconfiguration leaves the
//! previous matchers in effect.

mod deny;
mod pii;
mod regex_filter;
mod resource;

pub use deny::{DenyFilter, DenyFilterFactory};
pub use pii::{PiiDetector, PiiFilter, PiiFilterFactory, PiiMatch, RegexPiiDetector};
pub use regex_filter::{RegexFilter, RegexFilterFactory};
pub use resource::{ResourceFilter, ResourceFilterFactory};

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use parking_lot::RwLock;

use crate::core::filters::types::{ConfigMap, FilterCapabilities};

/// Identity fields shared by every plugin
pub(crate) struct FilterBase {
    name: String,
    enabled: AtomicBool,
    priority: AtomicI32,
    capabilities: FilterCapabilities,
    config: RwLock<ConfigMap>,
}

impl FilterBase {
    pub(crate) fn new(name: String, priority: i32, capabilities: FilterCapabilities) -> Self {
        Self {
            name,
            enabled: AtomicBool::new(true),
            priority: AtomicI32::new(priority),
            capabilities,
            config: RwLock::new(ConfigMap::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn priority(&self) -> i32 {
        self.priority.load(Ordering::Relaxed)
    }

    pub(crate) fn set_priority(&self, priority: i32) {
        self.priority.store(priority, Ordering::Relaxed);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn capabilities(&self) -> FilterCapabilities {
        self.capabilities.clone()
    }

    pub(crate) fn config(&self) -> ConfigMap {
        self.config.read().clone()
    }

    pub(crate) fn set_config(&self, config: &ConfigMap) {
        *self.config.write() = config.clone();
    }
}

/// Read the filter instance name out of a configuration document
pub(crate) fn name_from_config(config: &ConfigMap, fallback: &str) -> String {
    config
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Deserialize a configuration document into a typed config model
pub(crate) fn parse_config<T: serde::de::DeserializeOwned>(
    config: &ConfigMap,
) -> crate::utils::error::Result<T> {
    serde_json::from_value(serde_json::Value::Object(config.clone())).map_err(|e| {
        crate::utils::error::GatewayError::Validation(format!("invalid filter config: {}", e))
    })
}
