//! Filter factory registry
//!
//! Catalogue mapping each [`FilterType`] to the factory that builds configured
//! filter instances. Constructed explicitly and injected into the service at
//! start-up; populated once, then read concurrently without coordination.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::filters::types::{FilterFactory, FilterInfo, FilterType};
use crate::utils::error::{GatewayError, Result};

/// Process-wide catalogue of filter factories
#[derive(Default)]
pub struct FilterRegistry {
    factories: RwLock<HashMap<FilterType, Arc<dyn FilterFactory>>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for its filter type
    pub fn register(&self, factory: Arc<dyn FilterFactory>) -> Result<()> {
        let filter_type = factory.filter_type();
        let mut factories = self.factories.write();

        if factories.contains_key(&filter_type) {
            return Err(GatewayError::Conflict(format!(
                "filter type '{}' is already registered",
                filter_type
            )));
        }

        factories.insert(filter_type, factory);
        Ok(())
    }

    /// Look up the factory for a filter type
    pub fn get(&self, filter_type: FilterType) -> Result<Arc<dyn FilterFactory>> {
        self.factories
            .read()
            .get(&filter_type)
            .cloned()
            .ok_or_else(|| {
                GatewayError::NotFound(format!("filter type '{}' not found", filter_type))
            })
    }

    /// All registered filter types
    pub fn list(&self) -> Vec<FilterType> {
        self.factories.read().keys().copied().collect()
    }

    /// Whether any factory has been registered
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Discovery metadata for one filter type
    pub fn info(&self, filter_type: FilterType) -> Result<FilterInfo> {
        let factory = self.get(filter_type)?;

        // Build a throwaway instance from the defaults to read capabilities
        let probe = factory.create(&factory.default_config())?;

        Ok(FilterInfo {
            filter_type: factory.filter_type(),
            name: factory.name().to_string(),
            description: factory.description().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "filtergate".to_string(),
            config_schema: factory.config_schema(),
            capabilities: probe.capabilities(),
            default_config: factory.default_config(),
        })
    }

    /// Discovery metadata for every registered filter type
    pub fn all_info(&self) -> Result<Vec<FilterInfo>> {
        let types = self.list();
        let mut infos = Vec::with_capacity(types.len());
        for filter_type in types {
            infos.push(self.info(filter_type)?);
        }
        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::plugins::DenyFilterFactory;

    #[test]
    fn test_register_and_get() {
        let registry = FilterRegistry::new();
        registry
            .register(Arc::new(DenyFilterFactory))
            .expect("register deny factory");

        assert!(registry.get(FilterType::Deny).is_ok());
        assert!(registry.get(FilterType::Pii).is_err());
        assert_eq!(registry.list(), vec![FilterType::Deny]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = FilterRegistry::new();
        registry.register(Arc::new(DenyFilterFactory)).unwrap();

        let err = registry.register(Arc::new(DenyFilterFactory)).unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
    }

    #[test]
    fn test_info_exposes_defaults_and_capabilities() {
        let registry = FilterRegistry::new();
        registry.register(Arc::new(DenyFilterFactory)).unwrap();

        let info = registry.info(FilterType::Deny).unwrap();
        assert_eq!(info.filter_type, FilterType::Deny);
        assert!(info.capabilities.supports_blocking);
        assert!(info.config_schema.is_object());
    }
}
