//! Per-organization filtering facade
//!
//! Loads filter configurations from the injected store, caches the
//! reconstructed filter set per organization, and runs content through a
//! request-scoped manager seeded from the cache. Administrative writes
//! persist first, then invalidate the cache entry so the next call reloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::filters::manager::{FilterManager, FilterMetrics, FilterMetricsSnapshot};
use crate::core::filters::plugins::{
    DenyFilterFactory, PiiFilterFactory, RegexFilterFactory, ResourceFilterFactory,
};
use crate::core::filters::registry::FilterRegistry;
use crate::core::filters::types::{Filter, FilterContent, FilterContext, FilterResult};
use crate::storage::records::{ContentFilterRecord, FilterViolationRecord};
use crate::storage::store::FilterStore;
use crate::utils::error::{GatewayError, Result};

type FilterSet = Arc<Vec<Arc<dyn Filter>>>;

/// Content filtering service with a per-organization configuration cache
pub struct FilterService {
    store: Arc<dyn FilterStore>,
    registry: Arc<FilterRegistry>,
    metrics: Arc<FilterMetrics>,
    // Reads take the shared lock on the request hot path; writes happen on
    // load/save/delete/reload. A cache miss queries the store outside the
    // lock, so two concurrent misses may both load; both writes derive from
    // the same durable state and are idempotent.
    org_filters: RwLock<HashMap<String, FilterSet>>,
    initialized: AtomicBool,
}

impl FilterService {
    /// Create a service around an injected store and registry
    pub fn new(store: Arc<dyn FilterStore>, registry: Arc<FilterRegistry>) -> Self {
        Self {
            store,
            registry,
            metrics: Arc::new(FilterMetrics::new()),
            org_filters: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Register the built-in plugin factories; safe to call more than once
    pub fn initialize(&self) -> Result<()> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        for factory in [
            Arc::new(PiiFilterFactory) as Arc<dyn crate::core::filters::types::FilterFactory>,
            Arc::new(ResourceFilterFactory),
            Arc::new(DenyFilterFactory),
            Arc::new(RegexFilterFactory),
        ] {
            match self.registry.register(factory) {
                Ok(()) => {}
                // Another component already registered this type
                Err(GatewayError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        info!("Filter service initialized with built-in plugin factories");
        Ok(())
    }

    /// The injected registry
    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    /// Run content through every filter configured for the organization
    pub async fn process_content(
        &self,
        ctx: &FilterContext,
        content: &FilterContent,
    ) -> Result<(FilterResult, FilterContent)> {
        self.ensure_organization_filters(&ctx.organization_id)
            .await?;

        let filters = {
            let cache = self.org_filters.read().await;
            cache.get(&ctx.organization_id).cloned()
        }
        .unwrap_or_else(|| Arc::new(Vec::new()));

        // Request-scoped manager over the shared filter instances
        let manager = FilterManager::with_metrics(Arc::clone(&self.metrics));
        for filter in filters.iter() {
            manager.add_filter(Arc::clone(filter))?;
        }

        manager.apply_filters(ctx, content)
    }

    /// Load an organization's enabled filters from the store and replace its
    /// cache entry
    pub async fn load_filters_from_store(&self, organization_id: &str) -> Result<()> {
        let records = self
            .store
            .list_enabled(organization_id)
            .await
            .map_err(|e| {
                GatewayError::Internal(format!(
                    "failed to load filters for organization '{}': {}",
                    organization_id, e
                ))
            })?;

        let mut filters: Vec<Arc<dyn Filter>> = Vec::with_capacity(records.len());
        for record in &records {
            filters.push(self.build_filter(record)?);
        }

        debug!(
            "Loaded {} filters for organization {}",
            filters.len(),
            organization_id
        );

        let mut cache = self.org_filters.write().await;
        cache.insert(organization_id.to_string(), Arc::new(filters));
        Ok(())
    }

    /// The cached filter set for an organization, loading on miss
    pub async fn get_organization_filters(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Arc<dyn Filter>>> {
        self.ensure_organization_filters(organization_id).await?;
        let cache = self.org_filters.read().await;
        Ok(cache
            .get(organization_id)
            .map(|set| set.to_vec())
            .unwrap_or_default())
    }

    /// Validate and persist a filter row, then drop the organization's cache
    /// entry so the next call reloads
    pub async fn save_filter(&self, record: ContentFilterRecord) -> Result<()> {
        record.validate()?;

        // An invalid configuration must never reach the store or the cache
        let factory = self.registry.get(record.filter_type)?;
        factory.validate_config(&record.config)?;

        self.store.upsert(&record).await?;
        self.invalidate(&record.organization_id).await;
        Ok(())
    }

    /// Delete a filter row, then drop the organization's cache entry
    pub async fn delete_filter(&self, organization_id: &str, name: &str) -> Result<()> {
        self.store.delete(organization_id, name).await?;
        self.invalidate(organization_id).await;
        Ok(())
    }

    /// Drop and reload an organization's cached filters
    pub async fn reload_organization_filters(&self, organization_id: &str) -> Result<()> {
        self.invalidate(organization_id).await;
        self.load_filters_from_store(organization_id).await
    }

    /// Append one violation row to the audit trail
    pub async fn log_violation(&self, violation: &FilterViolationRecord) -> Result<()> {
        self.store.append_violation(violation).await.map_err(|e| {
            GatewayError::Internal(format!("failed to log filter violation: {}", e))
        })
    }

    /// Page through an organization's violations, newest first
    pub async fn get_violations(
        &self,
        organization_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<FilterViolationRecord>> {
        self.store
            .list_violations(organization_id, limit, offset)
            .await
    }

    /// Store connectivity plus a populated registry
    pub async fn health_check(&self) -> Result<()> {
        self.store.ping().await?;
        if self.registry.is_empty() {
            return Err(GatewayError::Internal(
                "no filter types registered".to_string(),
            ));
        }
        Ok(())
    }

    /// Running counters across every pass this service ran
    pub fn metrics(&self) -> FilterMetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn ensure_organization_filters(&self, organization_id: &str) -> Result<()> {
        {
            let cache = self.org_filters.read().await;
            if cache.contains_key(organization_id) {
                return Ok(());
            }
        }
        self.load_filters_from_store(organization_id).await
    }

    async fn invalidate(&self, organization_id: &str) {
        let mut cache = self.org_filters.write().await;
        if cache.remove(organization_id).is_some() {
            debug!("Invalidated filter cache for organization {}", organization_id);
        }
    }

    /// Reconstruct a filter instance from its persisted row
    fn build_filter(&self, record: &ContentFilterRecord) -> Result<Arc<dyn Filter>> {
        let factory = self.registry.get(record.filter_type)?;

        let mut config = record.config.clone();
        config.insert(
            "name".to_string(),
            serde_json::Value::String(record.name.clone()),
        );

        let filter = factory.create(&config).map_err(|e| {
            warn!("Failed to build filter '{}': {}", record.name, e);
            GatewayError::Internal(format!(
                "failed to create filter instance for '{}': {}",
                record.name, e
            ))
        })?;

        filter.set_enabled(record.enabled);
        filter.set_priority(record.priority);
        Ok(filter)
    }
}
