//! Filter manager: ordered multi-filter composition
//!
//! Holds a name-keyed set of filters and applies every enabled filter whose
//! capabilities match the request to one piece of content, threading mutated
//! content through the chain and merging the per-filter results.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::core::filters::types::{Filter, FilterContent, FilterContext, FilterResult};
use crate::utils::error::{GatewayError, Result};

/// Running counters shared across manager instances
///
/// Counters are atomic so concurrently handled requests can update them
/// without a lock on the hot path.
#[derive(Default)]
pub struct FilterMetrics {
    requests: AtomicU64,
    blocked: AtomicU64,
    modified: AtomicU64,
    violations: AtomicU64,
    violations_by_type: DashMap<String, u64>,
}

impl FilterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_pass(&self, results: &[FilterResult]) {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let mut blocked = false;
        let mut modified = false;
        let mut violations = 0u64;
        for result in results {
            blocked |= result.blocked;
            modified |= result.modified;
            violations += result.violations.len() as u64;
            for violation in &result.violations {
                *self
                    .violations_by_type
                    .entry(violation.violation_type.clone())
                    .or_insert(0) += 1;
            }
        }

        if blocked {
            self.blocked.fetch_add(1, Ordering::Relaxed);
        }
        if modified {
            self.modified.fetch_add(1, Ordering::Relaxed);
        }
        self.violations.fetch_add(violations, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> FilterMetricsSnapshot {
        FilterMetricsSnapshot {
            total_requests: self.requests.load(Ordering::Relaxed),
            total_blocked: self.blocked.load(Ordering::Relaxed),
            total_modified: self.modified.load(Ordering::Relaxed),
            total_violations: self.violations.load(Ordering::Relaxed),
            violations_by_type: self
                .violations_by_type
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct FilterMetricsSnapshot {
    pub total_requests: u64,
    pub total_blocked: u64,
    pub total_modified: u64,
    pub total_violations: u64,
    pub violations_by_type: HashMap<String, u64>,
}

/// Ordered collection of filters applied to one piece of content
pub struct FilterManager {
    filters: RwLock<HashMap<String, Arc<dyn Filter>>>,
    metrics: Arc<FilterMetrics>,
}

impl FilterManager {
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(FilterMetrics::new()))
    }

    /// Build a manager that records into shared counters; used by the service
    /// so request-scoped managers feed one set of totals.
    pub fn with_metrics(metrics: Arc<FilterMetrics>) -> Self {
        Self {
            filters: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Add a filter; names must be unique within the manager
    pub fn add_filter(&self, filter: Arc<dyn Filter>) -> Result<()> {
        let name = filter.name().to_string();
        if name.is_empty() {
            return Err(GatewayError::Validation(
                "filter name cannot be empty".to_string(),
            ));
        }

        let mut filters = self.filters.write();
        if filters.contains_key(&name) {
            return Err(GatewayError::Conflict(format!(
                "filter '{}' is already registered",
                name
            )));
        }
        filters.insert(name, filter);
        Ok(())
    }

    pub fn remove_filter(&self, name: &str) -> Result<()> {
        if self.filters.write().remove(name).is_none() {
            return Err(GatewayError::NotFound(format!(
                "filter '{}' not found",
                name
            )));
        }
        Ok(())
    }

    pub fn get_filter(&self, name: &str) -> Result<Arc<dyn Filter>> {
        self.filters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("filter '{}' not found", name)))
    }

    pub fn list_filters(&self) -> Vec<Arc<dyn Filter>> {
        self.filters.read().values().cloned().collect()
    }

    pub fn enable_filter(&self, name: &str) -> Result<()> {
        self.get_filter(name)?.set_enabled(true);
        Ok(())
    }

    pub fn disable_filter(&self, name: &str) -> Result<()> {
        self.get_filter(name)?.set_enabled(false);
        Ok(())
    }

    /// Apply all applicable filters and merge their results
    pub fn apply_filters(
        &self,
        ctx: &FilterContext,
        content: &FilterContent,
    ) -> Result<(FilterResult, FilterContent)> {
        let (results, content) = self.apply_filters_in_order(ctx, content)?;
        Ok((merge_results(&results), content))
    }

    /// Apply all applicable filters in ascending priority order, returning
    /// the per-filter results for attribution
    pub fn apply_filters_in_order(
        &self,
        ctx: &FilterContext,
        content: &FilterContent,
    ) -> Result<(Vec<FilterResult>, FilterContent)> {
        let filters = self.enabled_filters_sorted();

        let mut results = Vec::with_capacity(filters.len());
        let mut current = content.clone();

        for filter in filters {
            let capabilities = filter.capabilities();
            if !capabilities.supports_direction(ctx.direction)
                || !capabilities.supports_content_type(&ctx.content_type)
            {
                continue;
            }

            let (result, modified_content) = filter.apply(ctx, &current).map_err(|e| {
                GatewayError::Internal(format!("filter '{}' failed: {}", filter.name(), e))
            })?;

            if result.modified {
                if let Some(modified_content) = modified_content {
                    current = modified_content;
                }
            }

            results.push(result);
        }

        self.metrics.record_pass(&results);
        Ok((results, current))
    }

    /// Metrics snapshot for this manager's counter set
    pub fn stats(&self) -> FilterMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn enabled_filters_sorted(&self) -> Vec<Arc<dyn Filter>> {
        let mut filters: Vec<Arc<dyn Filter>> = self
            .filters
            .read()
            .values()
            .filter(|f| f.is_enabled())
            .cloned()
            .collect();
        // Lower priority value runs first; names break ties for stable order
        filters.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
        filters
    }
}

impl Default for FilterManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge per-filter results into one aggregate
///
/// blocked and modified OR together; violations concatenate in evaluation
/// order; the action is the most severe seen; the reason is the first
/// blocking reason, falling back to a violation-count summary.
pub fn merge_results(results: &[FilterResult]) -> FilterResult {
    if results.is_empty() {
        return FilterResult::allow();
    }
    if results.len() == 1 {
        return results[0].clone();
    }

    let mut merged = FilterResult::allow();
    for result in results {
        merged.blocked |= result.blocked;
        merged.modified |= result.modified;
        merged.action = merged.action.max(result.action);
        merged.violations.extend(result.violations.iter().cloned());
    }

    if let Some(blocking) = results.iter().find(|r| r.blocked && !r.reason.is_empty()) {
        merged.reason = blocking.reason.clone();
    } else if !merged.violations.is_empty() {
        merged.reason = format!(
            "{} violations found across {} filters",
            merged.violations.len(),
            results.len()
        );
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::plugins::{DenyFilter, RegexFilter};
    use crate::core::filters::types::{ConfigMap, FilterAction, FilterDirection};
    use serde_json::json;

    fn config(value: serde_json::Value) -> ConfigMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("config must be an object"),
        }
    }

    fn ctx() -> FilterContext {
        FilterContext::new("req-1", "org-1", FilterDirection::Inbound)
    }

    fn deny(name: &str, word: &str, action: &str) -> Arc<dyn Filter> {
        Arc::new(
            DenyFilter::new(
                name,
                &config(json!({"blocked_words": [word], "action": action})),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let manager = FilterManager::new();
        manager.add_filter(deny("a", "x", "warn")).unwrap();
        let err = manager.add_filter(deny("a", "y", "warn")).unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
    }

    #[test]
    fn test_block_and_warn_merge() {
        let manager = FilterManager::new();
        manager.add_filter(deny("blocker", "alpha", "block")).unwrap();
        manager.add_filter(deny("warner", "beta", "warn")).unwrap();

        let (result, _) = manager
            .apply_filters(&ctx(), &FilterContent::from_raw("alpha and beta"))
            .unwrap();

        assert!(result.blocked);
        assert_eq!(result.action, FilterAction::Block);
        // Violations from both filters survive the merge
        assert_eq!(result.violations.len(), 2);
    }

    #[test]
    fn test_priority_order_and_content_threading() {
        let manager = FilterManager::new();

        // Rewrites "classified" away before the deny filter runs
        let scrubber: Arc<dyn Filter> = Arc::new(
            RegexFilter::new(
                "scrubber",
                &config(json!({
                    "rules": [
                        {"name": "scrub", "pattern": "classified", "replacement": "public", "action": "replace"},
                    ],
                    "action": "allow",
                })),
            )
            .unwrap(),
        );
        scrubber.set_priority(1);

        let blocker = deny("blocker", "classified", "block");
        blocker.set_priority(2);

        manager.add_filter(scrubber).unwrap();
        manager.add_filter(blocker).unwrap();

        let (result, content) = manager
            .apply_filters(&ctx(), &FilterContent::from_raw("this is classified"))
            .unwrap();

        assert!(!result.blocked);
        assert!(result.modified);
        assert_eq!(content.raw, "this is public");
    }

    #[test]
    fn test_per_filter_results_in_priority_order() {
        let manager = FilterManager::new();
        let first = deny("zz-first", "x", "warn");
        first.set_priority(1);
        let second = deny("aa-second", "x", "audit");
        second.set_priority(5);
        manager.add_filter(second).unwrap();
        manager.add_filter(first).unwrap();

        let (results, _) = manager
            .apply_filters_in_order(&ctx(), &FilterContent::from_raw("x"))
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].action, FilterAction::Warn);
        assert_eq!(results[1].action, FilterAction::Audit);
    }

    #[test]
    fn test_direction_capability_filtering() {
        let manager = FilterManager::new();
        manager.add_filter(deny("d", "x", "block")).unwrap();

        let mut outbound = ctx();
        outbound.direction = FilterDirection::Outbound;
        // Deny supports both directions, so it still runs
        let (result, _) = manager
            .apply_filters(&outbound, &FilterContent::from_raw("x"))
            .unwrap();
        assert!(result.blocked);
    }

    #[test]
    fn test_stats_counters() {
        let manager = FilterManager::new();
        manager.add_filter(deny("d", "bad", "block")).unwrap();

        manager
            .apply_filters(&ctx(), &FilterContent::from_raw("all good"))
            .unwrap();
        manager
            .apply_filters(&ctx(), &FilterContent::from_raw("bad bad"))
            .unwrap();

        let stats = manager.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.total_blocked, 1);
        assert_eq!(stats.total_violations, 2);
        assert_eq!(stats.violations_by_type.get("blocked_word"), Some(&2));
    }

    #[test]
    fn test_disabled_filter_contributes_nothing() {
        let manager = FilterManager::new();
        let filter = deny("d", "bad", "block");
        manager.add_filter(filter).unwrap();
        manager.disable_filter("d").unwrap();

        let (result, _) = manager
            .apply_filters(&ctx(), &FilterContent::from_raw("bad"))
            .unwrap();
        assert!(!result.blocked);
        assert_eq!(result.action, FilterAction::Allow);
        assert!(result.violations.is_empty());
    }
}
