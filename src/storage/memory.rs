//! In-memory filter store
//!
//! Backs the gateway when no database is configured and doubles as the test
//! store. Filter rows are keyed by (organization, name); violations append
//! to a per-process log.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::records::{ContentFilterRecord, FilterViolationRecord};
use crate::storage::store::FilterStore;
use crate::utils::error::{GatewayError, Result};

/// Volatile [`FilterStore`] implementation
#[derive(Default)]
pub struct MemoryFilterStore {
    filters: RwLock<HashMap<(String, String), ContentFilterRecord>>,
    violations: RwLock<Vec<FilterViolationRecord>>,
}

impl MemoryFilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with filter rows
    pub async fn with_filters(records: Vec<ContentFilterRecord>) -> Self {
        let store = Self::new();
        {
            let mut filters = store.filters.write().await;
            for record in records {
                filters.insert(
                    (record.organization_id.clone(), record.name.clone()),
                    record,
                );
            }
        }
        store
    }
}

#[async_trait]
impl FilterStore for MemoryFilterStore {
    async fn list_enabled(&self, organization_id: &str) -> Result<Vec<ContentFilterRecord>> {
        let filters = self.filters.read().await;
        let mut records: Vec<ContentFilterRecord> = filters
            .values()
            .filter(|r| r.organization_id == organization_id && r.enabled)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(records)
    }

    async fn upsert(&self, record: &ContentFilterRecord) -> Result<()> {
        let mut filters = self.filters.write().await;
        let key = (record.organization_id.clone(), record.name.clone());
        let mut record = record.clone();
        record.updated_at = chrono::Utc::now();
        filters.insert(key, record);
        Ok(())
    }

    async fn delete(&self, organization_id: &str, name: &str) -> Result<()> {
        let mut filters = self.filters.write().await;
        let key = (organization_id.to_string(), name.to_string());
        if filters.remove(&key).is_none() {
            return Err(GatewayError::NotFound(format!(
                "filter '{}' not found for organization '{}'",
                name, organization_id
            )));
        }
        Ok(())
    }

    async fn append_violation(&self, violation: &FilterViolationRecord) -> Result<()> {
        self.violations.write().await.push(violation.clone());
        Ok(())
    }

    async fn list_violations(
        &self,
        organization_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<FilterViolationRecord>> {
        let violations = self.violations.read().await;
        let mut matching: Vec<FilterViolationRecord> = violations
            .iter()
            .filter(|v| v.organization_id == organization_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
