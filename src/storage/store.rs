//! Filter configuration store contract
//!
//! The pipeline consumes an organization-scoped configuration store and a
//! violation-log sink; it does not own durable storage itself. The SeaORM
//! implementation lives in [`crate::storage::database`].

use async_trait::async_trait;

use crate::storage::records::{ContentFilterRecord, FilterViolationRecord};
use crate::utils::error::Result;

/// Organization-scoped filter configuration store and violation log
#[async_trait]
pub trait FilterStore: Send + Sync {
    /// Enabled filter rows for one organization, ordered by ascending
    /// priority then creation time
    async fn list_enabled(&self, organization_id: &str) -> Result<Vec<ContentFilterRecord>>;

    /// Insert or update a filter row keyed by (organization, name)
    async fn upsert(&self, record: &ContentFilterRecord) -> Result<()>;

    /// Delete a filter row; fails with NotFound when absent
    async fn delete(&self, organization_id: &str, name: &str) -> Result<()>;

    /// Append one violation row to the audit trail
    async fn append_violation(&self, violation: &FilterViolationRecord) -> Result<()>;

    /// Page through an organization's violations, newest first
    async fn list_violations(
        &self,
        organization_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<FilterViolationRecord>>;

    /// Connectivity check
    async fn ping(&self) -> Result<()>;
}
