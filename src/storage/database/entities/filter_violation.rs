use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::storage::records::FilterViolationRecord;

/// Filter violation audit-trail database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "filter_violations")]
pub struct Model {
    /// Violation ID (UUID)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning organization
    pub organization_id: String,

    /// Filter that produced the violation, when known
    pub filter_id: Option<String>,

    /// Request the violation occurred in
    pub request_id: String,

    pub session_id: Option<String>,

    pub server_id: Option<String>,

    /// Violation type tag, e.g. blocked_word
    pub violation_type: String,

    /// Resolved action: block, warn, audit, allow
    pub action_taken: String,

    /// Matched content, truncated
    pub content_snippet: Option<String>,

    /// Pattern that matched, when any
    pub pattern_matched: Option<String>,

    pub severity: String,

    pub user_id: String,

    pub remote_ip: Option<String>,

    pub user_agent: Option<String>,

    /// inbound or outbound
    pub direction: Option<String>,

    /// Free-form violation metadata
    pub metadata: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Convert the database model to the domain record
    pub fn to_record(&self) -> FilterViolationRecord {
        let metadata = match &self.metadata {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };

        FilterViolationRecord {
            id: self.id,
            organization_id: self.organization_id.clone(),
            filter_id: self.filter_id.clone(),
            request_id: self.request_id.clone(),
            session_id: self.session_id.clone(),
            server_id: self.server_id.clone(),
            violation_type: self.violation_type.clone(),
            action_taken: self.action_taken.clone(),
            content_snippet: self.content_snippet.clone(),
            pattern_matched: self.pattern_matched.clone(),
            severity: self.severity.clone(),
            user_id: self.user_id.clone(),
            remote_ip: self.remote_ip.clone(),
            user_agent: self.user_agent.clone(),
            direction: self.direction.clone(),
            metadata,
            created_at: self.created_at.naive_utc().and_utc(),
        }
    }
}
