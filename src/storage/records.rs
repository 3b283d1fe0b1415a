//! Domain records exchanged with the filter configuration store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::filters::types::{ConfigMap, FilterType};
use crate::utils::error::{GatewayError, Result};

/// Longest content snippet persisted with a violation row
pub const MAX_SNIPPET_LEN: usize = 500;

/// Persisted filter configuration for one organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFilterRecord {
    pub id: Uuid,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub enabled: bool,
    pub priority: i32,
    pub config: ConfigMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl ContentFilterRecord {
    pub fn new(
        organization_id: impl Into<String>,
        name: impl Into<String>,
        filter_type: FilterType,
        enabled: bool,
        priority: i32,
        config: ConfigMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id: organization_id.into(),
            name: name.into(),
            description: String::new(),
            filter_type,
            enabled,
            priority,
            config,
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    /// Structural validation applied before persisting
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(GatewayError::Validation(
                "filter name cannot be empty".to_string(),
            ));
        }
        if self.organization_id.is_empty() {
            return Err(GatewayError::Validation(
                "organization id cannot be empty".to_string(),
            ));
        }
        if !(1..=1000).contains(&self.priority) {
            return Err(GatewayError::Validation(format!(
                "priority {} out of range 1..=1000",
                self.priority
            )));
        }
        Ok(())
    }
}

/// One audit-trail row describing a rule match and the action taken
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterViolationRecord {
    pub id: Uuid,
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<String>,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    pub violation_type: String,
    pub action_taken: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_matched: Option<String>,
    pub severity: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default)]
    pub metadata: ConfigMap,
    pub created_at: DateTime<Utc>,
}

impl FilterViolationRecord {
    pub fn new(
        organization_id: impl Into<String>,
        request_id: impl Into<String>,
        violation_type: impl Into<String>,
        action_taken: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: organization_id.into(),
            filter_id: None,
            request_id: request_id.into(),
            session_id: None,
            server_id: None,
            violation_type: violation_type.into(),
            action_taken: action_taken.into(),
            content_snippet: None,
            pattern_matched: None,
            severity: severity.into(),
            user_id: String::new(),
            remote_ip: None,
            user_agent: None,
            direction: None,
            metadata: ConfigMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Store the matched content, truncated for privacy and storage
    pub fn set_snippet(&mut self, matched: &str) {
        if matched.is_empty() {
            return;
        }
        let snippet = if matched.chars().count() > MAX_SNIPPET_LEN {
            let truncated: String = matched.chars().take(MAX_SNIPPET_LEN).collect();
            format!("{}...", truncated)
        } else {
            matched.to_string()
        };
        self.content_snippet = Some(snippet);
    }
}
