//! Content filtering type definitions
//!
//! Core types shared by the filter plugins, manager, registry, and service.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::{GatewayError, Result};

/// JSON object used for opaque filter configuration documents
pub type ConfigMap = serde_json::Map<String, Value>;

/// The type of a content filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// PII detection and masking
    Pii,
    /// URL / resource reference policy
    Resource,
    /// Word, phrase, and pattern blocking
    Deny,
    /// Rule-based scan and transform
    Regex,
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterType::Pii => "pii",
            FilterType::Resource => "resource",
            FilterType::Deny => "deny",
            FilterType::Regex => "regex",
        };
        f.write_str(s)
    }
}

impl FromStr for FilterType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pii" => Ok(FilterType::Pii),
            "resource" => Ok(FilterType::Resource),
            "deny" => Ok(FilterType::Deny),
            "regex" => Ok(FilterType::Regex),
            other => Err(GatewayError::Validation(format!(
                "unknown filter type: {}",
                other
            ))),
        }
    }
}

/// The action to take when a filter is triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    /// Reject the content
    Block,
    /// Record and continue
    Warn,
    /// Record for audit only
    Audit,
    /// No action
    #[default]
    Allow,
}

impl FilterAction {
    /// Severity rank used when merging results: block > warn > audit > allow.
    pub fn severity_rank(self) -> u8 {
        match self {
            FilterAction::Block => 3,
            FilterAction::Warn => 2,
            FilterAction::Audit => 1,
            FilterAction::Allow => 0,
        }
    }

    /// The more severe of two actions
    pub fn max(self, other: FilterAction) -> FilterAction {
        if other.severity_rank() > self.severity_rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterAction::Block => "block",
            FilterAction::Warn => "warn",
            FilterAction::Audit => "audit",
            FilterAction::Allow => "allow",
        };
        f.write_str(s)
    }
}

impl FromStr for FilterAction {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "block" => Ok(FilterAction::Block),
            "warn" => Ok(FilterAction::Warn),
            "audit" => Ok(FilterAction::Audit),
            "allow" => Ok(FilterAction::Allow),
            other => Err(GatewayError::Validation(format!(
                "invalid action: {}",
                other
            ))),
        }
    }
}

/// Whether content is flowing toward the backend or back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterDirection {
    /// Caller -> gateway -> backend
    Inbound,
    /// Backend -> gateway -> caller
    Outbound,
}

impl fmt::Display for FilterDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterDirection::Inbound => f.write_str("inbound"),
            FilterDirection::Outbound => f.write_str("outbound"),
        }
    }
}

/// Transport the request arrived over, inferred from the path prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Http,
    WebSocket,
    Sse,
    Streamable,
}

/// Request-scoped data carried through the filter chain
///
/// Created fresh for each request or response leg and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterContext {
    pub request_id: String,
    pub organization_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    pub transport: TransportKind,
    pub direction: FilterDirection,
    pub content_type: String,
    #[serde(default)]
    pub metadata: ConfigMap,
    pub timestamp: DateTime<Utc>,
}

impl FilterContext {
    /// Create a context for the given request leg
    pub fn new(
        request_id: impl Into<String>,
        organization_id: impl Into<String>,
        direction: FilterDirection,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            organization_id: organization_id.into(),
            user_id: String::new(),
            session_id: None,
            server_id: None,
            transport: TransportKind::Http,
            direction,
            content_type: String::new(),
            metadata: ConfigMap::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Content passing through the filter chain
///
/// Filters that rewrite text return a new `FilterContent`; the caller decides
/// whether to accept the mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterContent {
    /// Raw text payload
    pub raw: String,
    /// Structured payload, when the body parsed as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Value>,
    /// Request or response headers, lowercased keys
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Query parameters
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

impl FilterContent {
    /// Create content from a raw text payload
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Default::default()
        }
    }

    /// Copy of this content with the raw text replaced
    pub fn with_raw(&self, raw: String) -> Self {
        Self {
            raw,
            parsed: self.parsed.clone(),
            headers: self.headers.clone(),
            params: self.params.clone(),
        }
    }
}

/// One discrete rule match found by a filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterViolation {
    /// Violation type tag, e.g. `blocked_word`, `blocked_protocol`
    #[serde(rename = "type")]
    pub violation_type: String,
    /// Rule or pattern text that matched
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,
    /// The matched substring
    #[serde(rename = "match", default, skip_serializing_if = "String::is_empty")]
    pub matched: String,
    /// Character offset of the match in the scanned text
    #[serde(default)]
    pub position: usize,
    /// Severity tag: low, medium, high, critical
    pub severity: String,
    #[serde(default)]
    pub metadata: ConfigMap,
    /// Replacement applied by a rewriting rule, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl FilterViolation {
    pub fn new(
        violation_type: impl Into<String>,
        pattern: impl Into<String>,
        matched: impl Into<String>,
        position: usize,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            violation_type: violation_type.into(),
            pattern: pattern.into(),
            matched: matched.into(),
            position,
            severity: severity.into(),
            metadata: ConfigMap::new(),
            replacement: None,
        }
    }

    /// Attach a metadata entry
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// The result of applying one filter, or the merged result of a whole pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    pub blocked: bool,
    pub modified: bool,
    pub action: FilterAction,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default)]
    pub violations: Vec<FilterViolation>,
    #[serde(default)]
    pub metadata: ConfigMap,
    pub processed_at: DateTime<Utc>,
}

impl FilterResult {
    pub fn new(
        blocked: bool,
        modified: bool,
        action: FilterAction,
        reason: impl Into<String>,
        violations: Vec<FilterViolation>,
    ) -> Self {
        Self {
            blocked,
            modified,
            action,
            reason: reason.into(),
            violations,
            metadata: ConfigMap::new(),
            processed_at: Utc::now(),
        }
    }

    /// An allow result with no violations, used by disabled filters
    pub fn allow() -> Self {
        Self::new(false, false, FilterAction::Allow, "", Vec::new())
    }
}

/// Features a filter declares support for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterCapabilities {
    pub supports_inbound: bool,
    pub supports_outbound: bool,
    pub supports_modification: bool,
    pub supports_blocking: bool,
    /// Content types the filter understands; `*` matches everything
    pub supported_content_types: Vec<String>,
    pub supports_realtime: bool,
    pub supports_batch: bool,
}

impl FilterCapabilities {
    /// Whether the filter can run for the given direction
    pub fn supports_direction(&self, direction: FilterDirection) -> bool {
        match direction {
            FilterDirection::Inbound => self.supports_inbound,
            FilterDirection::Outbound => self.supports_outbound,
        }
    }

    /// Whether the filter can run for the given content type
    pub fn supports_content_type(&self, content_type: &str) -> bool {
        if self.supported_content_types.is_empty() {
            return true;
        }
        self.supported_content_types
            .iter()
            .any(|t| t == content_type || t == "*")
    }
}

/// The content filter contract
///
/// A filter is shared read-mostly across requests for one organization;
/// `apply` is pure in-memory computation and must not perform I/O. Identity
/// and compiled state are mutated only through `configure`, `set_enabled`,
/// and `set_priority`.
pub trait Filter: Send + Sync {
    /// The filter type
    fn filter_type(&self) -> FilterType;

    /// Unique name within a manager
    fn name(&self) -> &str;

    /// Ordering key; lower values are evaluated first
    fn priority(&self) -> i32;

    fn set_priority(&self, priority: i32);

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    /// Declared capabilities
    fn capabilities(&self) -> FilterCapabilities;

    /// Snapshot of the current configuration document
    fn config(&self) -> ConfigMap;

    /// Parse, validate, and atomically replace the compiled configuration.
    ///
    /// On error the previously compiled state remains in effect.
    fn configure(&self, config: &ConfigMap) -> Result<()>;

    /// Apply the filter to content, returning the result and the rewritten
    /// content when the filter mutated it.
    ///
    /// A disabled filter returns an allow result with no violations.
    fn apply(
        &self,
        ctx: &FilterContext,
        content: &FilterContent,
    ) -> Result<(FilterResult, Option<FilterContent>)>;
}

/// Builds configured filter instances for one [`FilterType`]
pub trait FilterFactory: Send + Sync {
    /// The filter type this factory creates
    fn filter_type(&self) -> FilterType;

    /// Human-readable factory name
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Create a new filter from a configuration document
    fn create(&self, config: &ConfigMap) -> Result<Arc<dyn Filter>>;

    /// Validate a configuration document without building a filter
    fn validate_config(&self, config: &ConfigMap) -> Result<()>;

    /// Default configuration document
    fn default_config(&self) -> ConfigMap;

    /// JSON schema describing the configuration document
    fn config_schema(&self) -> Value;
}

/// Discovery metadata for one filter type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterInfo {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub config_schema: Value,
    pub capabilities: FilterCapabilities,
    pub default_config: ConfigMap,
}
