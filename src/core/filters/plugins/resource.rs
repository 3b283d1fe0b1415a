//! Resource filter: URL and resource-reference policy
//!
//! Extracts URL-shaped substrings from content and checks each candidate
//! against protocol, domain, and network-address policy. Content size and
//! declared content type are checked independently of URL extraction.

use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::{Host, Url};

use crate::core::filters::plugins::{FilterBase, name_from_config, parse_config};
use crate::core::filters::types::{
    ConfigMap, Filter, FilterAction, FilterCapabilities, FilterContent, FilterContext,
    FilterFactory, FilterResult, FilterType, FilterViolation,
};
use crate::utils::error::Result;

const DEFAULT_PRIORITY: i32 = 20;

// URL-shaped token heuristic; precise parsing happens per candidate below.
// Bracketed IPv6 hosts are matched explicitly since brackets otherwise
// terminate a candidate.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://(?:\[[0-9a-fA-F:.]+\][^\s<>"{}|\\^`\[\]]*|[^\s<>"{}|\\^`\[\]]+)"#)
        .expect("URL extraction pattern is valid")
});

/// Resource filter configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub allowed_protocols: Vec<String>,
    pub blocked_domains: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub max_content_size: u64,
    pub allowed_content_types: Vec<String>,
    pub blocked_content_types: Vec<String>,
    pub allow_private_networks: bool,
    pub allow_localhost: bool,
    pub action: FilterAction,
    pub log_violations: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            allowed_protocols: vec!["https".to_string(), "http".to_string()],
            blocked_domains: Vec::new(),
            allowed_domains: Vec::new(),
            max_content_size: 10 * 1024 * 1024,
            allowed_content_types: Vec::new(),
            blocked_content_types: Vec::new(),
            allow_private_networks: false,
            allow_localhost: false,
            action: FilterAction::Block,
            log_violations: true,
        }
    }
}

/// Normalized configuration; all protocol/domain entries lowercased
struct CompiledResource {
    config: ResourceConfig,
}

impl CompiledResource {
    fn compile(mut config: ResourceConfig) -> Result<Self> {
        for list in [
            &mut config.allowed_protocols,
            &mut config.blocked_domains,
            &mut config.allowed_domains,
            &mut config.allowed_content_types,
            &mut config.blocked_content_types,
        ] {
            for entry in list.iter_mut() {
                *entry = entry.trim().to_lowercase();
            }
            list.retain(|e| !e.is_empty());
        }
        Ok(Self { config })
    }
}

/// Extract URL-shaped candidates, trimming trailing punctuation
fn extract_urls(content: &str) -> Vec<&str> {
    URL_PATTERN
        .find_iter(content)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '}']))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whether a hostname matches a domain pattern; `*.example.com` matches the
/// bare domain and any subdomain
fn matches_domain(hostname: &str, pattern: &str) -> bool {
    if hostname == pattern {
        return true;
    }
    if let Some(base) = pattern.strip_prefix("*.") {
        return hostname == base || hostname.ends_with(&format!(".{}", base));
    }
    false
}

/// URL and resource-reference policy filter
pub struct ResourceFilter {
    base: FilterBase,
    compiled: ArcSwap<CompiledResource>,
}

impl ResourceFilter {
    pub fn new(name: impl Into<String>, config: &ConfigMap) -> Result<Self> {
        let capabilities = FilterCapabilities {
            supports_inbound: true,
            supports_outbound: true,
            supports_modification: false,
            supports_blocking: true,
            supported_content_types: vec!["*".to_string()],
            supports_realtime: true,
            supports_batch: false,
        };
        let filter = Self {
            base: FilterBase::new(name.into(), DEFAULT_PRIORITY, capabilities),
            compiled: ArcSwap::from_pointee(CompiledResource::compile(ResourceConfig::default())?),
        };
        filter.configure(config)?;
        Ok(filter)
    }

    fn check_protocol(url: &Url, config: &ResourceConfig) -> Option<FilterViolation> {
        let protocol = url.scheme().to_lowercase();
        if config.allowed_protocols.iter().any(|p| *p == protocol) {
            return None;
        }
        Some(
            FilterViolation::new("blocked_protocol", "", url.as_str(), 0, "high")
                .with_meta("protocol", protocol)
                .with_meta("allowed_protocols", json!(config.allowed_protocols)),
        )
    }

    fn check_domain(url: &Url, config: &ResourceConfig) -> Option<FilterViolation> {
        let hostname = url.host_str().unwrap_or("").to_lowercase();

        // Block list uses exact hostname matches
        if config.blocked_domains.iter().any(|d| *d == hostname) {
            return Some(
                FilterViolation::new("blocked_domain", "", url.as_str(), 0, "high")
                    .with_meta("domain", hostname),
            );
        }

        if !config.allowed_domains.is_empty()
            && !config
                .allowed_domains
                .iter()
                .any(|d| matches_domain(&hostname, d))
        {
            return Some(
                FilterViolation::new("domain_not_allowed", "", url.as_str(), 0, "high")
                    .with_meta("domain", hostname)
                    .with_meta("allowed_domains", json!(config.allowed_domains)),
            );
        }

        None
    }

    fn check_network_address(url: &Url, config: &ResourceConfig) -> Option<FilterViolation> {
        let host = url.host()?;

        if !config.allow_localhost {
            let is_localhost = match &host {
                Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
                Host::Ipv4(ip) => ip.is_loopback() || ip.is_unspecified(),
                Host::Ipv6(ip) => ip.is_loopback(),
            };
            if is_localhost {
                return Some(
                    FilterViolation::new("localhost_access", "", url.as_str(), 0, "medium")
                        .with_meta("hostname", host.to_string()),
                );
            }
        }

        if !config.allow_private_networks {
            // RFC1918: 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
            if let Host::Ipv4(ip) = &host {
                if ip.is_private() {
                    return Some(
                        FilterViolation::new(
                            "private_network_access",
                            "",
                            url.as_str(),
                            0,
                            "medium",
                        )
                        .with_meta("hostname", host.to_string()),
                    );
                }
            }
        }

        None
    }

    fn check_content_size(content: &FilterContent, config: &ResourceConfig) -> Option<FilterViolation> {
        if config.max_content_size == 0 {
            return None;
        }
        let content_size = content.raw.len() as u64;
        if content_size > config.max_content_size {
            return Some(
                FilterViolation::new("content_size_exceeded", "", "", 0, "medium")
                    .with_meta("content_size", content_size)
                    .with_meta("max_size", config.max_content_size),
            );
        }
        None
    }

    fn check_content_type(
        ctx: &FilterContext,
        content: &FilterContent,
        config: &ResourceConfig,
    ) -> Option<FilterViolation> {
        let mut content_type = ctx.content_type.clone();
        if content_type.is_empty() {
            if let Some(ct) = content.headers.get("content-type") {
                content_type = ct.clone();
            }
        }
        if content_type.is_empty() {
            return None;
        }

        // Normalize: strip parameters, lowercase
        if let Some(idx) = content_type.find(';') {
            content_type.truncate(idx);
        }
        let content_type = content_type.trim().to_lowercase();

        if config.blocked_content_types.iter().any(|t| *t == content_type) {
            return Some(
                FilterViolation::new("blocked_content_type", "", "", 0, "medium")
                    .with_meta("content_type", content_type),
            );
        }

        if !config.allowed_content_types.is_empty()
            && !config
                .allowed_content_types
                .iter()
                .any(|t| *t == content_type)
        {
            return Some(
                FilterViolation::new("content_type_not_allowed", "", "", 0, "medium")
                    .with_meta("content_type", content_type)
                    .with_meta("allowed_types", json!(config.allowed_content_types)),
            );
        }

        None
    }
}

impl Filter for ResourceFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Resource
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn priority(&self) -> i32 {
        self.base.priority()
    }

    fn set_priority(&self, priority: i32) {
        self.base.set_priority(priority);
    }

    fn is_enabled(&self) -> bool {
        self.base.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.base.set_enabled(enabled);
    }

    fn capabilities(&self) -> FilterCapabilities {
        self.base.capabilities()
    }

    fn config(&self) -> ConfigMap {
        self.base.config()
    }

    fn configure(&self, config: &ConfigMap) -> Result<()> {
        let parsed: ResourceConfig = parse_config(config)?;
        let compiled = CompiledResource::compile(parsed)?;
        self.compiled.store(Arc::new(compiled));
        self.base.set_config(config);
        Ok(())
    }

    fn apply(
        &self,
        ctx: &FilterContext,
        content: &FilterContent,
    ) -> Result<(FilterResult, Option<FilterContent>)> {
        if !self.is_enabled() {
            return Ok((FilterResult::allow(), None));
        }

        let compiled = self.compiled.load();
        let config = &compiled.config;
        let mut violations = Vec::new();

        for candidate in extract_urls(&content.raw) {
            let url = match Url::parse(candidate) {
                Ok(url) => url,
                Err(e) => {
                    // A malformed candidate is a violation, not an abort
                    violations.push(
                        FilterViolation::new("invalid_url", "", candidate, 0, "medium")
                            .with_meta("error", e.to_string()),
                    );
                    continue;
                }
            };

            if let Some(v) = Self::check_protocol(&url, config) {
                violations.push(v);
            }
            if let Some(v) = Self::check_domain(&url, config) {
                violations.push(v);
            }
            if let Some(v) = Self::check_network_address(&url, config) {
                violations.push(v);
            }
        }

        if let Some(v) = Self::check_content_size(content, config) {
            violations.push(v);
        }
        if let Some(v) = Self::check_content_type(ctx, content, config) {
            violations.push(v);
        }

        let (action, blocked, reason) = if violations.is_empty() {
            (FilterAction::Allow, false, String::new())
        } else {
            let count = violations.len();
            match config.action {
                FilterAction::Block => (
                    FilterAction::Block,
                    true,
                    format!("Resource access denied: {} violations found", count),
                ),
                FilterAction::Warn => (
                    FilterAction::Warn,
                    false,
                    format!("Resource violations detected: {} issues found", count),
                ),
                FilterAction::Audit => (
                    FilterAction::Audit,
                    false,
                    format!("Resource violations logged: {} issues found", count),
                ),
                FilterAction::Allow => (FilterAction::Allow, false, String::new()),
            }
        };

        Ok((
            FilterResult::new(blocked, false, action, reason, violations),
            None,
        ))
    }
}

/// Factory for [`ResourceFilter`]
pub struct ResourceFilterFactory;

impl FilterFactory for ResourceFilterFactory {
    fn filter_type(&self) -> FilterType {
        FilterType::Resource
    }

    fn name(&self) -> &str {
        "Resource Filter"
    }

    fn description(&self) -> &str {
        "Validates URI access, filters protocols and domains, enforces content size limits"
    }

    fn create(&self, config: &ConfigMap) -> Result<Arc<dyn Filter>> {
        let name = name_from_config(config, "resource-filter");
        Ok(Arc::new(ResourceFilter::new(name, config)?))
    }

    fn validate_config(&self, config: &ConfigMap) -> Result<()> {
        let parsed: ResourceConfig = parse_config(config)?;
        CompiledResource::compile(parsed).map(|_| ())
    }

    fn default_config(&self) -> ConfigMap {
        let value = json!({
            "allowed_protocols": ["https", "http"],
            "blocked_domains": [],
            "allowed_domains": [],
            "max_content_size": 10_485_760u64,
            "allowed_content_types": [],
            "blocked_content_types": [],
            "allow_private_networks": false,
            "allow_localhost": false,
            "action": "block",
            "log_violations": true,
        });
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn config_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "allowed_protocols": {"type": "array", "items": {"type": "string"}},
                "blocked_domains": {"type": "array", "items": {"type": "string"}},
                "allowed_domains": {"type": "array", "items": {"type": "string"}},
                "max_content_size": {"type": "number", "minimum": 0},
                "allowed_content_types": {"type": "array", "items": {"type": "string"}},
                "blocked_content_types": {"type": "array", "items": {"type": "string"}},
                "allow_private_networks": {"type": "boolean"},
                "allow_localhost": {"type": "boolean"},
                "action": {"type": "string", "enum": ["block", "warn", "audit", "allow"]},
                "log_violations": {"type": "boolean"},
            },
        })
    }
}
