//! Deny filter: vocabulary and pattern blocking
//!
//! Scans content for blocked words, phrases, raw regex patterns, and named
//! custom rules. Every occurrence yields its own violation; one filter-level
//! action covers them all. The deny filter never rewrites content.

use std::sync::Arc;

use arc_swap::ArcSwap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::filters::plugins::{FilterBase, name_from_config, parse_config};
use crate::core::filters::types::{
    ConfigMap, Filter, FilterAction, FilterCapabilities, FilterContent, FilterContext,
    FilterFactory, FilterResult, FilterType, FilterViolation,
};
use crate::utils::error::{GatewayError, Result};

const DEFAULT_PRIORITY: i32 = 30;

/// Deny filter configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DenyConfig {
    pub blocked_words: Vec<String>,
    pub blocked_phrases: Vec<String>,
    pub blocked_patterns: Vec<String>,
    pub case_sensitive: bool,
    pub whole_words_only: bool,
    pub action: FilterAction,
    pub log_violations: bool,
    pub custom_rules: Vec<CustomRule>,
}

impl Default for DenyConfig {
    fn default() -> Self {
        Self {
            blocked_words: Vec::new(),
            blocked_phrases: Vec::new(),
            blocked_patterns: Vec::new(),
            case_sensitive: false,
            whole_words_only: false,
            action: FilterAction::Warn,
            log_violations: true,
            custom_rules: Vec::new(),
        }
    }
}

/// A named, independently toggled blocking rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomRule {
    pub name: String,
    pub pattern: String,
    pub enabled: bool,
    pub severity: String,
    pub category: String,
    pub description: String,
}

impl Default for CustomRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            pattern: String::new(),
            enabled: true,
            severity: "medium".to_string(),
            category: "custom".to_string(),
            description: String::new(),
        }
    }
}

/// A blocked word or phrase prepared for scanning
struct BlockedTerm {
    /// Term normalized per the case-sensitivity setting
    normalized: String,
    /// Term as configured
    original: String,
    /// "word" or "phrase"
    category: &'static str,
    /// Word-boundary matcher, present in whole-words mode
    boundary: Option<Regex>,
}

/// A compiled raw pattern or custom rule
struct CompiledPattern {
    regex: Regex,
    violation_type: &'static str,
    rule_name: Option<String>,
    severity: String,
    category: String,
}

/// Fully compiled matcher set, replaced wholesale on reconfiguration
struct CompiledDeny {
    config: DenyConfig,
    terms: Vec<BlockedTerm>,
    patterns: Vec<CompiledPattern>,
}

impl CompiledDeny {
    fn compile(config: DenyConfig) -> Result<Self> {
        let mut terms = Vec::new();
        for (list, category) in [
            (&config.blocked_words, "word"),
            (&config.blocked_phrases, "phrase"),
        ] {
            for term in list.iter().filter(|t| !t.is_empty()) {
                let normalized = if config.case_sensitive {
                    term.clone()
                } else {
                    term.to_lowercase()
                };
                let boundary = if config.whole_words_only {
                    let flags = if config.case_sensitive { "" } else { "(?i)" };
                    let pattern = format!(r"{}\b{}\b", flags, regex::escape(term));
                    Some(Regex::new(&pattern).map_err(|e| {
                        GatewayError::InvalidPattern(format!(
                            "failed to compile boundary pattern for '{}': {}",
                            term, e
                        ))
                    })?)
                } else {
                    None
                };
                terms.push(BlockedTerm {
                    normalized,
                    original: term.clone(),
                    category,
                    boundary,
                });
            }
        }

        let mut patterns = Vec::new();
        for pattern in config.blocked_patterns.iter().filter(|p| !p.is_empty()) {
            let regex = Regex::new(pattern).map_err(|e| {
                GatewayError::InvalidPattern(format!(
                    "failed to compile blocked pattern '{}': {}",
                    pattern, e
                ))
            })?;
            patterns.push(CompiledPattern {
                regex,
                violation_type: "blocked_pattern",
                rule_name: None,
                severity: "medium".to_string(),
                category: "pattern".to_string(),
            });
        }
        for rule in config
            .custom_rules
            .iter()
            .filter(|r| r.enabled && !r.name.is_empty() && !r.pattern.is_empty())
        {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                GatewayError::InvalidPattern(format!(
                    "failed to compile custom rule '{}': {}",
                    rule.name, e
                ))
            })?;
            patterns.push(CompiledPattern {
                regex,
                violation_type: "custom_rule",
                rule_name: Some(rule.name.clone()),
                severity: rule.severity.clone(),
                category: rule.category.clone(),
            });
        }

        Ok(Self {
            config,
            terms,
            patterns,
        })
    }
}

/// Word, phrase, and pattern blocking filter
pub struct DenyFilter {
    base: FilterBase,
    compiled: ArcSwap<CompiledDeny>,
}

impl std::fmt::Debug for DenyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenyFilter")
            .field("name", &self.base.name())
            .finish_non_exhaustive()
    }
}

impl DenyFilter {
    pub fn new(name: impl Into<String>, config: &ConfigMap) -> Result<Self> {
        let capabilities = FilterCapabilities {
            supports_inbound: true,
            supports_outbound: true,
            supports_modification: false,
            supports_blocking: true,
            supported_content_types: vec!["*".to_string()],
            supports_realtime: true,
            supports_batch: true,
        };
        let filter = Self {
            base: FilterBase::new(name.into(), DEFAULT_PRIORITY, capabilities),
            compiled: ArcSwap::from_pointee(CompiledDeny::compile(DenyConfig::default())?),
        };
        filter.configure(config)?;
        Ok(filter)
    }

    /// Scan for one blocked term, one violation per occurrence
    fn check_term(
        &self,
        raw: &str,
        search_text: &str,
        term: &BlockedTerm,
        violations: &mut Vec<FilterViolation>,
    ) {
        if let Some(boundary) = &term.boundary {
            for m in boundary.find_iter(raw) {
                violations.push(
                    FilterViolation::new(
                        "blocked_word",
                        boundary.as_str(),
                        m.as_str(),
                        m.start(),
                        "medium",
                    )
                    .with_meta("category", term.category)
                    .with_meta("word", term.original.as_str()),
                );
            }
            return;
        }

        // Left-to-right scan advancing one character past each match start,
        // so repeated and overlapping occurrences each report separately.
        let mut start = 0;
        while let Some(idx) = search_text[start..].find(&term.normalized) {
            let abs = start + idx;
            let matched = raw
                .get(abs..abs + term.normalized.len())
                .unwrap_or(&term.normalized);
            violations.push(
                FilterViolation::new(
                    "blocked_word",
                    term.normalized.as_str(),
                    matched,
                    abs,
                    "medium",
                )
                .with_meta("category", term.category)
                .with_meta("word", term.original.as_str()),
            );
            start = abs
                + search_text[abs..]
                    .chars()
                    .next()
                    .map(|c| c.len_utf8())
                    .unwrap_or(1);
        }
    }
}

impl Filter for DenyFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Deny
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
        let parsed: DenyConfig = parse_config(config)?;
        let compiled = CompiledDeny::compile(parsed)?;
        self.compiled.store(Arc::new(compiled));
        self.base.set_config(config);
        Ok(())
    }

    fn apply(
        &self,
        _ctx: &FilterContext,
        content: &FilterContent,
    ) -> Result<(FilterResult, Option<FilterContent>)> {
        if !self.is_enabled() {
            return Ok((FilterResult::allow(), None));
        }

        let compiled = self.compiled.load();
        let raw = content.raw.as_str();
        let search_text = if compiled.config.case_sensitive {
            raw.to_string()
        } else {
            raw.to_lowercase()
        };

        let mut violations = Vec::new();
        for term in &compiled.terms {
            self.check_term(raw, &search_text, term, &mut violations);
        }

        for pattern in &compiled.patterns {
            for m in pattern.regex.find_iter(raw) {
                let mut violation = FilterViolation::new(
                    pattern.violation_type,
                    pattern.regex.as_str(),
                    m.as_str(),
                    m.start(),
                    pattern.severity.as_str(),
                )
                .with_meta("category", pattern.category.as_str());
                if let Some(rule_name) = &pattern.rule_name {
                    violation = violation.with_meta("rule_name", rule_name.as_str());
                }
                violations.push(violation);
            }
        }

        let (action, blocked, reason) = if violations.is_empty() {
            (FilterAction::Allow, false, String::new())
        } else {
            let count = violations.len();
            match compiled.config.action {
                FilterAction::Block => (
                    FilterAction::Block,
                    true,
                    format!("Content blocked: {} prohibited items found", count),
                ),
                FilterAction::Warn => (
                    FilterAction::Warn,
                    false,
                    format!("Content warning: {} prohibited items found", count),
                ),
                FilterAction::Audit => (
                    FilterAction::Audit,
                    false,
                    format!("Content audit: {} prohibited items logged", count),
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

/// Factory for [`DenyFilter`]
pub struct DenyFilterFactory;

impl FilterFactory for DenyFilterFactory {
    fn filter_type(&self) -> FilterType {
        FilterType::Deny
    }

    fn name(&self) -> &str {
        "Deny Filter"
    }

    fn description(&self) -> &str {
        "Blocks content containing prohibited words, phrases, or patterns"
    }

    fn create(&self, config: &ConfigMap) -> Result<Arc<dyn Filter>> {
        let name = name_from_config(config, "deny-filter");
        Ok(Arc::new(DenyFilter::new(name, config)?))
    }

    fn validate_config(&self, config: &ConfigMap) -> Result<()> {
        let parsed: DenyConfig = parse_config(config)?;
        CompiledDeny::compile(parsed).map(|_| ())
    }

    fn default_config(&self) -> ConfigMap {
        let value = json!({
            "blocked_words": ["password", "secret", "token"],
            "blocked_phrases": [],
            "blocked_patterns": [],
            "case_sensitive": false,
            "whole_words_only": false,
            "action": "warn",
            "log_violations": true,
            "custom_rules": [],
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
                "blocked_words": {"type": "array", "items": {"type": "string"}},
                "blocked_phrases": {"type": "array", "items": {"type": "string"}},
                "blocked_patterns": {"type": "array", "items": {"type": "string"}},
                "case_sensitive": {"type": "boolean"},
                "whole_words_only": {"type": "boolean"},
                "action": {"type": "string", "enum": ["block", "warn", "audit", "allow"]},
                "log_violations": {"type": "boolean"},
                "custom_rules": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "pattern": {"type": "string"},
                            "enabled": {"type": "boolean"},
                            "severity": {"type": "string"},
                            "category": {"type": "string"},
                            "description": {"type": "string"},
                        },
                        "required": ["name", "pattern"],
                    },
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::types::FilterDirection;

    fn config(value: serde_json::Value) -> ConfigMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("config must be an object"),
        }
    }

    fn ctx() -> FilterContext {
        FilterContext::new("req-1", "org-1", FilterDirection::Inbound)
    }

    #[test]
    fn test_blocked_word_case_insensitive() {
        let filter = DenyFilter::new(
            "deny",
            &config(json!({"blocked_words": ["password"], "action": "block"})),
        )
        .unwrap();

        let content = FilterContent::from_raw("Please enter your PASSWORD here");
        let (result, modified) = filter.apply(&ctx(), &content).unwrap();

        assert!(result.blocked);
        assert_eq!(result.action, FilterAction::Block);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].violation_type, "blocked_word");
        assert_eq!(result.violations[0].matched, "PASSWORD");
        assert!(modified.is_none());
    }

    #[test]
    fn test_whole_words_only() {
        let filter = DenyFilter::new(
            "deny",
            &config(json!({
                "blocked_words": ["pass"],
                "whole_words_only": true,
                "action": "block",
            })),
        )
        .unwrap();

        let (result, _) = filter
            .apply(&ctx(), &FilterContent::from_raw("Enter the pass code"))
            .unwrap();
        assert!(result.blocked);

        let (result, _) = filter
            .apply(&ctx(), &FilterContent::from_raw("Enter the password"))
            .unwrap();
        assert!(!result.blocked);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_repeated_word_yields_violation_per_occurrence() {
        let filter = DenyFilter::new(
            "deny",
            &config(json!({"blocked_words": ["test"], "action": "warn"})),
        )
        .unwrap();

        let (result, _) = filter
            .apply(
                &ctx(),
                &FilterContent::from_raw("This is a test and another test"),
            )
            .unwrap();

        assert_eq!(result.violations.len(), 2);
        assert!(!result.blocked);
        assert_eq!(result.action, FilterAction::Warn);
    }

    #[test]
    fn test_blocked_phrase_and_pattern() {
        let filter = DenyFilter::new(
            "deny",
            &config(json!({
                "blocked_phrases": ["drop table"],
                "blocked_patterns": [r"rm\s+-rf"],
                "action": "block",
            })),
        )
        .unwrap();

        let (result, _) = filter
            .apply(
                &ctx(),
                &FilterContent::from_raw("please DROP TABLE users; then rm -rf /"),
            )
            .unwrap();

        assert!(result.blocked);
        let types: Vec<_> = result
            .violations
            .iter()
            .map(|v| v.violation_type.as_str())
            .collect();
        assert!(types.contains(&"blocked_word"));
        assert!(types.contains(&"blocked_pattern"));
    }

    #[test]
    fn test_custom_rule_disabled_is_skipped() {
        let filter = DenyFilter::new(
            "deny",
            &config(json!({
                "custom_rules": [
                    {"name": "no-curl", "pattern": "curl", "enabled": false},
                    {"name": "no-wget", "pattern": "wget", "enabled": true, "severity": "high"},
                ],
                "action": "block",
            })),
        )
        .unwrap();

        let (result, _) = filter
            .apply(&ctx(), &FilterContent::from_raw("curl and wget"))
            .unwrap();

        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].violation_type, "custom_rule");
        assert_eq!(result.violations[0].severity, "high");
    }

    #[test]
    fn test_disabled_filter_is_noop() {
        let filter = DenyFilter::new(
            "deny",
            &config(json!({"blocked_words": ["password"], "action": "block"})),
        )
        .unwrap();
        filter.set_enabled(false);

        let (result, modified) = filter
            .apply(&ctx(), &FilterContent::from_raw("password password"))
            .unwrap();

        assert!(!result.blocked);
        assert_eq!(result.action, FilterAction::Allow);
        assert!(result.violations.is_empty());
        assert!(modified.is_none());
    }

    #[test]
    fn test_invalid_pattern_rejected_and_state_kept() {
        let filter = DenyFilter::new(
            "deny",
            &config(json!({"blocked_words": ["secret"], "action": "block"})),
        )
        .unwrap();

        let err = filter
            .configure(&config(json!({"blocked_patterns": ["[unclosed"]})))
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidPattern(_)));

        // Prior compiled state still applies
        let (result, _) = filter
            .apply(&ctx(), &FilterContent::from_raw("a secret"))
            .unwrap();
        assert!(result.blocked);
    }

    #[test]
    fn test_invalid_action_rejected() {
        let err = DenyFilter::new("deny", &config(json!({"action": "destroy"}))).unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }
}
