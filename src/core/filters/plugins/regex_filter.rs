//! Regex filter: rule-based scan and transform
//!
//! Ordered rules run left to right over the evolving text, so a replace rule
//! feeds its output to the rules after it. Every match of every enabled rule
//! is reported; a single block rule overrides the filter-level action.

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

const DEFAULT_PRIORITY: i32 = 40;

/// Per-rule action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Substitute all matches with the rule replacement
    #[default]
    Replace,
    /// Block the content regardless of the filter-level action
    Block,
    /// Report only
    Warn,
    /// Record for audit only
    Audit,
}

/// Regex filter configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegexConfig {
    pub rules: Vec<RuleConfig>,
    pub action: FilterAction,
    pub log_violations: bool,
    pub log_matches: bool,
}

impl Default for RegexConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            action: FilterAction::Warn,
            log_violations: true,
            log_matches: false,
        }
    }
}

/// A single scan-and-transform rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub name: String,
    pub pattern: String,
    pub replacement: String,
    pub enabled: bool,
    pub severity: String,
    pub category: String,
    pub description: String,
    pub action: RuleAction,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            pattern: String::new(),
            replacement: String::new(),
            enabled: true,
            severity: "medium".to_string(),
            category: "custom".to_string(),
            description: String::new(),
            action: RuleAction::Replace,
        }
    }
}

struct CompiledRule {
    name: String,
    regex: Regex,
    replacement: String,
    severity: String,
    category: String,
    action: RuleAction,
}

struct CompiledRegex {
    config: RegexConfig,
    rules: Vec<CompiledRule>,
}

impl CompiledRegex {
    fn compile(config: RegexConfig) -> Result<Self> {
        let mut rules = Vec::new();
        for rule in config
            .rules
            .iter()
            .filter(|r| r.enabled && !r.name.is_empty() && !r.pattern.is_empty())
        {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                GatewayError::InvalidPattern(format!(
                    "failed to compile pattern for rule '{}': {}",
                    rule.name, e
                ))
            })?;
            rules.push(CompiledRule {
                name: rule.name.clone(),
                regex,
                replacement: rule.replacement.clone(),
                severity: rule.severity.clone(),
                category: rule.category.clone(),
                action: rule.action,
            });
        }
        Ok(Self { config, rules })
    }
}

/// Rule-based scan-and-transform filter
pub struct RegexFilter {
    base: FilterBase,
    compiled: ArcSwap<CompiledRegex>,
}

impl std::fmt::Debug for RegexFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexFilter")
            .field("name", &self.base.name())
            .finish_non_exhaustive()
    }
}

impl RegexFilter {
    pub fn new(name: impl Into<String>, config: &ConfigMap) -> Result<Self> {
        let capabilities = FilterCapabilities {
            supports_inbound: true,
            supports_outbound: true,
            supports_modification: true,
            supports_blocking: true,
            supported_content_types: vec!["*".to_string()],
            supports_realtime: true,
            supports_batch: true,
        };
        let filter = Self {
            base: FilterBase::new(name.into(), DEFAULT_PRIORITY, capabilities),
            compiled: ArcSwap::from_pointee(CompiledRegex::compile(RegexConfig::default())?),
        };
        filter.configure(config)?;
        Ok(filter)
    }
}

impl Filter for RegexFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Regex
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
        let parsed: RegexConfig = parse_config(config)?;
        let compiled = CompiledRegex::compile(parsed)?;
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
        let mut text = content.raw.clone();
        let mut violations = Vec::new();
        let mut modified = false;
        let mut should_block = false;

        for rule in &compiled.rules {
            // Collect matches against the current text before any substitution
            let matches: Vec<(usize, String)> = rule
                .regex
                .find_iter(&text)
                .map(|m| (m.start(), m.as_str().to_string()))
                .collect();

            for (position, matched) in &matches {
                let mut violation = FilterViolation::new(
                    "regex_match",
                    rule.regex.as_str(),
                    matched.as_str(),
                    *position,
                    rule.severity.as_str(),
                )
                .with_meta("rule_name", rule.name.as_str())
                .with_meta("category", rule.category.as_str())
                .with_meta("action", format!("{:?}", rule.action).to_lowercase());
                if !rule.replacement.is_empty() {
                    violation.replacement = Some(rule.replacement.clone());
                }
                violations.push(violation);
            }

            if matches.is_empty() {
                continue;
            }

            match rule.action {
                RuleAction::Replace => {
                    if !rule.replacement.is_empty() {
                        let replaced = rule
                            .regex
                            .replace_all(&text, rule.replacement.as_str())
                            .to_string();
                        if replaced != text {
                            text = replaced;
                            modified = true;
                        }
                    }
                }
                RuleAction::Block => should_block = true,
                RuleAction::Warn | RuleAction::Audit => {}
            }
        }

        let (action, blocked, reason) = if should_block {
            (
                FilterAction::Block,
                true,
                format!(
                    "Content blocked by regex rules: {} violations found",
                    violations.len()
                ),
            )
        } else if violations.is_empty() {
            (FilterAction::Allow, false, String::new())
        } else {
            let count = violations.len();
            match compiled.config.action {
                FilterAction::Block => (
                    FilterAction::Block,
                    true,
                    format!("Content blocked: {} regex violations found", count),
                ),
                FilterAction::Warn => (
                    FilterAction::Warn,
                    false,
                    format!("Content warning: {} regex matches found", count),
                ),
                FilterAction::Audit => (
                    FilterAction::Audit,
                    false,
                    format!("Content audit: {} regex matches logged", count),
                ),
                FilterAction::Allow => (FilterAction::Allow, false, String::new()),
            }
        };

        let new_content = modified.then(|| content.with_raw(text));
        Ok((
            FilterResult::new(blocked, modified, action, reason, violations),
            new_content,
        ))
    }
}

/// Factory for [`RegexFilter`]
pub struct RegexFilterFactory;

impl FilterFactory for RegexFilterFactory {
    fn filter_type(&self) -> FilterType {
        FilterType::Regex
    }

    fn name(&self) -> &str {
        "Regex Filter"
    }

    fn description(&self) -> &str {
        "Pattern-based content filtering with search and replace functionality"
    }

    fn create(&self, config: &ConfigMap) -> Result<Arc<dyn Filter>> {
        let name = name_from_config(config, "regex-filter");
        Ok(Arc::new(RegexFilter::new(name, config)?))
    }

    fn validate_config(&self, config: &ConfigMap) -> Result<()> {
        let parsed: RegexConfig = parse_config(config)?;
        CompiledRegex::compile(parsed).map(|_| ())
    }

    fn default_config(&self) -> ConfigMap {
        let value = json!({
            "rules": [
                {
                    "name": "remove-extra-spaces",
                    "pattern": r"\s{2,}",
                    "replacement": " ",
                    "enabled": false,
                    "severity": "low",
                    "category": "formatting",
                    "description": "Remove extra spaces from content",
                    "action": "replace",
                },
            ],
            "action": "warn",
            "log_violations": true,
            "log_matches": false,
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
                "rules": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "pattern": {"type": "string"},
                            "replacement": {"type": "string"},
                            "enabled": {"type": "boolean"},
                            "severity": {"type": "string"},
                            "category": {"type": "string"},
                            "description": {"type": "string"},
                            "action": {"type": "string", "enum": ["replace", "block", "warn", "audit"]},
                        },
                        "required": ["name", "pattern"],
                    },
                },
                "action": {"type": "string", "enum": ["block", "warn", "audit", "allow"]},
                "log_violations": {"type": "boolean"},
                "log_matches": {"type": "boolean"},
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
    fn test_replace_rules_compose_over_evolving_text() {
        let filter = RegexFilter::new(
            "regex",
            &config(json!({
                "rules": [
                    {"name": "collapse-spaces", "pattern": r" {2,}", "replacement": " ", "action": "replace"},
                    {"name": "tab-to-spaces", "pattern": r"\t", "replacement": "    ", "action": "replace"},
                ],
                "action": "allow",
            })),
        )
        .unwrap();

        let content = FilterContent::from_raw("This  has\textra     spaces");
        let (result, new_content) = filter.apply(&ctx(), &content).unwrap();

        assert!(result.modified);
        assert!(!result.blocked);
        assert!(result.violations.len() >= 2);
        assert_eq!(new_content.unwrap().raw, "This has    extra spaces");
        // Original content is untouched
        assert_eq!(content.raw, "This  has\textra     spaces");
    }

    #[test]
    fn test_block_rule_overrides_filter_action() {
        let filter = RegexFilter::new(
            "regex",
            &config(json!({
                "rules": [
                    {"name": "no-badword", "pattern": "badword", "action": "block", "severity": "high"},
                ],
                "action": "allow",
            })),
        )
        .unwrap();

        let (result, _) = filter
            .apply(&ctx(), &FilterContent::from_raw("contains badword here"))
            .unwrap();

        assert!(result.blocked);
        assert_eq!(result.action, FilterAction::Block);
        assert_eq!(result.violations[0].violation_type, "regex_match");
    }

    #[test]
    fn test_every_match_of_every_rule_reported() {
        let filter = RegexFilter::new(
            "regex",
            &config(json!({
                "rules": [
                    {"name": "digits", "pattern": r"\d+", "replacement": "N", "action": "replace"},
                ],
                "action": "warn",
            })),
        )
        .unwrap();

        let (result, new_content) = filter
            .apply(&ctx(), &FilterContent::from_raw("a1 b22 c333"))
            .unwrap();

        assert_eq!(result.violations.len(), 3);
        assert!(result.modified);
        assert_eq!(new_content.unwrap().raw, "aN bN cN");
        assert_eq!(result.action, FilterAction::Warn);
    }

    #[test]
    fn test_disabled_rule_skipped() {
        let filter = RegexFilter::new(
            "regex",
            &config(json!({
                "rules": [
                    {"name": "off", "pattern": "anything", "enabled": false, "action": "block"},
                ],
                "action": "allow",
            })),
        )
        .unwrap();

        let (result, _) = filter
            .apply(&ctx(), &FilterContent::from_raw("anything goes"))
            .unwrap();
        assert!(!result.blocked);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_invalid_rule_pattern_fails_configure() {
        let err = RegexFilter::new(
            "regex",
            &config(json!({
                "rules": [{"name": "bad", "pattern": "(unclosed"}],
            })),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidPattern(_)));
    }
}
