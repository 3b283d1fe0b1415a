//! PII filter: detection and masking of personally identifiable information
//!
//! Detection sits behind the [`PiiDetector`] seam; the filter itself only
//! assumes a detector yields zero or more matches. The built-in
//! [`RegexPiiDetector`] covers the common identifier shapes and any custom
//! patterns supplied in the configuration.

use std::collections::HashMap;
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

const DEFAULT_PRIORITY: i32 = 10;

// Built-in identifier shapes, keyed by the pattern name used in the
// `patterns` config map.
const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    ("ssn", r"\b\d{3}-\d{2}-\d{4}\b|\b\d{9}\b"),
    (
        "credit_card",
        r"\b4[0-9]{12}(?:[0-9]{3})?\b|\b5[1-5][0-9]{14}\b|\b3[47][0-9]{13}\b|\b6(?:011|5[0-9]{2})[0-9]{12}\b",
    ),
    ("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
    (
        "phone",
        r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
    ),
    ("ip_address", r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b"),
    ("aws_keys", r"AKIA[0-9A-Z]{16}"),
];

/// One identifier found by a detector
#[derive(Debug, Clone)]
pub struct PiiMatch {
    /// Detector-defined type name, e.g. `ssn`, `email`
    pub pii_type: String,
    /// Pattern or rule that produced the match
    pub pattern: String,
    /// Matched text
    pub matched: String,
    /// Character offset in the scanned text
    pub position: usize,
    /// Severity tag
    pub severity: String,
}

/// Detection seam: anything that can find identifiers in text
///
/// Implementations must be pure in-memory computation; the filter calls
/// `detect` on the request hot path.
pub trait PiiDetector: Send + Sync {
    fn detect(&self, text: &str) -> Vec<PiiMatch>;
}

/// How detected values are rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaskingStrategy {
    #[default]
    Redact,
    Hash,
    Partial,
    Tokenize,
    None,
}

impl MaskingStrategy {
    fn mask(self, value: &str) -> String {
        match self {
            MaskingStrategy::Redact => "[REDACTED]".to_string(),
            MaskingStrategy::Hash => format!("[HASH:{:x}]", value.len()),
            MaskingStrategy::Partial => {
                let len = value.chars().count();
                if len <= 4 {
                    "*".repeat(len)
                } else {
                    let start: String = value.chars().take(2).collect();
                    let end: String = value.chars().skip(len - 2).collect();
                    format!("{}{}{}", start, "*".repeat(len - 4), end)
                }
            }
            MaskingStrategy::Tokenize => format!("[TOKEN:{:x}]", value.len()),
            MaskingStrategy::None => value.to_string(),
        }
    }
}

/// PII filter configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PiiConfig {
    /// Built-in pattern toggles, keyed by pattern name
    pub patterns: HashMap<String, bool>,
    pub masking_strategy: MaskingStrategy,
    pub action: FilterAction,
    pub log_violations: bool,
    pub custom_patterns: Vec<CustomPattern>,
}

impl Default for PiiConfig {
    fn default() -> Self {
        Self {
            patterns: HashMap::new(),
            masking_strategy: MaskingStrategy::Redact,
            action: FilterAction::Warn,
            log_violations: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// User-supplied detection pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomPattern {
    pub name: String,
    pub pattern: String,
    pub enabled: bool,
    pub severity: String,
    pub description: String,
}

impl Default for CustomPattern {
    fn default() -> Self {
        Self {
            name: String::new(),
            pattern: String::new(),
            enabled: true,
            severity: "medium".to_string(),
            description: String::new(),
        }
    }
}

struct CompiledPiiPattern {
    name: String,
    regex: Regex,
    severity: String,
}

/// Regex-backed default detector
pub struct RegexPiiDetector {
    patterns: Vec<CompiledPiiPattern>,
}

impl RegexPiiDetector {
    /// Compile the enabled built-in patterns plus any custom patterns
    pub fn from_config(config: &PiiConfig) -> Result<Self> {
        let mut patterns = Vec::new();

        for (name, pattern) in BUILTIN_PATTERNS {
            if config.patterns.get(*name).copied().unwrap_or(false) {
                let regex = Regex::new(pattern).map_err(|e| {
                    GatewayError::InvalidPattern(format!(
                        "failed to compile pattern {}: {}",
                        name, e
                    ))
                })?;
                patterns.push(CompiledPiiPattern {
                    name: (*name).to_string(),
                    regex,
                    severity: "medium".to_string(),
                });
            }
        }

        for custom in config
            .custom_patterns
            .iter()
            .filter(|p| p.enabled && !p.name.is_empty() && !p.pattern.is_empty())
        {
            let regex = Regex::new(&custom.pattern).map_err(|e| {
                GatewayError::InvalidPattern(format!(
                    "failed to compile custom pattern {}: {}",
                    custom.name, e
                ))
            })?;
            patterns.push(CompiledPiiPattern {
                name: custom.name.clone(),
                regex,
                severity: custom.severity.clone(),
            });
        }

        Ok(Self { patterns })
    }
}

impl PiiDetector for RegexPiiDetector {
    fn detect(&self, text: &str) -> Vec<PiiMatch> {
        let mut matches = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                matches.push(PiiMatch {
                    pii_type: pattern.name.clone(),
                    pattern: pattern.regex.as_str().to_string(),
                    matched: m.as_str().to_string(),
                    position: m.start(),
                    severity: pattern.severity.clone(),
                });
            }
        }
        matches
    }
}

struct CompiledPii {
    config: PiiConfig,
    detector: Arc<dyn PiiDetector>,
}

/// PII detection and masking filter
pub struct PiiFilter {
    base: FilterBase,
    /// External detector supplied at construction, kept across reconfigures
    detector_override: Option<Arc<dyn PiiDetector>>,
    compiled: ArcSwap<CompiledPii>,
}

impl std::fmt::Debug for PiiFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiiFilter")
            .field("name", &self.base.name())
            .field("has_detector_override", &self.detector_override.is_some())
            .finish_non_exhaustive()
    }
}

impl PiiFilter {
    pub fn new(name: impl Into<String>, config: &ConfigMap) -> Result<Self> {
        Self::build(name.into(), config, None)
    }

    /// Build a PII filter around an externally provided detector
    pub fn with_detector(
        name: impl Into<String>,
        config: &ConfigMap,
        detector: Arc<dyn PiiDetector>,
    ) -> Result<Self> {
        Self::build(name.into(), config, Some(detector))
    }

    fn build(
        name: String,
        config: &ConfigMap,
        detector: Option<Arc<dyn PiiDetector>>,
    ) -> Result<Self> {
        let capabilities = FilterCapabilities {
            supports_inbound: true,
            supports_outbound: true,
            supports_modification: true,
            supports_blocking: true,
            supported_content_types: vec!["*".to_string()],
            supports_realtime: true,
            supports_batch: true,
        };
        let default_config = PiiConfig::default();
        let initial_detector: Arc<dyn PiiDetector> = match &detector {
            Some(d) => Arc::clone(d),
            None => Arc::new(RegexPiiDetector::from_config(&default_config)?),
        };
        let filter = Self {
            base: FilterBase::new(name, DEFAULT_PRIORITY, capabilities),
            detector_override: detector,
            compiled: ArcSwap::from_pointee(CompiledPii {
                config: default_config,
                detector: initial_detector,
            }),
        };
        filter.configure(config)?;
        Ok(filter)
    }
}

impl Filter for PiiFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Pii
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
        let parsed: PiiConfig = parse_config(config)?;
        let detector: Arc<dyn PiiDetector> = match &self.detector_override {
            Some(d) => Arc::clone(d),
            None => Arc::new(RegexPiiDetector::from_config(&parsed)?),
        };
        self.compiled.store(Arc::new(CompiledPii {
            config: parsed,
            detector,
        }));
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
        let strategy = compiled.config.masking_strategy;
        let matches = compiled.detector.detect(&content.raw);

        let mut violations = Vec::with_capacity(matches.len());
        let mut text = content.raw.clone();

        for m in &matches {
            let mut violation = FilterViolation::new(
                m.pii_type.as_str(),
                m.pattern.as_str(),
                m.matched.as_str(),
                m.position,
                m.severity.as_str(),
            )
            .with_meta("detector", "pii");

            if strategy != MaskingStrategy::None {
                let masked = strategy.mask(&m.matched);
                text = text.replace(&m.matched, &masked);
                violation.replacement = Some(masked);
            }

            violations.push(violation);
        }

        let modified = text != content.raw;

        let (action, blocked, reason) = if violations.is_empty() {
            (FilterAction::Allow, false, String::new())
        } else {
            let count = violations.len();
            match compiled.config.action {
                FilterAction::Block => (
                    FilterAction::Block,
                    true,
                    format!("PII detected: {} violations found", count),
                ),
                FilterAction::Warn => (
                    FilterAction::Warn,
                    false,
                    format!("PII detected: {} violations found (warning)", count),
                ),
                FilterAction::Audit => (
                    FilterAction::Audit,
                    false,
                    format!("PII detected: {} violations logged for audit", count),
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

/// Factory for [`PiiFilter`]
pub struct PiiFilterFactory;

impl FilterFactory for PiiFilterFactory {
    fn filter_type(&self) -> FilterType {
        FilterType::Pii
    }

    fn name(&self) -> &str {
        "PII Filter"
    }

    fn description(&self) -> &str {
        "Detects and masks personally identifiable information (PII) in content"
    }

    fn create(&self, config: &ConfigMap) -> Result<Arc<dyn Filter>> {
        let name = name_from_config(config, "pii-filter");
        Ok(Arc::new(PiiFilter::new(name, config)?))
    }

    fn validate_config(&self, config: &ConfigMap) -> Result<()> {
        let parsed: PiiConfig = parse_config(config)?;
        RegexPiiDetector::from_config(&parsed).map(|_| ())
    }

    fn default_config(&self) -> ConfigMap {
        let value = json!({
            "patterns": {
                "ssn": true,
                "credit_card": true,
                "email": true,
                "phone": true,
            },
            "masking_strategy": "redact",
            "action": "warn",
            "log_violations": true,
            "custom_patterns": [],
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
                "patterns": {
                    "type": "object",
                    "additionalProperties": {"type": "boolean"},
                },
                "masking_strategy": {
                    "type": "string",
                    "enum": ["redact", "hash", "partial", "tokenize", "none"],
                },
                "action": {"type": "string", "enum": ["block", "warn", "audit", "allow"]},
                "log_violations": {"type": "boolean"},
                "custom_patterns": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "pattern": {"type": "string"},
                            "enabled": {"type": "boolean"},
                            "severity": {"type": "string"},
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
    fn test_ssn_detected_and_redacted() {
        let filter = PiiFilter::new(
            "pii",
            &config(json!({
                "patterns": {"ssn": true},
                "masking_strategy": "redact",
                "action": "warn",
            })),
        )
        .unwrap();

        let (result, new_content) = filter
            .apply(&ctx(), &FilterContent::from_raw("My SSN is 123-45-6789"))
            .unwrap();

        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].violation_type, "ssn");
        assert!(result.modified);
        assert_eq!(new_content.unwrap().raw, "My SSN is [REDACTED]");
        assert_eq!(result.action, FilterAction::Warn);
    }

    #[test]
    fn test_partial_masking() {
        assert_eq!(MaskingStrategy::Partial.mask("123-45-6789"), "12*******89");
        assert_eq!(MaskingStrategy::Partial.mask("abcd"), "****");
    }

    #[test]
    fn test_disabled_patterns_not_detected() {
        let filter = PiiFilter::new(
            "pii",
            &config(json!({"patterns": {"ssn": false}, "action": "block"})),
        )
        .unwrap();

        let (result, _) = filter
            .apply(&ctx(), &FilterContent::from_raw("SSN 123-45-6789"))
            .unwrap();
        assert!(result.violations.is_empty());
        assert!(!result.blocked);
    }

    #[test]
    fn test_block_action_applies_uniformly() {
        let filter = PiiFilter::new(
            "pii",
            &config(json!({
                "patterns": {"email": true},
                "masking_strategy": "none",
                "action": "block",
            })),
        )
        .unwrap();

        let (result, new_content) = filter
            .apply(
                &ctx(),
                &FilterContent::from_raw("contact a@example.com or b@example.org"),
            )
            .unwrap();

        assert!(result.blocked);
        assert_eq!(result.violations.len(), 2);
        assert!(!result.modified);
        assert!(new_content.is_none());
    }

    #[test]
    fn test_external_detector_seam() {
        struct StubDetector;
        impl PiiDetector for StubDetector {
            fn detect(&self, text: &str) -> Vec<PiiMatch> {
                text.find("hunter2")
                    .map(|position| PiiMatch {
                        pii_type: "stub_secret".to_string(),
                        pattern: String::new(),
                        matched: "hunter2".to_string(),
                        position,
                        severity: "high".to_string(),
                    })
                    .into_iter()
                    .collect()
            }
        }

        let filter = PiiFilter::with_detector(
            "pii",
            &config(json!({"action": "block", "masking_strategy": "none"})),
            Arc::new(StubDetector),
        )
        .unwrap();

        let (result, _) = filter
            .apply(&ctx(), &FilterContent::from_raw("pw is hunter2"))
            .unwrap();
        assert!(result.blocked);
        assert_eq!(result.violations[0].violation_type, "stub_secret");
    }

    #[test]
    fn test_invalid_custom_pattern_rejected() {
        let err = PiiFilter::new(
            "pii",
            &config(json!({
                "custom_patterns": [{"name": "bad", "pattern": "("}],
            })),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidPattern(_)));
    }
}
