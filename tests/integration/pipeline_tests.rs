//! End-to-end pipeline tests over persisted configuration
//!
//! Saves filter configurations through the service, then verifies the
//! reconstructed pipeline behaves per policy.

use filtergate::core::filters::types::{
    FilterAction, FilterContent, FilterContext, FilterDirection, FilterType,
};
use filtergate::storage::records::ContentFilterRecord;

use crate::common::{config, deny_record, sqlite_service};

fn ctx(org: &str) -> FilterContext {
    FilterContext::new("req-1", org, FilterDirection::Inbound)
}

#[tokio::test]
async fn test_save_then_process_round_trip() {
    let service = sqlite_service().await;

    service
        .save_filter(deny_record("org-1", "no-secrets", 10, "password"))
        .await
        .unwrap();

    // The reconstructed filter carries the persisted identity
    let filters = service.get_organization_filters("org-1").await.unwrap();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].name(), "no-secrets");
    assert_eq!(filters[0].filter_type(), FilterType::Deny);
    assert!(filters[0].is_enabled());
    assert_eq!(filters[0].priority(), 10);
    assert_eq!(
        filters[0].config().get("blocked_words").unwrap(),
        &serde_json::json!(["password"])
    );

    let (result, _) = service
        .process_content(
            &ctx("org-1"),
            &FilterContent::from_raw("Please enter your password here"),
        )
        .await
        .unwrap();

    assert!(result.blocked);
    assert_eq!(result.action, FilterAction::Block);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].violation_type, "blocked_word");
}

#[tokio::test]
async fn test_multi_filter_composition_with_rewrite() {
    let service = sqlite_service().await;

    // Priority 1: mask emails; priority 20: deny the word "classified"
    let mut pii = ContentFilterRecord::new(
        "org-1",
        "mask-pii",
        FilterType::Pii,
        true,
        1,
        config(serde_json::json!({
            "patterns": {"email": true},
            "masking_strategy": "redact",
            "action": "warn",
        })),
    );
    pii.description = "Mask emails before anything else runs".to_string();
    service.save_filter(pii).await.unwrap();
    service
        .save_filter(deny_record("org-1", "no-classified", 20, "classified"))
        .await
        .unwrap();

    let (result, content) = service
        .process_content(
            &ctx("org-1"),
            &FilterContent::from_raw("reach me at alice@example.com"),
        )
        .await
        .unwrap();

    assert!(!result.blocked);
    assert!(result.modified);
    assert_eq!(result.action, FilterAction::Warn);
    assert_eq!(content.raw, "reach me at [REDACTED]");

    // Both filters contribute to a blocked aggregate when triggered
    let (result, _) = service
        .process_content(
            &ctx("org-1"),
            &FilterContent::from_raw("classified: bob@example.com"),
        )
        .await
        .unwrap();
    assert!(result.blocked);
    assert_eq!(result.action, FilterAction::Block);
    let types: Vec<&str> = result
        .violations
        .iter()
        .map(|v| v.violation_type.as_str())
        .collect();
    assert!(types.contains(&"email"));
    assert!(types.contains(&"blocked_word"));
}

#[tokio::test]
async fn test_resource_policy_from_store() {
    let service = sqlite_service().await;

    service
        .save_filter(ContentFilterRecord::new(
            "org-1",
            "https-only",
            FilterType::Resource,
            true,
            5,
            config(serde_json::json!({
                "allowed_protocols": ["https"],
                "allowed_domains": ["*.example.com"],
                "action": "block",
            })),
        ))
        .await
        .unwrap();

    let (result, _) = service
        .process_content(
            &ctx("org-1"),
            &FilterContent::from_raw("GET https://api.example.com/v1/users"),
        )
        .await
        .unwrap();
    assert!(!result.blocked);

    let (result, _) = service
        .process_content(
            &ctx("org-1"),
            &FilterContent::from_raw("GET http://other.com/payload"),
        )
        .await
        .unwrap();
    assert!(result.blocked);
    let types: Vec<&str> = result
        .violations
        .iter()
        .map(|v| v.violation_type.as_str())
        .collect();
    assert!(types.contains(&"blocked_protocol"));
    assert!(types.contains(&"domain_not_allowed"));
}

#[tokio::test]
async fn test_reload_picks_up_external_changes() {
    let service = sqlite_service().await;

    service
        .save_filter(deny_record("org-1", "no-secrets", 10, "password"))
        .await
        .unwrap();

    // Warm the cache, then delete and reload
    let (result, _) = service
        .process_content(&ctx("org-1"), &FilterContent::from_raw("password"))
        .await
        .unwrap();
    assert!(result.blocked);

    service.delete_filter("org-1", "no-secrets").await.unwrap();
    service.reload_organization_filters("org-1").await.unwrap();

    let (result, _) = service
        .process_content(&ctx("org-1"), &FilterContent::from_raw("password"))
        .await
        .unwrap();
    assert!(!result.blocked);
}

#[tokio::test]
async fn test_health_check() {
    let service = sqlite_service().await;
    assert!(service.health_check().await.is_ok());
}
