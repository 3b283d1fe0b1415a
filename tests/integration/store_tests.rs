//! SeaORM store integration tests
//!
//! Exercises the filter configuration store against real in-memory sqlite.

use filtergate::core::filters::types::FilterType;
use filtergate::storage::records::FilterViolationRecord;
use filtergate::storage::store::FilterStore;
use filtergate::utils::error::GatewayError;

use crate::common::{config, deny_record, memory_store};

#[tokio::test]
async fn test_store_ping() {
    let store = memory_store().await;
    assert!(store.ping().await.is_ok());
}

#[tokio::test]
async fn test_upsert_and_list_round_trip() {
    let store = memory_store().await;

    let record = deny_record("org-1", "no-secrets", 10, "password");
    store.upsert(&record).await.unwrap();

    let listed = store.list_enabled("org-1").await.unwrap();
    assert_eq!(listed.len(), 1);

    let loaded = &listed[0];
    assert_eq!(loaded.name, "no-secrets");
    assert_eq!(loaded.filter_type, FilterType::Deny);
    assert!(loaded.enabled);
    assert_eq!(loaded.priority, 10);
    assert_eq!(
        loaded.config.get("blocked_words").unwrap(),
        &serde_json::json!(["password"])
    );
}

#[tokio::test]
async fn test_upsert_updates_existing_row() {
    let store = memory_store().await;

    let mut record = deny_record("org-1", "no-secrets", 10, "password");
    store.upsert(&record).await.unwrap();

    record.priority = 5;
    record.config = config(serde_json::json!({
        "blocked_words": ["token"],
        "action": "warn",
    }));
    store.upsert(&record).await.unwrap();

    let listed = store.list_enabled("org-1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].priority, 5);
    assert_eq!(
        listed[0].config.get("blocked_words").unwrap(),
        &serde_json::json!(["token"])
    );
}

#[tokio::test]
async fn test_list_enabled_orders_by_priority() {
    let store = memory_store().await;

    store.upsert(&deny_record("org-1", "late", 50, "a")).await.unwrap();
    store.upsert(&deny_record("org-1", "early", 1, "b")).await.unwrap();
    store.upsert(&deny_record("org-1", "middle", 25, "c")).await.unwrap();

    let listed = store.list_enabled("org-1").await.unwrap();
    let names: Vec<&str> = listed.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["early", "middle", "late"]);
}

#[tokio::test]
async fn test_disabled_rows_excluded() {
    let store = memory_store().await;

    let mut record = deny_record("org-1", "off", 10, "x");
    record.enabled = false;
    store.upsert(&record).await.unwrap();

    assert!(store.list_enabled("org-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_organization_scoping() {
    let store = memory_store().await;

    store.upsert(&deny_record("org-1", "a", 10, "x")).await.unwrap();
    store.upsert(&deny_record("org-2", "b", 10, "y")).await.unwrap();

    assert_eq!(store.list_enabled("org-1").await.unwrap().len(), 1);
    assert_eq!(store.list_enabled("org-2").await.unwrap().len(), 1);
    assert!(store.list_enabled("org-3").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_missing_row_fails() {
    let store = memory_store().await;

    store.upsert(&deny_record("org-1", "a", 10, "x")).await.unwrap();
    store.delete("org-1", "a").await.unwrap();

    let err = store.delete("org-1", "a").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
}

#[tokio::test]
async fn test_violation_log_pagination() {
    let store = memory_store().await;

    for i in 0..5 {
        let mut violation = FilterViolationRecord::new(
            "org-1",
            format!("req-{}", i),
            "blocked_word",
            "block",
            "medium",
        );
        violation.created_at = chrono::Utc::now() + chrono::Duration::seconds(i);
        store.append_violation(&violation).await.unwrap();
    }

    let first_page = store.list_violations("org-1", 2, 0).await.unwrap();
    assert_eq!(first_page.len(), 2);
    // Newest first
    assert_eq!(first_page[0].request_id, "req-4");

    let second_page = store.list_violations("org-1", 2, 2).await.unwrap();
    assert_eq!(second_page.len(), 2);
    assert_eq!(second_page[0].request_id, "req-2");

    assert!(store.list_violations("org-2", 10, 0).await.unwrap().is_empty());
}
