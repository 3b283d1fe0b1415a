//! Shared test infrastructure

use std::sync::Arc;

use filtergate::config::DatabaseConfig;
use filtergate::core::filters::registry::FilterRegistry;
use filtergate::core::filters::types::{ConfigMap, FilterType};
use filtergate::services::FilterService;
use filtergate::storage::database::SeaOrmFilterStore;
use filtergate::storage::records::ContentFilterRecord;

/// In-memory sqlite store with migrations applied
pub async fn memory_store() -> SeaOrmFilterStore {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connection_timeout: 5,
        enabled: true,
    };

    let store = SeaOrmFilterStore::new(&config)
        .await
        .expect("Failed to create store");
    store.migrate().await.expect("Migration failed");
    store
}

/// Filter service over an in-memory sqlite store
pub async fn sqlite_service() -> FilterService {
    let store = Arc::new(memory_store().await);
    let service = FilterService::new(store, Arc::new(FilterRegistry::new()));
    service.initialize().expect("Failed to initialize service");
    service
}

/// Turn a JSON literal into a configuration document
pub fn config(value: serde_json::Value) -> ConfigMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("config must be an object"),
    }
}

/// A deny-filter record blocking one word
pub fn deny_record(org: &str, name: &str, priority: i32, word: &str) -> ContentFilterRecord {
    ContentFilterRecord::new(
        org,
        name,
        FilterType::Deny,
        true,
        priority,
        config(serde_json::json!({
            "blocked_words": [word],
            "action": "block",
        })),
    )
}
