//! HTTP middleware integration tests
//!
//! Drives the filtering middleware pair through actix test services.

use std::sync::Arc;

use actix_web::{App, HttpResponse, test, web};

use filtergate::core::filters::registry::FilterRegistry;
use filtergate::server::middleware::{ContentFilterMiddleware, ResponseFilterMiddleware};
use filtergate::services::FilterService;
use filtergate::storage::memory::MemoryFilterStore;

use crate::common::deny_record;

const ORG: &str = "00000000-0000-0000-0000-000000000000";

async fn echo(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(body)
}

async fn service_with(records: Vec<filtergate::storage::ContentFilterRecord>) -> Arc<FilterService> {
    let store = Arc::new(MemoryFilterStore::with_filters(records).await);
    let service = FilterService::new(store, Arc::new(FilterRegistry::new()));
    service.initialize().unwrap();
    Arc::new(service)
}

#[actix_web::test]
async fn test_blocked_request_returns_sanitized_403() {
    let filters = service_with(vec![deny_record(ORG, "no-secrets", 10, "password")]).await;

    let app = test::init_service(
        App::new()
            .wrap(ContentFilterMiddleware::new(filters.clone(), ORG))
            .route("/rpc/echo", web::post().to(echo)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/rpc/echo")
        .set_payload("my password is hunter2")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "CONTENT_FILTERED");
    assert_eq!(body["details"][0]["type"], "blocked_word");
    assert!(body["details"][0].get("match").is_none());
    assert!(body["details"][0].get("pattern").is_none());

    // The block was recorded in the audit trail
    let violations = filters.get_violations(ORG, 10, 0).await.unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].action_taken, "block");
    assert_eq!(violations[0].direction.as_deref(), Some("inbound"));
}

#[actix_web::test]
async fn test_clean_request_passes_through() {
    let filters = service_with(vec![deny_record(ORG, "no-secrets", 10, "password")]).await;

    let app = test::init_service(
        App::new()
            .wrap(ContentFilterMiddleware::new(filters, ORG))
            .route("/rpc/echo", web::post().to(echo)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/rpc/echo")
        .set_payload("nothing to see here")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body = test::read_body(resp).await;
    assert_eq!(body, "nothing to see here");
}

#[actix_web::test]
async fn test_modified_body_reaches_handler() {
    let mut record = deny_record(ORG, "scrub-digits", 10, "unused");
    record.filter_type = filtergate::core::filters::types::FilterType::Regex;
    record.config = crate::common::config(serde_json::json!({
        "rules": [
            {"name": "digits", "pattern": r"\d+", "replacement": "N", "action": "replace"},
        ],
        "action": "allow",
    }));
    let filters = service_with(vec![record]).await;

    let app = test::init_service(
        App::new()
            .wrap(ContentFilterMiddleware::new(filters, ORG))
            .route("/rpc/echo", web::post().to(echo)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/rpc/echo")
        .set_payload("order 12345 shipped")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body = test::read_body(resp).await;
    assert_eq!(body, "order N shipped");
}

#[actix_web::test]
async fn test_skip_list_bypasses_filtering() {
    let filters = service_with(vec![deny_record(ORG, "no-secrets", 10, "password")]).await;

    let app = test::init_service(
        App::new()
            .wrap(ContentFilterMiddleware::new(filters, ORG))
            .route("/health", web::post().to(echo)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/health")
        .set_payload("password password password")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_tenant_header_selects_filter_set() {
    // Only org-a blocks the word
    let filters = service_with(vec![deny_record("org-a", "no-secrets", 10, "password")]).await;

    let app = test::init_service(
        App::new()
            .wrap(ContentFilterMiddleware::new(filters, ORG))
            .route("/rpc/echo", web::post().to(echo)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/rpc/echo")
        .insert_header(("x-organization-id", "org-a"))
        .set_payload("password")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri("/rpc/echo")
        .insert_header(("x-organization-id", "org-b"))
        .set_payload("password")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn test_caller_request_id_attributed_to_violations() {
    let filters = service_with(vec![deny_record(ORG, "no-secrets", 10, "password")]).await;

    let app = test::init_service(
        App::new()
            .wrap(ContentFilterMiddleware::new(filters.clone(), ORG))
            .route("/rpc/echo", web::post().to(echo)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/rpc/echo")
        .insert_header(("x-request-id", "req-fixed"))
        .set_payload("the password again")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 403);
    let violations = filters.get_violations(ORG, 10, 0).await.unwrap();
    assert_eq!(violations[0].request_id, "req-fixed");
}

#[actix_web::test]
async fn test_oversized_body_rejected_before_filtering() {
    let filters = service_with(vec![deny_record(ORG, "no-secrets", 10, "password")]).await;

    let app = test::init_service(
        App::new()
            .wrap(ContentFilterMiddleware::new(filters.clone(), ORG).max_body_size(16))
            .route("/rpc/echo", web::post().to(echo)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/rpc/echo")
        .set_payload("this body is far longer than sixteen bytes")
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();

    assert_eq!(
        err.as_response_error().status_code(),
        actix_web::http::StatusCode::PAYLOAD_TOO_LARGE
    );
    // Nothing reached the pipeline, so nothing was logged
    assert!(filters.get_violations(ORG, 10, 0).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_warn_action_logs_and_continues() {
    let mut record = deny_record(ORG, "warn-secrets", 10, "password");
    record.config = crate::common::config(serde_json::json!({
        "blocked_words": ["password"],
        "action": "warn",
    }));
    let filters = service_with(vec![record]).await;

    let app = test::init_service(
        App::new()
            .wrap(ContentFilterMiddleware::new(filters.clone(), ORG))
            .route("/rpc/echo", web::post().to(echo)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/rpc/echo")
        .set_payload("my password")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let violations = filters.get_violations(ORG, 10, 0).await.unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].action_taken, "warn");
}

async fn leaky_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("the password is hunter2")
}

#[actix_web::test]
async fn test_response_filter_blocks_outbound_leak() {
    let filters = service_with(vec![deny_record(ORG, "no-secrets", 10, "password")]).await;

    let app = test::init_service(
        App::new()
            .wrap(ResponseFilterMiddleware::new(filters.clone(), ORG))
            .route("/rpc/leak", web::get().to(leaky_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/rpc/leak").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "CONTENT_FILTERED");

    let violations = filters.get_violations(ORG, 10, 0).await.unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].direction.as_deref(), Some("outbound"));
}

#[actix_web::test]
async fn test_response_filter_rewrites_outbound_body() {
    let mut record = deny_record(ORG, "mask-pii", 10, "unused");
    record.filter_type = filtergate::core::filters::types::FilterType::Pii;
    record.config = crate::common::config(serde_json::json!({
        "patterns": {"email": true},
        "masking_strategy": "redact",
        "action": "warn",
    }));
    let filters = service_with(vec![record]).await;

    async fn email_handler() -> HttpResponse {
        HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body("write to alice@example.com")
    }

    let app = test::init_service(
        App::new()
            .wrap(ResponseFilterMiddleware::new(filters, ORG))
            .route("/rpc/email", web::get().to(email_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/rpc/email").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body = test::read_body(resp).await;
    assert_eq!(body, "write to [REDACTED]");
}
