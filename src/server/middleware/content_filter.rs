//! Inbound content filtering middleware
//!
//! Buffers the request body, runs it through the organization's filter
//! pipeline, and either rejects the request, forwards a rewritten body, or
//! passes it through unchanged. The original payload is restored for
//! downstream handlers in every non-blocking outcome.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{CONTENT_LENGTH, HeaderValue};
use actix_web::{Error, HttpMessage, HttpResponse, web};
use bytes::{Bytes, BytesMut};
use futures::future::{Ready, ready};
use futures_util::StreamExt;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::filters::types::{
    FilterAction, FilterContent, FilterContext, FilterDirection, FilterResult, FilterViolation,
};
use crate::server::middleware::helpers::{
    TenantInfo, resolve_tenant, should_skip_filtering, transport_from_path,
};
use crate::services::FilterService;
use crate::storage::records::FilterViolationRecord;

const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Content filtering middleware for Actix-web
pub struct ContentFilterMiddleware {
    service: Arc<FilterService>,
    default_organization_id: String,
    log_violations: bool,
    max_body_size: usize,
}

impl ContentFilterMiddleware {
    pub fn new(service: Arc<FilterService>, default_organization_id: impl Into<String>) -> Self {
        Self {
            service,
            default_organization_id: default_organization_id.into(),
            log_violations: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Control violation-row persistence
    pub fn log_violations(mut self, enabled: bool) -> Self {
        self.log_violations = enabled;
        self
    }

    /// Cap buffered request bodies; oversized payloads are rejected before
    /// any pattern matching runs, bounding worst-case filtering latency
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for ContentFilterMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ContentFilterMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ContentFilterMiddlewareService {
            service: Rc::new(service),
            filter_service: Arc::clone(&self.service),
            default_organization_id: self.default_organization_id.clone(),
            log_violations: self.log_violations,
            max_body_size: self.max_body_size,
        }))
    }
}

/// Service implementation for the content filtering middleware
pub struct ContentFilterMiddlewareService<S> {
    service: Rc<S>,
    filter_service: Arc<FilterService>,
    default_organization_id: String,
    log_violations: bool,
    max_body_size: usize,
}

impl<S, B> Service<ServiceRequest> for ContentFilterMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let filter_service = Arc::clone(&self.filter_service);
        let default_org = self.default_organization_id.clone();
        let log_violations = self.log_violations;
        let max_body_size = self.max_body_size;

        Box::pin(async move {
            if should_skip_filtering(req.path()) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let tenant = resolve_tenant(&req, &default_org);

            // Adopt a caller-supplied request id, minting one otherwise; the
            // header is propagated so downstream handlers and the outbound
            // leg attribute violations to the same id
            let request_id = match req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
            {
                Some(id) => id.to_string(),
                None => {
                    let id = Uuid::new_v4().to_string();
                    if let Ok(value) = HeaderValue::from_str(&id) {
                        req.headers_mut().insert(
                            actix_web::http::header::HeaderName::from_static("x-request-id"),
                            value,
                        );
                    }
                    id
                }
            };
            debug!("Filtering request {}", request_id);
            req.extensions_mut().insert(tenant.clone());

            let body = read_body(&mut req, max_body_size).await?;
            let ctx = build_context(&req, &tenant, &request_id);
            let content = build_content(&req, &body);

            let (result, filtered_content) = filter_service
                .process_content(&ctx, &content)
                .await
                .map_err(|e| {
                    warn!("Content filtering failed for request {}: {}", request_id, e);
                    Error::from(e)
                })?;

            // Persist the audit trail for any outcome carrying violations
            if log_violations && !result.violations.is_empty() {
                log_violation_rows(&filter_service, &ctx, &result).await;
            }

            if result.blocked && result.action == FilterAction::Block {
                debug!(
                    "Request {} blocked by content filters: {}",
                    request_id, result.reason
                );
                let response = blocked_response(&result);
                return Ok(req.into_response(response).map_into_right_body());
            }

            let forwarded = if result.modified && filtered_content.raw != content.raw {
                Bytes::from(filtered_content.raw.clone())
            } else {
                body
            };
            restore_payload(&mut req, forwarded);

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

/// Collect the whole request payload into memory, bounded by `limit`
async fn read_body(req: &mut ServiceRequest, limit: usize) -> Result<Bytes, Error> {
    let mut payload = req.take_payload();
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > limit {
            return Err(actix_web::error::ErrorPayloadTooLarge(
                "request body exceeds the filtering size limit",
            ));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// Hand a re-readable copy of the body back to downstream extractors
fn restore_payload(req: &mut ServiceRequest, body: Bytes) {
    let len = body.len();
    let (_, mut payload) = actix_http::h1::Payload::create(true);
    payload.unread_data(body);
    req.set_payload(actix_web::dev::Payload::from(payload));

    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        req.headers_mut().insert(CONTENT_LENGTH, value);
    }
}

fn build_context(req: &ServiceRequest, tenant: &TenantInfo, request_id: &str) -> FilterContext {
    let mut ctx = FilterContext::new(
        request_id,
        tenant.organization_id.clone(),
        FilterDirection::Inbound,
    );
    ctx.user_id = tenant.user_id.clone();
    ctx.transport = transport_from_path(req.path());
    ctx.content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    ctx.metadata
        .insert("method".to_string(), json!(req.method().as_str()));
    ctx.metadata.insert("path".to_string(), json!(req.path()));
    if let Some(user_agent) = req.headers().get("user-agent").and_then(|v| v.to_str().ok()) {
        ctx.metadata.insert("user_agent".to_string(), json!(user_agent));
    }
    if let Some(peer) = req.connection_info().realip_remote_addr() {
        ctx.metadata.insert("remote_addr".to_string(), json!(peer));
    }
    ctx
}

fn build_content(req: &ServiceRequest, body: &Bytes) -> FilterContent {
    let raw = String::from_utf8_lossy(body).into_owned();
    let parsed = serde_json::from_str(&raw).ok();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    let params: HashMap<String, serde_json::Value> =
        web::Query::<HashMap<String, String>>::from_query(req.query_string())
            .map(|q| {
                q.into_inner()
                    .into_iter()
                    .map(|(k, v)| (k, json!(v)))
                    .collect()
            })
            .unwrap_or_default();

    FilterContent {
        raw,
        parsed,
        headers,
        params,
    }
}

/// 403 response exposing only policy-safe violation details
fn blocked_response(result: &FilterResult) -> HttpResponse {
    HttpResponse::Forbidden().json(json!({
        "error": "Content blocked by security filters",
        "reason": result.reason,
        "code": "CONTENT_FILTERED",
        "details": sanitize_violations(&result.violations),
    }))
}

/// Strip matched text and patterns before anything leaves the gateway
pub(crate) fn sanitize_violations(violations: &[FilterViolation]) -> Vec<serde_json::Value> {
    violations
        .iter()
        .map(|v| {
            json!({
                "type": v.violation_type,
                "severity": v.severity,
                "position": v.position,
            })
        })
        .collect()
}

/// Persist one violation row per rule match
pub(crate) async fn log_violation_rows(
    service: &FilterService,
    ctx: &FilterContext,
    result: &FilterResult,
) {
    for violation in &result.violations {
        let mut row = FilterViolationRecord::new(
            ctx.organization_id.clone(),
            ctx.request_id.clone(),
            violation.violation_type.clone(),
            result.action.to_string(),
            violation.severity.clone(),
        );
        row.user_id = ctx.user_id.clone();
        row.session_id = ctx.session_id.clone();
        row.server_id = ctx.server_id.clone();
        row.direction = Some(ctx.direction.to_string());
        row.metadata = violation.metadata.clone();
        row.set_snippet(&violation.matched);
        if !violation.pattern.is_empty() {
            row.pattern_matched = Some(violation.pattern.clone());
        }
        row.remote_ip = ctx
            .metadata
            .get("remote_addr")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        row.user_agent = ctx
            .metadata
            .get("user_agent")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if let Err(e) = service.log_violation(&row).await {
            warn!("Failed to log filter violation: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_violations_hide_match_and_pattern() {
        let violation = FilterViolation::new(
            "blocked_word",
            "secret-pattern",
            "the secret itself",
            7,
            "high",
        );
        let sanitized = sanitize_violations(&[violation]);

        assert_eq!(sanitized.len(), 1);
        let entry = &sanitized[0];
        assert_eq!(entry["type"], "blocked_word");
        assert_eq!(entry["severity"], "high");
        assert_eq!(entry["position"], 7);
        assert!(entry.get("match").is_none());
        assert!(entry.get("pattern").is_none());
        let text = entry.to_string();
        assert!(!text.contains("secret-pattern"));
        assert!(!text.contains("the secret itself"));
    }
}
