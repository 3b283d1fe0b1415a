//! Outbound response filtering middleware
//!
//! Captures the emitted response body before it is flushed, re-runs the
//! organization's filters with direction=outbound, and rewrites or replaces
//! the body when policy requires it. Response mutation is best-effort: it
//! only works because this middleware holds the whole body before the
//! client sees any of it.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::{self, BoxBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_LENGTH;
use actix_web::{Error, HttpMessage, HttpResponse};
use bytes::Bytes;
use futures::future::{Ready, ready};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::filters::types::{
    FilterAction, FilterContent, FilterContext, FilterDirection,
};
use crate::server::middleware::content_filter::{log_violation_rows, sanitize_violations};
use crate::server::middleware::helpers::{TenantInfo, should_skip_filtering, transport_from_path};
use crate::services::FilterService;

/// Response filtering middleware for Actix-web
pub struct ResponseFilterMiddleware {
    service: Arc<FilterService>,
    default_organization_id: String,
    log_violations: bool,
}

impl ResponseFilterMiddleware {
    pub fn new(service: Arc<FilterService>, default_organization_id: impl Into<String>) -> Self {
        Self {
            service,
            default_organization_id: default_organization_id.into(),
            log_violations: true,
        }
    }

    /// Control violation-row persistence
    pub fn log_violations(mut self, enabled: bool) -> Self {
        self.log_violations = enabled;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for ResponseFilterMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = ResponseFilterMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ResponseFilterMiddlewareService {
            service: Rc::new(service),
            filter_service: Arc::clone(&self.service),
            default_organization_id: self.default_organization_id.clone(),
            log_violations: self.log_violations,
        }))
    }
}

/// Service implementation for the response filtering middleware
pub struct ResponseFilterMiddlewareService<S> {
    service: Rc<S>,
    filter_service: Arc<FilterService>,
    default_organization_id: String,
    log_violations: bool,
}

impl<S, B> Service<ServiceRequest> for ResponseFilterMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let filter_service = Arc::clone(&self.filter_service);
        let default_org = self.default_organization_id.clone();
        let log_violations = self.log_violations;

        Box::pin(async move {
            let skip = should_skip_filtering(req.path());
            let path = req.path().to_string();

            let res = service.call(req).await?;

            if skip || !res.status().is_success() {
                return Ok(res.map_into_boxed_body());
            }

            let (req, res) = res.into_parts();

            // The inbound middleware runs inside this one and attaches the
            // resolved tenant to the request
            let tenant = req
                .extensions()
                .get::<TenantInfo>()
                .cloned()
                .unwrap_or_else(|| TenantInfo {
                    organization_id: default_org.clone(),
                    user_id: "default-user".to_string(),
                });
            let (res, body) = res.into_parts();

            let body_bytes = body::to_bytes(body).await.map_err(|_| {
                actix_web::error::ErrorInternalServerError("failed to buffer response body")
            })?;

            if body_bytes.is_empty() {
                let res = res.set_body(BoxBody::new(body_bytes));
                return Ok(ServiceResponse::new(req, res));
            }

            let request_id = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            let mut ctx = FilterContext::new(
                request_id.clone(),
                tenant.organization_id.clone(),
                FilterDirection::Outbound,
            );
            ctx.user_id = tenant.user_id.clone();
            ctx.transport = transport_from_path(&path);
            ctx.content_type = res
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            ctx.metadata
                .insert("status_code".to_string(), json!(res.status().as_u16()));
            ctx.metadata.insert("path".to_string(), json!(path));

            let content = FilterContent::from_raw(String::from_utf8_lossy(&body_bytes).into_owned());

            let (result, filtered_content) =
                match filter_service.process_content(&ctx, &content).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        // The response is already produced; surface the
                        // pipeline failure without dropping it
                        warn!(
                            "Outbound filtering failed for request {}: {}",
                            request_id, e
                        );
                        let res = res.set_body(BoxBody::new(body_bytes));
                        return Ok(ServiceResponse::new(req, res));
                    }
                };

            if log_violations && !result.violations.is_empty() {
                debug!(
                    "Outbound filtering found {} violations for request {}",
                    result.violations.len(),
                    request_id
                );
                log_violation_rows(&filter_service, &ctx, &result).await;
            }

            if result.blocked && result.action == FilterAction::Block {
                let replacement = HttpResponse::build(StatusCode::FORBIDDEN).json(json!({
                    "error": "Response blocked by security filters",
                    "reason": result.reason,
                    "code": "CONTENT_FILTERED",
                    "details": sanitize_violations(&result.violations),
                }));
                return Ok(ServiceResponse::new(req, replacement));
            }

            let mut res = res;
            let out_body = if result.modified && filtered_content.raw != content.raw {
                res.headers_mut().remove(CONTENT_LENGTH);
                Bytes::from(filtered_content.raw)
            } else {
                body_bytes
            };

            let res = res.set_body(BoxBody::new(out_body));
            Ok(ServiceResponse::new(req, res))
        })
    }
}
