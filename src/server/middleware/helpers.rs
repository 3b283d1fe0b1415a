//! Middleware helper functions

use actix_web::HttpMessage;
use actix_web::dev::ServiceRequest;

use crate::core::filters::types::TransportKind;

/// Paths exempt from content filtering. Health and metrics probes carry no
/// tenant content; auth and filter-admin endpoints are excluded so filtering
/// cannot lock administrators out of the filter configuration itself.
const SKIP_PATHS: &[&str] = &[
    "/health",
    "/metrics",
    "/api/auth/login",
    "/api/auth/refresh",
    "/api/admin/filters",
];

/// Whether content filtering should be skipped for a path
pub fn should_skip_filtering(path: &str) -> bool {
    SKIP_PATHS.iter().any(|skip| path.starts_with(skip))
}

/// Infer the transport from the request path
pub fn transport_from_path(path: &str) -> TransportKind {
    if path.starts_with("/ws") {
        TransportKind::WebSocket
    } else if path.starts_with("/sse") {
        TransportKind::Sse
    } else if path.starts_with("/mcp") {
        TransportKind::Streamable
    } else {
        TransportKind::Http
    }
}

/// Tenant identity attached to a request by an upstream auth layer
#[derive(Debug, Clone)]
pub struct TenantInfo {
    pub organization_id: String,
    pub user_id: String,
}

/// Resolve the tenant for a request: request extensions first, then
/// headers, then the configured default organization
pub fn resolve_tenant(req: &ServiceRequest, default_organization_id: &str) -> TenantInfo {
    if let Some(tenant) = req.extensions().get::<TenantInfo>() {
        return tenant.clone();
    }

    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    TenantInfo {
        organization_id: header("x-organization-id")
            .unwrap_or_else(|| default_organization_id.to_string()),
        user_id: header("x-user-id").unwrap_or_else(|| "default-user".to_string()),
    }
}
