//! Health check endpoints

use std::borrow::Cow;

use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::debug;

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;

/// Configure health check routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(health_check))
            .route("/detailed", web::get().to(detailed_health_check)),
    );
}

#[derive(serde::Serialize)]
struct HealthStatus {
    status: Cow<'static, str>,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: Cow<'static, str>,
}

/// Basic health check endpoint
///
/// Used by load balancers and monitoring systems; exempt from content
/// filtering.
pub async fn health_check(_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Health check requested");

    let health_status = HealthStatus {
        status: Cow::Borrowed("healthy"),
        timestamp: chrono::Utc::now(),
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(health_status)))
}

/// Detailed health check: verifies the filter store and registry
async fn detailed_health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Detailed health check requested");

    match state.filters.health_check().await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
            "status": "healthy",
            "filter_service": "ok",
        })))),
        Err(e) => Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "success": false,
            "error": e.to_string(),
        }))),
    }
}
