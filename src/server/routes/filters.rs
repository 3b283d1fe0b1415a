//! Filter administration and discovery endpoints
//!
//! Tenant administrators manage their organization's filter set here. These
//! routes sit on the filtering skip-list, so filter configuration can never
//! be locked out by the filters it configures. Configuration and persistence
//! errors surface their underlying message to the administrator.

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use serde::Deserialize;
use tracing::info;

use crate::core::filters::types::{ConfigMap, FilterType};
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::storage::records::ContentFilterRecord;

/// Configure filter administration routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin/filters")
            .route("/types", web::get().to(list_filter_types))
            .route("/violations", web::get().to(list_violations))
            .route("/metrics", web::get().to(filtering_metrics))
            .route("/reload", web::post().to(reload_filters))
            .route("", web::get().to(list_filters))
            .route("", web::post().to(save_filter))
            .route("/{name}", web::delete().to(delete_filter)),
    );
}

fn organization_from(req: &HttpRequest, state: &AppState) -> String {
    req.headers()
        .get("x-organization-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.filtering.default_organization_id.clone())
}

/// Discovery metadata for every registered filter type
async fn list_filter_types(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let infos = state.filters.registry().all_info()?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(infos)))
}

#[derive(Debug, serde::Serialize)]
struct FilterSummary {
    name: String,
    #[serde(rename = "type")]
    filter_type: FilterType,
    enabled: bool,
    priority: i32,
    config: ConfigMap,
}

/// The organization's configured filters
async fn list_filters(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let organization_id = organization_from(&req, &state);
    let filters = state.filters.get_organization_filters(&organization_id).await?;

    let summaries: Vec<FilterSummary> = filters
        .iter()
        .map(|f| FilterSummary {
            name: f.name().to_string(),
            filter_type: f.filter_type(),
            enabled: f.is_enabled(),
            priority: f.priority(),
            config: f.config(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(summaries)))
}

#[derive(Debug, Deserialize)]
struct SaveFilterRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    filter_type: FilterType,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default = "default_priority")]
    priority: i32,
    #[serde(default)]
    config: ConfigMap,
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> i32 {
    100
}

/// Create or update a filter configuration
async fn save_filter(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<SaveFilterRequest>,
) -> ActixResult<HttpResponse> {
    let organization_id = organization_from(&req, &state);
    let body = body.into_inner();

    let mut record = ContentFilterRecord::new(
        organization_id.clone(),
        body.name.clone(),
        body.filter_type,
        body.enabled,
        body.priority,
        body.config,
    );
    record.description = body.description;

    state.filters.save_filter(record).await?;
    info!(
        "Filter '{}' saved for organization {}",
        body.name, organization_id
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "name": body.name,
        "status": "saved",
    }))))
}

/// Delete a filter configuration
async fn delete_filter(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let organization_id = organization_from(&req, &state);
    let name = path.into_inner();

    state.filters.delete_filter(&organization_id, &name).await?;
    info!(
        "Filter '{}' deleted for organization {}",
        name, organization_id
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "name": name,
        "status": "deleted",
    }))))
}

/// Drop and reload the organization's cached filter set
async fn reload_filters(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let organization_id = organization_from(&req, &state);
    state
        .filters
        .reload_organization_filters(&organization_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "status": "reloaded",
    }))))
}

#[derive(Debug, Deserialize)]
struct ViolationQuery {
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

fn default_limit() -> u64 {
    50
}

/// Page through the organization's violation audit trail
async fn list_violations(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ViolationQuery>,
) -> ActixResult<HttpResponse> {
    let organization_id = organization_from(&req, &state);
    let limit = query.limit.min(500);

    let violations = state
        .filters
        .get_violations(&organization_id, limit, query.offset)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(violations)))
}

/// Running filtering counters
async fn filtering_metrics(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.filters.metrics())))
}
