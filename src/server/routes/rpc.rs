//! Protocol echo endpoint
//!
//! Minimal handler standing in for the brokered backend: it returns the
//! (possibly rewritten) request body, which makes the inbound and outbound
//! filtering legs observable end to end.

use actix_web::{HttpResponse, Result as ActixResult, web};

/// Configure protocol routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/rpc").route("/echo", web::post().to(echo)));
}

/// Echo the request body back to the caller
async fn echo(body: web::Bytes) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(body))
}
