//! HTTP server wiring

use actix_web::middleware::Condition;
use actix_web::{App, HttpServer as ActixHttpServer, web};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::config::Config;
use crate::server::middleware::{ContentFilterMiddleware, ResponseFilterMiddleware};
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{GatewayError, Result};

/// Gateway HTTP server
pub struct HttpServer {
    config: Config,
    state: AppState,
}

impl HttpServer {
    /// Create a server around the shared application state
    pub fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and run until shutdown
    pub async fn start(self) -> Result<()> {
        let state = self.state.clone();
        let filtering = self.config.filtering.clone();
        let host = self.config.server.host.clone();
        let port = self.config.server.port;
        let workers = self.config.server.workers;
        let max_body_size = self.config.server.max_body_size;

        info!("Starting HTTP server at http://{}:{}", host, port);

        let mut server = ActixHttpServer::new(move || {
            let filter_service = state.filters.clone();
            App::new()
                .app_data(web::Data::new(state.clone()))
                .app_data(web::PayloadConfig::new(max_body_size))
                // Middleware runs outermost-last: tracing wraps the
                // filtering pair; the response filter wraps the inbound
                // filter so it can read the resolved tenant and request id
                .wrap(
                    ContentFilterMiddleware::new(
                        filter_service.clone(),
                        filtering.default_organization_id.clone(),
                    )
                    .log_violations(filtering.log_violations)
                    .max_body_size(max_body_size),
                )
                .wrap(Condition::new(
                    filtering.filter_responses,
                    ResponseFilterMiddleware::new(
                        filter_service,
                        filtering.default_organization_id.clone(),
                    )
                    .log_violations(filtering.log_violations),
                ))
                .wrap(TracingLogger::default())
                .configure(routes::configure_routes)
        });

        if let Some(workers) = workers {
            server = server.workers(workers);
        }

        server
            .bind((host.as_str(), port))
            .map_err(|e| GatewayError::Config(format!("Failed to bind {}:{}: {}", host, port, e)))?
            .run()
            .await
            .map_err(GatewayError::Io)
    }
}
