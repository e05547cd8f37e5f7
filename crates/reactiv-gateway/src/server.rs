// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use reactiv_config::model::GatewayConfig;
use reactiv_core::ReactivError;
use reactiv_fallback::FallbackSystem;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub system: Arc<FallbackSystem>,
    pub auth: AuthConfig,
}

/// Gateway server configuration (mirrors `GatewayConfig`).
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl ServerConfig {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            bearer_token: config.bearer_token.clone(),
        }
    }
}

/// Builds the router:
/// - GET /health (public)
/// - GET /v1/status, POST /v1/dispatch, POST /v1/recovery,
///   POST /v1/queue/process, POST /v1/breakers/{channel}/reset (bearer auth)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/status", get(handlers::get_status))
        .route("/v1/dispatch", post(handlers::post_dispatch))
        .route("/v1/recovery", post(handlers::post_recovery))
        .route("/v1/queue/process", post(handlers::post_process_queue))
        .route(
            "/v1/breakers/{channel}/reset",
            post(handlers::post_reset_breaker),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), ReactivError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ReactivError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| ReactivError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_copies_gateway_section() {
        let gateway = GatewayConfig {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 4040,
            bearer_token: Some("gw-secret-8841".to_string()),
        };
        let config = ServerConfig::from_config(&gateway);
        assert_eq!(config.port, 4040);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.bearer_token.as_deref(), Some("gw-secret-8841"));
    }

    #[test]
    fn debug_output_hides_bearer_token() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 4040,
            bearer_token: Some("gw-secret-8841".to_string()),
        };
        let printed = format!("{config:?}");
        assert!(printed.contains("4040"));
        assert!(printed.contains("[redacted]"));
        assert!(!printed.contains("gw-secret-8841"));
    }
}
