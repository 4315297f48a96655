// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use walink_config::model::GatewayConfig;
use walink_connection::{ConnectionSupervisor, StatusFacade};
use walink_core::WalinkError;
use walink_dispatch::OutboundDispatcher;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

const MAX_CONCURRENT_REQUESTS: usize = 64;

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: std::time::Instant,
    /// Renders the Prometheus exposition; `None` disables `/metrics`.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub status: StatusFacade,
    pub dispatcher: Arc<OutboundDispatcher>,
    pub supervisor: Arc<ConnectionSupervisor>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// All routes with their middleware.
///
/// `/health` and `/metrics` are public; everything else needs the bearer token.
pub fn router(state: GatewayState, max_body_bytes: usize) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/send", post(handlers::post_send))
        .route("/logout", get(handlers::get_logout))
        .route("/qr", get(handlers::get_qr))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `cancel` fires.
///
/// Refuses to start without a bearer token.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), WalinkError> {
    if state
        .auth
        .bearer_token
        .as_deref()
        .is_none_or(|t| t.trim().is_empty())
    {
        return Err(WalinkError::Config(
            "gateway.bearer_token must be set to serve the control API".to_string(),
        ));
    }

    let app = router(state, config.max_body_bytes);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WalinkError::Transport {
            message: format!("failed to bind gateway to {addr}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| WalinkError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
