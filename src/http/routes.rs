use super::handlers;
use super::state::AppState;
use crate::ws;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (root path kept for load balancers probing "/")
        .route("/", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        // Relay protocol
        .route("/ws", get(ws::ws_upgrade))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
