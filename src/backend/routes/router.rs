//! Router Assembly
//!
//! Combines the gateway socket route, the REST fallback routes, and the
//! liveness probe into one Axum router with request tracing.

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::backend::realtime::gateway::handle_gateway_socket;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new()
        .route("/ws", axum::routing::get(handle_gateway_socket))
        .route("/health", axum::routing::get(health));

    let router = configure_api_routes(router);

    router
        .fallback(|| async { "404 Not Found" })
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health() -> &'static str {
    "ok"
}
