//! Server Initialization
//!
//! Builds the application: database pool, realtime state, router, and the
//! periodic cleanup task for idle broadcast channels.

use axum::Router;
use std::time::Duration;

use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_database;
use crate::backend::server::state::AppState;

/// How often idle broadcast channels are pruned
const ROOM_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Create and configure the Axum application
pub async fn create_app() -> Result<Router<()>, sqlx::Error> {
    tracing::info!("Initializing tradepost messaging server");

    let db_pool = load_database().await?;
    let app_state = AppState::new(db_pool);

    let app = create_router(app_state.clone());

    // Rooms whose last subscriber disconnected accumulate otherwise.
    let cleanup_rooms = app_state.rooms.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ROOM_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            cleanup_rooms.cleanup_inactive_channels();
            tracing::debug!("pruned idle broadcast channels");
        }
    });

    tracing::info!("Router configured");
    Ok(app)
}
