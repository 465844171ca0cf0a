//! Application State
//!
//! Central state container for the Axum application. Everything in here is
//! cheaply cloneable and thread-safe: the sqlx pool is an `Arc` internally,
//! and the realtime components wrap their maps in `Arc<Mutex<..>>`.
//!
//! `FromRef` implementations let handlers extract just the part of the
//! state they need instead of the whole container.

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::backend::realtime::{PresenceTracker, RoomRegistry};

/// Application state shared across handlers and gateway connections
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    ///
    /// The store is the single source of truth; the server does not start
    /// without it.
    pub db_pool: PgPool,

    /// Broadcast rooms: per-conversation, per-user, and the status channel
    pub rooms: RoomRegistry,

    /// Which identities currently hold live gateway connections
    pub presence: PresenceTracker,
}

impl AppState {
    pub fn new(db_pool: PgPool) -> Self {
        Self {
            db_pool,
            rooms: RoomRegistry::new(),
            presence: PresenceTracker::new(),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for RoomRegistry {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.rooms.clone()
    }
}

impl FromRef<AppState> for PresenceTracker {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.presence.clone()
    }
}
