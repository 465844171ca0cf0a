//! API Route Handlers
//!
//! REST fallback routes for the messaging core:
//!
//! - `GET  /api/conversations` - list the caller's conversations
//! - `POST /api/conversations` - start (or fetch) a conversation for an ad
//! - `GET  /api/conversations/{conversation_id}/messages` - history
//! - `POST /api/conversations/{conversation_id}/messages` - send
//! - `POST /api/conversations/{conversation_id}/read` - mark read
//!
//! All of these require a bearer token; authorization is checked per
//! conversation in the handlers.

use axum::Router;

use crate::backend::messaging::handlers::{
    get_messages, list_conversations, mark_conversation_read, send_message, start_conversation,
};
use crate::backend::server::state::AppState;

/// Configure API routes
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/conversations",
            axum::routing::get(list_conversations).post(start_conversation),
        )
        .route(
            "/api/conversations/{conversation_id}/messages",
            axum::routing::get(get_messages).post(send_message),
        )
        .route(
            "/api/conversations/{conversation_id}/read",
            axum::routing::post(mark_conversation_read),
        )
}
