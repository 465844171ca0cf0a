//! REST Fallback Handlers
//!
//! The HTTP surface used when a socket is unavailable. Each handler is
//! semantically identical to its gateway counterpart: same authorization
//! rule (non-participants see not-found), same persistence side effects,
//! same broadcasts and notification emission, because both paths run
//! through [`super::delivery`].

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use crate::backend::auth::sessions::user_id_from_token;
use crate::backend::directory::ads;
use crate::backend::error::MessagingError;
use crate::backend::messaging::{conversations, delivery, messages};
use crate::backend::server::state::AppState;
use crate::shared::messaging::{
    ListConversationsResponse, ListMessagesResponse, SendMessageRequest, SendMessageResponse,
    StartConversationRequest, StartConversationResponse,
};

/// Extract and verify the bearer token from request headers
fn extract_user_id(headers: &HeaderMap) -> Result<Uuid, MessagingError> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| MessagingError::Authentication("missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| MessagingError::Authentication("malformed authorization header".to_string()))?;

    user_id_from_token(token).map_err(MessagingError::Authentication)
}

/// List the caller's conversations (GET /api/conversations)
pub async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListConversationsResponse>, MessagingError> {
    let user_id = extract_user_id(&headers)?;
    let conversations = conversations::list_for_user(&state.db_pool, user_id).await?;
    Ok(Json(ListConversationsResponse { conversations }))
}

/// Start (or fetch) the conversation for an advertisement
/// (POST /api/conversations)
///
/// The caller becomes the buyer; the seller side is resolved from the ad
/// directory. Upsert semantics: repeating the call returns the same
/// conversation.
pub async fn start_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StartConversationRequest>,
) -> Result<Json<StartConversationResponse>, MessagingError> {
    let buyer_id = extract_user_id(&headers)?;

    let ad = ads::get_ad_by_id(&state.db_pool, request.advertisement_id)
        .await?
        .ok_or_else(|| MessagingError::validation("advertisement_id", "advertisement not found"))?;

    let conversation =
        conversations::get_or_create(&state.db_pool, ad.id, buyer_id, ad.seller_id).await?;

    Ok(Json(StartConversationResponse { conversation }))
}

/// List a conversation's messages (GET /api/conversations/{id}/messages)
pub async fn get_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ListMessagesResponse>, MessagingError> {
    let user_id = extract_user_id(&headers)?;

    let conversation =
        conversations::get_for_participant(&state.db_pool, conversation_id, user_id)
            .await?
            .ok_or(MessagingError::Authorization)?;

    let messages = messages::list_for_conversation(&state.db_pool, conversation.id).await?;
    Ok(Json(ListMessagesResponse { messages }))
}

/// Send a message (POST /api/conversations/{id}/messages)
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, MessagingError> {
    let user_id = extract_user_id(&headers)?;

    let conversation =
        conversations::get_for_participant(&state.db_pool, conversation_id, user_id)
            .await?
            .ok_or(MessagingError::Authorization)?;

    let message = delivery::send_message(
        &state.db_pool,
        &state.rooms,
        &conversation,
        user_id,
        &request.text,
    )
    .await?;

    Ok(Json(SendMessageResponse { message }))
}

/// Mark a conversation's messages read (POST /api/conversations/{id}/read)
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, MessagingError> {
    let user_id = extract_user_id(&headers)?;

    let conversation =
        conversations::get_for_participant(&state.db_pool, conversation_id, user_id)
            .await?
            .ok_or(MessagingError::Authorization)?;

    delivery::mark_conversation_read(&state.db_pool, &state.rooms, &conversation, user_id).await?;

    Ok(StatusCode::OK)
}
