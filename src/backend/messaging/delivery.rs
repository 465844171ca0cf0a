//! Message Delivery Pipeline
//!
//! The single place where sending a message (or marking a conversation
//! read) produces its side effects. The REST handlers and the gateway both
//! call through here, so the two transports are semantically identical:
//! same authorization rule, same persistence, same broadcasts, same
//! notification emission.
//!
//! Sequence for a send: persist to the message store (which bumps the
//! conversation timestamp), broadcast the persisted message to the
//! conversation room, ping the receiver's personal channel, then write the
//! notification row. The notification write is fire-and-forget; its failure
//! is logged and never surfaced to the sender.

use sqlx::PgPool;
use uuid::Uuid;

use crate::backend::directory::users;
use crate::backend::error::MessagingError;
use crate::backend::messaging::{messages, notifications};
use crate::backend::realtime::RoomRegistry;
use crate::shared::event::ServerEvent;
use crate::shared::messaging::{ChatMessage, Conversation};

/// Preview length for the personal-channel badge ping
const PING_PREVIEW_LEN: usize = 60;

/// Persist a message and fan out every delivery side effect.
///
/// On any store failure nothing is broadcast; the error is returned to the
/// caller alone.
pub async fn send_message(
    pool: &PgPool,
    rooms: &RoomRegistry,
    conversation: &Conversation,
    sender_id: Uuid,
    text: &str,
) -> Result<ChatMessage, MessagingError> {
    let message = messages::append(pool, conversation, sender_id, text).await?;

    let delivered = rooms.broadcast_to_conversation(
        conversation.id,
        ServerEvent::NewMessage {
            message: message.clone(),
        },
    );
    tracing::debug!(
        conversation = %conversation.id,
        message = %message.id,
        subscribers = delivered,
        "message broadcast to room"
    );

    rooms.notify_user(
        message.receiver_id,
        ServerEvent::NewMessageNotification {
            conversation_id: conversation.id,
            sender_id,
            preview: message.preview(PING_PREVIEW_LEN),
        },
    );

    emit_notification(pool, &message).await;

    Ok(message)
}

/// Mark a conversation read for `reader_id` and broadcast the receipt so the
/// counterpart's delivered indicators can flip to read.
pub async fn mark_conversation_read(
    pool: &PgPool,
    rooms: &RoomRegistry,
    conversation: &Conversation,
    reader_id: Uuid,
) -> Result<u64, MessagingError> {
    let flipped = messages::mark_read(pool, conversation.id, reader_id).await?;

    rooms.broadcast_to_conversation(
        conversation.id,
        ServerEvent::MessagesRead {
            conversation_id: conversation.id,
            read_by: reader_id,
        },
    );

    Ok(flipped)
}

/// Write the notification row for a delivered message. Failures are logged
/// and swallowed; the message itself is already persisted and broadcast.
async fn emit_notification(pool: &PgPool, message: &ChatMessage) {
    let sender_name = match users::get_user_by_id(pool, message.sender_id).await {
        Ok(Some(profile)) => profile.username,
        Ok(None) => "Unknown user".to_string(),
        Err(err) => {
            tracing::warn!(error = ?err, "sender lookup failed while emitting notification");
            "Unknown user".to_string()
        }
    };

    if let Err(err) = notifications::create_message_notification(pool, message, &sender_name).await
    {
        tracing::warn!(
            error = ?err,
            message = %message.id,
            "failed to write message notification"
        );
    }
}
