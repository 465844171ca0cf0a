//! Message Store
//!
//! Ordered message log per conversation. A message is immutable once
//! written except for its read flag. Appending a message always bumps the
//! owning conversation's `updated_at` in the same transaction; the bump is a
//! property of `append` itself, not of any particular caller.

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::backend::error::MessagingError;
use crate::shared::messaging::{ChatMessage, Conversation};

/// Append a message to a conversation.
///
/// The receiver is derived from the conversation's stored participants, so a
/// sender can only ever address the counterpart. Empty or whitespace-only
/// text is rejected before anything touches the database.
pub async fn append(
    pool: &PgPool,
    conversation: &Conversation,
    sender_id: Uuid,
    text: &str,
) -> Result<ChatMessage, MessagingError> {
    if text.trim().is_empty() {
        return Err(MessagingError::validation(
            "text",
            "message text cannot be empty",
        ));
    }

    let receiver_id = conversation
        .counterpart_of(sender_id)
        .ok_or(MessagingError::Authorization)?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        INSERT INTO chat_messages (id, conversation_id, sender_id, receiver_id, content, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6)
        RETURNING seq
        "#,
    )
    .bind(id)
    .bind(conversation.id)
    .bind(sender_id)
    .bind(receiver_id)
    .bind(text)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE conversations SET updated_at = $1 WHERE id = $2
        "#,
    )
    .bind(now)
    .bind(conversation.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ChatMessage {
        id,
        seq: row.get("seq"),
        conversation_id: conversation.id,
        sender_id,
        receiver_id,
        text: text.to_string(),
        is_read: false,
        created_at: now,
    })
}

/// All messages of a conversation, oldest first.
///
/// The history is returned whole; there is no pagination.
pub async fn list_for_conversation(
    pool: &PgPool,
    conversation_id: Uuid,
) -> Result<Vec<ChatMessage>, MessagingError> {
    let rows = sqlx::query(
        r#"
        SELECT id, seq, conversation_id, sender_id, receiver_id, content, is_read, created_at
        FROM chat_messages
        WHERE conversation_id = $1
        ORDER BY seq ASC
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ChatMessage {
            id: row.get("id"),
            seq: row.get("seq"),
            conversation_id: row.get("conversation_id"),
            sender_id: row.get("sender_id"),
            receiver_id: row.get("receiver_id"),
            text: row.get("content"),
            is_read: row.get("is_read"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// Mark every unread message addressed to `reader_id` as read.
///
/// Idempotent; returns the number of rows that actually flipped.
pub async fn mark_read(
    pool: &PgPool,
    conversation_id: Uuid,
    reader_id: Uuid,
) -> Result<u64, MessagingError> {
    let result = sqlx::query(
        r#"
        UPDATE chat_messages
        SET is_read = TRUE
        WHERE conversation_id = $1 AND receiver_id = $2 AND is_read = FALSE
        "#,
    )
    .bind(conversation_id)
    .bind(reader_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
