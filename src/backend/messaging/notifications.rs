//! Notification Emitter
//!
//! Fire-and-forget side effect of message delivery: a notification row is
//! written for the receiver immediately after a message is persisted. The
//! read/delete lifecycle of these rows belongs to the enclosing
//! application's notification surface.

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::shared::messaging::notification::NOTIFICATION_KIND_MESSAGE;
use crate::shared::messaging::{ChatMessage, Notification};

/// Length of the message snippet carried in the notification body
const SNIPPET_LEN: usize = 80;

/// Write a "new message" notification for the receiver
pub async fn create_message_notification(
    pool: &PgPool,
    message: &ChatMessage,
    sender_name: &str,
) -> Result<Notification, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let title = format!("New message from {}", sender_name);
    let body = message.preview(SNIPPET_LEN);

    sqlx::query(
        r#"
        INSERT INTO notifications (id, recipient_id, kind, title, body, conversation_id, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
        "#,
    )
    .bind(id)
    .bind(message.receiver_id)
    .bind(NOTIFICATION_KIND_MESSAGE)
    .bind(&title)
    .bind(&body)
    .bind(message.conversation_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Notification {
        id,
        recipient_id: message.receiver_id,
        kind: NOTIFICATION_KIND_MESSAGE.to_string(),
        title,
        body,
        conversation_id: Some(message.conversation_id),
        is_read: false,
        created_at: now,
    })
}

/// Unread notifications for a user, newest first
pub async fn list_unread_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, recipient_id, kind, title, body, conversation_id, is_read, created_at
        FROM notifications
        WHERE recipient_id = $1 AND is_read = FALSE
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Notification {
            id: row.get("id"),
            recipient_id: row.get("recipient_id"),
            kind: row.get("kind"),
            title: row.get("title"),
            body: row.get("body"),
            conversation_id: row.get("conversation_id"),
            is_read: row.get("is_read"),
            created_at: row.get("created_at"),
        })
        .collect())
}
