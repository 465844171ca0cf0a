//! Conversation Store
//!
//! Durable record of buyer/seller/ad pairings. One conversation exists per
//! (advertisement, buyer, seller) triple; creation is an atomic upsert so
//! concurrent calls for the same triple converge on one row.

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::backend::error::MessagingError;
use crate::shared::messaging::{Conversation, ConversationSummary};

fn conversation_from_row(row: &sqlx::postgres::PgRow) -> Conversation {
    Conversation {
        id: row.get("id"),
        advertisement_id: row.get("advertisement_id"),
        buyer_id: row.get("buyer_id"),
        seller_id: row.get("seller_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Insert the conversation for a triple, or touch and return the existing
/// row on conflict.
///
/// The upsert happens at the database level, so concurrent calls for the
/// same triple cannot create two rows.
pub async fn get_or_create(
    pool: &PgPool,
    advertisement_id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
) -> Result<Conversation, MessagingError> {
    if buyer_id == seller_id {
        return Err(MessagingError::validation(
            "buyer_id",
            "cannot start a conversation with yourself",
        ));
    }

    let now = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO conversations (id, advertisement_id, buyer_id, seller_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        ON CONFLICT (advertisement_id, buyer_id, seller_id)
        DO UPDATE SET updated_at = EXCLUDED.updated_at
        RETURNING id, advertisement_id, buyer_id, seller_id, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(advertisement_id)
    .bind(buyer_id)
    .bind(seller_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(conversation_from_row(&row))
}

/// Fetch a conversation only if `user_id` is one of its participants.
///
/// Authorization-as-lookup: a non-participant gets `None`, exactly as if the
/// conversation did not exist.
pub async fn get_for_participant(
    pool: &PgPool,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Conversation>, MessagingError> {
    let row = sqlx::query(
        r#"
        SELECT id, advertisement_id, buyer_id, seller_id, created_at, updated_at
        FROM conversations
        WHERE id = $1 AND (buyer_id = $2 OR seller_id = $2)
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| conversation_from_row(&r)))
}

/// List a user's conversations as display summaries, most recent activity
/// first.
///
/// Each summary embeds the counterpart's username, the ad card, the latest
/// message, and the caller's unread count. Ordering falls back to the
/// conversation's creation time when no message exists yet.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ConversationSummary>, MessagingError> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.advertisement_id, c.buyer_id, c.seller_id, c.created_at,
               a.title AS ad_title, a.price_cents AS ad_price_cents, a.primary_image AS ad_image,
               u.username AS counterpart_name,
               lm.content AS last_message_text,
               lm.created_at AS last_message_at,
               lm.sender_id AS last_message_sender,
               (SELECT COUNT(*) FROM chat_messages m
                WHERE m.conversation_id = c.id AND m.receiver_id = $1 AND m.is_read = FALSE
               ) AS unread_count
        FROM conversations c
        JOIN advertisements a ON a.id = c.advertisement_id
        JOIN users u ON u.id = CASE WHEN c.buyer_id = $1 THEN c.seller_id ELSE c.buyer_id END
        LEFT JOIN LATERAL (
            SELECT content, created_at, sender_id
            FROM chat_messages
            WHERE conversation_id = c.id
            ORDER BY seq DESC
            LIMIT 1
        ) lm ON TRUE
        WHERE c.buyer_id = $1 OR c.seller_id = $1
        ORDER BY COALESCE(lm.created_at, c.created_at) DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ConversationSummary {
            id: row.get("id"),
            advertisement_id: row.get("advertisement_id"),
            buyer_id: row.get("buyer_id"),
            seller_id: row.get("seller_id"),
            counterpart_name: row.get("counterpart_name"),
            ad_title: row.get("ad_title"),
            ad_price_cents: row.get("ad_price_cents"),
            ad_image: row.get("ad_image"),
            last_message_text: row.get("last_message_text"),
            last_message_at: row.get("last_message_at"),
            last_message_sender: row.get("last_message_sender"),
            unread_count: row.get("unread_count"),
            created_at: row.get("created_at"),
        })
        .collect())
}
