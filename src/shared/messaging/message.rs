//! Chat Message Data Structure
//!
//! A message in a conversation. Messages are immutable once written except
//! for the read flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique message ID (server-assigned)
    pub id: Uuid,
    /// Position in the conversation's total order (store-assigned)
    pub seq: i64,
    /// Conversation this message belongs to
    pub conversation_id: Uuid,
    /// User who sent the message
    pub sender_id: Uuid,
    /// The conversation counterpart the message is addressed to
    pub receiver_id: Uuid,
    /// Message body (never empty)
    pub text: String,
    /// Whether the receiver has seen this message
    pub is_read: bool,
    /// When the message was written (server-assigned)
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// First `max_len` characters of the body, with an ellipsis when cut
    pub fn preview(&self, max_len: usize) -> String {
        if self.text.chars().count() <= max_len {
            self.text.clone()
        } else {
            let mut preview: String = self.text.chars().take(max_len).collect();
            preview.push('…');
            preview
        }
    }
}

/// Request to send a message over the REST fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Response after sending a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message: ChatMessage,
}

/// Response for listing a conversation's messages.
///
/// The full history is returned in one page, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<ChatMessage>,
}
