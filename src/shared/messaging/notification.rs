//! Notification Record
//!
//! Side-effect entity written by the message delivery pipeline. Its
//! read/delete lifecycle belongs to the enclosing application's notification
//! surface; the messaging core only produces rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type tag for message notifications
pub const NOTIFICATION_KIND_MESSAGE: &str = "message";

/// A notification row for a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    /// Type tag, e.g. `"message"`
    pub kind: String,
    pub title: String,
    /// Short snippet of the triggering message
    pub body: String,
    pub conversation_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
