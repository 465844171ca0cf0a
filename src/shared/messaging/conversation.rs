//! Conversation Data Structure
//!
//! A conversation is the durable pairing of an advertisement with a buyer
//! and a seller. At most one conversation exists per (ad, buyer, seller)
//! triple; the store enforces this with a unique constraint and upsert
//! semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A buyer/seller conversation scoped to one advertisement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: Uuid,
    /// The advertisement this conversation is about
    pub advertisement_id: Uuid,
    /// The interested buyer
    pub buyer_id: Uuid,
    /// The advertisement's seller
    pub seller_id: Uuid,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// Bumped by every appended message
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Check whether a user is one of the two participants
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// The participant on the other side from `user_id`.
    ///
    /// Returns `None` when `user_id` is not a participant at all.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.buyer_id {
            Some(self.seller_id)
        } else if user_id == self.seller_id {
            Some(self.buyer_id)
        } else {
            None
        }
    }
}

/// One row of the conversation list, as seen by a particular user.
///
/// Embeds the counterpart's display name, the ad card, the most recent
/// message, and the caller's unread count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub advertisement_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    /// Display name of the other participant
    pub counterpart_name: String,
    pub ad_title: String,
    pub ad_price_cents: i64,
    pub ad_image: Option<String>,
    /// Text of the most recent message, if any
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_sender: Option<Uuid>,
    /// Unread messages addressed to the requesting user
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
}

impl ConversationSummary {
    /// The counterpart participant id, from the perspective of `user_id`
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.buyer_id {
            Some(self.seller_id)
        } else if user_id == self.seller_id {
            Some(self.buyer_id)
        } else {
            None
        }
    }

    /// Activity timestamp used for ordering the conversation list
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

/// Response for listing conversations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

/// Request to start (or fetch) the conversation for an advertisement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartConversationRequest {
    pub advertisement_id: Uuid,
}

/// Response after starting a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartConversationResponse {
    pub conversation: Conversation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(buyer: Uuid, seller: Uuid) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            advertisement_id: Uuid::new_v4(),
            buyer_id: buyer,
            seller_id: seller,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_has_participant() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let conv = conversation(buyer, seller);

        assert!(conv.has_participant(buyer));
        assert!(conv.has_participant(seller));
        assert!(!conv.has_participant(Uuid::new_v4()));
    }

    #[test]
    fn test_counterpart_of() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let conv = conversation(buyer, seller);

        assert_eq!(conv.counterpart_of(buyer), Some(seller));
        assert_eq!(conv.counterpart_of(seller), Some(buyer));
        assert_eq!(conv.counterpart_of(Uuid::new_v4()), None);
    }

    #[test]
    fn test_last_activity_falls_back_to_creation() {
        let created = Utc::now();
        let summary = ConversationSummary {
            id: Uuid::new_v4(),
            advertisement_id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            counterpart_name: "alice".to_string(),
            ad_title: "Bike".to_string(),
            ad_price_cents: 12_500,
            ad_image: None,
            last_message_text: None,
            last_message_at: None,
            last_message_sender: None,
            unread_count: 0,
            created_at: created,
        };

        assert_eq!(summary.last_activity(), created);
    }
}
