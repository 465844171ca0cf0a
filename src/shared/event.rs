//! Wire Event Schema
//!
//! The single, explicit event schema spoken over the gateway socket. Every
//! frame is a JSON object tagged with `event` and carrying its payload under
//! `data`. There is exactly one shape per logical event; consumers never
//! have to probe alternative nestings.
//!
//! Events the server accepts are [`ClientEvent`]; events it emits are
//! [`ServerEvent`]. The schema is versioned through [`PROTOCOL_VERSION`];
//! incompatible changes bump the version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::messaging::ChatMessage;

/// Version of the gateway wire schema
pub const PROTOCOL_VERSION: u8 = 1;

/// Events a client sends to the gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Present an identity token; arms presence on success
    Authenticate { token: String },
    /// Join the broadcast room of a conversation the caller participates in
    JoinConversation { conversation_id: Uuid },
    /// Leave a conversation room; idempotent
    LeaveConversation { conversation_id: Uuid },
    /// Persist and broadcast a message.
    ///
    /// `receiver_id` is advisory; the server derives the actual receiver
    /// from the conversation's stored participants.
    SendMessage {
        conversation_id: Uuid,
        #[serde(default)]
        receiver_id: Option<Uuid>,
        text: String,
    },
    /// Relay a typing indicator to room peers; never persisted
    Typing {
        conversation_id: Uuid,
        is_typing: bool,
    },
    /// Mark every unread message addressed to the caller as read
    MarkMessagesRead { conversation_id: Uuid },
    /// Ask whether a user currently has a live connection
    GetUserStatus { user_id: Uuid },
}

/// Events the gateway emits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Authentication succeeded; sent to the originating connection
    Authenticated { user_id: Uuid },
    /// Authentication failed; the connection stays open but unauthenticated
    AuthenticationError { error: String },
    /// A persisted message, fanned out to the conversation room
    NewMessage { message: ChatMessage },
    /// Badge ping on the receiver's personal channel, for when the receiver
    /// is connected but not viewing this conversation
    NewMessageNotification {
        conversation_id: Uuid,
        sender_id: Uuid,
        preview: String,
    },
    /// Send acknowledgment, to the originating connection only
    MessageSent {
        message_id: Uuid,
        created_at: DateTime<Utc>,
    },
    /// Send failure, to the originating connection only
    MessageError { message: String },
    /// Typing relay, to room peers excluding the typist
    UserTyping {
        conversation_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    },
    /// Read receipt, fanned out to the conversation room
    MessagesRead { conversation_id: Uuid, read_by: Uuid },
    /// Presence change or status reply
    UserStatus { user_id: Uuid, online: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_tagging() {
        let event = ClientEvent::Authenticate {
            token: "abc".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "authenticate");
        assert_eq!(json["data"]["token"], "abc");
    }

    #[test]
    fn test_send_message_receiver_is_optional() {
        let conversation_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"event":"send_message","data":{{"conversation_id":"{}","text":"hi"}}}}"#,
            conversation_id
        );
        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        match event {
            ClientEvent::SendMessage {
                conversation_id: cid,
                receiver_id,
                text,
            } => {
                assert_eq!(cid, conversation_id);
                assert_eq!(receiver_id, None);
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_server_event_round_trip() {
        let event = ServerEvent::MessagesRead {
            conversation_id: Uuid::new_v4(),
            read_by: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_user_status_shape() {
        let user_id = Uuid::new_v4();
        let event = ServerEvent::UserStatus {
            user_id,
            online: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "user_status");
        assert_eq!(json["data"]["online"], true);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let raw = r#"{"event":"drop_tables","data":{}}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(raw);
        assert!(result.is_err());
    }
}
