//! Messaging Data Structures
//!
//! Data structures for the conversation/message layer, shared between the
//! backend stores and the client state machine.

/// Conversation data structures
pub mod conversation;

/// Chat message data structures
pub mod message;

/// Notification record produced by the message write path
pub mod notification;

pub use conversation::{
    Conversation, ConversationSummary, ListConversationsResponse, StartConversationRequest,
    StartConversationResponse,
};
pub use message::{ChatMessage, ListMessagesResponse, SendMessageRequest, SendMessageResponse};
pub use notification::Notification;
