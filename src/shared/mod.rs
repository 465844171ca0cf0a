//! Shared Types
//!
//! Types used by both the server and the client: messaging DTOs and the
//! wire event schema for the realtime gateway.

/// Wire event schema for the realtime gateway
pub mod event;

/// Conversation, message, and notification data structures
pub mod messaging;

pub use event::{ClientEvent, ServerEvent, PROTOCOL_VERSION};
pub use messaging::{ChatMessage, Conversation, ConversationSummary, Notification};
