//! Messaging State Machine
//!
//! The client-side mirror of the conversation layer. It is headless and
//! transport-free: the caller feeds it [`ServerEvent`]s (from a
//! [`super::ChatSocket`]) and REST responses, and reads back what to render.
//!
//! Responsibilities:
//!
//! - conversation list with unread counts, replaced wholesale on refresh
//! - the open conversation's message list
//! - optimistic local echo of just-sent messages, reconciled against the
//!   server broadcast when it arrives, flagged failed on `message_error`
//!   (resending is manual, never automatic)
//! - typing indicators with a client-owned expiry deadline per peer, since
//!   the server relays typing events without debouncing or expiring them
//! - room join/leave commands emitted when the selection changes
//! - a refresh flag raised by any signal that activity happened elsewhere,
//!   so the caller re-fetches the conversation list instead of trusting
//!   push payloads alone

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::shared::event::ServerEvent;
use crate::shared::messaging::{ChatMessage, ConversationSummary};

/// How long a peer's typing indicator stays visible without a refresh
pub const TYPING_INDICATOR_TTL: Duration = Duration::from_secs(3);

/// Delivery state of an optimistic local echo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStatus {
    /// Displayed locally, awaiting the server broadcast
    Sending,
    /// The server reported a send failure; the user may resend
    Failed,
}

/// A locally echoed outgoing message
#[derive(Debug, Clone)]
pub struct LocalEcho {
    pub local_id: Uuid,
    pub conversation_id: Uuid,
    pub text: String,
    pub status: EchoStatus,
}

/// Room membership change the caller should forward to the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCommand {
    Join(Uuid),
    Leave(Uuid),
}

/// Client-side messaging state
#[derive(Debug, Default)]
pub struct MessagingState {
    /// Set once the gateway acknowledges authentication
    pub current_user_id: Option<Uuid>,
    /// Conversation summaries in server order (most recent activity first)
    pub conversations: Vec<ConversationSummary>,
    /// Message history per conversation
    pub messages: HashMap<Uuid, Vec<ChatMessage>>,
    /// Currently open conversation
    pub selected_conversation_id: Option<Uuid>,
    /// Last error reported by the gateway, for the UI to surface
    pub last_error: Option<String>,

    echoes: Vec<LocalEcho>,
    typing_deadlines: HashMap<(Uuid, Uuid), Instant>,
    online_users: HashSet<Uuid>,
    needs_conversation_refresh: bool,
}

impl MessagingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a conversation (or close with `None`). Returns the room
    /// membership changes to forward to the socket.
    pub fn select_conversation(&mut self, conversation_id: Option<Uuid>) -> Vec<RoomCommand> {
        let mut commands = Vec::new();
        if self.selected_conversation_id == conversation_id {
            return commands;
        }
        if let Some(previous) = self.selected_conversation_id {
            commands.push(RoomCommand::Leave(previous));
        }
        if let Some(next) = conversation_id {
            commands.push(RoomCommand::Join(next));
        }
        self.selected_conversation_id = conversation_id;
        commands
    }

    /// Record the optimistic echo for a message the caller just sent.
    ///
    /// Returns the echo's local id.
    pub fn record_local_echo(&mut self, conversation_id: Uuid, text: impl Into<String>) -> Uuid {
        let local_id = Uuid::new_v4();
        self.echoes.push(LocalEcho {
            local_id,
            conversation_id,
            text: text.into(),
            status: EchoStatus::Sending,
        });
        local_id
    }

    /// Pending echoes for a conversation, in send order
    pub fn pending_echoes(&self, conversation_id: Uuid) -> Vec<&LocalEcho> {
        self.echoes
            .iter()
            .filter(|echo| echo.conversation_id == conversation_id)
            .collect()
    }

    /// Flip a failed echo back to sending and hand its payload to the
    /// caller for a manual resend
    pub fn retry_failed_echo(&mut self, local_id: Uuid) -> Option<(Uuid, String)> {
        let echo = self
            .echoes
            .iter_mut()
            .find(|echo| echo.local_id == local_id && echo.status == EchoStatus::Failed)?;
        echo.status = EchoStatus::Sending;
        Some((echo.conversation_id, echo.text.clone()))
    }

    /// Apply one gateway event. `now` drives typing-indicator deadlines.
    pub fn apply_event(&mut self, event: ServerEvent, now: Instant) {
        match event {
            ServerEvent::Authenticated { user_id } => {
                self.current_user_id = Some(user_id);
            }
            ServerEvent::AuthenticationError { error } => {
                self.last_error = Some(error);
            }
            ServerEvent::NewMessage { message } => {
                // A message from the typist supersedes their indicator.
                self.typing_deadlines
                    .remove(&(message.conversation_id, message.sender_id));
                if Some(message.sender_id) == self.current_user_id {
                    self.reconcile_echo(&message);
                }
                self.insert_message(message);
                self.needs_conversation_refresh = true;
            }
            ServerEvent::NewMessageNotification { .. } => {
                self.needs_conversation_refresh = true;
            }
            ServerEvent::MessageSent { .. } => {
                self.last_error = None;
            }
            ServerEvent::MessageError { message } => {
                if let Some(echo) = self
                    .echoes
                    .iter_mut()
                    .rev()
                    .find(|echo| echo.status == EchoStatus::Sending)
                {
                    echo.status = EchoStatus::Failed;
                }
                self.last_error = Some(message);
            }
            ServerEvent::UserTyping {
                conversation_id,
                user_id,
                is_typing,
            } => {
                let key = (conversation_id, user_id);
                if is_typing {
                    self.typing_deadlines.insert(key, now + TYPING_INDICATOR_TTL);
                } else {
                    self.typing_deadlines.remove(&key);
                }
            }
            ServerEvent::MessagesRead {
                conversation_id,
                read_by,
            } => {
                if let Some(messages) = self.messages.get_mut(&conversation_id) {
                    for message in messages.iter_mut() {
                        if message.receiver_id == read_by {
                            message.is_read = true;
                        }
                    }
                }
            }
            ServerEvent::UserStatus { user_id, online } => {
                if online {
                    self.online_users.insert(user_id);
                } else {
                    self.online_users.remove(&user_id);
                }
            }
        }
    }

    /// Replace the conversation list with a fresh server response
    pub fn apply_conversations(&mut self, conversations: Vec<ConversationSummary>) {
        self.conversations = conversations;
    }

    /// Replace a conversation's history with a fresh server response.
    ///
    /// Echoes are kept alongside; anything the server now knows about is
    /// reconciled away.
    pub fn apply_messages(&mut self, conversation_id: Uuid, messages: Vec<ChatMessage>) {
        if let Some(me) = self.current_user_id {
            for message in &messages {
                if message.sender_id == me {
                    self.reconcile_echo(message);
                }
            }
        }
        self.messages.insert(conversation_id, messages);
    }

    /// Peers currently typing in a conversation. Expired deadlines are
    /// pruned as a side effect.
    pub fn typing_peers(&mut self, conversation_id: Uuid, now: Instant) -> Vec<Uuid> {
        self.prune_expired_typing(now);
        self.typing_deadlines
            .keys()
            .filter(|(conv, _)| *conv == conversation_id)
            .map(|(_, user)| *user)
            .collect()
    }

    /// Drop typing indicators whose deadline has passed
    pub fn prune_expired_typing(&mut self, now: Instant) {
        self.typing_deadlines.retain(|_, deadline| *deadline > now);
    }

    /// Whether a peer currently has a live connection, as far as the client
    /// has been told
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.online_users.contains(&user_id)
    }

    /// Take the refresh flag; the caller should re-fetch the conversation
    /// list when this returns true
    pub fn take_refresh_flag(&mut self) -> bool {
        std::mem::take(&mut self.needs_conversation_refresh)
    }

    /// Total unread messages across all conversations
    pub fn unread_total(&self) -> i64 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    fn insert_message(&mut self, message: ChatMessage) {
        let messages = self.messages.entry(message.conversation_id).or_default();
        if messages.iter().any(|existing| existing.id == message.id) {
            return;
        }
        // Broadcasts normally arrive in order; a refresh racing a push can
        // deliver out of order, so insert by seq.
        let position = messages
            .iter()
            .position(|existing| existing.seq > message.seq)
            .unwrap_or(messages.len());
        messages.insert(position, message);
    }

    fn reconcile_echo(&mut self, message: &ChatMessage) {
        if let Some(index) = self.echoes.iter().position(|echo| {
            echo.conversation_id == message.conversation_id
                && echo.text == message.text
                && echo.status == EchoStatus::Sending
        }) {
            self.echoes.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn message(conversation_id: Uuid, sender_id: Uuid, receiver_id: Uuid, seq: i64, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            seq,
            conversation_id,
            sender_id,
            receiver_id,
            text: text.to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    fn authed_state(user_id: Uuid) -> MessagingState {
        let mut state = MessagingState::new();
        state.apply_event(ServerEvent::Authenticated { user_id }, Instant::now());
        state
    }

    #[test]
    fn test_select_conversation_emits_room_commands() {
        let mut state = MessagingState::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert_eq!(
            state.select_conversation(Some(first)),
            vec![RoomCommand::Join(first)]
        );
        assert_eq!(
            state.select_conversation(Some(second)),
            vec![RoomCommand::Leave(first), RoomCommand::Join(second)]
        );
        // Re-selecting the open conversation is a no-op
        assert!(state.select_conversation(Some(second)).is_empty());
        assert_eq!(
            state.select_conversation(None),
            vec![RoomCommand::Leave(second)]
        );
    }

    #[test]
    fn test_echo_reconciled_by_broadcast() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        state.record_local_echo(conversation, "hello");
        assert_eq!(state.pending_echoes(conversation).len(), 1);

        state.apply_event(
            ServerEvent::NewMessage {
                message: message(conversation, me, peer, 1, "hello"),
            },
            Instant::now(),
        );

        assert!(state.pending_echoes(conversation).is_empty());
        assert_eq!(state.messages[&conversation].len(), 1);
    }

    #[test]
    fn test_peer_message_does_not_consume_echo() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        state.record_local_echo(conversation, "hello");
        state.apply_event(
            ServerEvent::NewMessage {
                message: message(conversation, peer, me, 1, "hello"),
            },
            Instant::now(),
        );

        // Same text, but from the peer: the echo must survive.
        assert_eq!(state.pending_echoes(conversation).len(), 1);
    }

    #[test]
    fn test_failed_echo_supports_manual_retry() {
        let me = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        let local_id = state.record_local_echo(conversation, "hello");
        state.apply_event(
            ServerEvent::MessageError {
                message: "message could not be saved, try again".to_string(),
            },
            Instant::now(),
        );

        assert_eq!(state.pending_echoes(conversation)[0].status, EchoStatus::Failed);
        assert!(state.last_error.is_some());

        let (retry_conversation, retry_text) = state.retry_failed_echo(local_id).unwrap();
        assert_eq!(retry_conversation, conversation);
        assert_eq!(retry_text, "hello");
        assert_eq!(state.pending_echoes(conversation)[0].status, EchoStatus::Sending);
    }

    #[test]
    fn test_typing_indicator_expires_after_ttl() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        let start = Instant::now();
        state.apply_event(
            ServerEvent::UserTyping {
                conversation_id: conversation,
                user_id: peer,
                is_typing: true,
            },
            start,
        );

        assert_eq!(state.typing_peers(conversation, start + Duration::from_secs(2)), vec![peer]);
        assert!(state
            .typing_peers(conversation, start + Duration::from_secs(4))
            .is_empty());
    }

    #[test]
    fn test_typing_indicator_refresh_extends_deadline() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        let start = Instant::now();
        let typing = |state: &mut MessagingState, at: Instant| {
            state.apply_event(
                ServerEvent::UserTyping {
                    conversation_id: conversation,
                    user_id: peer,
                    is_typing: true,
                },
                at,
            );
        };

        typing(&mut state, start);
        typing(&mut state, start + Duration::from_secs(2));

        // The refresh at t=2 keeps the indicator alive past t=4.
        assert_eq!(state.typing_peers(conversation, start + Duration::from_secs(4)), vec![peer]);
    }

    #[test]
    fn test_message_from_typist_clears_indicator() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        let now = Instant::now();
        state.apply_event(
            ServerEvent::UserTyping {
                conversation_id: conversation,
                user_id: peer,
                is_typing: true,
            },
            now,
        );
        state.apply_event(
            ServerEvent::NewMessage {
                message: message(conversation, peer, me, 1, "done typing"),
            },
            now,
        );

        assert!(state.typing_peers(conversation, now).is_empty());
    }

    #[test]
    fn test_refresh_flag_raised_by_activity_signals() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        assert!(!state.take_refresh_flag());

        state.apply_event(
            ServerEvent::NewMessageNotification {
                conversation_id: conversation,
                sender_id: peer,
                preview: "hi".to_string(),
            },
            Instant::now(),
        );
        assert!(state.take_refresh_flag());
        // Taking the flag clears it.
        assert!(!state.take_refresh_flag());

        state.apply_event(
            ServerEvent::NewMessage {
                message: message(conversation, peer, me, 1, "hi"),
            },
            Instant::now(),
        );
        assert!(state.take_refresh_flag());
    }

    #[test]
    fn test_read_receipt_flips_my_sent_messages() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        state.apply_messages(
            conversation,
            vec![
                message(conversation, me, peer, 1, "first"),
                message(conversation, peer, me, 2, "second"),
            ],
        );

        state.apply_event(
            ServerEvent::MessagesRead {
                conversation_id: conversation,
                read_by: peer,
            },
            Instant::now(),
        );

        let messages = &state.messages[&conversation];
        assert!(messages[0].is_read, "message addressed to the reader flips");
        assert!(!messages[1].is_read, "message addressed to me does not");
    }

    #[test]
    fn test_duplicate_broadcast_inserted_once() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        let msg = message(conversation, peer, me, 1, "hi");
        state.apply_event(
            ServerEvent::NewMessage {
                message: msg.clone(),
            },
            Instant::now(),
        );
        state.apply_event(ServerEvent::NewMessage { message: msg }, Instant::now());

        assert_eq!(state.messages[&conversation].len(), 1);
    }

    #[test]
    fn test_out_of_order_broadcast_sorted_by_seq() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut state = authed_state(me);

        let first = message(conversation, peer, me, 1, "first");
        let second = message(conversation, peer, me, 2, "second");
        state.apply_event(
            ServerEvent::NewMessage {
                message: second.clone(),
            },
            Instant::now(),
        );
        state.apply_event(
            ServerEvent::NewMessage {
                message: first.clone(),
            },
            Instant::now(),
        );

        let texts: Vec<_> = state.messages[&conversation]
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_user_status_tracking() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let mut state = authed_state(me);

        assert!(!state.is_online(peer));
        state.apply_event(
            ServerEvent::UserStatus {
                user_id: peer,
                online: true,
            },
            Instant::now(),
        );
        assert!(state.is_online(peer));
        state.apply_event(
            ServerEvent::UserStatus {
                user_id: peer,
                online: false,
            },
            Instant::now(),
        );
        assert!(!state.is_online(peer));
    }
}
