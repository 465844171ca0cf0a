//! Broadcast Room Registry
//!
//! Manages the broadcast channels used to fan events out to connections:
//!
//! - one channel per conversation ("room"), created on first use
//! - one personal channel per user, for badge pings addressed to a single
//!   identity regardless of which conversation they are viewing
//! - one global status channel carrying presence transitions
//!
//! Channels are `tokio::sync::broadcast`, so every subscriber receives a
//! copy of each event. Idle channels are pruned periodically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::event::ServerEvent;

/// Capacity of each room / personal / status channel
const CHANNEL_CAPACITY: usize = 256;

/// Registry of conversation rooms and personal channels
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    conversations: Arc<Mutex<HashMap<Uuid, broadcast::Sender<ServerEvent>>>>,
    users: Arc<Mutex<HashMap<Uuid, broadcast::Sender<ServerEvent>>>>,
    status: broadcast::Sender<ServerEvent>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        let (status, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            conversations: Arc::new(Mutex::new(HashMap::new())),
            users: Arc::new(Mutex::new(HashMap::new())),
            status,
        }
    }

    /// Get or create the broadcast sender for a conversation room
    pub fn conversation_sender(&self, conversation_id: Uuid) -> broadcast::Sender<ServerEvent> {
        let mut channels = self.conversations.lock().unwrap();
        channels
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Get or create a user's personal channel sender
    pub fn user_sender(&self, user_id: Uuid) -> broadcast::Sender<ServerEvent> {
        let mut channels = self.users.lock().unwrap();
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Subscribe to the global status channel
    pub fn subscribe_status(&self) -> broadcast::Receiver<ServerEvent> {
        self.status.subscribe()
    }

    /// Broadcast an event to every connection in a conversation room.
    ///
    /// A send with no receivers is not an error; the room may simply be
    /// empty.
    pub fn broadcast_to_conversation(&self, conversation_id: Uuid, event: ServerEvent) -> usize {
        if let Some(sender) = self.conversations.lock().unwrap().get(&conversation_id) {
            sender.send(event).unwrap_or(0)
        } else {
            0
        }
    }

    /// Deliver an event on a user's personal channel
    pub fn notify_user(&self, user_id: Uuid, event: ServerEvent) -> usize {
        if let Some(sender) = self.users.lock().unwrap().get(&user_id) {
            sender.send(event).unwrap_or(0)
        } else {
            0
        }
    }

    /// Broadcast a presence transition to every authenticated connection
    pub fn broadcast_status(&self, event: ServerEvent) -> usize {
        self.status.send(event).unwrap_or(0)
    }

    /// Drop channels nobody is subscribed to anymore
    pub fn cleanup_inactive_channels(&self) {
        self.conversations
            .lock()
            .unwrap()
            .retain(|_, sender| sender.receiver_count() > 0);
        self.users
            .lock()
            .unwrap()
            .retain(|_, sender| sender.receiver_count() > 0);
    }

    /// Subscriber count for a conversation room
    pub fn room_subscriber_count(&self, conversation_id: Uuid) -> usize {
        self.conversations
            .lock()
            .unwrap()
            .get(&conversation_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_receipt(conversation_id: Uuid) -> ServerEvent {
        ServerEvent::MessagesRead {
            conversation_id,
            read_by: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_room_subscriber() {
        let rooms = RoomRegistry::new();
        let conversation_id = Uuid::new_v4();

        let mut rx = rooms.conversation_sender(conversation_id).subscribe();
        let delivered = rooms.broadcast_to_conversation(conversation_id, read_receipt(conversation_id));
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ServerEvent::MessagesRead { .. }));
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_room_delivers_nothing() {
        let rooms = RoomRegistry::new();
        let conversation_id = Uuid::new_v4();
        assert_eq!(
            rooms.broadcast_to_conversation(conversation_id, read_receipt(conversation_id)),
            0
        );
    }

    #[tokio::test]
    async fn test_personal_channel_is_per_user() {
        let rooms = RoomRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut alice_rx = rooms.user_sender(alice).subscribe();
        let _bob_rx = rooms.user_sender(bob).subscribe();

        let event = ServerEvent::NewMessageNotification {
            conversation_id: Uuid::new_v4(),
            sender_id: bob,
            preview: "hi".to_string(),
        };
        assert_eq!(rooms.notify_user(alice, event), 1);
        assert!(alice_rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_status_channel_fans_out() {
        let rooms = RoomRegistry::new();
        let mut rx1 = rooms.subscribe_status();
        let mut rx2 = rooms.subscribe_status();

        let user_id = Uuid::new_v4();
        let delivered = rooms.broadcast_status(ServerEvent::UserStatus {
            user_id,
            online: true,
        });
        assert_eq!(delivered, 2);
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_channels() {
        let rooms = RoomRegistry::new();
        let conversation_id = Uuid::new_v4();

        {
            let _rx = rooms.conversation_sender(conversation_id).subscribe();
            assert_eq!(rooms.room_subscriber_count(conversation_id), 1);
        }

        rooms.cleanup_inactive_channels();
        assert_eq!(rooms.room_subscriber_count(conversation_id), 0);
    }
}
