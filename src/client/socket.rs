//! Gateway Socket Client
//!
//! `ChatSocket` owns one WebSocket connection to the gateway. It spawns a
//! writer task (commands out) and a reader task (events in) and exposes
//! non-blocking `poll_events` / `poll_status` so a UI loop can drain updates
//! each frame without awaiting.
//!
//! The object has an explicit lifecycle: construct with [`ChatSocket::connect`],
//! authenticate in-band, issue commands, and drop (or [`ChatSocket::close`])
//! to tear the connection down.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use super::ClientError;
use crate::shared::event::{ClientEvent, ServerEvent};

/// Connection status reported by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Disconnected,
}

/// One live gateway connection
#[derive(Debug)]
pub struct ChatSocket {
    command_tx: mpsc::UnboundedSender<ClientEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
    status_rx: mpsc::UnboundedReceiver<ConnectionStatus>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ChatSocket {
    /// Open a connection to the gateway, e.g. `ws://localhost:3000/ws`
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (ws, _) = connect_async(url).await?;
        let (mut sink, mut stream) = ws.split();

        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<ServerEvent>();
        let (status_tx, status_rx) = mpsc::unbounded_channel::<ConnectionStatus>();

        let _ = status_tx.send(ConnectionStatus::Connected);

        let writer = tokio::spawn(async move {
            while let Some(event) = command_rx.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::error!(error = ?err, "failed to serialize client event");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(payload)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if event_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = ?err, "unparseable gateway event ignored");
                        }
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        let _ = status_tx.send(ConnectionStatus::Error(err.to_string()));
                        break;
                    }
                }
            }
            let _ = status_tx.send(ConnectionStatus::Disconnected);
        });

        Ok(Self {
            command_tx,
            event_rx,
            status_rx,
            reader,
            writer,
        })
    }

    fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.command_tx
            .send(event)
            .map_err(|_| ClientError::NotConnected)
    }

    /// Present an identity token; the server answers with `authenticated`
    /// or `authentication_error`
    pub fn authenticate(&self, token: impl Into<String>) -> Result<(), ClientError> {
        self.send(ClientEvent::Authenticate {
            token: token.into(),
        })
    }

    /// Join a conversation's broadcast room
    pub fn join_conversation(&self, conversation_id: Uuid) -> Result<(), ClientError> {
        self.send(ClientEvent::JoinConversation { conversation_id })
    }

    /// Leave a conversation's broadcast room
    pub fn leave_conversation(&self, conversation_id: Uuid) -> Result<(), ClientError> {
        self.send(ClientEvent::LeaveConversation { conversation_id })
    }

    /// Send a message; the acknowledgment arrives as a `message_sent` event
    pub fn send_message(&self, conversation_id: Uuid, text: impl Into<String>) -> Result<(), ClientError> {
        self.send(ClientEvent::SendMessage {
            conversation_id,
            receiver_id: None,
            text: text.into(),
        })
    }

    /// Signal that the user started or stopped typing
    pub fn set_typing(&self, conversation_id: Uuid, is_typing: bool) -> Result<(), ClientError> {
        self.send(ClientEvent::Typing {
            conversation_id,
            is_typing,
        })
    }

    /// Mark everything addressed to the caller in a conversation as read
    pub fn mark_read(&self, conversation_id: Uuid) -> Result<(), ClientError> {
        self.send(ClientEvent::MarkMessagesRead { conversation_id })
    }

    /// Ask whether a user is currently online
    pub fn request_user_status(&self, user_id: Uuid) -> Result<(), ClientError> {
        self.send(ClientEvent::GetUserStatus { user_id })
    }

    /// Drain pending server events (non-blocking)
    pub fn poll_events(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Latest connection status update, if any (non-blocking)
    pub fn poll_status(&mut self) -> Option<ConnectionStatus> {
        self.status_rx.try_recv().ok()
    }

    /// Tear the connection down
    pub fn close(self) {
        // Drop runs the actual teardown.
    }
}

impl Drop for ChatSocket {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}
