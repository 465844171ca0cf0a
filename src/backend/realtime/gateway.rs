//! WebSocket Gateway
//!
//! One socket endpoint (`GET /ws`) carries the whole realtime protocol.
//! Each connection runs a small state machine:
//!
//! `unauthenticated` -> `authenticated` -> member of zero or more
//! conversation rooms -> `disconnected`
//!
//! A connection starts unauthenticated and may only emit an `authenticate`
//! event; if none arrives within the grace period the connection is closed.
//! Authentication verifies the bearer token against the identity directory,
//! registers the connection in the presence tracker, and subscribes the
//! socket to its personal channel and the global status channel.
//!
//! Room membership is granted only after the participant check passes.
//! Unauthorized joins are refused without acknowledgment, so conversation
//! existence is never revealed to non-participants.
//!
//! Handlers suspend at database calls; events from other connections (and
//! further events from this one) interleave at those points. Rapid
//! double-sends from one client are therefore not serialized here; the store
//! order is whatever the database commits, and that order is what every
//! reader observes.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::auth::sessions;
use crate::backend::directory::users;
use crate::backend::error::MessagingError;
use crate::backend::messaging::{conversations, delivery};
use crate::backend::server::state::AppState;
use crate::shared::event::{ClientEvent, ServerEvent};

/// How long an unauthenticated connection may linger before being dropped
const AUTH_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Upgrade handler for `GET /ws`
pub async fn handle_gateway_socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| gateway_connection(state, socket))
}

/// Per-connection state
struct GatewayConnection {
    id: Uuid,
    state: AppState,
    /// `Some` once the connection has authenticated
    identity: Option<Uuid>,
    outbound: mpsc::UnboundedSender<ServerEvent>,
    /// Conversation rooms this connection is a member of
    room_forwards: HashMap<Uuid, JoinHandle<()>>,
    /// Personal channel and status channel forwards
    personal_forwards: Vec<JoinHandle<()>>,
}

async fn gateway_connection(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer task: serialize outbound events onto the socket. It ends when
    // every sender is dropped, then closes the socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::error!(error = ?err, "failed to serialize outbound event");
                    continue;
                }
            };
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    let mut conn = GatewayConnection {
        id: Uuid::new_v4(),
        state,
        identity: None,
        outbound: outbound_tx,
        room_forwards: HashMap::new(),
        personal_forwards: Vec::new(),
    };

    tracing::debug!(connection = %conn.id, "gateway connection opened");

    let auth_deadline = tokio::time::sleep(AUTH_GRACE_PERIOD);
    tokio::pin!(auth_deadline);

    loop {
        tokio::select! {
            _ = &mut auth_deadline, if conn.identity.is_none() => {
                tracing::debug!(connection = %conn.id, "authentication grace period expired");
                break;
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => conn.dispatch(event).await,
                            Err(err) => {
                                tracing::debug!(connection = %conn.id, error = ?err, "malformed gateway frame ignored");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary are handled by the transport
                    Some(Err(err)) => {
                        tracing::debug!(connection = %conn.id, error = ?err, "gateway connection errored");
                        break;
                    }
                }
            }
        }
    }

    conn.disconnect();
    drop(conn);
    let _ = writer.await;
}

/// Forward a broadcast subscription into a connection's outbound queue.
///
/// `mute_typing_of` suppresses typing relays originating from the
/// connection's own identity, so a typist never sees their own indicator.
fn spawn_forward(
    mut rx: broadcast::Receiver<ServerEvent>,
    tx: mpsc::UnboundedSender<ServerEvent>,
    mute_typing_of: Option<Uuid>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let (Some(me), ServerEvent::UserTyping { user_id, .. }) =
                        (mute_typing_of, &event)
                    {
                        if *user_id == me {
                            continue;
                        }
                    }
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "gateway forward lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

impl GatewayConnection {
    fn emit(&self, event: ServerEvent) {
        let _ = self.outbound.send(event);
    }

    async fn dispatch(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Authenticate { token } => self.handle_authenticate(token).await,
            ClientEvent::JoinConversation { conversation_id } => {
                self.handle_join(conversation_id).await
            }
            ClientEvent::LeaveConversation { conversation_id } => self.handle_leave(conversation_id),
            ClientEvent::SendMessage {
                conversation_id,
                receiver_id,
                text,
            } => self.handle_send(conversation_id, receiver_id, text).await,
            ClientEvent::Typing {
                conversation_id,
                is_typing,
            } => self.handle_typing(conversation_id, is_typing),
            ClientEvent::MarkMessagesRead { conversation_id } => {
                self.handle_mark_read(conversation_id).await
            }
            ClientEvent::GetUserStatus { user_id } => self.handle_user_status(user_id),
        }
    }

    async fn handle_authenticate(&mut self, token: String) {
        let user_id = match sessions::user_id_from_token(&token) {
            Ok(user_id) => user_id,
            Err(error) => {
                self.emit(ServerEvent::AuthenticationError { error });
                return;
            }
        };

        match users::get_user_by_id(&self.state.db_pool, user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.emit(ServerEvent::AuthenticationError {
                    error: "unknown identity".to_string(),
                });
                return;
            }
            Err(err) => {
                tracing::error!(error = ?err, "identity lookup failed during authentication");
                self.emit(ServerEvent::AuthenticationError {
                    error: "identity lookup failed".to_string(),
                });
                return;
            }
        }

        if let Some(existing) = self.identity {
            if existing == user_id {
                self.emit(ServerEvent::Authenticated { user_id });
            } else {
                self.emit(ServerEvent::AuthenticationError {
                    error: "connection already authenticated".to_string(),
                });
            }
            return;
        }

        self.identity = Some(user_id);
        let came_online = self.state.presence.register_connection(user_id, self.id);

        let personal_rx = self.state.rooms.user_sender(user_id).subscribe();
        self.personal_forwards
            .push(spawn_forward(personal_rx, self.outbound.clone(), None));

        let status_rx = self.state.rooms.subscribe_status();
        self.personal_forwards
            .push(spawn_forward(status_rx, self.outbound.clone(), None));

        if came_online {
            self.state.rooms.broadcast_status(ServerEvent::UserStatus {
                user_id,
                online: true,
            });
        }

        tracing::info!(connection = %self.id, user = %user_id, "gateway connection authenticated");
        self.emit(ServerEvent::Authenticated { user_id });
    }

    async fn handle_join(&mut self, conversation_id: Uuid) {
        let Some(user_id) = self.identity else {
            return;
        };
        if self.room_forwards.contains_key(&conversation_id) {
            return;
        }

        match conversations::get_for_participant(&self.state.db_pool, conversation_id, user_id)
            .await
        {
            Ok(Some(_)) => {
                let rx = self
                    .state
                    .rooms
                    .conversation_sender(conversation_id)
                    .subscribe();
                self.room_forwards.insert(
                    conversation_id,
                    spawn_forward(rx, self.outbound.clone(), Some(user_id)),
                );
                tracing::debug!(connection = %self.id, conversation = %conversation_id, "joined room");
            }
            Ok(None) => {
                // Refused without acknowledgment.
                tracing::debug!(connection = %self.id, conversation = %conversation_id, "join refused");
            }
            Err(err) => {
                tracing::error!(error = %err, "participant check failed on join");
            }
        }
    }

    fn handle_leave(&mut self, conversation_id: Uuid) {
        if let Some(handle) = self.room_forwards.remove(&conversation_id) {
            handle.abort();
            tracing::debug!(connection = %self.id, conversation = %conversation_id, "left room");
        }
    }

    async fn handle_send(
        &mut self,
        conversation_id: Uuid,
        receiver_id: Option<Uuid>,
        text: String,
    ) {
        let Some(user_id) = self.identity else {
            self.emit(ServerEvent::MessageError {
                message: "not authenticated".to_string(),
            });
            return;
        };

        let conversation = match conversations::get_for_participant(
            &self.state.db_pool,
            conversation_id,
            user_id,
        )
        .await
        {
            Ok(Some(conversation)) => conversation,
            Ok(None) => {
                self.emit(ServerEvent::MessageError {
                    message: MessagingError::Authorization.public_message(),
                });
                return;
            }
            Err(err) => {
                let err = MessagingError::from(err);
                tracing::error!(error = %err, "conversation lookup failed on send");
                self.emit(ServerEvent::MessageError {
                    message: err.public_message(),
                });
                return;
            }
        };

        // The receiver is always derived from the conversation record; a
        // mismatched client-supplied value is ignored.
        if let Some(requested) = receiver_id {
            if conversation.counterpart_of(user_id) != Some(requested) {
                tracing::debug!(
                    connection = %self.id,
                    conversation = %conversation_id,
                    requested = %requested,
                    "client-supplied receiver ignored"
                );
            }
        }

        match delivery::send_message(
            &self.state.db_pool,
            &self.state.rooms,
            &conversation,
            user_id,
            &text,
        )
        .await
        {
            Ok(message) => {
                self.emit(ServerEvent::MessageSent {
                    message_id: message.id,
                    created_at: message.created_at,
                });
            }
            Err(err) => {
                if matches!(err, MessagingError::Persistence(_)) {
                    tracing::error!(error = %err, "message persistence failed");
                }
                self.emit(ServerEvent::MessageError {
                    message: err.public_message(),
                });
            }
        }
    }

    fn handle_typing(&mut self, conversation_id: Uuid, is_typing: bool) {
        let Some(user_id) = self.identity else {
            return;
        };
        // Room membership implies the participant check already passed.
        if !self.room_forwards.contains_key(&conversation_id) {
            return;
        }
        self.state.rooms.broadcast_to_conversation(
            conversation_id,
            ServerEvent::UserTyping {
                conversation_id,
                user_id,
                is_typing,
            },
        );
    }

    async fn handle_mark_read(&mut self, conversation_id: Uuid) {
        let Some(user_id) = self.identity else {
            return;
        };

        let conversation = match conversations::get_for_participant(
            &self.state.db_pool,
            conversation_id,
            user_id,
        )
        .await
        {
            Ok(Some(conversation)) => conversation,
            Ok(None) => return,
            Err(err) => {
                tracing::error!(error = %err, "conversation lookup failed on mark-read");
                return;
            }
        };

        match delivery::mark_conversation_read(
            &self.state.db_pool,
            &self.state.rooms,
            &conversation,
            user_id,
        )
        .await
        {
            Ok(flipped) => {
                tracing::debug!(connection = %self.id, conversation = %conversation_id, flipped, "conversation marked read");
            }
            Err(err) => {
                tracing::error!(error = %err, "mark-read failed");
                self.emit(ServerEvent::MessageError {
                    message: err.public_message(),
                });
            }
        }
    }

    fn handle_user_status(&self, user_id: Uuid) {
        if self.identity.is_none() {
            return;
        }
        let online = self.state.presence.is_online(user_id);
        self.emit(ServerEvent::UserStatus { user_id, online });
    }

    /// Tear down room and channel forwards and release presence. If this was
    /// the identity's last connection, an offline status is broadcast once.
    fn disconnect(&mut self) {
        for (_, handle) in self.room_forwards.drain() {
            handle.abort();
        }
        for handle in self.personal_forwards.drain(..) {
            handle.abort();
        }
        if self.identity.is_some() {
            if let Some(offline_identity) = self.state.presence.remove_connection(self.id) {
                self.state.rooms.broadcast_status(ServerEvent::UserStatus {
                    user_id: offline_identity,
                    online: false,
                });
            }
        }
        tracing::debug!(connection = %self.id, "gateway connection closed");
    }
}
