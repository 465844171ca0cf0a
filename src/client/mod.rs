//! Client Side
//!
//! The consumer of the gateway and the REST fallback surface:
//!
//! - **`socket`** - `ChatSocket`, an explicit client object owning the
//!   WebSocket connection with a connect/authenticate/close lifecycle. There
//!   is no process-wide socket singleton; whatever composition root manages
//!   UI state constructs one and passes it around.
//! - **`api`** - `MessagingApi`, the REST fallback client used when a socket
//!   is unavailable.
//! - **`state`** - `MessagingState`, the browser-side mirror: conversation
//!   list with unread counts, the open conversation's messages, optimistic
//!   local echo, and typing-indicator expiry.

use thiserror::Error;

/// REST fallback client
pub mod api;

/// WebSocket client object
pub mod socket;

/// Messaging state machine
pub mod state;

pub use api::MessagingApi;
pub use socket::{ChatSocket, ConnectionStatus};
pub use state::{MessagingState, RoomCommand, TYPING_INDICATOR_TTL};

/// Client-side failures
#[derive(Debug, Error)]
pub enum ClientError {
    /// WebSocket transport failure
    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the request
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The socket has been closed or never connected
    #[error("socket is not connected")]
    NotConnected,
}
