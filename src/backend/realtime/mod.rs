//! Realtime Layer
//!
//! The in-memory half of the messaging core. Everything here lives for the
//! process only; a multi-instance deployment would need an external presence
//! store, which is out of scope.
//!
//! - **`presence`** - which identities currently hold live connections
//! - **`rooms`** - per-conversation and per-user broadcast channels
//! - **`gateway`** - the WebSocket endpoint and its per-connection state
//!   machine

/// WebSocket gateway
pub mod gateway;

/// Online-identity tracking
pub mod presence;

/// Broadcast room registry
pub mod rooms;

pub use presence::PresenceTracker;
pub use rooms::RoomRegistry;
