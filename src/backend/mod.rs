//! Backend Server
//!
//! The Axum server side of the messaging core: REST handlers, the WebSocket
//! gateway, the sqlx persistence layer, and the in-memory realtime state
//! (presence, rooms).

/// Identity token verification
pub mod auth;

/// Read-only user and advertisement lookups
pub mod directory;

/// Error taxonomy and HTTP mapping
pub mod error;

/// Conversation/message/notification stores, delivery pipeline, REST handlers
pub mod messaging;

/// Presence tracking, broadcast rooms, and the WebSocket gateway
pub mod realtime;

/// Route configuration
pub mod routes;

/// Server state and initialization
pub mod server;
