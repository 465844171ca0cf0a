//! Tradepost messaging core
//!
//! Tradepost is the conversation and real-time messaging core of a
//! classifieds marketplace. Buyers and sellers exchange messages about a
//! specific advertisement; each (ad, buyer, seller) triple maps to exactly
//! one durable conversation.
//!
//! # Module Structure
//!
//! The library is organized into three main modules:
//!
//! - **`shared`** - Types shared between server and client
//!   - Conversation, message, and notification DTOs
//!   - The wire event schema used by the WebSocket gateway
//!
//! - **`backend`** - Server-side code
//!   - Axum REST handlers and the WebSocket gateway
//!   - sqlx-backed conversation/message/notification stores
//!   - In-memory presence tracking and per-conversation broadcast rooms
//!
//! - **`client`** - Consumer-side code
//!   - An explicit socket client object with a connect/authenticate/close
//!     lifecycle
//!   - A REST fallback client for when a socket is unavailable
//!   - The messaging state machine: unread counts, optimistic local echo,
//!     typing-indicator expiry
//!
//! # Realtime Model
//!
//! A client connects to `/ws`, authenticates with a bearer token, joins the
//! rooms of conversations it participates in, and exchanges the events
//! defined in [`shared::event`]. Every message is persisted before it is
//! broadcast; the socket push path and the REST read path agree on one total
//! order (the store's `seq` column).
//!
//! # Error Handling
//!
//! Store failures never cross the gateway boundary raw. They are classified
//! into authentication, authorization, validation, and persistence errors
//! (`backend::error`) before being emitted outward. Authorization failures
//! are indistinguishable from "not found", so conversation existence is
//! never revealed to non-participants.

/// Shared types and the wire event schema
pub mod shared;

/// Backend server-side code
pub mod backend;

/// Socket client, REST fallback client, and messaging state machine
pub mod client;
