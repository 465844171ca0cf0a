//! Messaging Persistence and Delivery
//!
//! The durable half of the messaging core: conversation and message stores,
//! the notification emitter, the shared delivery pipeline, and the REST
//! fallback handlers.
//!
//! Both the REST path and the gateway path go through [`delivery`], so a
//! message send has identical side effects regardless of transport: persist,
//! broadcast to the conversation room, ping the receiver's personal channel,
//! write a notification row.

/// Conversation store
pub mod conversations;

/// Shared send / mark-read pipeline
pub mod delivery;

/// REST fallback handlers
pub mod handlers;

/// Message store
pub mod messages;

/// Notification emitter
pub mod notifications;
