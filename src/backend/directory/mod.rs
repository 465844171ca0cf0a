//! Directory Lookups
//!
//! Read-only lookups against the user and advertisement tables owned by the
//! enclosing marketplace application. The messaging core resolves display
//! names and the seller side of a new conversation here; it never mutates
//! these tables.

/// Advertisement lookups
pub mod ads;

/// User lookups
pub mod users;

pub use ads::Advertisement;
pub use users::UserProfile;
