//! Identity Token Handling
//!
//! The messaging core does not own signup or login; it only verifies the
//! identity tokens minted by the enclosing application.

/// JWT creation and verification
pub mod sessions;

pub use sessions::{create_token, verify_token, Claims};
