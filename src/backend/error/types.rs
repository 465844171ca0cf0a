//! Error Taxonomy
//!
//! Every failure the messaging core reports falls into one of four
//! categories:
//!
//! - `Authentication` - invalid, expired, or missing credential. The caller
//!   is denied the requested capability; a gateway connection is not
//!   dropped.
//! - `Authorization` - the caller is not a participant of the targeted
//!   conversation. Mapped to 404 so conversation existence is never revealed
//!   to non-participants.
//! - `Validation` - empty message text or missing identifiers. Nothing is
//!   persisted or broadcast.
//! - `Persistence` - the store write failed for infrastructural reasons.
//!   Recoverable from the caller's perspective; there is no automatic retry.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Classified failure of a messaging operation
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Invalid, expired, or missing credential
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Caller is not a participant of the targeted conversation.
    ///
    /// Deliberately carries no detail; to the caller it is
    /// indistinguishable from the conversation not existing.
    #[error("conversation not found")]
    Authorization,

    /// Request payload failed validation
    #[error("validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// The underlying store failed
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl MessagingError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            // Authorization-as-lookup: non-participants see a plain 404.
            Self::Authorization => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to emit to the caller.
    ///
    /// Persistence details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Persistence(_) => "message could not be saved, try again".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for MessagingError {
    fn into_response(self) -> Response {
        if let Self::Persistence(ref err) = self {
            tracing::error!(error = ?err, "store operation failed");
        }
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
