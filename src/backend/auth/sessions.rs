//! Identity Tokens
//!
//! JWT verification for REST calls and for the gateway's in-band
//! `authenticate` event. Token minting lives here as well so tests and the
//! enclosing application share one claims layout.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Token lifetime
const TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Display name, carried for logging convenience
    #[serde(default)]
    pub username: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using development default");
        "tradepost-dev-secret-change-in-production".to_string()
    })
}

/// Mint an identity token for a user
pub fn create_token(
    user_id: Uuid,
    username: Option<String>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs();

    let claims = Claims {
        sub: user_id.to_string(),
        username,
        exp: now + TOKEN_TTL.as_secs(),
        iat: now,
    };

    let key = EncodingKey::from_secret(jwt_secret().as_ref());
    encode(&Header::default(), &claims, &key)
}

/// Verify and decode an identity token
pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(jwt_secret().as_ref());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}

/// Extract the user ID from a token
pub fn user_id_from_token(token: &str) -> Result<Uuid, String> {
    let claims = verify_token(token).map_err(|e| format!("token verification failed: {}", e))?;
    Uuid::parse_str(&claims.sub).map_err(|e| format!("invalid user id in token: {}", e))
}
