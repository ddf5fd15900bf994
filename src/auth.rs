//! Request authentication.
//!
//! The operator panel sends `X-API-Key`; admin routes take
//! `Authorization: Bearer <ADMIN_TOKEN>`. Both are axum extractors so the
//! router can attach them with `middleware::from_extractor_with_state`.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ApiKey;
use crate::store::api_keys;
use crate::Config;

// ---

pub const API_KEY_HEADER: &str = "x-api-key";

const INVALID_API_KEY: &str = "Invalid or missing API key.";
const INVALID_ADMIN_TOKEN: &str = "Invalid or missing admin token.";

/// An operator panel authenticated by an active API key.
#[derive(Debug, Clone)]
pub struct PanelKey(pub ApiKey);

impl FromRequestParts<(PgPool, Config)> for PanelKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        (pool, _): &(PgPool, Config),
    ) -> Result<Self, Self::Rejection> {
        // ---
        let supplied = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AppError::Unauthorized(INVALID_API_KEY))?;

        match api_keys::validate(pool, supplied).await? {
            Some(key) => {
                tracing::debug!(key_id = key.id, name = %key.name, "API key accepted");
                Ok(PanelKey(key))
            }
            None => {
                tracing::warn!("Rejected request with unknown or revoked API key");
                Err(AppError::Unauthorized(INVALID_API_KEY))
            }
        }
    }
}

/// A caller holding the configured admin token.
#[derive(Debug, Clone, Copy)]
pub struct AdminToken;

impl FromRequestParts<(PgPool, Config)> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        (_, config): &(PgPool, Config),
    ) -> Result<Self, Self::Rejection> {
        // ---
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match token {
            Some(token) if tokens_match(token, &config.admin_token) => Ok(AdminToken),
            _ => {
                tracing::warn!("Rejected admin request without a valid token");
                Err(AppError::Unauthorized(INVALID_ADMIN_TOKEN))
            }
        }
    }
}

/// Compare secrets without an early exit on the first differing byte.
fn tokens_match(supplied: &str, expected: &str) -> bool {
    // ---
    let (a, b) = (supplied.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check a supplied PIN against the stored value.
///
/// Stored values with a bcrypt prefix (`$2y$`, `$2a$`, `$2b$`) are verified
/// as hashes; anything else is compared as plain text.
pub fn pin_matches(stored: &str, supplied: &str) -> bool {
    // ---
    let hashed = ["$2y$", "$2a$", "$2b$"]
        .iter()
        .any(|prefix| stored.starts_with(prefix));

    if !hashed {
        return stored == supplied;
    }

    match bcrypt::verify(supplied, stored) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored PIN hash could not be parsed");
            false
        }
    }
}

/// A fresh 64-character hex API key.
pub fn generate_api_key() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
