//! Signed session tokens.
//!
//! Two HS256 token kinds, signed with distinct keys:
//! - access tokens (30 min) carry `{sub, role}` and authorize every request;
//! - refresh tokens (14 days) carry `{sub, jti}`; the jti is the primary key
//!   of the durable refresh-token store.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ACCESS_TOKEN_TTL_MINUTES, REFRESH_TOKEN_TTL_DAYS};
use crate::models::Role;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,
    #[error("Token invalid")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User id.
    pub sub: String,
    /// Token id, the key of the durable store row.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_access_token(secret: &str, user_id: &Uuid, role: Role) -> Result<String, TokenError> {
    issue_access_token_with_ttl(secret, user_id, role, Duration::minutes(ACCESS_TOKEN_TTL_MINUTES))
}

/// TTL-parameterized variant; tests mint already-expired tokens with it.
pub fn issue_access_token_with_ttl(
    secret: &str,
    user_id: &Uuid,
    role: Role,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| TokenError::Invalid)
}

pub fn verify_access_token(secret: &str, token: &str) -> Result<AccessClaims, TokenError> {
    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &strict_validation(),
    )
    .map(|data| data.claims)
    .map_err(map_jwt_error)
}

/// Issue a refresh token. Returns the token string, its jti, and its expiry
/// instant for the durable store.
pub fn issue_refresh_token(
    secret: &str,
    user_id: &Uuid,
) -> Result<(String, Uuid, DateTime<Utc>), TokenError> {
    let now = Utc::now();
    let expires_at = now + Duration::days(REFRESH_TOKEN_TTL_DAYS);
    let jti = Uuid::new_v4();
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        jti: jti.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| TokenError::Invalid)?;
    Ok((token, jti, expires_at))
}

pub fn verify_refresh_token(secret: &str, token: &str) -> Result<RefreshClaims, TokenError> {
    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &strict_validation(),
    )
    .map(|data| data.claims)
    .map_err(map_jwt_error)
}

/// Signature-checked decode that ignores expiry. Logout uses this so an
/// expired-but-genuine token still deletes its store row.
pub fn refresh_claims_ignoring_expiry(
    secret: &str,
    token: &str,
) -> Result<RefreshClaims, TokenError> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation.validate_exp = false;
    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(map_jwt_error)
}

fn strict_validation() -> Validation {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    }
}
