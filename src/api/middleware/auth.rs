//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies the access token's
//! signature and expiry, and injects `AuthedUser` into request extensions
//! for downstream authorization checks.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::str::FromStr;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::tokens;

/// Require a valid access token.
///
/// Accesses `ApiContext` from request extensions (injected by the Extension
/// layer). On success: injects `AuthedUser` for handlers.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?;

    let claims = tokens::verify_access_token(&ctx.config.access_secret, token)?;
    let user_id = Uuid::from_str(&claims.sub).map_err(|_| ApiError::Unauthenticated)?;

    req.extensions_mut().insert(AuthedUser {
        user_id,
        role: claims.role,
    });

    Ok(next.run(req).await)
}
