//! Account endpoints: admin-only registration and user management, plus the
//! login / refresh / logout token lifecycle.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::authorization::is_admin;
use crate::db::repository::{refresh_token, user};
use crate::models::{Role, User, UserSummary};
use crate::{passwords, tokens};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

/// `POST /users/register` — admin-only account creation.
pub async fn register(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if !is_admin(actor.role) {
        return Err(ApiError::Forbidden("Access denied. Admins only.".into()));
    }

    let role = Role::from_str(&request.role)
        .map_err(|_| ApiError::BadRequest("Invalid role selected".into()))?;

    let now = Utc::now();
    let new_user = User {
        id: Uuid::new_v4(),
        name: request.name,
        email: request.email,
        password_hash: passwords::hash_password(&request.password)?,
        role,
        created_at: now,
        updated_at: now,
    };

    let conn = ctx.open_db()?;
    user::insert_user(&conn, &new_user).map_err(|err| {
        if err.is_unique_violation() {
            ApiError::Conflict("Email already registered".into())
        } else {
            ApiError::from(err)
        }
    })?;

    tracing::info!(user_id = %new_user.id, role = role.as_str(), "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user: UserSummary::from(&new_user),
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: LoginUser,
}

/// `POST /users/login` — credential check + token issuance.
///
/// Unknown email and wrong password return the identical response.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let conn = ctx.open_db()?;

    let found = user::find_user_by_email(&conn, &request.email)?
        .ok_or(ApiError::InvalidCredentials)?;
    if !passwords::verify_password(&request.password, &found.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let access_token =
        tokens::issue_access_token(&ctx.config.access_secret, &found.id, found.role)
            .map_err(|_| ApiError::Internal("token issuance failed".into()))?;
    let (refresh, jti, expires_at) =
        tokens::issue_refresh_token(&ctx.config.refresh_secret, &found.id)
            .map_err(|_| ApiError::Internal("token issuance failed".into()))?;

    refresh_token::prune_expired_tokens(&conn)?;
    refresh_token::store_refresh_token(&conn, &jti, &found.id, expires_at)?;

    tracing::info!(user_id = %found.id, "login");

    Ok(Json(LoginResponse {
        access_token,
        refresh_token: refresh,
        user: LoginUser {
            id: found.id,
            email: found.email,
            role: found.role,
        },
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// `POST /users/refresh-token` — exchange a live refresh token for a new
/// access token carrying the user's current role.
pub async fn refresh(
    State(ctx): State<ApiContext>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let denied = || ApiError::Forbidden("Access denied".into());

    let claims = tokens::verify_refresh_token(&ctx.config.refresh_secret, &request.refresh_token)
        .map_err(|_| denied())?;
    let jti = Uuid::from_str(&claims.jti).map_err(|_| denied())?;
    let user_id = Uuid::from_str(&claims.sub).map_err(|_| denied())?;

    let conn = ctx.open_db()?;
    if !refresh_token::refresh_token_is_active(&conn, &jti)? {
        return Err(denied());
    }

    // Role is re-read so a refreshed token reflects the account as it is
    // now, not as it was at login.
    let current = user::find_user_by_id(&conn, &user_id)?.ok_or_else(denied)?;

    let access_token =
        tokens::issue_access_token(&ctx.config.access_secret, &current.id, current.role)
            .map_err(|_| ApiError::Internal("token issuance failed".into()))?;

    Ok(Json(RefreshResponse { access_token }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `POST /users/logout` — revoke a refresh token. Idempotent: unknown or
/// malformed tokens still get a 200.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Ok(claims) =
        tokens::refresh_claims_ignoring_expiry(&ctx.config.refresh_secret, &request.refresh_token)
    {
        if let Ok(jti) = Uuid::from_str(&claims.jti) {
            let conn = ctx.open_db()?;
            refresh_token::revoke_refresh_token(&conn, &jti)?;
        }
    }

    Ok(Json(MessageResponse {
        message: "Logged out successfully".into(),
    }))
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

/// `GET /users/admin/users` — every account except the actor's own.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
) -> Result<Json<UsersResponse>, ApiError> {
    if !is_admin(actor.role) {
        return Err(ApiError::Forbidden("Access denied.".into()));
    }

    let conn = ctx.open_db()?;
    let users = user::list_users_except(&conn, &actor.user_id)?;
    Ok(Json(UsersResponse { users }))
}

/// `DELETE /users/:id` — hard delete; the cascade revokes the target's
/// refresh tokens.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
    Path(target_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !is_admin(actor.role) {
        return Err(ApiError::Forbidden(
            "Access denied. Only admins can delete users.".into(),
        ));
    }
    if target_id == actor.user_id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account.".into(),
        ));
    }

    let conn = ctx.open_db()?;
    if !user::delete_user(&conn, &target_id)? {
        return Err(ApiError::NotFound("User not found".into()));
    }

    tracing::info!(user_id = %target_id, deleted_by = %actor.user_id, "user deleted");

    Ok(Json(MessageResponse {
        message: "User account deleted successfully".into(),
    }))
}
