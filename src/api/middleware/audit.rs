//! Request audit middleware.
//!
//! Logs every API request with method, path, response status, and the
//! authenticated user when one is present. Runs innermost, after auth has
//! injected `AuthedUser`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::AuthedUser;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let actor = req
        .extensions()
        .get::<AuthedUser>()
        .map(|user| user.user_id.to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16();
    match actor {
        Some(user_id) => tracing::info!(%method, %path, status, %user_id, "request"),
        None => tracing::info!(%method, %path, status, "request"),
    }

    response
}
