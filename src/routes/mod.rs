//! HTTP route handlers.

pub mod forgot_password;
pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod reset_password;
pub mod signup;
pub mod token_exchange;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth_service::AuthServiceClient;
use crate::error::{AppError, ErrorEnvelope};
use crate::session::Session;
use crate::types::UserIdentity;

/// Profile-backed identity for an authenticated session.
pub(crate) async fn load_identity(
    client: &AuthServiceClient<'_>,
    session: &Session,
) -> Result<UserIdentity, AppError> {
    let profile = client
        .fetch_profile(&session.user.id, &session.access_token)
        .await?
        .ok_or(AppError::ProfileNotFound)?;
    Ok(UserIdentity::new(&session.user, profile))
}

/// Fallback for unknown paths.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorEnvelope::new("Not found", "NOT_FOUND", None)),
    )
        .into_response()
}
