//! POST /auth-forgot-password

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde_json::Value;
use std::sync::Arc;

use crate::auth_service::Reply;
use crate::context::ClientContext;
use crate::error::AppError;
use crate::types::{ForgotPasswordRequest, MessageResponse, parse_json};

/// Send a recovery e-mail whose link lands on the caller's Environment.
pub async fn forgot_password(
    State(state): State<Arc<crate::AppState>>,
    ctx: ClientContext,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let client = state.auth_client()?;
    let req: ForgotPasswordRequest = parse_json(&body)?;

    let email = req
        .email
        .as_ref()
        .and_then(Value::as_str)
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Validation {
            error: "Missing email",
            code: "MISSING_EMAIL",
            message: "Email is required".into(),
        })?;

    let redirect_to = state.config.reset_redirect(ctx.environment);
    if redirect_to.is_none() {
        tracing::warn!(environment = %ctx.environment, "no reset redirect configured");
    }

    if let Reply::Rejected(details) = client.recover(&email, redirect_to).await? {
        return Err(AppError::Rejected {
            error: "Failed to send reset email",
            code: "RESET_FAILED",
            details,
        });
    }

    Ok(Json(MessageResponse::ok(
        "Password reset link sent. Check your email.",
    )))
}
