//! POST /auth-reset-password

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;

use crate::auth_service::Reply;
use crate::context::ClientContext;
use crate::error::AppError;
use crate::ocsf::{self, Activity};
use crate::session::{Session, authenticate};
use crate::tokens::TokenPair;
use crate::transport::CredentialResponse;
use crate::types::{ResetPasswordRequest, UserSummary, parse_json};

const MIN_PASSWORD_CHARS: usize = 6;

/// Set a new password using the recovery tokens from the reset link.
///
/// After the update the session is refreshed once. If that fails the password
/// change still stands and the caller is asked to log in again.
pub async fn reset_password(
    State(state): State<Arc<crate::AppState>>,
    ctx: ClientContext,
    body: Bytes,
) -> Result<Response, AppError> {
    let client = state.auth_client()?;
    let req: ResetPasswordRequest = parse_json(&body)?;

    let (Some(access_token), Some(refresh_token), Some(new_password)) =
        (req.access_token(), req.refresh_token(), req.new_password())
    else {
        return Err(AppError::missing_fields(
            "Access token, refresh token and new password are required",
        ));
    };

    if new_password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::Validation {
            error: "Invalid password",
            code: "WEAK_PASSWORD",
            message: format!("Password must have at least {MIN_PASSWORD_CHARS} characters"),
        });
    }

    let recovery = TokenPair {
        access_token: Some(access_token.to_string()),
        refresh_token: Some(refresh_token.to_string()),
    };
    let outcome = authenticate(&client, &recovery).await?;
    let Some(session) = outcome.session() else {
        return Err(AppError::Rejected {
            error: "Invalid or expired token",
            code: "INVALID_TOKEN",
            details: "Reset token is invalid or expired".into(),
        });
    };

    let user = match client
        .update_password(&session.access_token, new_password)
        .await?
    {
        Reply::Accepted(user) => user,
        Reply::Rejected(details) => {
            return Err(AppError::Rejected {
                error: "Failed to update password",
                code: "UPDATE_FAILED",
                details,
            });
        }
    };

    ocsf::authentication_event(
        Activity::Other,
        true,
        user.email.as_deref(),
        ctx.environment,
        "Password updated",
    );

    let current_refresh = session.refresh_token.as_deref().unwrap_or(refresh_token);
    let renewed = match client.refresh(current_refresh).await {
        Ok(Reply::Accepted(issued)) => Session::from_issued(issued, Some(current_refresh)).ok(),
        Ok(Reply::Rejected(message)) => {
            tracing::warn!(error = %message, "refresh after password reset rejected");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "refresh after password reset failed");
            None
        }
    };

    let Some(renewed) = renewed else {
        return Ok(Json(json!({
            "success": true,
            "message": "Password updated. Please log in again.",
            "requires_login": true,
        }))
        .into_response());
    };

    Ok(CredentialResponse::ok(
        ctx.transport(),
        json!({
            "success": true,
            "message": "Password updated successfully.",
            "requires_login": false,
            "user": UserSummary::from(&user),
        }),
    )
    .with_session(&renewed)
    .into_response())
}
