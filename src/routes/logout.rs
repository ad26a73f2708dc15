//! POST|DELETE /auth-logout

use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;
use std::sync::Arc;

use crate::auth_service::Reply;
use crate::context::ClientContext;
use crate::error::AppError;
use crate::ocsf::{self, Activity};
use crate::session::validate_access_token;
use crate::tokens::extract_tokens;
use crate::transport::CredentialResponse;
use crate::types::UserSummary;

/// Revoke every session of the caller and, for PROD, expire both cookies.
pub async fn logout(
    State(state): State<Arc<crate::AppState>>,
    ctx: ClientContext,
    headers: HeaderMap,
) -> Result<CredentialResponse, AppError> {
    let client = state.auth_client()?;
    let access_token = extract_tokens(&headers)
        .and_then(|tokens| tokens.access_token)
        .ok_or(AppError::NoSession)?;

    let (session, _) = validate_access_token(&client, &access_token)
        .await?
        .into_session()?;

    if let Reply::Rejected(message) = client.sign_out(&session.access_token).await? {
        tracing::error!(user_id = %session.user.id, error = %message, "sign-out rejected");
        return Err(AppError::LogoutFailed(message));
    }

    ocsf::authentication_event(
        Activity::Logoff,
        true,
        session.user.email.as_deref(),
        ctx.environment,
        "User logged out",
    );

    Ok(CredentialResponse::ok(
        ctx.transport(),
        json!({
            "success": true,
            "message": "Logged out successfully",
            "user": UserSummary::from(&session.user),
        }),
    )
    .clearing_session())
}
