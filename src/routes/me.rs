//! GET /auth-me

use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;
use std::sync::Arc;

use crate::context::ClientContext;
use crate::error::AppError;
use crate::ocsf::{self, Activity};
use crate::session::authenticate;
use crate::tokens::extract_tokens;
use crate::transport::CredentialResponse;

/// Current user. A refreshed session is re-delivered to the caller.
///
/// The profile is loaded after the refresh. If that lookup fails the error is
/// returned and the rotated tokens are not delivered, so the caller's refresh
/// token is already spent and it has to log in again.
pub async fn me(
    State(state): State<Arc<crate::AppState>>,
    ctx: ClientContext,
    headers: HeaderMap,
) -> Result<CredentialResponse, AppError> {
    let client = state.auth_client()?;
    let tokens = extract_tokens(&headers).ok_or(AppError::NoToken)?;

    let (session, refreshed) = authenticate(&client, &tokens).await?.into_session()?;
    if refreshed {
        ocsf::authentication_event(
            Activity::ServiceTicket,
            true,
            session.user.email.as_deref(),
            ctx.environment,
            "Session refreshed",
        );
    }

    let identity = super::load_identity(&client, &session).await?;
    let response = CredentialResponse::ok(
        ctx.transport(),
        json!({ "success": true, "user": identity, "refreshed": refreshed }),
    );

    Ok(if refreshed {
        response.with_session(&session)
    } else {
        response
    })
}
