//! POST /auth-refresh

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;
use std::sync::Arc;

use crate::auth_service::Reply;
use crate::context::ClientContext;
use crate::error::AppError;
use crate::ocsf::{self, Activity};
use crate::origin::Environment;
use crate::session::Session;
use crate::tokens::extract_refresh_token;
use crate::transport::CredentialResponse;
use crate::types::RefreshRequest;

/// Exchange the caller's refresh token for a new pair.
///
/// The token comes from cookies or `X-Refresh-Token`; DEV callers may also
/// send it as `refresh_token` in the JSON body.
pub async fn refresh_tokens(
    State(state): State<Arc<crate::AppState>>,
    ctx: ClientContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<CredentialResponse, AppError> {
    let client = state.auth_client()?;

    let refresh_token = extract_refresh_token(&headers)
        .or_else(|| {
            if ctx.environment != Environment::Dev {
                return None;
            }
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|req| req.refresh_token)
                .filter(|t| !t.is_empty())
        })
        .ok_or(AppError::NoRefreshToken)?;

    let issued = match client.refresh(&refresh_token).await? {
        Reply::Accepted(issued) => issued,
        Reply::Rejected(message) => {
            ocsf::authentication_event(
                Activity::ServiceTicket,
                false,
                None,
                ctx.environment,
                &format!("Token refresh failed: {message}"),
            );
            return Err(AppError::RefreshFailed(message));
        }
    };
    let session = Session::from_issued(issued, Some(&refresh_token))?;

    ocsf::authentication_event(
        Activity::ServiceTicket,
        true,
        session.user.email.as_deref(),
        ctx.environment,
        "Token refresh succeeded",
    );

    Ok(CredentialResponse::ok(
        ctx.transport(),
        json!({ "success": true, "message": "Session refreshed successfully" }),
    )
    .with_session(&session))
}
