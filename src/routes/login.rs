//! POST /auth-login

use axum::body::Bytes;
use axum::extract::State;
use serde_json::json;
use std::sync::Arc;

use crate::auth_service::Reply;
use crate::context::ClientContext;
use crate::error::AppError;
use crate::ocsf::{self, Activity};
use crate::session::Session;
use crate::transport::CredentialResponse;
use crate::types::{LoginRequest, parse_json, required};

/// Password login. Credentials travel per the caller's Environment.
pub async fn login(
    State(state): State<Arc<crate::AppState>>,
    ctx: ClientContext,
    body: Bytes,
) -> Result<CredentialResponse, AppError> {
    let client = state.auth_client()?;
    let req: LoginRequest = parse_json(&body)?;

    let password = req.password.as_deref().filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (required(req.email.as_deref()), password) else {
        return Err(AppError::Validation {
            error: "Missing credentials",
            code: "MISSING_FIELDS",
            message: "Email and password are required".into(),
        });
    };

    let issued = match client.sign_in_with_password(email, password).await? {
        Reply::Accepted(issued) => issued,
        Reply::Rejected(message) => {
            ocsf::authentication_event(
                Activity::Logon,
                false,
                Some(email),
                ctx.environment,
                &format!("Login failed: {message}"),
            );
            return Err(AppError::InvalidCredentials(message));
        }
    };

    let session = Session::from_issued(issued, None)?;
    let identity = super::load_identity(&client, &session).await?;

    ocsf::authentication_event(
        Activity::Logon,
        true,
        session.user.email.as_deref(),
        ctx.environment,
        "Login succeeded",
    );
    tracing::info!(user_id = %session.user.id, environment = %ctx.environment, "login succeeded");

    Ok(
        CredentialResponse::ok(ctx.transport(), json!({ "success": true, "user": identity }))
            .with_session(&session),
    )
}
