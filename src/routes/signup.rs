//! POST /auth-signup

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::auth_service::{Profile, Reply};
use crate::context::ClientContext;
use crate::error::AppError;
use crate::ocsf::{self, Activity};
use crate::retry::{RetryPolicy, retry_until_some};
use crate::session::Session;
use crate::transport::CredentialResponse;
use crate::types::{SignupRequest, UserIdentity, UserSummary, parse_json, required};

/// The profile row is created asynchronously after sign-up.
const PROFILE_WAIT: RetryPolicy = RetryPolicy::fixed(10, Duration::from_millis(150));

pub async fn signup(
    State(state): State<Arc<crate::AppState>>,
    ctx: ClientContext,
    body: Bytes,
) -> Result<CredentialResponse, AppError> {
    let client = state.auth_client()?;
    let req: SignupRequest = parse_json(&body)?;

    let password = req.password.as_deref().filter(|p| !p.is_empty());
    let (Some(email), Some(password), Some(full_name)) = (
        required(req.email.as_deref()),
        password,
        required(req.full_name.as_deref()),
    ) else {
        return Err(AppError::missing_fields(
            "Email, password and full_name are required",
        ));
    };

    let created = match client.sign_up(email, password, full_name).await? {
        Reply::Accepted(created) => created,
        Reply::Rejected(details) => {
            ocsf::authentication_event(
                Activity::Other,
                false,
                Some(email),
                ctx.environment,
                &format!("Sign-up failed: {details}"),
            );
            return Err(AppError::Rejected {
                error: "Failed to create account",
                code: "SIGNUP_FAILED",
                details,
            });
        }
    };

    ocsf::authentication_event(
        Activity::Other,
        true,
        Some(email),
        ctx.environment,
        "Account created",
    );

    let Some(issued) = created.session else {
        tracing::info!("account created, e-mail confirmation pending");
        return Ok(CredentialResponse::new(
            StatusCode::CREATED,
            ctx.transport(),
            json!({
                "success": true,
                "message": "Account created! Please check your email to confirm.",
                "user": created.user.as_ref().map(UserSummary::from),
                "email_confirmation_required": true,
            }),
        ));
    };

    let session = Session::from_issued(issued, None)?;
    let user_id = session.user.id.as_str();
    let access_token = session.access_token.as_str();
    let client = &client;

    let profile = retry_until_some(PROFILE_WAIT, move |attempt| async move {
        let found = client.fetch_profile(user_id, access_token).await?;
        if found.is_none() {
            tracing::debug!(attempt, "profile not visible yet");
        }
        Ok::<_, AppError>(found)
    })
    .await?
    .unwrap_or_else(|| {
        tracing::warn!(user_id, "profile not visible after sign-up, using defaults");
        Profile::default()
    });

    let identity = UserIdentity {
        role: profile.role.or_else(|| Some("user".into())),
        plan: profile.plan.or_else(|| Some("free".into())),
        full_name: profile.full_name.or_else(|| Some(full_name.to_string())),
        ..UserIdentity::new(&session.user, Profile::default())
    };

    Ok(CredentialResponse::new(
        StatusCode::CREATED,
        ctx.transport(),
        json!({ "success": true, "user": identity }),
    )
    .with_session(&session))
}
