//! Access-token validation with a single refresh fallback.
//!
//! ```text
//! validate ──ok──> Valid
//!     │
//!   rejected ──no refresh token──> Rejected(INVALID_TOKEN | TOKEN_EXPIRED)
//!     │
//!   refresh ──ok──> Refreshed
//!     └──rejected──> Rejected(TOKEN_EXPIRED)
//! ```
//!
//! A transport failure at any step is an `Err`, never a rejection.

use crate::auth_service::{AuthServiceClient, AuthServiceError, AuthSession, AuthUser, Reply};
use crate::error::AppError;
use crate::jwt;
use crate::tokens::TokenPair;

/// An authenticated session for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
}

impl Session {
    /// Build from a freshly issued session. A missing rotated refresh token
    /// falls back to `previous_refresh`.
    pub fn from_issued(
        issued: AuthSession,
        previous_refresh: Option<&str>,
    ) -> Result<Self, AuthServiceError> {
        let user = issued
            .user
            .ok_or_else(|| AuthServiceError::Decode("session without user".into()))?;
        Ok(Self {
            user,
            access_token: issued.access_token,
            refresh_token: issued
                .refresh_token
                .or_else(|| previous_refresh.map(String::from)),
            expires_at: issued.expires_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    InvalidToken,
    TokenExpired,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::InvalidToken => "INVALID_TOKEN",
            AuthErrorCode::TokenExpired => "TOKEN_EXPIRED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub code: AuthErrorCode,
    pub message: String,
}

impl AuthFailure {
    fn expired() -> Self {
        Self {
            code: AuthErrorCode::TokenExpired,
            message: "Please login again".into(),
        }
    }
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure.code {
            AuthErrorCode::InvalidToken => AppError::InvalidToken(failure.message),
            AuthErrorCode::TokenExpired => AppError::TokenExpired(failure.message),
        }
    }
}

/// Result of authenticating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The presented access token is accepted as is.
    Valid(Session),
    /// The access token was rejected and the refresh token produced a new pair.
    /// Credentials must be re-delivered to the caller.
    Refreshed(Session),
    Rejected(AuthFailure),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, AuthOutcome::Rejected(_))
    }

    pub fn is_refreshed(&self) -> bool {
        matches!(self, AuthOutcome::Refreshed(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthOutcome::Valid(s) | AuthOutcome::Refreshed(s) => Some(s),
            AuthOutcome::Rejected(_) => None,
        }
    }

    /// Session plus refreshed flag, or the rejection as a request error.
    pub fn into_session(self) -> Result<(Session, bool), AppError> {
        match self {
            AuthOutcome::Valid(s) => Ok((s, false)),
            AuthOutcome::Refreshed(s) => Ok((s, true)),
            AuthOutcome::Rejected(failure) => Err(failure.into()),
        }
    }
}

/// Identity lookup for the access token. Never refreshes.
pub async fn validate_access_token(
    client: &AuthServiceClient<'_>,
    access_token: &str,
) -> Result<AuthOutcome, AuthServiceError> {
    match client.get_user(access_token).await? {
        Reply::Accepted(user) => Ok(AuthOutcome::Valid(Session {
            user,
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
        })),
        Reply::Rejected(message) => {
            tracing::debug!(error = %message, "access token rejected");
            Ok(AuthOutcome::Rejected(AuthFailure {
                code: AuthErrorCode::InvalidToken,
                message,
            }))
        }
    }
}

/// Exchange the refresh token once.
pub async fn refresh_session(
    client: &AuthServiceClient<'_>,
    refresh_token: &str,
) -> Result<AuthOutcome, AuthServiceError> {
    match client.refresh(refresh_token).await? {
        Reply::Accepted(issued) => Ok(AuthOutcome::Refreshed(Session::from_issued(
            issued,
            Some(refresh_token),
        )?)),
        Reply::Rejected(message) => {
            tracing::debug!(error = %message, "refresh token rejected");
            Ok(AuthOutcome::Rejected(AuthFailure::expired()))
        }
    }
}

/// Validate, then refresh at most once.
///
/// A pair without an access token goes straight to the refresh. Without a
/// refresh token a rejected access token is reported as `TOKEN_EXPIRED` when
/// its `exp` claim is in the past, else `INVALID_TOKEN`.
pub async fn authenticate(
    client: &AuthServiceClient<'_>,
    tokens: &TokenPair,
) -> Result<AuthOutcome, AuthServiceError> {
    let Some(access_token) = tokens.access_token.as_deref() else {
        return match tokens.refresh_token.as_deref() {
            Some(refresh) => {
                tracing::info!("no access token, attempting refresh");
                refresh_session(client, refresh).await
            }
            None => Ok(AuthOutcome::Rejected(AuthFailure {
                code: AuthErrorCode::InvalidToken,
                message: "No access token".into(),
            })),
        };
    };

    let outcome = validate_access_token(client, access_token).await?;

    match (outcome, tokens.refresh_token.as_deref()) {
        (AuthOutcome::Valid(mut session), refresh) => {
            session.refresh_token = refresh.map(String::from);
            Ok(AuthOutcome::Valid(session))
        }
        (AuthOutcome::Rejected(_), Some(refresh)) => {
            tracing::info!("access token rejected, attempting refresh");
            refresh_session(client, refresh).await
        }
        (AuthOutcome::Rejected(failure), None) => {
            if jwt::has_expired(access_token) {
                Ok(AuthOutcome::Rejected(AuthFailure::expired()))
            } else {
                Ok(AuthOutcome::Rejected(failure))
            }
        }
        (refreshed @ AuthOutcome::Refreshed(_), _) => Ok(refreshed),
    }
}
