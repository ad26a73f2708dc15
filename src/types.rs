//! Shared request/response DTOs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth_service::{AuthUser, Profile};
use crate::error::AppError;

/// Parse a JSON request body. Anything unparseable is `INVALID_JSON`.
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|_| AppError::invalid_json())
}

/// Trimmed, non-empty string field.
pub fn required(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

/// POST /auth-login request body.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /auth-signup request body.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// POST /auth-refresh request body, read only for DEV callers.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// POST /auth-forgot-password request body. `email` stays untyped so a
/// non-string value is reported as a missing e-mail, not as bad JSON.
#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<Value>,
}

/// POST /auth-reset-password request body. Both snake_case and camelCase
/// spellings are accepted.
#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default, rename = "accessToken")]
    access_token_camel: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default, rename = "refreshToken")]
    refresh_token_camel: Option<String>,
    #[serde(default)]
    new_password: Option<String>,
    #[serde(default, rename = "newPassword")]
    new_password_camel: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl ResetPasswordRequest {
    pub fn access_token(&self) -> Option<&str> {
        first_present(&[&self.access_token, &self.access_token_camel])
    }

    pub fn refresh_token(&self) -> Option<&str> {
        first_present(&[&self.refresh_token, &self.refresh_token_camel])
    }

    pub fn new_password(&self) -> Option<&str> {
        first_present(&[&self.new_password, &self.new_password_camel, &self.password])
    }
}

fn first_present<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .find_map(|c| c.as_deref().filter(|s| !s.is_empty()))
}

/// Caller identity: authentication record merged with the profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub plan: Option<String>,
    pub full_name: Option<String>,
}

impl UserIdentity {
    pub fn new(user: &AuthUser, profile: Profile) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: profile.role,
            plan: profile.plan,
            full_name: profile.full_name,
        }
    }
}

/// `{id, email}` as echoed by logout, sign-up and password reset.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub email: Option<String>,
}

impl From<&AuthUser> for UserSummary {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}

/// GET /token-exchange response.
#[derive(Debug, Serialize)]
pub struct TokenExchangeResponse {
    pub success: bool,
    pub authenticated: bool,
    pub user: ExchangedUser,
}

#[derive(Debug, Serialize)]
pub struct ExchangedUser {
    pub id: String,
    pub access_token: String,
}

/// Plain `{success, message}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String,
}
