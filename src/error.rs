//! Application error types with Axum response mapping.
//!
//! Every failure leaving a handler becomes the standard envelope
//! `{success: false, error, code, message?, details?}` with a matching status.
//! Transport-level detail is logged, never returned.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth_service::AuthServiceError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NoToken,

    #[error("Invalid token")]
    InvalidToken(String),

    #[error("Session expired")]
    TokenExpired(String),

    #[error("No refresh token")]
    NoRefreshToken,

    #[error("Refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Authentication failed: {0}")]
    InvalidCredentials(String),

    #[error("No active session")]
    NoSession,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{error}: {message}")]
    Validation {
        error: &'static str,
        code: &'static str,
        message: String,
    },

    #[error("{error}: {details}")]
    Rejected {
        error: &'static str,
        code: &'static str,
        details: String,
    },

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(#[from] AuthServiceError),

    #[error("Logout failed: {0}")]
    LogoutFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Wire form of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: &str, code: &str, message: Option<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
            message,
            details: None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoToken
            | AppError::InvalidToken(_)
            | AppError::TokenExpired(_)
            | AppError::NoRefreshToken
            | AppError::RefreshFailed(_)
            | AppError::InvalidCredentials(_)
            | AppError::NoSession => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Validation { .. } | AppError::Rejected { .. } => StatusCode::BAD_REQUEST,
            AppError::ProfileNotFound => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::LogoutFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NoToken => "NO_TOKEN",
            AppError::InvalidToken(_) => "INVALID_TOKEN",
            AppError::TokenExpired(_) => "TOKEN_EXPIRED",
            AppError::NoRefreshToken => "NO_REFRESH_TOKEN",
            AppError::RefreshFailed(_) => "REFRESH_FAILED",
            AppError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            AppError::NoSession => "NO_SESSION",
            AppError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            AppError::Validation { code, .. } | AppError::Rejected { code, .. } => *code,
            AppError::ProfileNotFound => "PROFILE_ERROR",
            AppError::Configuration(_) => "ENV_ERROR",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::LogoutFailed(_) => "LOGOUT_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn missing_configuration() -> Self {
        AppError::Configuration("Missing authentication service configuration".into())
    }

    pub fn invalid_json() -> Self {
        AppError::Validation {
            error: "Invalid request",
            code: "INVALID_JSON",
            message: "Request body must be valid JSON".into(),
        }
    }

    pub fn missing_fields(message: &str) -> Self {
        AppError::Validation {
            error: "Missing fields",
            code: "MISSING_FIELDS",
            message: message.into(),
        }
    }

    fn envelope(&self) -> ErrorEnvelope {
        let relogin = Some("Please login again".to_string());
        match self {
            AppError::NoToken => ErrorEnvelope::new("Not authenticated", self.code(), relogin),
            AppError::InvalidToken(msg) => {
                ErrorEnvelope::new("Invalid token", self.code(), Some(msg.clone()))
            }
            AppError::TokenExpired(msg) => {
                ErrorEnvelope::new("Session expired", self.code(), Some(msg.clone()))
            }
            AppError::NoRefreshToken => {
                ErrorEnvelope::new("No refresh token", self.code(), relogin)
            }
            AppError::RefreshFailed(msg) => {
                ErrorEnvelope::new("Session expired", self.code(), Some(msg.clone()))
            }
            AppError::InvalidCredentials(msg) => {
                ErrorEnvelope::new("Authentication failed", self.code(), Some(msg.clone()))
            }
            AppError::NoSession => ErrorEnvelope::new(
                "No active session",
                self.code(),
                Some("User is not logged in".into()),
            ),
            AppError::MethodNotAllowed => ErrorEnvelope::new(
                "Method not allowed",
                self.code(),
                Some("Method not supported by this endpoint".into()),
            ),
            AppError::Validation { error, message, .. } => {
                ErrorEnvelope::new(error, self.code(), Some(message.clone()))
            }
            AppError::Rejected { error, details, .. } => ErrorEnvelope {
                details: Some(details.clone()),
                ..ErrorEnvelope::new(error, self.code(), None)
            },
            AppError::ProfileNotFound => ErrorEnvelope::new(
                "Profile not found",
                self.code(),
                Some("User profile not found".into()),
            ),
            AppError::Configuration(msg) => {
                ErrorEnvelope::new("Configuration error", self.code(), Some(msg.clone()))
            }
            AppError::Upstream(_) => ErrorEnvelope::new(
                "Upstream unavailable",
                self.code(),
                Some("Authentication service unreachable".into()),
            ),
            AppError::LogoutFailed(msg) => {
                ErrorEnvelope::new("Failed to invalidate session", self.code(), Some(msg.clone()))
            }
            AppError::Internal(_) => ErrorEnvelope::new(
                "Internal server error",
                self.code(),
                Some("Unexpected error".into()),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream(e) => tracing::error!(error = %e, "authentication service call failed"),
            AppError::Internal(e) => tracing::error!(error = %e, "unhandled error"),
            AppError::Configuration(e) => tracing::error!(error = %e, "configuration error"),
            other => tracing::debug!(code = other.code(), "request rejected"),
        }

        (self.status(), Json(self.envelope())).into_response()
    }
}

/// Fallback for routes hit with an unsupported method.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
