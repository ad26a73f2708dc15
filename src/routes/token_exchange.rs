//! GET /token-exchange
//!
//! Turns the caller's credential (usually the access cookie) into a bearer
//! token the client can attach to its own calls. Validation only, no refresh.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::session::{AuthOutcome, validate_access_token};
use crate::tokens::extract_tokens;
use crate::types::{ExchangedUser, TokenExchangeResponse};

/// Returns the raw access token in the body for every Environment, bypassing
/// the Transport Selector: handing a PROD caller its bearer token is the point.
pub async fn token_exchange(
    State(state): State<Arc<crate::AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenExchangeResponse>, AppError> {
    let client = state.auth_client()?;
    let tokens = extract_tokens(&headers).ok_or(AppError::NoToken)?;
    let Some(access_token) = tokens.access_token else {
        return Err(AppError::TokenExpired("Please login again".into()));
    };

    let AuthOutcome::Valid(session) = validate_access_token(&client, &access_token).await?
    else {
        return Err(AppError::TokenExpired("Please login again".into()));
    };

    Ok(Json(TokenExchangeResponse {
        success: true,
        authenticated: true,
        user: ExchangedUser {
            id: session.user.id,
            access_token: session.access_token,
        },
    }))
}
