//! Credential delivery per Environment.
//!
//! PROD callers get Set-Cookie headers and a token-free body. DEV callers get
//! `access_token`, `refresh_token` and `expires_at` in the body and no cookies.
//! The response is assembled in full before it is returned.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};

use crate::cookies::{CookieSpec, clearing_cookies, session_cookies};
use crate::error::AppError;
use crate::origin::Environment;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Cookies,
    Body,
}

impl Transport {
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Prod => Transport::Cookies,
            Environment::Dev => Transport::Body,
        }
    }
}

/// A JSON response that may carry credentials.
#[derive(Debug)]
pub struct CredentialResponse {
    status: StatusCode,
    body: Map<String, Value>,
    cookies: Vec<CookieSpec>,
    transport: Transport,
}

impl CredentialResponse {
    /// `body` should be a JSON object; any other value is wrapped as `data`.
    pub fn new(status: StatusCode, transport: Transport, body: Value) -> Self {
        let body = match body {
            Value::Object(map) => map,
            other => Map::from_iter([("data".to_string(), other)]),
        };
        Self {
            status,
            body,
            cookies: Vec::new(),
            transport,
        }
    }

    pub fn ok(transport: Transport, body: Value) -> Self {
        Self::new(StatusCode::OK, transport, body)
    }

    /// Deliver the session's tokens through the selected transport.
    pub fn with_session(mut self, session: &Session) -> Self {
        match self.transport {
            Transport::Cookies => {
                self.cookies.extend(session_cookies(
                    &session.access_token,
                    session.refresh_token.as_deref(),
                ));
            }
            Transport::Body => {
                self.body
                    .insert("access_token".into(), session.access_token.clone().into());
                if let Some(refresh) = &session.refresh_token {
                    self.body.insert("refresh_token".into(), refresh.clone().into());
                }
                self.body
                    .insert("expires_at".into(), session.expires_at.map_or(Value::Null, Value::from));
            }
        }
        self
    }

    /// Expire both auth cookies. No-op for body transport.
    pub fn clearing_session(mut self) -> Self {
        if self.transport == Transport::Cookies {
            self.cookies.extend(clearing_cookies());
        }
        self
    }
}

impl IntoResponse for CredentialResponse {
    fn into_response(self) -> Response {
        let mut cookie_values = Vec::with_capacity(self.cookies.len());
        for cookie in &self.cookies {
            match HeaderValue::from_str(&cookie.to_header_value()) {
                Ok(value) => cookie_values.push(value),
                Err(_) => {
                    // No partial credentials: either every cookie goes out or none.
                    return AppError::Internal(format!("unencodable cookie {}", cookie.name))
                        .into_response();
                }
            }
        }

        let mut response = (self.status, Json(Value::Object(self.body))).into_response();
        let headers = response.headers_mut();
        for value in cookie_values {
            headers.append(header::SET_COOKIE, value);
        }
        response
    }
}
