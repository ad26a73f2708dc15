//! HTTP client for the external Authentication Service and profile store.
//!
//! Every call separates three results: accepted (2xx), rejected by the
//! service (4xx, carries its message), and failed (transport error, 5xx or an
//! undecodable body). Only the last one is an `Err`.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::AuthServiceConfig;

/// Identity as reported by the Authentication Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A session issued by a password grant, a refresh or a sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

/// Row of the external profile store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Outcome of sign-up: a session only when no e-mail confirmation is pending.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Accepted(T),
    Rejected(String),
}

impl<T> Reply<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Reply::Accepted(v) => Some(v),
            Reply::Rejected(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("undecodable response: {0}")]
    Decode(String),
}

/// Borrowed view over the shared HTTP client and service coordinates.
#[derive(Clone, Copy)]
pub struct AuthServiceClient<'a> {
    http: &'a reqwest::Client,
    config: AuthServiceConfig<'a>,
}

impl<'a> AuthServiceClient<'a> {
    pub fn new(http: &'a reqwest::Client, config: AuthServiceConfig<'a>) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.url, path)
    }

    fn with_key(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", self.config.anon_key)
    }

    fn with_bearer(&self, req: RequestBuilder, access_token: &str) -> RequestBuilder {
        req.header("apikey", self.config.anon_key)
            .bearer_auth(access_token)
    }

    /// Identity lookup for an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<Reply<AuthUser>, AuthServiceError> {
        let req = self.with_bearer(self.http.get(self.url("/auth/v1/user")), access_token);
        send_json(req).await
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Reply<AuthSession>, AuthServiceError> {
        let req = self
            .with_key(self.http.post(self.url("/auth/v1/token?grant_type=refresh_token")))
            .json(&json!({ "refresh_token": refresh_token }));
        send_json(req).await
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Reply<AuthSession>, AuthServiceError> {
        let req = self
            .with_key(self.http.post(self.url("/auth/v1/token?grant_type=password")))
            .json(&json!({ "email": email, "password": password }));
        send_json(req).await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Reply<SignUp>, AuthServiceError> {
        let req = self
            .with_key(self.http.post(self.url("/auth/v1/signup")))
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name }
            }));

        let reply: Reply<Value> = send_json(req).await?;
        let Reply::Accepted(body) = reply else {
            return Ok(Reply::Rejected(rejection_message(&reply)));
        };

        // With auto-confirm the service answers with a session, otherwise with the bare user.
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body)
                .map_err(|e| AuthServiceError::Decode(e.to_string()))?;
            Ok(Reply::Accepted(SignUp {
                user: session.user.clone(),
                session: Some(session),
            }))
        } else {
            let user = serde_json::from_value(body).ok();
            Ok(Reply::Accepted(SignUp {
                user,
                session: None,
            }))
        }
    }

    /// Revoke every session of the token's user.
    pub async fn sign_out(&self, access_token: &str) -> Result<Reply<()>, AuthServiceError> {
        let req = self.with_bearer(
            self.http.post(self.url("/auth/v1/logout?scope=global")),
            access_token,
        );
        send_empty(req).await
    }

    /// Send a password-recovery e-mail.
    pub async fn recover(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<Reply<()>, AuthServiceError> {
        let path = match redirect_to {
            Some(url) => format!("/auth/v1/recover?redirect_to={}", urlencoding::encode(url)),
            None => "/auth/v1/recover".into(),
        };
        let req = self
            .with_key(self.http.post(self.url(&path)))
            .json(&json!({ "email": email }));
        send_empty(req).await
    }

    pub async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<Reply<AuthUser>, AuthServiceError> {
        let req = self
            .with_bearer(self.http.put(self.url("/auth/v1/user")), access_token)
            .json(&json!({ "password": password }));
        send_json(req).await
    }

    /// Profile row for a user, read with the user's own token.
    pub async fn fetch_profile(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<Profile>, AuthServiceError> {
        let path = format!(
            "/rest/v1/users?id=eq.{}&select=role,plan,full_name",
            urlencoding::encode(user_id)
        );
        let req = self.with_bearer(self.http.get(self.url(&path)), access_token);

        match send_json::<Vec<Profile>>(req).await? {
            Reply::Accepted(rows) => Ok(rows.into_iter().next()),
            Reply::Rejected(msg) => {
                tracing::warn!(user_id, error = %msg, "profile lookup rejected");
                Ok(None)
            }
        }
    }
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<Reply<T>, AuthServiceError> {
    let resp = req
        .send()
        .await
        .map_err(|e| AuthServiceError::Transport(e.to_string()))?;
    let status = resp.status();

    if status.is_success() {
        let body = resp
            .json()
            .await
            .map_err(|e| AuthServiceError::Decode(e.to_string()))?;
        return Ok(Reply::Accepted(body));
    }

    reject(status, resp).await
}

async fn send_empty(req: RequestBuilder) -> Result<Reply<()>, AuthServiceError> {
    let resp = req
        .send()
        .await
        .map_err(|e| AuthServiceError::Transport(e.to_string()))?;
    let status = resp.status();

    if status.is_success() {
        return Ok(Reply::Accepted(()));
    }

    reject(status, resp).await
}

async fn reject<T>(status: StatusCode, resp: reqwest::Response) -> Result<Reply<T>, AuthServiceError> {
    if !status.is_client_error() {
        return Err(AuthServiceError::Status(status.as_u16()));
    }

    let body: Value = resp.json().await.unwrap_or(Value::Null);
    let message = ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .unwrap_or("Request rejected by authentication service");

    Ok(Reply::Rejected(message.to_string()))
}

fn rejection_message<T>(reply: &Reply<T>) -> String {
    match reply {
        Reply::Rejected(msg) => msg.clone(),
        Reply::Accepted(_) => String::new(),
    }
}
