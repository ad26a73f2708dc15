//! Test utilities: app builders, JWT factory, wiremock stand-ins for the
//! Authentication Service and profile store.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use session_relay::config::{Config, RelayMode};
use session_relay::{AppState, create_app, create_gateway};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROD_ORIGIN: &str = "https://app.example.com";
pub const DEV_ORIGIN: &str = "https://project.weweb-preview.io";

/// API router talking to `auth_url`.
pub fn build_test_app(auth_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.auth_service_url = auth_url.to_string();
    build_test_app_with_config(config)
}

pub fn build_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, reqwest::Client::new()));
    (create_app(state.clone()), state)
}

/// Gateway router relaying to `upstream_url`.
pub fn build_test_gateway(upstream_url: &str) -> axum::Router {
    let mut config = Config::test_default();
    config.mode = RelayMode::Gateway;
    config.proxy_upstream_url = upstream_url.to_string();
    create_gateway(Arc::new(AppState::new(config, reqwest::Client::new())))
}

/// Request builder with an optional Origin header.
pub fn request(method: &str, uri: &str, origin: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match origin {
        Some(o) => builder.header(header::ORIGIN, o),
        None => builder,
    }
}

pub fn json_request(method: &str, uri: &str, origin: Option<&str>, body: &Value) -> Request<Body> {
    request(method, uri, origin)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Unsigned JWT with the given claims. The relay never verifies signatures.
pub fn make_unsigned_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(b"fake-signature");
    format!("{header}.{payload}.{sig}")
}

pub fn expired_jwt() -> String {
    make_unsigned_jwt(&json!({"sub": "user-1", "email": "a@example.com", "exp": 1000}))
}

pub fn session_json(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 1900000000,
        "user": {"id": "user-1", "email": "a@example.com"}
    })
}

pub async fn mount_password_grant(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_refresh_grant(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_user(server: &MockServer, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({"id": "user-1", "email": "a@example.com"}))
    } else {
        ResponseTemplate::new(status).set_body_json(json!({"msg": "invalid JWT: token is expired"}))
    };
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(template)
        .mount(server)
        .await;
}

pub async fn mount_profile(server: &MockServer, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

pub fn profile_rows() -> Value {
    json!([{"role": "user", "plan": "pro", "full_name": "Ada Lovelace"}])
}
