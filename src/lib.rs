//! Session relay: environment-aware authentication endpoints and API gateway.
//!
//! One binary, two routers. `api` mode serves the authentication endpoints,
//! `gateway` mode relays `/api/*` to the internal API. Selection via
//! `RELAY_MODE`.

pub mod auth_service;
pub mod config;
pub mod context;
pub mod cookies;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod ocsf;
pub mod origin;
pub mod proxy;
pub mod retry;
pub mod routes;
pub mod session;
pub mod tokens;
pub mod transport;
pub mod types;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth_service::AuthServiceClient;
use crate::config::{Config, RelayMode};
use crate::error::{AppError, method_not_allowed};
use crate::origin::OriginPolicy;

/// Shared application state available to all route handlers.
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub origins: OriginPolicy,
}

impl AppState {
    pub fn new(config: Config, http_client: reqwest::Client) -> Self {
        let origins = config.origin_policy();
        Self {
            config,
            http_client,
            origins,
        }
    }

    /// Client for the Authentication Service, or `ENV_ERROR` when unconfigured.
    pub fn auth_client(&self) -> Result<AuthServiceClient<'_>, AppError> {
        self.config
            .auth_service()
            .map(|cfg| AuthServiceClient::new(&self.http_client, cfg))
            .ok_or_else(AppError::missing_configuration)
    }
}

/// Router for the configured mode.
pub fn create_router(state: Arc<AppState>) -> Router {
    match state.config.mode {
        RelayMode::Api => create_app(state),
        RelayMode::Gateway => create_gateway(state),
    }
}

/// Authentication endpoints, nested under `API_PATH_PREFIX`.
///
/// Every response passes through the CORS middleware, which also answers
/// OPTIONS with 204 before routing.
pub fn create_app(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route(
            "/auth-login",
            post(routes::login::login).fallback(method_not_allowed),
        )
        .route(
            "/auth-signup",
            post(routes::signup::signup).fallback(method_not_allowed),
        )
        .route(
            "/auth-me",
            get(routes::me::me).fallback(method_not_allowed),
        )
        .route(
            "/auth-refresh",
            post(routes::refresh::refresh_tokens).fallback(method_not_allowed),
        )
        .route(
            "/auth-logout",
            post(routes::logout::logout)
                .delete(routes::logout::logout)
                .fallback(method_not_allowed),
        )
        .route(
            "/token-exchange",
            get(routes::token_exchange::token_exchange).fallback(method_not_allowed),
        )
        .route(
            "/auth-forgot-password",
            post(routes::forgot_password::forgot_password).fallback(method_not_allowed),
        )
        .route(
            "/auth-reset-password",
            post(routes::reset_password::reset_password).fallback(method_not_allowed),
        );

    let prefix = state.config.api_path_prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        auth_routes
    } else {
        Router::new().nest(prefix, auth_routes)
    };

    router
        .route("/health", get(routes::health::health))
        .fallback(routes::not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::cors::apply_cors,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reverse proxy: every path except `/health` goes to [`proxy::relay`].
pub fn create_gateway(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .fallback(proxy::relay)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
