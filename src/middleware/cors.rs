//! CORS for every API response.
//!
//! Classifies the caller once, stores the [`ClientContext`] in request
//! extensions, answers preflight with 204 and writes the negotiated CORS
//! headers over whatever the handler produced.

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::AppState;
use crate::context::ClientContext;

pub async fn apply_cors(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let ctx = ClientContext::classify(&state.origins, req.headers());
    let policy = state.origins.cors_policy(ctx.origin.as_deref());

    tracing::debug!(
        origin = ctx.origin.as_deref().unwrap_or("-"),
        environment = %ctx.environment,
        method = %req.method(),
        "classified caller"
    );

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        req.extensions_mut().insert(ctx);
        next.run(req).await
    };

    policy.apply(response.headers_mut());
    response
}
