//! Per-request caller classification.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use std::convert::Infallible;

use crate::origin::{Environment, OriginPolicy};
use crate::transport::Transport;

/// Origin and Environment of the caller, computed once per request.
///
/// Inserted into request extensions by the CORS middleware. Handlers mounted
/// without it fall back to classifying the request themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub origin: Option<String>,
    pub environment: Environment,
}

impl ClientContext {
    pub fn classify(policy: &OriginPolicy, headers: &HeaderMap) -> Self {
        let origin = headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let environment = policy.detect_environment(origin.as_deref());
        Self {
            origin,
            environment,
        }
    }

    pub fn transport(&self) -> Transport {
        Transport::for_environment(self.environment)
    }
}

impl FromRequestParts<std::sync::Arc<crate::AppState>> for ClientContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &std::sync::Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<ClientContext>() {
            return Ok(ctx.clone());
        }
        Ok(Self::classify(&state.origins, &parts.headers))
    }
}
