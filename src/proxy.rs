//! Edge gateway relaying `/api/*` to the internal API root.
//!
//! Request side: path rewrite, fixed header allow-list, Cookie only for PROD.
//! Response side: the relay-owned `Access-Control-Allow-*` headers replace
//! upstream ones and every other header is kept. Each upstream Set-Cookie
//! stays its own header (rewritten for PROD, dropped for DEV). Hop-by-hop
//! headers are not copied.

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::AppState;
use crate::context::ClientContext;
use crate::cookies::fix_cookie;
use crate::error::ErrorEnvelope;
use crate::origin::{CONTROLLED_HEADERS, CorsPolicy, Environment};

/// Request headers relayed upstream. Cookie is handled separately.
const FORWARDED_HEADERS: [&str; 8] = [
    "content-type",
    "apikey",
    "authorization",
    "origin",
    "x-client-info",
    "x-supabase-auth",
    "x-requested-with",
    "x-refresh-token",
];

const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

/// Map a public request URI onto the internal API. `None` if outside the public prefix.
pub fn rewrite_target(uri: &Uri, public_prefix: &str, internal_prefix: &str) -> Option<String> {
    let rest = uri.path().strip_prefix(public_prefix)?;
    Some(match uri.query() {
        Some(query) => format!("{internal_prefix}{rest}?{query}"),
        None => format!("{internal_prefix}{rest}"),
    })
}

/// Fallback handler of the gateway router.
pub async fn relay(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let config = &state.config;

    let Some(target) = rewrite_target(
        req.uri(),
        &config.proxy_public_prefix,
        &config.proxy_internal_prefix,
    ) else {
        tracing::debug!(path = %req.uri().path(), "not an API route");
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorEnvelope::new("Not found", "NOT_FOUND", None)),
        )
            .into_response();
    };

    let ctx = ClientContext::classify(&state.origins, req.headers());
    let cors = state.origins.cors_policy(ctx.origin.as_deref());

    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        cors.apply(response.headers_mut());
        return response;
    }

    tracing::info!(
        method = %req.method(),
        target = %target,
        environment = %ctx.environment,
        "relaying request"
    );

    let (parts, body) = req.into_parts();
    let body = match to_bytes(body, config.proxy_max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "request body rejected");
            return with_cors(
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorEnvelope::new(
                    "Payload too large",
                    "PAYLOAD_TOO_LARGE",
                    Some("Request body exceeds the relay limit".into()),
                ),
                &cors,
            );
        }
    };

    let mut upstream = state
        .http_client
        .request(parts.method, format!("{}{}", config.proxy_upstream_url, target))
        .headers(forwarded_headers(&parts.headers, ctx.environment));
    if !body.is_empty() {
        upstream = upstream.body(body);
    }

    let upstream = match upstream.send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, target = %target, "internal API unreachable");
            return bad_gateway(&cors);
        }
    };

    let status = upstream.status();
    let headers = reconcile_headers(upstream.headers(), ctx.environment, &cors);

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, target = %target, "internal API response interrupted");
            return bad_gateway(&cors);
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn forwarded_headers(incoming: &HeaderMap, env: Environment) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in FORWARDED_HEADERS {
        if let Some(value) = incoming.get(name) {
            out.insert(HeaderName::from_static(name), value.clone());
        }
    }

    if env == Environment::Prod {
        let cookies: Vec<&str> = incoming
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !cookies.is_empty()
            && let Ok(value) = HeaderValue::from_str(&cookies.join("; "))
        {
            out.insert(header::COOKIE, value);
        }
    }
    out
}

/// Build the client-facing header set from the upstream one.
fn reconcile_headers(upstream: &HeaderMap, env: Environment, cors: &CorsPolicy) -> HeaderMap {
    let mut out = HeaderMap::new();
    let mut set_cookies = Vec::new();

    for (name, value) in upstream {
        if *name == header::SET_COOKIE {
            set_cookies.push(value);
        } else if !CONTROLLED_HEADERS.contains(name) && !HOP_BY_HOP.contains(name) {
            out.append(name.clone(), value.clone());
        }
    }

    cors.merge_into(&mut out);

    match env {
        Environment::Prod => {
            for raw in set_cookies {
                let Ok(raw) = raw.to_str() else {
                    tracing::warn!("dropping non-text Set-Cookie from upstream");
                    continue;
                };
                match HeaderValue::from_str(&fix_cookie(raw)) {
                    Ok(fixed) => {
                        out.append(header::SET_COOKIE, fixed);
                    }
                    Err(_) => tracing::warn!("dropping unencodable Set-Cookie from upstream"),
                }
            }
        }
        Environment::Dev => {
            if !set_cookies.is_empty() {
                tracing::debug!(count = set_cookies.len(), "dropping upstream cookies for DEV caller");
            }
        }
    }
    out
}

fn bad_gateway(cors: &CorsPolicy) -> Response {
    with_cors(
        StatusCode::BAD_GATEWAY,
        ErrorEnvelope::new(
            "Upstream unavailable",
            "UPSTREAM_ERROR",
            Some("Could not reach the internal API".into()),
        ),
        cors,
    )
}

fn with_cors(status: StatusCode, body: ErrorEnvelope, cors: &CorsPolicy) -> Response {
    let mut response = (status, Json(body)).into_response();
    cors.apply(response.headers_mut());
    response
}
