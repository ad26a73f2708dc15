//! Integration tests for the gateway router against a wiremock internal API.

mod common;

use axum::body::Body;
use axum::http::{StatusCode, header};
use common::*;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_string, header as header_matches, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_gateway_health() {
    let app = build_test_gateway("http://127.0.0.1:9");
    let req = request("GET", "/health", None).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["mode"], "gateway");
}

#[tokio::test]
async fn test_preflight_never_reaches_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let app = build_test_gateway(&upstream.uri());

    let req = request("OPTIONS", "/api/auth-me", Some(DEV_ORIGIN))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], DEV_ORIGIN);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_path_outside_public_prefix_is_404() {
    let app = build_test_gateway("http://127.0.0.1:9");
    let req = request("GET", "/other/thing", Some(PROD_ORIGIN))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert_eq!(body_json(resp).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_path_and_query_are_rewritten() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/auth-login"))
        .and(query_param("next", "home"))
        .and(body_string(r#"{"email":"a@example.com"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&upstream)
        .await;
    let app = build_test_gateway(&upstream.uri());

    let req = request("POST", "/api/auth-login?next=home", Some(PROD_ORIGIN))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"a@example.com"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["ok"], true);
}

async fn mount_two_cookies(upstream: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/functions/v1/auth-login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "sb-access-token=a; Path=/; Domain=internal.example; SameSite=Lax")
                .append_header("set-cookie", "sb-refresh-token=r; Max-Age=604800")
                .set_body_json(json!({"success": true})),
        )
        .mount(upstream)
        .await;
}

#[tokio::test]
async fn test_prod_keeps_each_cookie_separately_and_fixed() {
    let upstream = MockServer::start().await;
    mount_two_cookies(&upstream).await;
    let app = build_test_gateway(&upstream.uri());

    let req = request("POST", "/api/auth-login", Some(PROD_ORIGIN))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("sb-access-token=a;")));
    assert!(cookies.iter().any(|c| c.starts_with("sb-refresh-token=r;")));
    for cookie in &cookies {
        let lower = cookie.to_ascii_lowercase();
        assert!(!lower.contains("domain="));
        assert!(!lower.contains("samesite=lax"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.ends_with("SameSite=None"));
    }
}

#[tokio::test]
async fn test_dev_drops_upstream_cookies() {
    let upstream = MockServer::start().await;
    mount_two_cookies(&upstream).await;
    let app = build_test_gateway(&upstream.uri());

    let req = request("POST", "/api/auth-login", Some(DEV_ORIGIN))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());
    assert_eq!(body_json(resp).await["success"], true);
}

#[tokio::test]
async fn test_upstream_cors_headers_are_replaced() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/auth-me"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("access-control-allow-origin", "*")
                .insert_header("access-control-allow-credentials", "false")
                .insert_header("x-upstream", "kept")
                .set_body_json(json!({})),
        )
        .mount(&upstream)
        .await;
    let app = build_test_gateway(&upstream.uri());

    let req = request("GET", "/api/auth-me", Some(PROD_ORIGIN))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    let headers = resp.headers();
    assert_eq!(headers.get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN).iter().count(), 1);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], PROD_ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers["x-upstream"], "kept");
}

#[tokio::test]
async fn test_upstream_vary_and_expose_headers_survive() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/analyses"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("vary", "Accept-Encoding")
                .insert_header("access-control-expose-headers", "X-Total-Count")
                .set_body_json(json!([])),
        )
        .mount(&upstream)
        .await;
    let app = build_test_gateway(&upstream.uri());

    let req = request("GET", "/api/analyses", Some(PROD_ORIGIN))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    let headers = resp.headers();
    let vary: Vec<_> = headers
        .get_all(header::VARY)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(vary.iter().any(|v| v.contains("Accept-Encoding")));
    assert!(vary.iter().any(|v| v.contains("Origin")));
    assert_eq!(headers[header::ACCESS_CONTROL_EXPOSE_HEADERS], "X-Total-Count");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], PROD_ORIGIN);
}

#[tokio::test]
async fn test_cookie_forwarded_for_prod() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/auth-me"))
        .and(header_matches("cookie", "sb-access-token=at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&upstream)
        .await;
    let app = build_test_gateway(&upstream.uri());

    let req = request("GET", "/api/auth-me", Some(PROD_ORIGIN))
        .header(header::COOKIE, "sb-access-token=at")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cookie_withheld_for_dev() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/auth-me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&upstream)
        .await;
    let app = build_test_gateway(&upstream.uri());

    let req = request("GET", "/api/auth-me", Some(DEV_ORIGIN))
        .header(header::COOKIE, "sb-access-token=at")
        .header(header::AUTHORIZATION, "Bearer at")
        .header("x-not-forwarded", "1")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let received = upstream.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let forwarded = &received[0].headers;
    assert!(forwarded.get("cookie").is_none());
    assert!(forwarded.get("x-not-forwarded").is_none());
    assert_eq!(forwarded.get("authorization").unwrap(), "Bearer at");
}

#[tokio::test]
async fn test_unreachable_upstream_is_502_with_cors() {
    let app = build_test_gateway("http://127.0.0.1:9");
    let req = request("GET", "/api/auth-me", Some(PROD_ORIGIN))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], PROD_ORIGIN);
    assert_eq!(body_json(resp).await["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let mut config = session_relay::config::Config::test_default();
    config.mode = session_relay::config::RelayMode::Gateway;
    config.proxy_max_body_bytes = 8;
    let app = session_relay::create_gateway(std::sync::Arc::new(session_relay::AppState::new(
        config,
        reqwest::Client::new(),
    )));

    let req = request("POST", "/api/auth-login", Some(PROD_ORIGIN))
        .body(Body::from("0123456789abcdef"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(resp).await["code"], "PAYLOAD_TOO_LARGE");
}
