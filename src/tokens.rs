//! Access/refresh token extraction.
//!
//! Cookies win over headers: if either auth cookie is present the pair comes
//! from cookies alone, even when one of the two is missing.

use axum::http::{HeaderMap, header};
use std::collections::HashMap;

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";
pub const REFRESH_HEADER: &str = "x-refresh-token";

/// Credentials carried by one request. At least one of the two is set.
///
/// A browser drops the access cookie after its hour is up while the refresh
/// cookie lives on, so a refresh-only pair is normal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cookie,
    Header,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Cookie => "cookie",
            TokenSource::Header => "header",
        }
    }
}

#[derive(Debug, Default)]
struct Located {
    access: Option<String>,
    refresh: Option<String>,
}

/// Extract the token pair. `None` when neither token was found.
pub fn extract_tokens(headers: &HeaderMap) -> Option<TokenPair> {
    let (found, source) = locate(headers)?;

    tracing::debug!(
        source = source.as_str(),
        has_access = found.access.is_some(),
        has_refresh = found.refresh.is_some(),
        "tokens extracted"
    );
    Some(TokenPair {
        access_token: found.access,
        refresh_token: found.refresh,
    })
}

/// Refresh token alone, from the same source [`extract_tokens`] would pick.
pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    locate(headers).and_then(|(found, _)| found.refresh)
}

fn locate(headers: &HeaderMap) -> Option<(Located, TokenSource)> {
    let cookie_header = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    let cookies = parse_cookies(&cookie_header);
    let access = non_empty(cookies.get(ACCESS_COOKIE).copied());
    let refresh = non_empty(cookies.get(REFRESH_COOKIE).copied());
    if access.is_some() || refresh.is_some() {
        return Some((Located { access, refresh }, TokenSource::Cookie));
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(strip_bearer)?;

    let refresh = non_empty(
        headers
            .get(REFRESH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim),
    );

    Some((
        Located {
            access: Some(bearer.to_string()),
            refresh,
        },
        TokenSource::Header,
    ))
}

/// Parse a Cookie header into name → value. Each entry is split on its first `=`.
pub fn parse_cookies(header: &str) -> HashMap<&str, &str> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then_some((name, value.trim()))
        })
        .collect()
}

fn strip_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    let prefix = value.get(..7)?;
    if !prefix.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    let token = value[7..].trim();
    (!token.is_empty()).then_some(token)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_cookie_pair() {
        let h = headers(&[("cookie", "sb-access-token=at-1; sb-refresh-token=rt-1")]);
        assert_eq!(
            extract_tokens(&h),
            Some(TokenPair {
                access_token: Some("at-1".into()),
                refresh_token: Some("rt-1".into()),
            })
        );
    }

    #[test]
    fn test_cookie_value_split_on_first_equals() {
        let h = headers(&[("cookie", "sb-access-token=abc==; other=x=y")]);
        let pair = extract_tokens(&h).unwrap();
        assert_eq!(pair.access_token.as_deref(), Some("abc=="));
        assert!(pair.refresh_token.is_none());
    }

    #[test]
    fn test_cookies_win_over_headers() {
        let h = headers(&[
            ("cookie", "sb-access-token=from-cookie"),
            ("authorization", "Bearer from-header"),
            ("x-refresh-token", "rt-header"),
        ]);
        let pair = extract_tokens(&h).unwrap();
        assert_eq!(pair.access_token.as_deref(), Some("from-cookie"));
        // No fall-through to X-Refresh-Token once cookies matched
        assert!(pair.refresh_token.is_none());
    }

    #[test]
    fn test_refresh_cookie_only_does_not_fall_through() {
        let h = headers(&[
            ("cookie", "sb-refresh-token=rt-only"),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(
            extract_tokens(&h),
            Some(TokenPair {
                access_token: None,
                refresh_token: Some("rt-only".into()),
            })
        );
        assert_eq!(extract_refresh_token(&h).as_deref(), Some("rt-only"));
    }

    #[test]
    fn test_bearer_header() {
        let h = headers(&[
            ("authorization", "Bearer at-header"),
            ("x-refresh-token", "rt-header"),
        ]);
        assert_eq!(
            extract_tokens(&h),
            Some(TokenPair {
                access_token: Some("at-header".into()),
                refresh_token: Some("rt-header".into()),
            })
        );
    }

    #[test]
    fn test_bearer_prefix_case_insensitive() {
        let h = headers(&[("authorization", "bEaReR at-mixed")]);
        assert_eq!(extract_tokens(&h).unwrap().access_token.as_deref(), Some("at-mixed"));
    }

    #[test]
    fn test_bearer_without_refresh_header() {
        let h = headers(&[("authorization", "Bearer at")]);
        let pair = extract_tokens(&h).unwrap();
        assert!(pair.refresh_token.is_none());
    }

    #[test]
    fn test_unrelated_cookies_fall_through_to_header() {
        let h = headers(&[
            ("cookie", "theme=dark; lang=pt"),
            ("authorization", "Bearer at"),
        ]);
        assert_eq!(extract_tokens(&h).unwrap().access_token.as_deref(), Some("at"));
    }

    #[test]
    fn test_no_credentials() {
        assert!(extract_tokens(&HeaderMap::new()).is_none());
        assert!(extract_tokens(&headers(&[("authorization", "Basic dXNlcg==")])).is_none());
        assert!(extract_tokens(&headers(&[("authorization", "Bearer ")])).is_none());
        assert!(extract_tokens(&headers(&[("cookie", "sb-access-token=")])).is_none());
    }

    #[test]
    fn test_split_cookie_headers_are_joined() {
        let h = headers(&[
            ("cookie", "sb-access-token=at"),
            ("cookie", "sb-refresh-token=rt"),
        ]);
        let pair = extract_tokens(&h).unwrap();
        assert_eq!(pair.refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn test_parse_cookies() {
        let parsed = parse_cookies("a=1; b = 2 ;c=3=4; broken; =x");
        assert_eq!(parsed.get("a"), Some(&"1"));
        assert_eq!(parsed.get("b"), Some(&"2"));
        assert_eq!(parsed.get("c"), Some(&"3=4"));
        assert!(!parsed.contains_key("broken"));
        assert_eq!(parsed.len(), 3);
    }
}
