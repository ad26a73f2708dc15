//! Origin classification and CORS policy.
//!
//! Every request is tagged with exactly one [`Environment`] derived from its
//! `Origin` header. PROD callers receive credentials as cookies, DEV callers
//! (preview/editor/localhost) receive them in the JSON body.

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Deployment context of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "DEV",
            Environment::Prod => "PROD",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown environment: {0} (expected DEV or PROD)")]
pub struct UnknownEnvironment(String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEV" => Ok(Environment::Dev),
            "PROD" => Ok(Environment::Prod),
            other => Err(UnknownEnvironment(other.into())),
        }
    }
}

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Client-Info, apikey, X-Supabase-Auth, X-Requested-With, X-Refresh-Token";
pub const EXPOSED_HEADERS: &str = "Set-Cookie, Authorization, apikey";

/// Response headers owned by the relay. Upstream copies are discarded.
pub const CONTROLLED_HEADERS: [HeaderName; 4] = [
    header::ACCESS_CONTROL_ALLOW_ORIGIN,
    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
    header::ACCESS_CONTROL_ALLOW_METHODS,
    header::ACCESS_CONTROL_ALLOW_HEADERS,
];

/// Negotiated CORS grant for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allowed_origin: String,
    pub allow_credentials: bool,
    pub allowed_methods: &'static str,
    pub allowed_headers: &'static str,
    pub exposed_headers: &'static str,
}

impl CorsPolicy {
    /// Write the policy into `headers`, replacing any existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        self.apply_controlled(headers);
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(self.exposed_headers),
        );
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }

    /// Write the policy over a relayed header set.
    ///
    /// Only the four controlled headers are replaced. An upstream
    /// `Access-Control-Expose-Headers` wins, and `Origin` is added to an
    /// existing `Vary` instead of overwriting it.
    pub fn merge_into(&self, headers: &mut HeaderMap) {
        self.apply_controlled(headers);
        if !headers.contains_key(header::ACCESS_CONTROL_EXPOSE_HEADERS) {
            headers.insert(
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static(self.exposed_headers),
            );
        }

        let varies_on_origin = headers
            .get_all(header::VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .any(|v| v == "*" || v.eq_ignore_ascii_case("origin"));
        if !varies_on_origin {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }

    fn apply_controlled(&self, headers: &mut HeaderMap) {
        if let Ok(origin) = HeaderValue::from_str(&self.allowed_origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static(if self.allow_credentials { "true" } else { "false" }),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(self.allowed_methods),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(self.allowed_headers),
        );
    }
}

/// Immutable origin configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    production: Vec<String>,
    dev_patterns: Vec<String>,
    missing_origin: Environment,
    unrecognized_origin: Environment,
}

impl OriginPolicy {
    pub fn new(
        allowed: &[String],
        production: &[String],
        dev_patterns: &[String],
        missing_origin: Environment,
        unrecognized_origin: Environment,
    ) -> Self {
        let normalize_all = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|o| normalize_origin(o).to_string())
                .filter(|o| !o.is_empty())
                .collect()
        };

        Self {
            allowed: normalize_all(allowed),
            production: normalize_all(production),
            dev_patterns: dev_patterns
                .iter()
                .map(|p| p.trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            missing_origin,
            unrecognized_origin,
        }
    }

    /// True iff the origin is on the allow-list or matches a preview/editor/local host pattern.
    pub fn is_origin_allowed(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin.filter(|o| !o.trim().is_empty()) else {
            return false;
        };
        let normalized = normalize_origin(origin);
        self.allowed.iter().any(|a| a == normalized) || self.matches_dev_pattern(normalized)
    }

    /// Classify a caller. Pure and total: the same input always yields the same tag.
    pub fn detect_environment(&self, origin: Option<&str>) -> Environment {
        let Some(origin) = origin.filter(|o| !o.trim().is_empty()) else {
            return self.missing_origin;
        };
        let normalized = normalize_origin(origin);

        if self.production.iter().any(|p| p == normalized) {
            Environment::Prod
        } else if self.is_origin_allowed(Some(origin)) {
            Environment::Dev
        } else {
            self.unrecognized_origin
        }
    }

    /// CORS grant for the caller.
    ///
    /// An origin missing from the allow-list gets the allow-list's first entry
    /// rather than an error, so the browser rejects the response itself.
    pub fn cors_policy(&self, origin: Option<&str>) -> CorsPolicy {
        let matched = origin.filter(|o| {
            let normalized = normalize_origin(o);
            self.allowed.iter().any(|a| a == normalized)
        });

        let allowed_origin = match matched {
            Some(o) => o.trim().to_string(),
            None => {
                if let Some(o) = origin {
                    tracing::warn!(origin = %o, "origin not on CORS allow-list, using fallback origin");
                }
                self.fallback_origin().to_string()
            }
        };

        CorsPolicy {
            allowed_origin,
            allow_credentials: true,
            allowed_methods: ALLOWED_METHODS,
            allowed_headers: ALLOWED_HEADERS,
            exposed_headers: EXPOSED_HEADERS,
        }
    }

    fn fallback_origin(&self) -> &str {
        self.allowed.first().map(String::as_str).unwrap_or("null")
    }

    fn matches_dev_pattern(&self, origin: &str) -> bool {
        let Some(host) = url::Url::parse(origin)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        else {
            return false;
        };

        self.dev_patterns.iter().any(|pattern| {
            host == *pattern
                || host
                    .strip_suffix(pattern.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Trim surrounding whitespace and a single trailing slash.
pub fn normalize_origin(origin: &str) -> &str {
    let trimmed = origin.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed)
}
