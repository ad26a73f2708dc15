//! Set-Cookie minting and normalization.
//!
//! Minted format: `name=value; Max-Age=<n>; Path=<p>[; HttpOnly][; Secure][; SameSite=<mode>]`.
//! Cookies meant for cross-site use carry `Secure; HttpOnly; SameSite=None`
//! and never a `Domain` attribute.

use crate::tokens::{ACCESS_COOKIE, REFRESH_COOKIE};

pub const ACCESS_MAX_AGE_SECS: i64 = 3600;
pub const REFRESH_MAX_AGE_SECS: i64 = 7 * 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    Lax,
    #[default]
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie attributes, independent of name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age_secs: i64,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    /// Cross-site options with the given lifetime.
    pub fn cross_site(max_age_secs: i64) -> Self {
        Self {
            max_age_secs,
            path: "/".into(),
            http_only: true,
            secure: true,
            same_site: Some(SameSite::None),
        }
    }

    pub fn access() -> Self {
        Self::cross_site(ACCESS_MAX_AGE_SECS)
    }

    pub fn refresh() -> Self {
        Self::cross_site(REFRESH_MAX_AGE_SECS)
    }

    /// Same attributes, expiring immediately.
    pub fn cleared(mut self) -> Self {
        self.max_age_secs = 0;
        self
    }
}

/// A cookie ready to be serialized into one Set-Cookie header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl CookieSpec {
    pub fn new(name: &str, value: &str, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    pub fn to_header_value(&self) -> String {
        build_cookie(&self.name, &self.value, &self.options)
    }
}

/// Serialize a cookie. Flags are appended only when set, in fixed order.
pub fn build_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut parts = vec![
        format!("{name}={value}"),
        format!("Max-Age={}", options.max_age_secs),
        format!("Path={}", options.path),
    ];
    if options.http_only {
        parts.push("HttpOnly".into());
    }
    if options.secure {
        parts.push("Secure".into());
    }
    if let Some(same_site) = options.same_site {
        parts.push(format!("SameSite={}", same_site.as_str()));
    }
    parts.join("; ")
}

/// Access + refresh cookies for a fresh or refreshed session.
pub fn session_cookies(access_token: &str, refresh_token: Option<&str>) -> Vec<CookieSpec> {
    let mut cookies = vec![CookieSpec::new(
        ACCESS_COOKIE,
        access_token,
        CookieOptions::access(),
    )];
    if let Some(refresh) = refresh_token {
        cookies.push(CookieSpec::new(
            REFRESH_COOKIE,
            refresh,
            CookieOptions::refresh(),
        ));
    }
    cookies
}

/// Expired access + refresh cookies, used on logout.
pub fn clearing_cookies() -> Vec<CookieSpec> {
    vec![
        CookieSpec::new(ACCESS_COOKIE, "", CookieOptions::access().cleared()),
        CookieSpec::new(REFRESH_COOKIE, "", CookieOptions::refresh().cleared()),
    ]
}

/// Rewrite an upstream Set-Cookie value for cross-site delivery.
///
/// Drops `Domain` and any `SameSite`, adds `Path=/`, `HttpOnly` and `Secure`
/// when missing, then appends `SameSite=None`. `name=value`, `Expires`,
/// `Max-Age` and other attributes are kept. Applying it twice gives the same
/// attribute set as applying it once.
pub fn fix_cookie(raw: &str) -> String {
    let mut segments = raw.split(';');
    let pair = segments.next().unwrap_or_default().trim();

    let attributes: Vec<&str> = segments
        .map(str::trim)
        .filter(|attr| !attr.is_empty())
        .filter(|attr| {
            let name = attribute_name(attr);
            !name.eq_ignore_ascii_case("domain") && !name.eq_ignore_ascii_case("samesite")
        })
        .collect();

    let has = |wanted: &str| {
        attributes
            .iter()
            .any(|attr| attribute_name(attr).eq_ignore_ascii_case(wanted))
    };
    let needs_path = !has("path");
    let needs_http_only = !has("httponly");
    let needs_secure = !has("secure");

    let mut parts = Vec::with_capacity(attributes.len() + 5);
    parts.push(pair);
    parts.extend(attributes);
    if needs_path {
        parts.push("Path=/");
    }
    if needs_http_only {
        parts.push("HttpOnly");
    }
    if needs_secure {
        parts.push("Secure");
    }
    parts.push("SameSite=None");
    parts.join("; ")
}

fn attribute_name(attr: &str) -> &str {
    attr.split_once('=').map_or(attr, |(name, _)| name).trim()
}
