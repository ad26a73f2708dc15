//! Application configuration via environment variables.
//!
//! Loaded once at startup into an immutable [`Config`]. Missing
//! authentication-service credentials are not fatal here: endpoints answer
//! `ENV_ERROR` until they are configured.

use std::env;

use crate::origin::{Environment, OriginPolicy, UnknownEnvironment};

const DEFAULT_ALLOWED_ORIGINS: &str = "https://juristai.hashing3.com,https://7eb14f49-5c74-4713-9973-342719cde6fc.weweb-preview.io,https://editor.weweb.io,https://cdn.weweb.io";
const DEFAULT_PRODUCTION_ORIGINS: &str = "https://juristai.hashing3.com";
const DEFAULT_DEV_PATTERNS: &str = "weweb-preview.io,editor.weweb.io,cdn.weweb.io,localhost,127.0.0.1";

/// Which router the binary serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    Api,
    Gateway,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_service_url: String,
    pub auth_service_anon_key: String,
    pub allowed_origins: Vec<String>,
    pub production_origins: Vec<String>,
    pub dev_origin_patterns: Vec<String>,
    pub missing_origin_env: Environment,
    pub unrecognized_origin_env: Environment,
    pub api_path_prefix: String,
    pub proxy_public_prefix: String,
    pub proxy_internal_prefix: String,
    pub proxy_upstream_url: String,
    pub proxy_max_body_bytes: usize,
    pub reset_redirect_prod: String,
    pub reset_redirect_dev: String,
    pub mode: RelayMode,
    pub port: u16,
    pub json_logs: bool,
}

/// Validated Authentication Service coordinates.
#[derive(Debug, Clone, Copy)]
pub struct AuthServiceConfig<'a> {
    pub url: &'a str,
    pub anon_key: &'a str,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_service_url = env::var("AUTH_SERVICE_URL")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = list_env("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS);
        if allowed_origins.is_empty() {
            return Err(ConfigError::Invalid {
                key: "ALLOWED_ORIGINS".into(),
                reason: "at least one origin is required".into(),
            });
        }

        let api_path_prefix = env::var("API_PATH_PREFIX").unwrap_or_else(|_| "/functions/v1".into());
        let proxy_public_prefix = env::var("PROXY_PUBLIC_PREFIX").unwrap_or_else(|_| "/api/".into());
        for (key, value) in [
            ("API_PATH_PREFIX", &api_path_prefix),
            ("PROXY_PUBLIC_PREFIX", &proxy_public_prefix),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::Invalid {
                    key: key.into(),
                    reason: format!("must start with '/', got {value:?}"),
                });
            }
        }

        let mode = match env::var("RELAY_MODE").as_deref() {
            Err(_) | Ok("api") => RelayMode::Api,
            Ok("gateway") => RelayMode::Gateway,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    key: "RELAY_MODE".into(),
                    reason: format!("expected api or gateway, got {other}"),
                });
            }
        };

        Ok(Self {
            proxy_upstream_url: env::var("PROXY_UPSTREAM_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| auth_service_url.clone()),
            auth_service_url,
            auth_service_anon_key: env::var("AUTH_SERVICE_ANON_KEY").unwrap_or_default(),
            allowed_origins,
            production_origins: list_env("PRODUCTION_ORIGINS", DEFAULT_PRODUCTION_ORIGINS),
            dev_origin_patterns: list_env("DEV_ORIGIN_PATTERNS", DEFAULT_DEV_PATTERNS),
            missing_origin_env: env_environment("MISSING_ORIGIN_ENV", Environment::Prod)?,
            unrecognized_origin_env: env_environment("UNRECOGNIZED_ORIGIN_ENV", Environment::Dev)?,
            api_path_prefix,
            proxy_public_prefix,
            proxy_internal_prefix: env::var("PROXY_INTERNAL_PREFIX")
                .unwrap_or_else(|_| "/functions/v1/".into()),
            proxy_max_body_bytes: parsed_env("PROXY_MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            reset_redirect_prod: env::var("RESET_REDIRECT_PROD").unwrap_or_default(),
            reset_redirect_dev: env::var("RESET_REDIRECT_DEV").unwrap_or_default(),
            mode,
            port: parsed_env("PORT", 3001)?,
            json_logs: env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Authentication Service coordinates, or `None` when either is unset.
    pub fn auth_service(&self) -> Option<AuthServiceConfig<'_>> {
        if self.auth_service_url.is_empty() || self.auth_service_anon_key.is_empty() {
            return None;
        }
        Some(AuthServiceConfig {
            url: &self.auth_service_url,
            anon_key: &self.auth_service_anon_key,
        })
    }

    pub fn origin_policy(&self) -> OriginPolicy {
        OriginPolicy::new(
            &self.allowed_origins,
            &self.production_origins,
            &self.dev_origin_patterns,
            self.missing_origin_env,
            self.unrecognized_origin_env,
        )
    }

    /// Password-recovery landing page for the caller's environment.
    pub fn reset_redirect(&self, env: Environment) -> Option<&str> {
        let url = match env {
            Environment::Prod => &self.reset_redirect_prod,
            Environment::Dev => &self.reset_redirect_dev,
        };
        (!url.is_empty()).then_some(url.as_str())
    }
}

/// Configuration for testing. All fields are settable directly.
impl Config {
    pub fn test_default() -> Self {
        Self {
            auth_service_url: "http://127.0.0.1:9".into(),
            auth_service_anon_key: "test-anon-key".into(),
            allowed_origins: vec![
                "https://app.example.com".into(),
                "https://project.weweb-preview.io".into(),
                "https://editor.weweb.io".into(),
            ],
            production_origins: vec!["https://app.example.com".into()],
            dev_origin_patterns: vec![
                "weweb-preview.io".into(),
                "editor.weweb.io".into(),
                "localhost".into(),
                "127.0.0.1".into(),
            ],
            missing_origin_env: Environment::Prod,
            unrecognized_origin_env: Environment::Dev,
            api_path_prefix: "/functions/v1".into(),
            proxy_public_prefix: "/api/".into(),
            proxy_internal_prefix: "/functions/v1/".into(),
            proxy_upstream_url: "http://127.0.0.1:9".into(),
            proxy_max_body_bytes: 1024 * 1024,
            reset_redirect_prod: "https://app.example.com/reset-password".into(),
            reset_redirect_dev: "https://project.weweb-preview.io/reset-password".into(),
            mode: RelayMode::Api,
            port: 3001,
            json_logs: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error(transparent)]
    Environment(#[from] UnknownEnvironment),
}

fn list_env(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.into())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.into(),
            reason: format!("cannot parse {raw:?}"),
        }),
    }
}

fn env_environment(key: &str, default: Environment) -> Result<Environment, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => Ok(raw.parse()?),
    }
}
