//! Runtime configuration parsed from environment variables.
//!
//! The external API base URL has three sources, highest precedence first:
//! - a runtime config file (`RUNTIME_CONFIG_PATH`) holding `{"API_URL": ...}`,
//!   which deployments rewrite without rebuilding
//! - the `API_URL` environment variable
//! - in development (`NEOCRM_ENV=development`) client-side callers always use
//!   the relative [`DEV_API_BASE`] so the local proxy answers
//!
//! The server never fails to start on a missing URL; routes answer with a
//! 500 envelope instead (see `routes::proxy`).

use std::path::Path;

use reqwest::Url;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEV_API_BASE: &str = "/api";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("API_URL is not set")]
    MissingApiUrl,
    #[error("invalid API_URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("runtime config unreadable: {0}")]
    RuntimeConfig(String),
}

// =============================================================================
// RUNTIME OVERRIDE
// =============================================================================

/// Values injected at deploy time, read from a small JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
    #[serde(rename = "API_URL", default)]
    pub api_url: Option<String>,
}

impl RuntimeConfig {
    /// Load the runtime override file. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::RuntimeConfig(e.to_string())),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::RuntimeConfig(e.to_string()))
    }
}

// =============================================================================
// SERVER CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Resolved external API base, or the reason it could not be resolved.
    pub api_url: Result<Url, ConfigError>,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// - `PORT`: default 3000
    /// - `API_URL`: external API base URL
    /// - `RUNTIME_CONFIG_PATH`: optional runtime override file
    #[must_use]
    pub fn from_env() -> Self {
        let port = env_parse("PORT", DEFAULT_PORT);
        let runtime = match std::env::var("RUNTIME_CONFIG_PATH") {
            Ok(path) => RuntimeConfig::load(Path::new(&path)).unwrap_or_else(|e| {
                tracing::warn!(error = %e, %path, "ignoring runtime config");
                RuntimeConfig::default()
            }),
            Err(_) => RuntimeConfig::default(),
        };
        let build_time = std::env::var("API_URL").ok();
        let api_url = resolve_server_api_url(runtime.api_url.as_deref(), build_time.as_deref());
        Self { port, api_url }
    }
}

/// Pick the runtime override over the build-time value and validate it.
pub fn resolve_server_api_url(runtime: Option<&str>, build_time: Option<&str>) -> Result<Url, ConfigError> {
    let raw = first_non_blank(runtime, build_time).ok_or(ConfigError::MissingApiUrl)?;
    parse_absolute_url(raw)
}

/// Resolve the base URL used by client-side service calls.
///
/// Development always goes through the relative proxy path; otherwise the
/// runtime value wins over the build-time value.
pub fn resolve_client_api_base(
    runtime: Option<&str>,
    build_time: Option<&str>,
    development: bool,
) -> Result<String, ConfigError> {
    if development {
        return Ok(DEV_API_BASE.to_owned());
    }
    let raw = first_non_blank(runtime, build_time).ok_or(ConfigError::MissingApiUrl)?;
    let url = parse_absolute_url(raw)?;
    Ok(url.as_str().trim_end_matches('/').to_owned())
}

/// `true` when `NEOCRM_ENV` names a development build.
#[must_use]
pub fn is_development() -> bool {
    std::env::var("NEOCRM_ENV").is_ok_and(|v| v.trim().eq_ignore_ascii_case("development"))
}

fn first_non_blank<'a>(primary: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
    [primary, fallback]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
}

fn parse_absolute_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidApiUrl { url: raw.to_owned(), reason: e.to_string() })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiUrl { url: raw.to_owned(), reason: "scheme must be http or https".into() });
    }
    Ok(url)
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
