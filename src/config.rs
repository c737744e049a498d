//! Service configuration parsed from environment variables.
//!
//! Required:
//! - `DATABASE_URL`
//!
//! Optional:
//! - `PORT`: default 3000
//! - `ALLOWED_ORIGINS`: comma-separated hosts allowed to subscribe
//! - `RESEND_API_KEY` + `RESEND_FROM`: verification mail delivery; when
//!   either is absent links are only logged
//! - `CORS_ANY`: allow any origin at the CORS layer (origin checks in the
//!   handlers still apply)
//! - `DB_MAX_CONNECTIONS`: default 5
//! - `VERIFY_BASE_URL`: scheme and host used in verification links,
//!   default `https://stoked-ui.com`

use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "stoked-ui.com,www.stoked-ui.com";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_VERIFY_BASE_URL: &str = "https://stoked-ui.com";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} required")]
    Missing(&'static str),
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub resend: Option<ResendConfig>,
    pub cors_any: bool,
    pub db_max_connections: u32,
    /// No trailing slash, e.g. `https://stoked-ui.com`.
    pub verify_base_url: String,
}

impl Config {
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `DATABASE_URL` is missing, a numeric or
    /// boolean variable does not parse, or `VERIFY_BASE_URL` is not an
    /// http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let allowed_origins =
            parse_origins(lookup("ALLOWED_ORIGINS").as_deref().unwrap_or(DEFAULT_ALLOWED_ORIGINS));

        let cors_any = match lookup("CORS_ANY") {
            None => false,
            Some(raw) => {
                parse_bool(&raw).ok_or_else(|| ConfigError::Invalid { key: "CORS_ANY", value: raw.clone() })?
            }
        };

        let resend = match (non_empty(lookup("RESEND_API_KEY")), non_empty(lookup("RESEND_FROM"))) {
            (Some(api_key), Some(from)) => Some(ResendConfig { api_key, from }),
            _ => None,
        };

        let verify_base_url = match non_empty(lookup("VERIFY_BASE_URL")) {
            None => DEFAULT_VERIFY_BASE_URL.to_owned(),
            Some(raw) => parse_base_url(&raw).ok_or(ConfigError::Invalid { key: "VERIFY_BASE_URL", value: raw })?,
        };

        Ok(Self { database_url, port, allowed_origins, resend, cors_any, db_max_connections, verify_base_url })
    }
}

/// Accepts `1/true/yes/on` and `0/false/no/off`, case-insensitive.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw.clone() }),
    }
}

/// `https://host[/path]` with trailing slashes dropped; needs a non-empty host.
fn parse_base_url(raw: &str) -> Option<String> {
    let url = raw.trim_end_matches('/');
    let rest = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split('/').next().unwrap_or_default();
    (!host.is_empty() && !rest.contains(char::is_whitespace)).then(|| url.to_owned())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Split a comma-separated host list, dropping schemes and trailing slashes.
#[must_use]
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_origin)
        .filter(|o| !o.is_empty())
        .collect()
}

/// `https://Stoked-UI.com/` -> `stoked-ui.com`.
#[must_use]
pub fn normalize_origin(origin: &str) -> String {
    let trimmed = origin.trim();
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    host.trim_end_matches('/').to_ascii_lowercase()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
