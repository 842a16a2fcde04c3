//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;
use tracing::Level;

use biro_core::Credentials;

pub const DEFAULT_MAX_REAUTH_ATTEMPTS: u32 = 2;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub credentials: Option<Credentials>,
    pub log_level: Level,
    pub request_timeout: Duration,
    /// Silent recovery attempts `with_reauth` makes before surfacing a 401.
    pub max_reauth_attempts: u32,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
}

impl Config {
    /// A configuration pointing at `base_url` with every other setting defaulted.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
            log_level: Level::INFO,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_reauth_attempts: DEFAULT_MAX_REAUTH_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("BIRO_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("BIRO_BASE_URL".to_string()))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "BIRO_BASE_URL".to_string(),
                format!("'{base_url}' is not an http(s) URL"),
            ));
        }
        let mut config = Self::new(base_url);

        // Credentials are only taken when both halves are present.
        config.credentials = match (lookup("BIRO_USERNAME"), lookup("BIRO_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        config.log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        if let Some(secs) = parse_var::<u64>(&lookup, "BIRO_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "BIRO_MAX_REAUTH_ATTEMPTS")? {
            config.max_reauth_attempts = attempts;
        }
        if let Some(millis) = parse_var::<u64>(&lookup, "BIRO_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(millis);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "BIRO_POLL_MAX_ATTEMPTS")? {
            config.poll_max_attempts = attempts;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn base_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(var)) if var == "BIRO_BASE_URL"));
    }

    #[test]
    fn defaults_apply_when_only_base_url_is_set() {
        let config = load(&[("BIRO_BASE_URL", "https://portal.example.edu/")]).unwrap();
        assert_eq!(config.base_url, "https://portal.example.edu");
        assert_eq!(config.max_reauth_attempts, DEFAULT_MAX_REAUTH_ATTEMPTS);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("BIRO_BASE_URL", "http://localhost:8080"),
            ("BIRO_USERNAME", "jan"),
            ("BIRO_PASSWORD", "secret"),
            ("BIRO_MAX_REAUTH_ATTEMPTS", "4"),
            ("BIRO_POLL_INTERVAL_MS", "250"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert_eq!(config.max_reauth_attempts, 4);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.credentials, Some(Credentials::new("jan", "secret")));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[
            ("BIRO_BASE_URL", "http://localhost:8080"),
            ("BIRO_POLL_MAX_ATTEMPTS", "many"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "BIRO_POLL_MAX_ATTEMPTS"));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        assert!(load(&[("BIRO_BASE_URL", "ftp://portal")]).is_err());
    }
}
