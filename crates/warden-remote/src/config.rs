//! Remote authority configuration.
//!
//! Loaded from environment variables with defaults suitable for local
//! development. The endpoint is optional: a client without one reports
//! [`RemoteError::NotConfigured`](crate::RemoteError::NotConfigured) per call.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required setting.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration for a remote authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Absolute `http(s)` URL decisions are POSTed to.
    #[serde(default)]
    pub url: Option<String>,

    /// Headers sent with every request. Names are matched case-insensitively.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Default request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether to verify TLS certificates (disable only for testing).
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_verify_tls() -> bool {
    true
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            headers: BTreeMap::new(),
            timeout_ms: default_timeout_ms(),
            verify_tls: default_verify_tls(),
        }
    }
}

impl RemoteConfig {
    /// Configuration for the given endpoint with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WARDEN_REMOTE_URL`: remote authority URL (default: unset)
    /// - `WARDEN_REMOTE_TIMEOUT_MS`: request timeout in milliseconds (default: 10000)
    /// - `WARDEN_REMOTE_VERIFY_TLS`: `true`/`1` or `false`/`0` (default: true)
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] when a variable is set to a value that
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();

        let timeout_ms = match std::env::var("WARDEN_REMOTE_TIMEOUT_MS") {
            Ok(s) => parse_millis("WARDEN_REMOTE_TIMEOUT_MS", &s)?,
            Err(_) => default.timeout_ms,
        };

        let verify_tls = match std::env::var("WARDEN_REMOTE_VERIFY_TLS") {
            Ok(s) => parse_flag("WARDEN_REMOTE_VERIFY_TLS", &s)?,
            Err(_) => default.verify_tls,
        };

        Ok(Self {
            url: std::env::var("WARDEN_REMOTE_URL").ok().filter(|s| !s.is_empty()),
            headers: default.headers,
            timeout_ms,
            verify_tls,
        })
    }

    /// Add a default header. The name is stored lower-cased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the default timeout, kept to millisecond precision.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Get the default request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check whether an endpoint is set.
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Validate the configuration.
    ///
    /// An absent URL is valid here; a present one must be an absolute
    /// `http` or `https` URL with a host.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.url {
            validate_url(url)?;
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("`{value}` is not a number of milliseconds"),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("`{value}` is not a boolean"),
        }),
    }
}

/// Check that `url` parses as an absolute `http(s)` URL with a host.
pub fn validate_url(url: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "url".to_string(),
        message,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(format!("`{url}` is not a valid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("`{url}` is not an http(s) URL")));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid(format!("`{url}` has no host")));
    }
    Ok(())
}
