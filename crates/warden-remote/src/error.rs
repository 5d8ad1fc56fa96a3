//! Remote delegation errors.

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Remote authorization client errors.
///
/// A denial ([`RemoteError::Denied`]) is the authority's answer; every
/// other variant means no answer was obtained.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// No endpoint is configured.
    #[error("Remote authorization endpoint is not configured")]
    NotConfigured,

    /// The authority answered with a non-2xx status.
    #[error("Remote authority denied the request ({status} {status_text})")]
    Denied {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        status_text: String,
        /// Response body, when one was sent.
        body: Option<String>,
    },

    /// No response within the timeout.
    #[error("Remote authorization timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure.
    #[error("Remote transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// A configured or per-call header cannot be sent.
    #[error("Invalid header `{name}`: {message}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Invalid client configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// Classify a reqwest failure.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout(timeout)
        } else {
            RemoteError::Transport(err)
        }
    }

    /// Check if this is an explicit denial by the authority.
    pub fn is_denial(&self) -> bool {
        matches!(self, RemoteError::Denied { .. })
    }

    /// HTTP status returned by the authority, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Denied { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_display_and_status() {
        let err = RemoteError::Denied {
            status: 401,
            status_text: "Unauthorized".to_string(),
            body: None,
        };
        assert_eq!(
            err.to_string(),
            "Remote authority denied the request (401 Unauthorized)"
        );
        assert_eq!(err.status(), Some(401));
        assert!(err.is_denial());
    }

    #[test]
    fn test_timeout_is_not_a_denial() {
        let err = RemoteError::Timeout(Duration::from_millis(200));
        assert!(!err.is_denial());
        assert_eq!(err.status(), None);
    }
}
