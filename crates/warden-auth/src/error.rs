//! Error types for authorization decisions
//!
//! This module defines every error an authorization call can end with,
//! from caller mistakes through explicit denials to infrastructure
//! failures, and how each one maps onto an HTTP response.

use std::time::Duration;
use thiserror::Error;
use warden_rbac::{PrincipalId, RbacError};
use warden_remote::{ConfigError, RemoteError};

/// Authorization error types.
///
/// A denial ([`AuthzError::PermissionDenied`], [`AuthzError::RemoteDenied`])
/// is an expected outcome; the other variants mean no decision was made.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Principal id is not convertible to a number
    #[error("Invalid principal id `{0}`: must be a number")]
    InvalidIdentifier(String),

    /// OR/AND requested with fewer than two permissions
    #[error("Invalid combinator combination: {combinator} with {count} permission(s)")]
    InvalidCombinatorCombination {
        /// Requested combinator
        combinator: String,
        /// Number of distinct permissions requested
        count: usize,
    },

    /// Invalid authorizer configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The local strategy denied the request
    #[error("Permission denied.")]
    PermissionDenied,

    /// The remote authority answered with a non-2xx status
    #[error("Remote authority denied the request ({status} {status_text})")]
    RemoteDenied {
        /// HTTP status returned by the authority
        status: u16,
        /// Status text returned by the authority
        status_text: String,
        /// Response body, when one was sent
        body: Option<String>,
    },

    /// The remote authority did not answer in time
    #[error("Remote authorization timed out after {0:?}")]
    RemoteTimeout(Duration),

    /// The remote authority could not be reached
    #[error("Remote transport failure: {0}")]
    RemoteTransport(String),

    /// Remote delegation requested without an endpoint
    #[error("Remote authorization endpoint is not configured")]
    RemoteNotConfigured,

    /// No configuration exists for the principal type
    #[error("Unknown principal type `{0}`")]
    UnknownPrincipalType(String),

    /// The permission callback failed
    #[error("Permission lookup failed for principal {principal}: {message}")]
    Lookup {
        /// Principal being checked
        principal: PrincipalId,
        /// Error reported by the callback
        message: String,
    },

    /// Compiled-rule engine failure (source errors, engine not ready)
    #[error(transparent)]
    Rbac(RbacError),
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

impl AuthzError {
    /// Check if this error is an explicit denial.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            AuthzError::PermissionDenied | AuthzError::RemoteDenied { .. }
        )
    }

    /// Check if this error is caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AuthzError::Validation(_)
                | AuthzError::InvalidIdentifier(_)
                | AuthzError::InvalidCombinatorCombination { .. }
        )
    }

    /// Check if this error should be logged at error level.
    ///
    /// Denials and bad input are expected and should not be logged as errors.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthzError::Validation(_)
            | AuthzError::InvalidIdentifier(_)
            | AuthzError::InvalidCombinatorCombination { .. }
            | AuthzError::UnknownPrincipalType(_) => 400,

            AuthzError::PermissionDenied | AuthzError::RemoteDenied { .. } => 401,

            AuthzError::RemoteTransport(_) => 502,
            AuthzError::RemoteTimeout(_) => 504,

            AuthzError::Rbac(RbacError::NotReady) => 503,

            AuthzError::Configuration(_)
            | AuthzError::RemoteNotConfigured
            | AuthzError::Lookup { .. }
            | AuthzError::Rbac(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthzError::Validation(_) => "VALIDATION_ERROR",
            AuthzError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            AuthzError::InvalidCombinatorCombination { .. } => "INVALID_COMBINATOR_COMBINATION",
            AuthzError::Configuration(_) => "CONFIG_ERROR",
            AuthzError::PermissionDenied => "PERMISSION_DENIED",
            AuthzError::RemoteDenied { .. } => "REMOTE_DENIED",
            AuthzError::RemoteTimeout(_) => "REMOTE_TIMEOUT",
            AuthzError::RemoteTransport(_) => "REMOTE_TRANSPORT",
            AuthzError::RemoteNotConfigured => "REMOTE_NOT_CONFIGURED",
            AuthzError::UnknownPrincipalType(_) => "UNKNOWN_PRINCIPAL_TYPE",
            AuthzError::Lookup { .. } => "LOOKUP_FAILED",
            AuthzError::Rbac(RbacError::NotReady) => "NOT_READY",
            AuthzError::Rbac(_) => "RBAC_ERROR",
        }
    }
}

impl From<RbacError> for AuthzError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::Validation(message) => AuthzError::Validation(message),
            RbacError::InvalidIdentifier(id) => AuthzError::InvalidIdentifier(id),
            RbacError::InvalidCombinatorCombination { combinator, count } => {
                AuthzError::InvalidCombinatorCombination { combinator, count }
            }
            other => AuthzError::Rbac(other),
        }
    }
}

impl From<RemoteError> for AuthzError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotConfigured => AuthzError::RemoteNotConfigured,
            RemoteError::Denied {
                status,
                status_text,
                body,
            } => AuthzError::RemoteDenied {
                status,
                status_text,
                body,
            },
            RemoteError::Timeout(after) => AuthzError::RemoteTimeout(after),
            RemoteError::Transport(e) => AuthzError::RemoteTransport(e.to_string()),
            RemoteError::InvalidHeader { name, message } => {
                AuthzError::Validation(format!("invalid header `{name}`: {message}"))
            }
            RemoteError::Config(e) => AuthzError::Configuration(e.to_string()),
        }
    }
}

impl From<ConfigError> for AuthzError {
    fn from(err: ConfigError) -> Self {
        AuthzError::Configuration(err.to_string())
    }
}
