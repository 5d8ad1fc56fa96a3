//! Error types for rule compilation and compiled-rule decisions.

use thiserror::Error;

/// Rule engine error types.
#[derive(Debug, Error)]
pub enum RbacError {
    /// Caller input is malformed (bad permissions list, empty group, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A roles or users source failed to answer
    #[error("Source error in {operation}: {message}")]
    Source {
        /// Source operation that failed (e.g. `find_all_roles`)
        operation: &'static str,
        /// Error reported by the source
        message: String,
    },

    /// Principal identifier is not convertible to a number
    #[error("Invalid principal id `{0}`: must be a number")]
    InvalidIdentifier(String),

    /// Combinator does not fit the number of requested permissions
    #[error("Invalid combinator combination: {combinator} with {count} permission(s)")]
    InvalidCombinatorCombination {
        /// Combinator as given by the caller (`OR`, `AND` or `none`)
        combinator: String,
        /// Number of distinct permissions requested
        count: usize,
    },

    /// Decisions were requested before the first compilation completed
    #[error("Rule index is not ready: no compilation has completed")]
    NotReady,
}

/// Result type for rule engine operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    /// Wrap a source failure with the operation it came from.
    pub fn source_failure(operation: &'static str, err: impl std::fmt::Display) -> Self {
        RbacError::Source {
            operation,
            message: err.to_string(),
        }
    }

    /// Check if this error is caused by the caller rather than the engine.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RbacError::Validation(_)
                | RbacError::InvalidIdentifier(_)
                | RbacError::InvalidCombinatorCombination { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_keeps_operation() {
        let err = RbacError::source_failure("find_all_roles", "connection reset");
        assert_eq!(
            err.to_string(),
            "Source error in find_all_roles: connection reset"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn test_identifier_error_is_validation() {
        let err = RbacError::InvalidIdentifier("Not a Number".to_string());
        assert!(err.is_validation());
        assert!(err.to_string().contains("Not a Number"));
    }
}
