//! Domain error types
//!
//! Errors specific to domain operations: validation failures and
//! malformed identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Location is not absolute or cannot be normalized
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidLocation("docs/a".to_string());
        assert_eq!(err.to_string(), "Invalid location: docs/a");

        let err = DomainError::InvalidId("xyz".to_string());
        assert_eq!(err.to_string(), "Invalid ID format: xyz");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::ValidationFailed("a".to_string());
        let err2 = DomainError::ValidationFailed("a".to_string());
        let err3 = DomainError::ValidationFailed("b".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
