//! Error types and error handling utilities
//!
//! This module defines the core error types used throughout Girok.
//! All errors are designed to be informative and actionable.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Core result type used throughout the application
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error types for Girok
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// Uniqueness or already-exists violations
    #[error("Conflict: {0}")]
    Conflict(String),

    /// State not ready for the requested operation
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Illegal state-machine transition
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Credential verification failures
    #[error("Credential verification failed")]
    CredentialVerification,

    /// Cache backend errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Event bus errors
    #[error("Event bus error: {0}")]
    Bus(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        CoreError::Validation(message.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(entity_type: S, id: S) -> Self {
        CoreError::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        CoreError::Conflict(message.into())
    }

    /// Create a precondition error
    pub fn precondition<S: Into<String>>(message: S) -> Self {
        CoreError::Precondition(message.into())
    }

    /// Create an invalid-transition error
    pub fn invalid_transition(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create a cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        CoreError::Cache(message.into())
    }

    /// Create an event bus error
    pub fn bus<S: Into<String>>(message: S) -> Self {
        CoreError::Bus(message.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        CoreError::Internal(message.into())
    }

    /// Get the error category for logging and metrics
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Validation(_) => ErrorCategory::Validation,
            CoreError::NotFound { .. } => ErrorCategory::NotFound,
            CoreError::Conflict(_) => ErrorCategory::Conflict,
            CoreError::Precondition(_) => ErrorCategory::Precondition,
            CoreError::InvalidTransition { .. } => ErrorCategory::Precondition,
            CoreError::CredentialVerification => ErrorCategory::Credential,
            CoreError::Cache(_) => ErrorCategory::Dependency,
            CoreError::Bus(_) => ErrorCategory::Dependency,
            CoreError::Serialization(_) => ErrorCategory::Serialization,
            CoreError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Check if the error is retryable against its backend
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Cache(_) | CoreError::Bus(_))
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Precondition,
    Credential,
    Dependency,
    Serialization,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::Conflict => write!(f, "conflict"),
            ErrorCategory::Precondition => write!(f, "precondition"),
            ErrorCategory::Credential => write!(f, "credential"),
            ErrorCategory::Dependency => write!(f, "dependency"),
            ErrorCategory::Serialization => write!(f, "serialization"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = CoreError::validation("Invalid input");
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_not_found_error() {
        let error = CoreError::not_found("Sanction", "123");
        assert_eq!(error.category(), ErrorCategory::NotFound);

        match error {
            CoreError::NotFound { entity_type, id } => {
                assert_eq!(entity_type, "Sanction");
                assert_eq!(id, "123");
            }
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(CoreError::cache("Connection refused").is_retryable());
        assert!(CoreError::bus("Stream unavailable").is_retryable());
        assert!(!CoreError::validation("Invalid email").is_retryable());
    }

    #[test]
    fn test_invalid_transition_display() {
        let error = CoreError::invalid_transition("COMPLETED", "PENDING");
        assert_eq!(
            error.to_string(),
            "Invalid transition from COMPLETED to PENDING"
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = CoreError::conflict("duplicate email");
        let json = serde_json::to_string(&error).unwrap();
        let deserialized: CoreError = serde_json::from_str(&json).unwrap();

        assert_eq!(error.to_string(), deserialized.to_string());
    }
}
