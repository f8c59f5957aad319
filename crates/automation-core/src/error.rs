//! Unified error types for Automation Core.

use automation_types::{ConfigError, TypedError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for all runtime operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Database operation failed (SQLite).
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or constraint definition.
    #[error(transparent)]
    Typed(#[from] TypedError),

    /// Storage worker or blocking task could not complete.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote endpoint answered with a 5xx; the caller may retry.
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Unclassified error with message.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Whether retrying the same operation later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerError { .. } | Self::Network(_) | Self::Storage(_))
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Typed(TypedError::Config(err))
    }
}

impl From<automation_types::ConstraintError> for AppError {
    fn from(err: automation_types::ConstraintError) -> Self {
        Self::Typed(TypedError::Constraint(err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Storage(format!("blocking task failed: {err}"))
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for runtime operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Unknown(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::ServerError { status: 503 }.is_retryable());
        assert!(!AppError::from(ConfigError::Missing { field: "url".into() }).is_retryable());
        assert!(!AppError::Unknown("x".into()).is_retryable());
    }

    #[test]
    fn test_serializes_as_message() {
        let json = serde_json::to_string(&AppError::ServerError { status: 500 }).unwrap();
        assert_eq!(json, "\"Server error: HTTP 500\"");
    }
}
