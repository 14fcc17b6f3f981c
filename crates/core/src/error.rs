// Central Error Type for the Queue Engine

use thiserror::Error;

/// Boxed underlying cause of a storage failure
pub type StorageSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Rejected before any store interaction (bad queue name, timeouts, quantities)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// Any failure of the backing store, with the original cause attached
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<StorageSource>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Storage failure wrapping an underlying error
    pub fn storage<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AppError::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Storage failure detected by the engine itself (no underlying error)
    pub fn storage_invariant(message: impl Into<String>) -> Self {
        AppError::Storage {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<crate::domain::DomainError> for AppError {
    fn from(err: crate::domain::DomainError) -> Self {
        use crate::domain::DomainError;

        match err {
            DomainError::InvalidQueueName(msg) => AppError::InvalidArgument(msg),
            DomainError::InvalidDuration(msg) => AppError::InvalidArgument(msg),
            DomainError::InvalidPayload(msg) => AppError::InvalidPayload(msg),
        }
    }
}

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by wrapping it as AppError::Storage with the sqlx error as source

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use std::error::Error as _;

    #[test]
    fn test_domain_errors_map_to_argument_errors() {
        let err: AppError = DomainError::InvalidQueueName("empty".into()).into();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let err: AppError = DomainError::InvalidPayload("not json".into()).into();
        assert!(matches!(err, AppError::InvalidPayload(_)));
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection lost");
        let err = AppError::storage("insert failed", io);

        assert!(matches!(err, AppError::Storage { .. }));
        assert_eq!(err.to_string(), "Storage error: insert failed");
        assert_eq!(err.source().unwrap().to_string(), "connection lost");
    }
}
