// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid queue name: {0}")]
    InvalidQueueName(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
