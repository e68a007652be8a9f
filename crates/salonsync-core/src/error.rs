//! Error types for salonsync-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using salonsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in salonsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable key-value storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote store error
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
