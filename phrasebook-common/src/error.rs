//! Common error types for phrasebook

use thiserror::Error;

/// Common result type for phrasebook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the phrasebook crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog manifest parsing or validation error
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
