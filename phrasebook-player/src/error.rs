//! Error types for phrasebook-player
//!
//! Defines service-specific error types using thiserror. Every failure a
//! selection can hit is classified here; none of them is fatal to the
//! service.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the playback service
#[derive(Error, Debug)]
pub enum Error {
    /// The focus arbiter refused the request; nothing was played
    #[error("audio focus denied")]
    FocusDenied,

    /// The decode/output resource could not be created
    #[error("resource creation failed: {0}")]
    ResourceCreation(String),

    /// Clip id not present in the catalog
    #[error("clip not found: {0}")]
    ClipNotFound(Uuid),

    /// Audio decoding errors
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("audio output error: {0}")]
    AudioOutput(String),

    /// The session engine is no longer running
    #[error("session closed")]
    SessionClosed,

    /// File I/O errors
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from shared catalog/config code
    #[error(transparent)]
    Common(#[from] phrasebook_common::Error),

    /// Other errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the phrasebook-player Error
pub type Result<T> = std::result::Result<T, Error>;
