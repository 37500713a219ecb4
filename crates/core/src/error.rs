//! Error types for streamed presentation generation.

use crate::types::PresentationStatus;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating, storing or exporting presentations.
#[derive(Error, Debug)]
pub enum Error {
    /// The connection failed or the response body could not be read mid-stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A record payload was not a valid structured record.
    #[error("Record decode error: {0}")]
    Decode(String),

    /// Generation options failed validation.
    #[error("Invalid generation config: {0}")]
    InvalidConfig(String),

    /// The presentation already reached a terminal status.
    #[error("Presentation is {0} and accepts no further changes")]
    PresentationClosed(PresentationStatus),

    /// A status change that the generation lifecycle does not allow.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: PresentationStatus,
        to: PresentationStatus,
    },

    /// A collaborator endpoint answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The requested presentation does not exist.
    #[error("Presentation not found: {0}")]
    NotFound(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
