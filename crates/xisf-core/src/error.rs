//! Error types for xisf-core.

use thiserror::Error;

/// Core serialization-engine errors.
#[derive(Debug, Error)]
#[must_use]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed container: {0}")]
    MalformedHeader(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("invalid attachment reference: {0}")]
    InvalidReference(String),

    #[error("codec failure: {0}")]
    CodecFailure(String),

    #[error("{what} out of bounds: {index} (max {max})")]
    OutOfBounds {
        what: &'static str,
        index: usize,
        max: usize,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
