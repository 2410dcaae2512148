//! Error types for xisf-image.

use thiserror::Error;

/// Image-model errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate property id: {0}")]
    DuplicateProperty(String),

    #[error(transparent)]
    Core(#[from] xisf_core::Error),

    #[error(transparent)]
    Value(#[from] xisf_value::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
