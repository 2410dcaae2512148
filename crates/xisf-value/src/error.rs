//! Error types for xisf-value.

use thiserror::Error;

/// Property-value errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("{what} out of bounds: {index} (max {max})")]
    OutOfBounds {
        what: &'static str,
        index: usize,
        max: usize,
    },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
