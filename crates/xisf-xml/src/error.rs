//! Error types for xisf-xml.

use thiserror::Error;

/// Header XML and container-framing errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed container: {0}")]
    MalformedHeader(String),

    #[error(transparent)]
    Core(#[from] xisf_core::Error),

    #[error(transparent)]
    Value(#[from] xisf_value::Error),

    #[error(transparent)]
    Image(#[from] xisf_image::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
