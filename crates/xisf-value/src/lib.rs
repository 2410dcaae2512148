//! The typed property value system for XISF.
//!
//! `Value` is the tagged union backing every `<Property>`/`<FITSKeyword>`
//! conversion and every scalar DataBlock element type. This crate is
//! self-contained: it knows how to parse and format the wire text forms
//! and how to pack/unpack vector and matrix payloads to raw
//! little-endian bytes, but holds no opinion on where those bytes are
//! stored (embedded, inline, attachment — see `xisf-core::DataBlock`)
//! or how a property list orders and deduplicates its entries (see
//! `xisf-image::Image`).

mod error;
mod value;

pub use error::{Error, Result};
pub use value::{ElementType, Value};
