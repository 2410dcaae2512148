//! Core serialization primitives for the XISF container.
//!
//! This crate provides the bottom of the pipeline: the reference-shared
//! byte container, the compression adapter, the byte-shuffle transpose,
//! and the located-payload descriptor that ties them together.
//!
//! - [`ByteBuffer`] - reference-shared, mutable byte container
//! - [`Codec`] - uniform `{none, zlib, lz4, lz4hc, zstd}` adapter
//! - [`byte_shuffle`] - interleaved ↔ planar-by-byte transpose
//! - [`DataBlock`] - location-aware payload descriptor and pipeline

pub mod byte_buffer;
pub mod byte_shuffle;
pub mod codec;
pub mod datablock;
mod error;

pub use byte_buffer::ByteBuffer;
pub use codec::{Codec, SubBlock, LEVEL_DEFAULT};
pub use datablock::{
    format_compression, format_subblocks, parse_compression, parse_subblocks, DataBlock, Encoding,
    Location,
};
pub use error::{Error, Result};
