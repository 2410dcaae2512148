//! XISF container header: DOM-level attribute/field mapping, the
//! `Reader` state machine, and the two-phase `Writer`.
//!
//! - [`xml_mapper`] - pure element/attribute text ↔ typed field helpers
//! - [`Reader`] - `Closed → SignatureRead → HeaderRead → Ready`, lazy
//!   per-image attachment fetch
//! - [`Writer`] - XML synthesis, sentinel offset back-patch, chunked
//!   attachment append

mod error;
mod reader;
pub mod xml_mapper;
mod writer;

pub use error::{Error, Result};
pub use reader::Reader;
pub use writer::{PixelPlacement, Writer};
