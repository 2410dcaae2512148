//! The in-memory image model: geometry, sample format, color model,
//! the property and FITS-keyword tables, optional CFA/ICC, and the
//! pixel DataBlock pipeline tying it to `xisf-core`.

mod compression_override;
mod error;
mod fits;
mod image;
mod property;

pub use compression_override::{compression_override, CompressionOverride};
pub use error::{Error, Result};
pub use fits::FITSKeyword;
pub use image::{
    attachment_origin, ColorFilterArray, ColorSpace, Image, ImageType, PixelStorage, SampleFormat,
};
pub use property::Property;
