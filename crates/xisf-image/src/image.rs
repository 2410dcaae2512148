//! Geometry, sample format, color model, and the property/FITS-keyword
//! tables that make up a single XISF `<Image>`.

use std::collections::HashMap;

use tracing::warn;
use xisf_core::datablock::{DataBlock, Location};
use xisf_core::codec::Codec;

use crate::error::{Error, Result};
use crate::fits::FITSKeyword;
use crate::property::Property;

/// Pixel sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex32,
    Complex64,
}

impl SampleFormat {
    /// Size in bytes of one sample of one channel.
    pub fn byte_size(self) -> usize {
        match self {
            SampleFormat::UInt8 => 1,
            SampleFormat::UInt16 => 2,
            SampleFormat::UInt32 | SampleFormat::Float32 => 4,
            SampleFormat::UInt64 | SampleFormat::Float64 | SampleFormat::Complex32 => 8,
            SampleFormat::Complex64 => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::UInt8 => "UInt8",
            SampleFormat::UInt16 => "UInt16",
            SampleFormat::UInt32 => "UInt32",
            SampleFormat::UInt64 => "UInt64",
            SampleFormat::Float32 => "Float32",
            SampleFormat::Float64 => "Float64",
            SampleFormat::Complex32 => "Complex32",
            SampleFormat::Complex64 => "Complex64",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "UInt8" => SampleFormat::UInt8,
            "UInt16" => SampleFormat::UInt16,
            "UInt32" => SampleFormat::UInt32,
            "UInt64" => SampleFormat::UInt64,
            "Float32" => SampleFormat::Float32,
            "Float64" => SampleFormat::Float64,
            "Complex32" => SampleFormat::Complex32,
            "Complex64" => SampleFormat::Complex64,
            _ => return None,
        })
    }

    /// Resolve from a wire token, falling back to `UInt16` (and
    /// logging) on an unrecognized name.
    pub fn from_name_or_default(s: &str) -> Self {
        Self::from_name(s).unwrap_or_else(|| {
            warn!(token = s, "unknown sampleFormat, defaulting to UInt16");
            SampleFormat::UInt16
        })
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float32 | SampleFormat::Float64)
    }
}

/// Color model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    CieLab,
}

impl ColorSpace {
    pub fn name(self) -> &'static str {
        match self {
            ColorSpace::Gray => "Gray",
            ColorSpace::Rgb => "RGB",
            ColorSpace::CieLab => "CIELab",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "Gray" => ColorSpace::Gray,
            "RGB" => ColorSpace::Rgb,
            "CIELab" => ColorSpace::CieLab,
            _ => return None,
        })
    }

    pub fn from_name_or_default(s: &str) -> Self {
        Self::from_name(s).unwrap_or_else(|| {
            warn!(token = s, "unknown colorSpace, defaulting to Gray");
            ColorSpace::Gray
        })
    }
}

/// Pixel channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelStorage {
    /// `[c0[0..n], c1[0..n], …]`.
    Planar,
    /// `[p0_c0, p0_c1, …, p1_c0, …]`.
    Normal,
}

impl PixelStorage {
    pub fn name(self) -> &'static str {
        match self {
            PixelStorage::Planar => "Planar",
            PixelStorage::Normal => "Normal",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "Planar" => PixelStorage::Planar,
            "Normal" => PixelStorage::Normal,
            _ => return None,
        })
    }

    /// Cross-version files sometimes omit `pixelStorage` entirely;
    /// both that silence and an unrecognized token fall back to
    /// `Planar`.
    pub fn from_name_or_default(s: &str) -> Self {
        Self::from_name(s).unwrap_or_else(|| {
            warn!(token = s, "unknown pixelStorage, defaulting to Planar");
            PixelStorage::Planar
        })
    }
}

/// Calibration/processing role of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Bias,
    Dark,
    Flat,
    Light,
    MasterBias,
    MasterDark,
    MasterFlat,
    DefectMap,
    RejectionMapHigh,
    RejectionMapLow,
    BinaryRejectionMapHigh,
    BinaryRejectionMapLow,
    SlopeMap,
    WeightMap,
}

impl ImageType {
    pub fn name(self) -> &'static str {
        match self {
            ImageType::Bias => "Bias",
            ImageType::Dark => "Dark",
            ImageType::Flat => "Flat",
            ImageType::Light => "Light",
            ImageType::MasterBias => "MasterBias",
            ImageType::MasterDark => "MasterDark",
            ImageType::MasterFlat => "MasterFlat",
            ImageType::DefectMap => "DefectMap",
            ImageType::RejectionMapHigh => "RejectionMapHigh",
            ImageType::RejectionMapLow => "RejectionMapLow",
            ImageType::BinaryRejectionMapHigh => "BinaryRejectionMapHigh",
            ImageType::BinaryRejectionMapLow => "BinaryRejectionMapLow",
            ImageType::SlopeMap => "SlopeMap",
            ImageType::WeightMap => "WeightMap",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "Bias" => ImageType::Bias,
            "Dark" => ImageType::Dark,
            "Flat" => ImageType::Flat,
            "Light" => ImageType::Light,
            "MasterBias" => ImageType::MasterBias,
            "MasterDark" => ImageType::MasterDark,
            "MasterFlat" => ImageType::MasterFlat,
            "DefectMap" => ImageType::DefectMap,
            "RejectionMapHigh" => ImageType::RejectionMapHigh,
            "RejectionMapLow" => ImageType::RejectionMapLow,
            "BinaryRejectionMapHigh" => ImageType::BinaryRejectionMapHigh,
            "BinaryRejectionMapLow" => ImageType::BinaryRejectionMapLow,
            "SlopeMap" => ImageType::SlopeMap,
            "WeightMap" => ImageType::WeightMap,
            _ => return None,
        })
    }

    pub fn from_name_or_default(s: &str) -> Self {
        Self::from_name(s).unwrap_or_else(|| {
            warn!(token = s, "unknown imageType, defaulting to Light");
            ImageType::Light
        })
    }
}

/// Bayer-like sensor mosaic pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFilterArray {
    pub width: u32,
    pub height: u32,
    pub pattern: String,
}

impl ColorFilterArray {
    const ALPHABET: &'static str = "0RGBWCMY";

    pub fn new(width: u32, height: u32, pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.chars().all(|c| Self::ALPHABET.contains(c)) {
            return Err(Error::Core(xisf_core::Error::MalformedHeader(format!(
                "CFA pattern contains characters outside {{{}}}: {pattern}",
                Self::ALPHABET
            ))));
        }
        Ok(Self { width, height, pattern })
    }
}

/// A single `<Image>` element: geometry, sample format, color model,
/// properties, FITS keywords, optional CFA/ICC, and the pixel payload.
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u32,
    sample_format: SampleFormat,
    pub color_space: ColorSpace,
    pub pixel_storage: PixelStorage,
    /// `(lo, hi)`; default `(0.0, 1.0)`.
    pub bounds: (f64, f64),
    pub image_type: ImageType,
    pub icc_profile: Option<Vec<u8>>,
    pub cfa: Option<ColorFilterArray>,
    properties: Vec<Property>,
    property_index: HashMap<String, usize>,
    pub fits_keywords: Vec<FITSKeyword>,
    pixels: Vec<u8>,
    /// Write-time preference; the process-wide `LIBXISF_COMPRESSION`
    /// override, when set, takes precedence over this.
    pub codec: Option<Codec>,
    pub compress_level: Option<i32>,
    pub byte_shuffling: bool,
}

impl Image {
    /// Build an all-zero image of the given geometry and format.
    pub fn new(width: u32, height: u32, channels: u32, sample_format: SampleFormat, color_space: ColorSpace) -> Result<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(Error::Core(xisf_core::Error::MalformedHeader(
                "image geometry must be strictly positive".into(),
            )));
        }
        let size = width as usize * height as usize * channels as usize * sample_format.byte_size();
        Ok(Self {
            width,
            height,
            channels,
            sample_format,
            color_space,
            pixel_storage: PixelStorage::Planar,
            bounds: (0.0, 1.0),
            image_type: ImageType::Light,
            icc_profile: None,
            cfa: None,
            properties: Vec::new(),
            property_index: HashMap::new(),
            fits_keywords: Vec::new(),
            pixels: vec![0u8; size],
            codec: None,
            compress_level: None,
            byte_shuffling: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize * self.sample_format.byte_size()
    }

    /// `data.size() == width * height * channels * sizeOf(sampleFormat)`.
    pub fn validate(&self) -> Result<()> {
        let expected = self.expected_size();
        if self.pixels.len() != expected {
            return Err(Error::Core(xisf_core::Error::OutOfBounds {
                what: "pixel buffer size",
                index: self.pixels.len(),
                max: expected,
            }));
        }
        Ok(())
    }

    /// Rescale the pixel buffer to the new geometry, zero-filled.
    pub fn set_geometry(&mut self, width: u32, height: u32, channels: u32) -> Result<()> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(Error::Core(xisf_core::Error::MalformedHeader(
                "image geometry must be strictly positive".into(),
            )));
        }
        self.width = width;
        self.height = height;
        self.channels = channels;
        self.pixels = vec![0u8; self.expected_size()];
        Ok(())
    }

    /// Rescale the pixel buffer to the new sample format, zero-filled.
    pub fn set_sample_format(&mut self, format: SampleFormat) {
        self.sample_format = format;
        self.pixels = vec![0u8; self.expected_size()];
    }

    /// Deep transpose between `Planar` `[c0[0..n], c1[0..n], …]` and
    /// `Normal` `[p0_c0, p0_c1, …]` layout. Single-channel images
    /// short-circuit: only the storage tag changes.
    pub fn convert_pixel_storage_to(&mut self, target: PixelStorage) {
        if self.pixel_storage == target {
            return;
        }
        if self.channels <= 1 {
            self.pixel_storage = target;
            return;
        }

        let elem = self.sample_format.byte_size();
        let n = self.width as usize * self.height as usize;
        let c = self.channels as usize;
        let mut out = vec![0u8; self.pixels.len()];

        match target {
            // Planar -> Normal: out[p*c+ch] = in[ch*n+p]
            PixelStorage::Normal => {
                for ch in 0..c {
                    for p in 0..n {
                        let src = (ch * n + p) * elem;
                        let dst = (p * c + ch) * elem;
                        out[dst..dst + elem].copy_from_slice(&self.pixels[src..src + elem]);
                    }
                }
            }
            // Normal -> Planar: out[ch*n+p] = in[p*c+ch]
            PixelStorage::Planar => {
                for p in 0..n {
                    for ch in 0..c {
                        let src = (p * c + ch) * elem;
                        let dst = (ch * n + p) * elem;
                        out[dst..dst + elem].copy_from_slice(&self.pixels[src..src + elem]);
                    }
                }
            }
        }

        self.pixels = out;
        self.pixel_storage = target;
    }

    /// Read-only access in insertion order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn get_property(&self, id: &str) -> Option<&Property> {
        self.property_index.get(id).map(|&i| &self.properties[i])
    }

    /// Fails if `property.id` already exists.
    pub fn add_property(&mut self, property: Property) -> Result<()> {
        if self.property_index.contains_key(&property.id) {
            return Err(Error::DuplicateProperty(property.id));
        }
        self.property_index.insert(property.id.clone(), self.properties.len());
        self.properties.push(property);
        Ok(())
    }

    /// Insert, or replace in place if `property.id` already exists.
    pub fn update_property(&mut self, property: Property) {
        match self.property_index.get(&property.id) {
            Some(&index) => self.properties[index] = property,
            None => {
                self.property_index.insert(property.id.clone(), self.properties.len());
                self.properties.push(property);
            }
        }
    }

    /// Append a FITS keyword to the (non-deduplicated) keyword list.
    pub fn add_fits_keyword(&mut self, keyword: FITSKeyword) {
        self.fits_keywords.push(keyword);
    }

    /// If `keyword.name` maps to a known property id, parse its value
    /// per the mapped type and upsert the resulting property.
    pub fn adopt_fits_keyword_as_property(&mut self, keyword: &FITSKeyword) -> Result<()> {
        if let Some(property) = keyword.as_property()? {
            self.update_property(property);
        }
        Ok(())
    }

    /// Build a DataBlock ready for serialization from the resident
    /// pixel buffer, honoring the process-wide compression override
    /// when set, else this image's own codec preference.
    pub fn encode_pixel_data(&self) -> Result<DataBlock> {
        let (codec, level, shuffle) = match crate::compression_override::compression_override() {
            Some(over) => (over.codec, Some(over.level), self.sample_format.byte_size()),
            None => (
                self.codec.unwrap_or(Codec::None),
                self.compress_level,
                if self.byte_shuffling { self.sample_format.byte_size() } else { 0 },
            ),
        };
        Ok(DataBlock::encode(&self.pixels, codec, level, shuffle)?)
    }

    /// Replace the resident pixel buffer with the decoded contents of
    /// `block` (already fetched from its persisted location).
    pub fn set_pixel_data(&mut self, block: &DataBlock) -> Result<()> {
        let decoded = block.decode()?;
        if decoded.len() != self.expected_size() {
            return Err(Error::Core(xisf_core::Error::OutOfBounds {
                what: "decoded pixel buffer size",
                index: decoded.len(),
                max: self.expected_size(),
            }));
        }
        self.pixels = decoded;
        Ok(())
    }
}

/// Reference to where a just-decoded DataBlock used to live, retained
/// only for diagnostics; the Reader clears it once resident.
pub fn attachment_origin(block: &DataBlock) -> Option<(u64, u64)> {
    match block.location {
        Location::Attachment { pos, size } => Some((pos, size)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_image_has_zeroed_buffer_of_expected_size() {
        let img = Image::new(5, 7, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
        assert_eq!(img.pixels().len(), 5 * 7 * 1 * 2);
        img.validate().unwrap();
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(Image::new(0, 7, 1, SampleFormat::UInt16, ColorSpace::Gray).is_err());
    }

    #[test]
    fn set_sample_format_rescales_buffer() {
        let mut img = Image::new(2, 2, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        img.set_sample_format(SampleFormat::Float64);
        assert_eq!(img.pixels().len(), 2 * 2 * 1 * 8);
    }

    #[test]
    fn duplicate_property_id_is_rejected() {
        let mut img = Image::new(1, 1, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        img.add_property(Property::new("A", xisf_value::Value::Boolean(true))).unwrap();
        let err = img.add_property(Property::new("A", xisf_value::Value::Boolean(false)));
        assert!(err.is_err());
    }

    #[test]
    fn update_property_upserts_and_preserves_single_entry() {
        let mut img = Image::new(1, 1, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        img.update_property(Property::new("A", xisf_value::Value::Int32(1)));
        img.update_property(Property::new("A", xisf_value::Value::Int32(2)));
        assert_eq!(img.properties().len(), 1);
        assert_eq!(img.get_property("A").unwrap().value, xisf_value::Value::Int32(2));
    }

    #[test]
    fn property_insertion_order_is_preserved() {
        let mut img = Image::new(1, 1, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        img.add_property(Property::new("Z", xisf_value::Value::Boolean(true))).unwrap();
        img.add_property(Property::new("A", xisf_value::Value::Boolean(true))).unwrap();
        let ids: Vec<_> = img.properties().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["Z", "A"]);
    }

    #[test]
    fn planar_normal_round_trip_is_identity() {
        let mut img = Image::new(3, 2, 3, SampleFormat::UInt8, ColorSpace::Rgb).unwrap();
        for (i, b) in img.pixels_mut().iter_mut().enumerate() {
            *b = i as u8;
        }
        let original = img.pixels().to_vec();
        img.convert_pixel_storage_to(PixelStorage::Normal);
        assert_ne!(img.pixels(), original.as_slice());
        img.convert_pixel_storage_to(PixelStorage::Planar);
        assert_eq!(img.pixels(), original.as_slice());
    }

    #[test]
    fn single_channel_storage_conversion_short_circuits() {
        let mut img = Image::new(2, 2, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        let before = img.pixels().to_vec();
        img.convert_pixel_storage_to(PixelStorage::Normal);
        assert_eq!(img.pixels(), before.as_slice());
        assert_eq!(img.pixel_storage, PixelStorage::Normal);
    }

    #[test]
    fn unknown_enum_tokens_fall_back_to_defaults() {
        assert_eq!(ImageType::from_name_or_default("Nonsense"), ImageType::Light);
        assert_eq!(SampleFormat::from_name_or_default("Nonsense"), SampleFormat::UInt16);
        assert_eq!(PixelStorage::from_name_or_default("Nonsense"), PixelStorage::Planar);
        assert_eq!(ColorSpace::from_name_or_default("Nonsense"), ColorSpace::Gray);
    }

    #[test]
    fn cfa_rejects_out_of_alphabet_pattern() {
        assert!(ColorFilterArray::new(2, 2, "RGBX").is_err());
        assert!(ColorFilterArray::new(2, 2, "RGBG").is_ok());
    }

    #[test]
    fn pixel_data_encode_decode_round_trip() {
        let mut img = Image::new(4, 4, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
        for (i, b) in img.pixels_mut().iter_mut().enumerate() {
            *b = i as u8;
        }
        img.codec = Some(Codec::Zlib);
        img.byte_shuffling = true;
        let block = img.encode_pixel_data().unwrap();
        let mut restored = Image::new(4, 4, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
        restored.set_pixel_data(&block).unwrap();
        assert_eq!(restored.pixels(), img.pixels());
    }
}
