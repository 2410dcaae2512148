//! Container reader: `Closed → SignatureRead → HeaderRead → Ready`,
//! with lazy, per-image attachment fetch.

use std::io::{Read, Seek, SeekFrom};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

use xisf_core::datablock::{parse_compression, parse_subblocks, DataBlock, Encoding, Location};
use xisf_core::{ByteBuffer, Codec, SubBlock};
use xisf_image::{
    ColorFilterArray, ColorSpace, FITSKeyword, Image, ImageType, PixelStorage, Property, SampleFormat,
};
use xisf_value::Value;

use crate::error::{Error, Result};
use crate::xml_mapper::{attr, attr_or, local_name, parse_bounds, parse_geometry};

const SIGNATURE: &[u8; 8] = b"XISF0100";
const CHUNK: usize = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Ready,
}

/// A `<Data>`-bearing field: either already decoded (embedded/inline)
/// or still pointing past the header (attachment), waiting for
/// [`Reader::get_image`] to fetch it.
#[derive(Debug, Clone)]
struct PendingPayload {
    codec: Codec,
    uncompressed_size: u64,
    byte_shuffling: usize,
    subblocks: Option<Vec<SubBlock>>,
    location: Location,
    resident: Option<Vec<u8>>,
}

impl PendingPayload {
    fn from_descriptor((location, codec, uncompressed_size, byte_shuffling, subblocks): (Location, Codec, u64, usize, Option<Vec<SubBlock>>)) -> Self {
        Self { codec, uncompressed_size, byte_shuffling, subblocks, location, resident: None }
    }

    fn is_resolved(&self) -> bool {
        self.resident.is_some()
    }

    fn to_block(&self) -> Option<DataBlock> {
        self.resident.as_ref().map(|bytes| {
            DataBlock::from_resident(
                self.location.clone(),
                self.codec,
                self.uncompressed_size,
                self.byte_shuffling,
                self.subblocks.clone(),
                ByteBuffer::from_slice(bytes),
            )
        })
    }

    /// Resolve an `Inline` payload from the owning element's
    /// accumulated text. No-op for any other location.
    fn resolve_inline(&mut self, text: &str) {
        if let Location::Inline(enc) = self.location {
            self.resident = Some(match enc {
                Encoding::Base64 => ByteBuffer::base64_decode(text).into_vec(),
                Encoding::Base16 => ByteBuffer::base16_decode(text).into_vec(),
            });
        }
    }

    /// Resolve an `Attachment` payload eagerly (used for ICC/Thumbnail
    /// payloads, which are read immediately rather than lazily like
    /// image pixel data).
    fn resolve_attachment<R: Read + Seek>(&mut self, source: &mut R) -> Result<()> {
        if let Location::Attachment { pos, size } = self.location {
            self.resident = Some(read_attachment(source, pos, size)?);
        }
        Ok(())
    }
}

/// Reads `location`/`compression`/`subblocks` from an owning element
/// (`Image`, `Property`, `ICCProfile`, `Thumbnail`). Absence of
/// `location` means the value is carried entirely as attribute text
/// (plain scalars) and no payload applies.
fn parse_payload_descriptor(e: &BytesStart) -> Result<Option<PendingPayload>> {
    let Some(loc_text) = attr(e, "location") else {
        return Ok(None);
    };
    let location = Location::parse(&loc_text)?;
    let (codec, uncompressed_size, item_size) = match attr(e, "compression") {
        Some(c) => parse_compression(&c)?,
        None => (Codec::None, 0, 0),
    };
    let subblocks = match attr(e, "subblocks") {
        Some(s) => Some(parse_subblocks(&s)?),
        None => None,
    };
    Ok(Some(PendingPayload::from_descriptor((location, codec, uncompressed_size, item_size, subblocks))))
}

struct ImageFrame {
    width: u32,
    height: u32,
    channels: u32,
    sample_format: SampleFormat,
    color_space: ColorSpace,
    pixel_storage: Option<PixelStorage>,
    image_type: ImageType,
    bounds: Option<(f64, f64)>,
    pixels: Option<PendingPayload>,
    pixel_text: String,
    properties: Vec<Property>,
    fits_keywords: Vec<FITSKeyword>,
    cfa: Option<ColorFilterArray>,
    icc_profile: Option<PendingPayload>,
    /// `true` for the `<Thumbnail>` element, which is structurally an
    /// `Image` but is exposed via `Reader::thumbnail()` instead of the
    /// image list.
    is_thumbnail: bool,
}

enum PropertyOwner {
    File,
    Metadata,
    Image,
}

struct PropertyFrame {
    owner: PropertyOwner,
    id: String,
    type_name: String,
    comment: String,
    value_attr: Option<String>,
    text: String,
    vector_len: Option<usize>,
    matrix_dims: Option<(usize, usize)>,
    payload: Option<PendingPayload>,
}

enum DataOwner {
    ImagePixels,
    Property,
    Icc,
}

struct DataFrame {
    owner: DataOwner,
    encoding: Option<Encoding>,
    text: String,
}

enum Frame {
    Root,
    Image(Box<ImageFrame>),
    Property(Box<PropertyFrame>),
    Fits { name: String, value: String, comment: String },
    Metadata,
    Icc { payload: PendingPayload, text: String },
    Data(Box<DataFrame>),
}

/// Orchestrates open → signature → header XML → lazy attachment fetch.
pub struct Reader<R> {
    source: R,
    state: State,
    images: Vec<Image>,
    pending_pixels: Vec<Option<PendingPayload>>,
    file_properties: Vec<Property>,
    metadata: Vec<Property>,
    thumbnail: Option<Image>,
}

impl<R: Read + Seek> Reader<R> {
    pub fn open(mut source: R) -> Result<Self> {
        let mut sig = [0u8; 16];
        source.read_exact(&mut sig).map_err(xisf_core::Error::from)?;
        if &sig[0..8] != SIGNATURE {
            return Err(Error::MalformedHeader(format!(
                "bad signature: {:?}",
                String::from_utf8_lossy(&sig[0..8])
            )));
        }
        let header_size = u32::from_le_bytes([sig[8], sig[9], sig[10], sig[11]]) as usize;

        let mut header = vec![0u8; header_size];
        source.read_exact(&mut header).map_err(xisf_core::Error::from)?;

        let mut reader = Reader {
            source,
            state: State::Ready,
            images: Vec::new(),
            pending_pixels: Vec::new(),
            file_properties: Vec::new(),
            metadata: Vec::new(),
            thumbnail: None,
        };
        reader.parse_header(&header)?;
        Ok(reader)
    }

    pub fn close(&mut self) {
        self.images.clear();
        self.pending_pixels.clear();
        self.file_properties.clear();
        self.metadata.clear();
        self.thumbnail = None;
        self.state = State::Closed;
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn file_properties(&self) -> &[Property] {
        &self.file_properties
    }

    /// Properties nested under `<Metadata>`, kept separate from
    /// [`Reader::file_properties`] (the `<xisf>` element's own direct
    /// `<Property>` children).
    pub fn metadata(&self) -> &[Property] {
        &self.metadata
    }

    pub fn thumbnail(&self) -> Option<&Image> {
        self.thumbnail.as_ref()
    }

    /// Returns the image at `index`, resolving its pixel attachment
    /// first when `read_pixels` is set and it is not already resident.
    pub fn get_image(&mut self, index: usize, read_pixels: bool) -> Result<&Image> {
        if self.state == State::Closed {
            return Err(Error::MalformedHeader("reader is closed".into()));
        }
        if index >= self.images.len() {
            return Err(Error::Core(xisf_core::Error::OutOfBounds {
                what: "image index",
                index,
                max: self.images.len(),
            }));
        }
        if read_pixels {
            self.ensure_pixels(index)?;
        }
        Ok(&self.images[index])
    }

    fn ensure_pixels(&mut self, index: usize) -> Result<()> {
        let Some(pending) = self.pending_pixels[index].as_mut() else {
            return Ok(());
        };
        if !pending.is_resolved() {
            pending.resolve_attachment(&mut self.source)?;
        }
        let block = pending.to_block().expect("resolved above");
        self.images[index].set_pixel_data(&block)?;
        self.pending_pixels[index] = None;
        Ok(())
    }

    fn parse_header(&mut self, header: &[u8]) -> Result<()> {
        let text = std::str::from_utf8(header)
            .map_err(|e| Error::MalformedHeader(format!("header is not valid UTF-8: {e}")))?;
        let mut xml = XmlReader::from_str(text);
        xml.config_mut().trim_text(false);

        let mut stack: Vec<Frame> = vec![Frame::Root];

        loop {
            match xml.read_event()? {
                Event::Eof => break,
                Event::Start(e) => self.start_element(&mut stack, &e)?,
                Event::Empty(e) => {
                    self.start_element(&mut stack, &e)?;
                    self.end_element(&mut stack)?;
                }
                Event::End(_) => self.end_element(&mut stack)?,
                Event::Text(t) => {
                    let text = t.unescape()?.into_owned();
                    match stack.last_mut() {
                        Some(Frame::Property(p)) => p.text.push_str(&text),
                        Some(Frame::Data(d)) => d.text.push_str(&text),
                        Some(Frame::Image(img)) => img.pixel_text.push_str(&text),
                        Some(Frame::Icc { text: t, .. }) => t.push_str(&text),
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn start_element(&mut self, stack: &mut Vec<Frame>, e: &BytesStart) -> Result<()> {
        let name = local_name(&String::from_utf8_lossy(e.name().as_ref())).to_string();
        match name.as_str() {
            "xisf" => {
                let version = attr_or(e, "version", "");
                if version != "1.0" {
                    return Err(Error::MalformedHeader(format!("unsupported xisf version: {version}")));
                }
            }
            "Image" | "Thumbnail" => {
                let (width, height, channels) = parse_geometry(&attr_or(e, "geometry", "0:0:0"))?;
                let sample_format = SampleFormat::from_name_or_default(&attr_or(e, "sampleFormat", "UInt16"));
                let color_space = ColorSpace::from_name_or_default(&attr_or(e, "colorSpace", "Gray"));
                let pixel_storage = attr(e, "pixelStorage").map(|s| PixelStorage::from_name_or_default(&s));
                let image_type = ImageType::from_name_or_default(&attr_or(e, "imageType", "Light"));
                let bounds = match attr(e, "bounds") {
                    Some(s) => Some(parse_bounds(&s)?),
                    None => None,
                };
                let pixels = parse_payload_descriptor(e)?;
                stack.push(Frame::Image(Box::new(ImageFrame {
                    width,
                    height,
                    channels,
                    sample_format,
                    color_space,
                    pixel_storage,
                    image_type,
                    bounds,
                    pixels,
                    pixel_text: String::new(),
                    properties: Vec::new(),
                    fits_keywords: Vec::new(),
                    cfa: None,
                    icc_profile: None,
                    is_thumbnail: name == "Thumbnail",
                })));
            }
            "Property" => {
                let owner = match stack.last() {
                    Some(Frame::Image(_)) => PropertyOwner::Image,
                    Some(Frame::Metadata) => PropertyOwner::Metadata,
                    _ => PropertyOwner::File,
                };
                let type_name = attr_or(e, "type", "String");
                let payload = if is_vector_or_matrix(&type_name) { parse_payload_descriptor(e)? } else { None };
                stack.push(Frame::Property(Box::new(PropertyFrame {
                    owner,
                    id: attr_or(e, "id", ""),
                    type_name,
                    comment: attr_or(e, "comment", ""),
                    value_attr: attr(e, "value"),
                    text: String::new(),
                    vector_len: attr(e, "length").and_then(|s| s.parse().ok()),
                    matrix_dims: match (attr(e, "rows"), attr(e, "columns")) {
                        (Some(r), Some(c)) => Some((
                            r.parse().map_err(|_| Error::MalformedHeader(format!("bad rows: {r}")))?,
                            c.parse().map_err(|_| Error::MalformedHeader(format!("bad columns: {c}")))?,
                        )),
                        _ => None,
                    },
                    payload,
                })));
            }
            "FITSKeyword" => {
                stack.push(Frame::Fits {
                    name: attr_or(e, "name", ""),
                    value: attr_or(e, "value", ""),
                    comment: attr_or(e, "comment", ""),
                });
            }
            "ColorFilterArray" => {
                let width: u32 = attr_or(e, "width", "0").parse().unwrap_or(0);
                let height: u32 = attr_or(e, "height", "0").parse().unwrap_or(0);
                let pattern = attr_or(e, "pattern", "");
                if let Some(Frame::Image(img)) = stack.last_mut() {
                    img.cfa = Some(ColorFilterArray::new(width, height, pattern)?);
                }
            }
            "ICCProfile" => {
                let payload = parse_payload_descriptor(e)?.unwrap_or_else(|| PendingPayload::from_descriptor((
                    Location::Embedded,
                    Codec::None,
                    0,
                    0,
                    None,
                )));
                stack.push(Frame::Icc { payload, text: String::new() });
            }
            "Metadata" => stack.push(Frame::Metadata),
            "Data" => {
                let owner = match stack.last() {
                    Some(Frame::Image(_)) => DataOwner::ImagePixels,
                    Some(Frame::Property(_)) => DataOwner::Property,
                    _ => DataOwner::Icc,
                };
                let encoding = attr(e, "encoding").and_then(|s| match s.as_str() {
                    "base64" => Some(Encoding::Base64),
                    "base16" => Some(Encoding::Base16),
                    _ => None,
                });
                stack.push(Frame::Data(Box::new(DataFrame { owner, encoding, text: String::new() })));
            }
            _ => {}
        }
        Ok(())
    }

    fn end_element(&mut self, stack: &mut Vec<Frame>) -> Result<()> {
        let Some(frame) = stack.pop() else { return Ok(()) };
        match frame {
            Frame::Data(d) => {
                let bytes = match d.encoding {
                    Some(Encoding::Base64) => ByteBuffer::base64_decode(&d.text).into_vec(),
                    Some(Encoding::Base16) => ByteBuffer::base16_decode(&d.text).into_vec(),
                    None => Vec::new(),
                };
                match (d.owner, stack.last_mut()) {
                    (DataOwner::ImagePixels, Some(Frame::Image(img))) => {
                        if let Some(p) = img.pixels.as_mut() {
                            p.resident = Some(bytes);
                        }
                    }
                    (DataOwner::Property, Some(Frame::Property(p))) => {
                        if let Some(payload) = p.payload.as_mut() {
                            payload.resident = Some(bytes);
                        }
                    }
                    (DataOwner::Icc, Some(Frame::Icc { payload, .. })) => payload.resident = Some(bytes),
                    _ => {}
                }
            }
            Frame::Fits { name, value, comment } => {
                let keyword = FITSKeyword { name, value, comment };
                if let Some(Frame::Image(img)) = stack.last_mut() {
                    img.fits_keywords.push(keyword);
                }
            }
            Frame::Property(mut p) => {
                if let Some(payload) = p.payload.as_mut() {
                    if !payload.is_resolved() {
                        payload.resolve_inline(&p.text);
                    }
                }
                let value = self.build_property_value(&p)?;
                let property = Property::new(p.id.clone(), value).with_comment(p.comment.clone());
                match (p.owner, stack.last_mut()) {
                    (PropertyOwner::Image, Some(Frame::Image(img))) => img.properties.push(property),
                    (PropertyOwner::Metadata, _) => self.metadata.push(property),
                    _ => self.file_properties.push(property),
                }
            }
            Frame::Metadata => {}
            Frame::Icc { mut payload, text } => {
                if !payload.is_resolved() {
                    payload.resolve_inline(&text);
                }
                if !payload.is_resolved() {
                    payload.resolve_attachment(&mut self.source)?;
                }
                if let Some(Frame::Image(img)) = stack.last_mut() {
                    img.icc_profile = Some(payload);
                }
            }
            Frame::Image(img) => self.finish_image(*img)?,
            Frame::Root => {}
        }
        Ok(())
    }

    fn build_property_value(&self, p: &PropertyFrame) -> Result<Value> {
        if is_vector_or_matrix(&p.type_name) {
            let bytes = p.payload.as_ref().and_then(|payload| payload.resident.clone()).unwrap_or_default();
            return Ok(if p.type_name.ends_with("Matrix") {
                let (rows, columns) = p
                    .matrix_dims
                    .ok_or_else(|| Error::MalformedHeader(format!("{} missing rows/columns", p.type_name)))?;
                Value::matrix_from_le_bytes(&p.type_name, rows, columns, &bytes)?
            } else {
                let value = Value::vector_from_le_bytes(&p.type_name, &bytes)?;
                if let Some(expected) = p.vector_len {
                    if value.vector_len() != Some(expected) {
                        return Err(Error::MalformedHeader(format!(
                            "{} declared length {expected} but payload has {:?} elements",
                            p.type_name,
                            value.vector_len()
                        )));
                    }
                }
                value
            });
        }
        let text = match &p.value_attr {
            Some(v) => v.clone(),
            None => p.text.clone(),
        };
        Ok(Value::parse_scalar(&p.type_name, &text)?)
    }

    fn finish_image(&mut self, frame: ImageFrame) -> Result<()> {
        let mut image = Image::new(frame.width, frame.height, frame.channels, frame.sample_format, frame.color_space)?;
        image.pixel_storage = frame.pixel_storage.unwrap_or(PixelStorage::Planar);
        image.image_type = frame.image_type;
        if let Some(bounds) = frame.bounds {
            image.bounds = bounds;
        }
        image.cfa = frame.cfa;
        for property in frame.properties {
            image.add_property(property)?;
        }
        for keyword in frame.fits_keywords {
            image.add_fits_keyword(keyword);
        }
        if let Some(mut icc) = frame.icc_profile {
            if !icc.is_resolved() {
                icc.resolve_attachment(&mut self.source)?;
            }
            image.icc_profile = icc.resident;
        }

        let mut pending = frame.pixels;
        if let Some(p) = pending.as_mut() {
            if !p.is_resolved() {
                p.resolve_inline(&frame.pixel_text);
            }
        }

        if frame.is_thumbnail {
            if let Some(p) = pending.as_mut() {
                if !p.is_resolved() {
                    p.resolve_attachment(&mut self.source)?;
                }
                if let Some(block) = p.to_block() {
                    image.set_pixel_data(&block)?;
                }
            }
            self.thumbnail = Some(image);
            return Ok(());
        }

        let index = self.images.len();
        self.images.push(image);
        match pending {
            Some(p) if p.is_resolved() => {
                let block = p.to_block().expect("resolved");
                self.images[index].set_pixel_data(&block)?;
                self.pending_pixels.push(None);
            }
            Some(p) => self.pending_pixels.push(Some(p)),
            None => self.pending_pixels.push(None),
        }
        Ok(())
    }
}

fn is_vector_or_matrix(type_name: &str) -> bool {
    type_name.ends_with("Vector") || type_name.ends_with("Matrix")
}

fn read_attachment<R: Read + Seek>(source: &mut R, pos: u64, size: u64) -> Result<Vec<u8>> {
    source.seek(SeekFrom::Start(pos)).map_err(xisf_core::Error::from)?;
    let mut data = Vec::with_capacity(size as usize);
    let mut remaining = size as usize;
    let mut buf = vec![0u8; CHUNK];
    while remaining > 0 {
        let want = remaining.min(CHUNK);
        buf.resize(want, 0);
        source.read_exact(&mut buf).map_err(xisf_core::Error::from)?;
        data.extend_from_slice(&buf);
        remaining -= want;
    }
    Ok(data)
}
