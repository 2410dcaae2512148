//! Container writer: XML synthesis → sentinel offset back-patch →
//! attachment append.

use std::io::Write;

use chrono::Utc;
use xisf_core::datablock::{format_compression, format_subblocks, DataBlock, Encoding, Location};
use xisf_core::ByteBuffer;
use xisf_image::{FITSKeyword, Image, Property};
use xisf_value::Value;

use crate::error::{Error, Result};
use crate::xml_mapper::{escape_xml, format_bounds, format_geometry};

/// Where an image's pixel `DataBlock` is persisted. Properties always
/// use `Inline(Base64)`; only pixel data is large enough to warrant
/// the choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelPlacement {
    Attachment,
    /// `location="inline:…"`, payload carried as the owning element's
    /// own inner text.
    Inline(Encoding),
    /// `location="embedded"`, payload carried by a `<Data encoding="…">`
    /// child element.
    Embedded(Encoding),
}

/// The fixed-width sentinel offset patched in after the header length
/// is known. Ten digits, chosen so no plausible real offset is longer.
const SENTINEL_POS: u64 = 2_147_483_648;
const SENTINEL_WIDTH: usize = 10;
const CHUNK: usize = 1 << 30;

pub struct Writer;

impl Writer {
    /// Serialize `images`, `file_properties`, and an optional
    /// file-level `thumbnail` to `sink`.
    pub fn write<W: Write>(
        sink: &mut W,
        images: &[Image],
        file_properties: &[Property],
        thumbnail: Option<&Image>,
        placement: PixelPlacement,
    ) -> Result<()> {
        let mut attachments: Vec<Vec<u8>> = Vec::new();
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(
            "<xisf version=\"1.0\" xmlns=\"http://www.pixinsight.com/xisf\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://www.pixinsight.com/xisf \
             http://pixinsight.com/xisf/xisf-1.0.xsd\">\n",
        );

        xml.push_str("  <Metadata>\n");
        write_property(
            &mut xml,
            2,
            &Property::new("XISF:CreationTime", Value::TimePoint(Utc::now())),
        );
        write_property(
            &mut xml,
            2,
            &Property::new("XISF:CreatorApplication", Value::String("xisf-rs".to_string())),
        );
        xml.push_str("  </Metadata>\n");

        for property in file_properties {
            write_property(&mut xml, 1, property);
        }

        for image in images {
            write_image_element(&mut xml, "Image", image, placement, &mut attachments)?;
        }
        if let Some(thumb) = thumbnail {
            write_image_element(&mut xml, "Thumbnail", thumb, placement, &mut attachments)?;
        }

        xml.push_str("</xisf>\n");

        let header_bytes = xml.into_bytes();
        let mut file_bytes = Vec::with_capacity(16 + header_bytes.len());
        file_bytes.extend_from_slice(b"XISF0100");
        file_bytes.extend_from_slice(&[0u8; 8]);
        file_bytes.extend_from_slice(&header_bytes);

        let size = file_bytes.len() as u64;
        patch_attachment_offsets(&mut file_bytes, size, &attachments)?;

        let header_size = (file_bytes.len() - 16) as u32;
        file_bytes[8..12].copy_from_slice(&header_size.to_le_bytes());
        file_bytes[12..16].copy_from_slice(&[0u8; 4]);

        sink.write_all(&file_bytes).map_err(xisf_core::Error::from)?;
        for payload in &attachments {
            write_chunked(sink, payload)?;
        }
        Ok(())
    }
}

fn patch_attachment_offsets(file_bytes: &mut [u8], header_total: u64, attachments: &[Vec<u8>]) -> Result<()> {
    let sentinel = format!("attachment:{SENTINEL_POS}:");
    let mut search_from = 32usize.min(file_bytes.len());
    let mut offset = header_total;

    for payload in attachments {
        let haystack = &file_bytes[search_from..];
        let rel = find_subslice(haystack, sentinel.as_bytes()).ok_or_else(|| {
            Error::MalformedHeader("fewer attachment sentinels than attachment payloads".into())
        })?;
        let digits_start = search_from + rel + "attachment:".len();
        let replacement = format!("{offset:0width$}", width = SENTINEL_WIDTH);
        file_bytes[digits_start..digits_start + SENTINEL_WIDTH].copy_from_slice(replacement.as_bytes());
        search_from = digits_start + SENTINEL_WIDTH;
        offset += payload.len() as u64;
    }
    Ok(())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn write_chunked<W: Write>(sink: &mut W, bytes: &[u8]) -> Result<()> {
    for chunk in bytes.chunks(CHUNK) {
        sink.write_all(chunk).map_err(xisf_core::Error::from)?;
    }
    Ok(())
}

fn indent(n: usize) -> String {
    "  ".repeat(n)
}

fn write_image_element(
    xml: &mut String,
    tag: &str,
    image: &Image,
    placement: PixelPlacement,
    attachments: &mut Vec<Vec<u8>>,
) -> Result<()> {
    let block = image.encode_pixel_data()?;
    let (location_attr, data_child) = place_block(&block, placement, attachments);

    xml.push_str(&format!(
        "  <{tag} geometry=\"{}\" sampleFormat=\"{}\" colorSpace=\"{}\" pixelStorage=\"{}\" imageType=\"{}\"",
        format_geometry(image.width(), image.height(), image.channels()),
        image.sample_format().name(),
        image.color_space.name(),
        image.pixel_storage.name(),
        image.image_type.name(),
    ));
    if image.sample_format().is_float() && image.bounds != (0.0, 1.0) {
        xml.push_str(&format!(" bounds=\"{}\"", format_bounds(image.bounds.0, image.bounds.1)));
    }
    xml.push_str(&format!(" location=\"{location_attr}\""));
    if block.codec.name().is_some() {
        xml.push_str(&format!(
            " compression=\"{}\"",
            format_compression(block.codec, block.uncompressed_size, block.byte_shuffling)
        ));
        if let Some(subblocks) = &block.subblocks {
            xml.push_str(&format!(" subblocks=\"{}\"", format_subblocks(subblocks)));
        }
    }
    xml.push_str(">\n");

    if let Some(data_xml) = data_child {
        xml.push_str(&data_xml);
    }
    for property in image.properties() {
        write_property(xml, 2, property);
    }
    for keyword in &image.fits_keywords {
        write_fits_keyword(xml, keyword);
    }
    if let Some(cfa) = &image.cfa {
        xml.push_str(&format!(
            "    <ColorFilterArray width=\"{}\" height=\"{}\" pattern=\"{}\"/>\n",
            cfa.width, cfa.height, cfa.pattern
        ));
    }
    if let Some(icc) = &image.icc_profile {
        let encoded = ByteBuffer::from_slice(icc).base64_encode();
        xml.push_str(&format!("    <ICCProfile location=\"inline:base64\">{encoded}</ICCProfile>\n"));
    }
    xml.push_str(&format!("  </{tag}>\n"));
    Ok(())
}

/// Decide the `location` attribute text and, for `embedded`/`inline`,
/// the corresponding pixel markup; registers the raw payload for later
/// append when `Attachment` is chosen.
fn place_block(block: &DataBlock, placement: PixelPlacement, attachments: &mut Vec<Vec<u8>>) -> (String, Option<String>) {
    match placement {
        PixelPlacement::Attachment => {
            let size = block.resident_bytes().len() as u64;
            attachments.push(block.resident_bytes().to_vec());
            (Location::Attachment { pos: SENTINEL_POS, size }.format(), None)
        }
        PixelPlacement::Inline(enc) => {
            let text = transport_encode(block.resident_bytes(), enc);
            (Location::Inline(enc).format(), Some(format!("    {text}\n")))
        }
        PixelPlacement::Embedded(enc) => {
            let text = transport_encode(block.resident_bytes(), enc);
            (
                Location::Embedded.format(),
                Some(format!("    <Data encoding=\"{}\">{text}</Data>\n", enc.as_str())),
            )
        }
    }
}

fn transport_encode(bytes: &[u8], enc: Encoding) -> String {
    let buf = ByteBuffer::from_slice(bytes);
    match enc {
        Encoding::Base64 => buf.base64_encode(),
        Encoding::Base16 => buf.base16_encode(),
    }
}

fn write_property(xml: &mut String, depth: usize, property: &Property) {
    let pad = indent(depth);
    let type_name = property.value.type_name();
    if let Some(text) = property.value.format_scalar() {
        if let Value::String(_) = property.value {
            xml.push_str(&format!(
                "{pad}<Property id=\"{}\" type=\"{type_name}\"{}>{}</Property>\n",
                escape_xml(&property.id),
                comment_attr(&property.comment),
                escape_xml(&text)
            ));
        } else {
            xml.push_str(&format!(
                "{pad}<Property id=\"{}\" type=\"{type_name}\" value=\"{}\"{}/>\n",
                escape_xml(&property.id),
                escape_xml(&text),
                comment_attr(&property.comment)
            ));
        }
        return;
    }

    let bytes = property.value.to_le_bytes().unwrap_or_default();
    let encoded = ByteBuffer::from_slice(&bytes).base64_encode();
    let dims_attr = match property.value.matrix_dims() {
        Some((rows, columns)) => format!(" rows=\"{rows}\" columns=\"{columns}\""),
        None => match property.value.vector_len() {
            Some(len) => format!(" length=\"{len}\""),
            None => String::new(),
        },
    };
    xml.push_str(&format!(
        "{pad}<Property id=\"{}\" type=\"{type_name}\"{dims_attr} location=\"inline:base64\"{}>{}</Property>\n",
        escape_xml(&property.id),
        comment_attr(&property.comment),
        encoded
    ));
}

fn write_fits_keyword(xml: &mut String, keyword: &FITSKeyword) {
    xml.push_str(&format!(
        "    <FITSKeyword name=\"{}\" value=\"{}\"{}/>\n",
        escape_xml(&keyword.name),
        escape_xml(&keyword.value),
        comment_attr(&keyword.comment)
    ));
}

fn comment_attr(comment: &str) -> String {
    if comment.is_empty() {
        String::new()
    } else {
        format!(" comment=\"{}\"", escape_xml(comment))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use xisf_image::{ColorSpace, SampleFormat};

    use super::*;
    use crate::reader::Reader;

    #[test]
    fn writes_valid_signature_and_parseable_header() {
        let image = Image::new(2, 2, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        let mut out = Vec::new();
        Writer::write(&mut out, &[image], &[], None, PixelPlacement::Attachment).unwrap();
        assert_eq!(&out[0..8], b"XISF0100");

        let mut reader = Reader::open(Cursor::new(out)).unwrap();
        assert_eq!(reader.image_count(), 1);
    }

    #[test]
    fn attachment_round_trip_preserves_pixels() {
        let mut image = Image::new(4, 4, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
        for (i, b) in image.pixels_mut().iter_mut().enumerate() {
            *b = i as u8;
        }
        let original = image.pixels().to_vec();

        let mut out = Vec::new();
        Writer::write(&mut out, &[image], &[], None, PixelPlacement::Attachment).unwrap();

        let mut reader = Reader::open(Cursor::new(out)).unwrap();
        let read_back = reader.get_image(0, true).unwrap();
        assert_eq!(read_back.pixels(), original.as_slice());
    }

    #[test]
    fn inline_and_attachment_placements_decode_identically() {
        let mut image_a = Image::new(3, 3, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
        for (i, b) in image_a.pixels_mut().iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        let image_b = image_a.clone();

        let mut attached = Vec::new();
        Writer::write(&mut attached, &[image_a], &[], None, PixelPlacement::Attachment).unwrap();
        let mut inlined = Vec::new();
        Writer::write(&mut inlined, &[image_b], &[], None, PixelPlacement::Inline(Encoding::Base64)).unwrap();

        let mut r1 = Reader::open(Cursor::new(attached)).unwrap();
        let mut r2 = Reader::open(Cursor::new(inlined)).unwrap();
        assert_eq!(r1.get_image(0, true).unwrap().pixels(), r2.get_image(0, true).unwrap().pixels());
    }

    #[test]
    fn embedded_placement_round_trips() {
        let mut image = Image::new(2, 2, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
        for (i, b) in image.pixels_mut().iter_mut().enumerate() {
            *b = (i * 3) as u8;
        }
        let original = image.pixels().to_vec();

        let mut out = Vec::new();
        Writer::write(&mut out, &[image], &[], None, PixelPlacement::Embedded(Encoding::Base64)).unwrap();

        let mut reader = Reader::open(Cursor::new(out)).unwrap();
        let read_back = reader.get_image(0, true).unwrap();
        assert_eq!(read_back.pixels(), original.as_slice());
    }

    #[test]
    fn file_property_round_trips() {
        let image = Image::new(1, 1, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        let props = vec![Property::new("Custom:Note", Value::String("Hello XISF".to_string()))];
        let mut out = Vec::new();
        Writer::write(&mut out, &[image], &props, None, PixelPlacement::Attachment).unwrap();

        let mut reader = Reader::open(Cursor::new(out)).unwrap();
        let found = reader.file_properties().iter().find(|p| p.id == "Custom:Note").unwrap();
        assert_eq!(found.value, Value::String("Hello XISF".to_string()));
    }

    #[test]
    fn thumbnail_round_trips_as_image_shaped_value() {
        let image = Image::new(3, 3, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        let mut thumb = Image::new(2, 2, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
        for (i, b) in thumb.pixels_mut().iter_mut().enumerate() {
            *b = (i + 1) as u8;
        }
        let thumb_pixels = thumb.pixels().to_vec();

        let mut out = Vec::new();
        Writer::write(&mut out, &[image], &[], Some(&thumb), PixelPlacement::Attachment).unwrap();

        let reader = Reader::open(Cursor::new(out)).unwrap();
        let got = reader.thumbnail().expect("thumbnail present");
        assert_eq!(got.width(), 2);
        assert_eq!(got.height(), 2);
        assert_eq!(got.pixels(), thumb_pixels.as_slice());
    }
}
