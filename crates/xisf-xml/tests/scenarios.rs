//! Full serialization round-trip and the spec's numbered end-to-end
//! scenarios, exercised through the public `Reader`/`Writer` API only.

use std::io::Cursor;

use xisf_core::datablock::Encoding;
use xisf_image::{ColorSpace, Image, Property, SampleFormat};
use xisf_value::Value;
use xisf_xml::{PixelPlacement, Reader, Writer};

fn round_trip(images: &[Image], placement: PixelPlacement) -> Vec<Image> {
    let mut buf = Vec::new();
    Writer::write(&mut buf, images, &[], None, placement).expect("write");
    let mut reader = Reader::open(Cursor::new(buf)).expect("open");
    (0..reader.image_count())
        .map(|i| reader.get_image(i, true).expect("get_image").clone())
        .collect()
}

/// Scenario 1: minimal 5x7 UInt16 gray image, 13 typed properties, embedded.
#[test]
fn scenario_1_minimal_gray_image_with_typed_properties() {
    let mut img = Image::new(5, 7, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
    img.add_property(Property::new("P:Boolean", Value::Boolean(true))).unwrap();
    img.add_property(Property::new("P:Int8", Value::Int8(8))).unwrap();
    img.add_property(Property::new("P:Int16", Value::Int16(16))).unwrap();
    img.add_property(Property::new("P:Int32", Value::Int32(32))).unwrap();
    img.add_property(Property::new("P:UInt8", Value::UInt8(8))).unwrap();
    img.add_property(Property::new("P:UInt16", Value::UInt16(16))).unwrap();
    img.add_property(Property::new("P:UInt32", Value::UInt32(32))).unwrap();
    img.add_property(Property::new("P:Float32", Value::Float32(0.32))).unwrap();
    img.add_property(Property::new("P:Float64", Value::Float64(0.64))).unwrap();
    img.add_property(Property::new("P:Complex32", Value::Complex32(3.0, -2.0))).unwrap();
    img.add_property(Property::new("P:Complex64", Value::Complex64(-3.0, 2.0))).unwrap();
    img.add_property(Property::new("P:String", Value::String("Hello XISF".to_string()))).unwrap();
    img.add_property(Property::new("P:Last", Value::Int32(0))).unwrap();
    assert_eq!(img.properties().len(), 13);

    let original_pixels = img.pixels().to_vec();
    let back = round_trip(&[img.clone()], PixelPlacement::Embedded(Encoding::Base64));
    assert_eq!(back.len(), 1);
    let got = &back[0];

    assert_eq!(got.properties().len(), 13);
    for (want, have) in img.properties().iter().zip(got.properties()) {
        assert_eq!(want.id, have.id);
        match (&want.value, &have.value) {
            (Value::Float32(a), Value::Float32(b)) => assert!((a - b).abs() < 1e-6),
            (Value::Float64(a), Value::Float64(b)) => assert!((a - b).abs() < 1e-12),
            (a, b) => assert_eq!(a, b),
        }
    }
    assert_eq!(got.pixels(), original_pixels.as_slice());
}

/// Scenario 2: same image, LZ4 + byte-shuffle(2), attachment placement.
#[test]
fn scenario_2_lz4_shuffled_attachment() {
    let mut img = Image::new(5, 7, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
    for (i, b) in img.pixels_mut().iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    img.codec = Some(xisf_core::Codec::Lz4);
    img.byte_shuffling = true;
    let original_pixels = img.pixels().to_vec();

    let back = round_trip(&[img], PixelPlacement::Attachment);
    assert_eq!(back[0].pixels(), original_pixels.as_slice());
}

/// Scenario 3: 2048x2048 UInt16 noise, zlib level 9, attachment.
#[test]
fn scenario_3_large_zlib_image_round_trips() {
    let mut img = Image::new(2048, 2048, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
    let mut state: u32 = 0x1234_5678;
    for b in img.pixels_mut().iter_mut() {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        *b = (state >> 24) as u8;
    }
    img.codec = Some(xisf_core::Codec::Zlib);
    img.compress_level = Some(9);
    img.byte_shuffling = true;
    let original_pixels = img.pixels().to_vec();

    let back = round_trip(&[img], PixelPlacement::Attachment);
    assert_eq!(back[0].pixels(), original_pixels.as_slice());
}

/// Scenario 4: inline base-64 UI16Vector property.
#[test]
fn scenario_4_inline_vector_property_round_trips() {
    let mut img = Image::new(1, 1, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
    img.add_property(Property::new("Vec", Value::UI16Vector(vec![23, 45, 86]))).unwrap();

    let back = round_trip(&[img], PixelPlacement::Inline(Encoding::Base64));
    let prop = back[0].get_property("Vec").expect("Vec property present");
    assert_eq!(prop.value, Value::UI16Vector(vec![23, 45, 86]));
}

/// Scenario 5: inline base-64 2x3 UI16Matrix property.
#[test]
fn scenario_5_inline_matrix_property_round_trips() {
    let mut img = Image::new(1, 1, 1, SampleFormat::UInt16, ColorSpace::Gray).unwrap();
    img.add_property(Property::new("M", Value::UI16Matrix(2, 3, vec![0, 1, 2, 10, 0, 0])))
        .unwrap();

    let back = round_trip(&[img], PixelPlacement::Inline(Encoding::Base64));
    let prop = back[0].get_property("M").expect("M property present");
    assert_eq!(prop.value, Value::UI16Matrix(2, 3, vec![0, 1, 2, 10, 0, 0]));
}

/// Scenario 6: bad signature is rejected with a malformed-header error.
#[test]
fn scenario_6_invalid_signature_rejected() {
    let mut bytes = b"XISF0099".to_vec();
    bytes.extend_from_slice(&0u32.to_le_bytes()); // headerSize, unread after signature check fails
    bytes.extend_from_slice(&[0u8; 4]); // reserved

    let err = Reader::open(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, xisf_xml::Error::MalformedHeader(_)));
}

/// Location equivalence (spec.md section 8): inline and attachment
/// placements of the same image decode to identical pixels.
#[test]
fn location_equivalence_inline_vs_attachment() {
    let mut img = Image::new(4, 4, 3, SampleFormat::UInt8, ColorSpace::Rgb).unwrap();
    for (i, b) in img.pixels_mut().iter_mut().enumerate() {
        *b = (i * 7) as u8;
    }
    let via_inline = round_trip(&[img.clone()], PixelPlacement::Inline(Encoding::Base64));
    let via_attachment = round_trip(&[img], PixelPlacement::Attachment);
    assert_eq!(via_inline[0].pixels(), via_attachment[0].pixels());
}

/// A file-level thumbnail round-trips as an `Image`-shaped value,
/// distinct from the main image list.
#[test]
fn thumbnail_round_trips_through_full_file() {
    let img = Image::new(4, 4, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
    let mut thumb = Image::new(2, 2, 1, SampleFormat::UInt8, ColorSpace::Gray).unwrap();
    for (i, b) in thumb.pixels_mut().iter_mut().enumerate() {
        *b = (i + 10) as u8;
    }
    let thumb_pixels = thumb.pixels().to_vec();

    let mut buf = Vec::new();
    Writer::write(&mut buf, &[img], &[], Some(&thumb), PixelPlacement::Attachment).expect("write");
    let mut reader = Reader::open(Cursor::new(buf)).expect("open");

    assert_eq!(reader.image_count(), 1);
    let got = reader.thumbnail().expect("thumbnail present");
    assert_eq!(got.width(), 2);
    assert_eq!(got.height(), 2);
    assert_eq!(got.pixels(), thumb_pixels.as_slice());
}

/// `<Metadata><Property>` children are exposed separately from the
/// `<xisf>` element's own top-level properties.
#[test]
fn metadata_properties_are_kept_separate_from_file_properties() {
    let body = "<Image geometry=\"1:1:1\" sampleFormat=\"UInt8\" colorSpace=\"Gray\" location=\"inline:base64\">AA==</Image>\
<Property id=\"TopLevel\" type=\"Int32\" value=\"1\"/>\
<Metadata><Property id=\"CreationTime\" type=\"String\" value=\"2024-01-01T00:00:00\"/></Metadata>";
    let xml = format!("<xisf version=\"1.0\" xmlns=\"http://www.pixinsight.com/xisf\">{body}</xisf>");
    let mut file = Vec::new();
    file.extend_from_slice(b"XISF0100");
    file.extend_from_slice(&(xml.len() as u32).to_le_bytes());
    file.extend_from_slice(&[0u8; 4]);
    file.extend_from_slice(xml.as_bytes());

    let reader = Reader::open(Cursor::new(file)).expect("open");
    assert_eq!(reader.file_properties().len(), 1);
    assert_eq!(reader.file_properties()[0].id, "TopLevel");
    assert_eq!(reader.metadata().len(), 1);
    assert_eq!(reader.metadata()[0].id, "CreationTime");
}
