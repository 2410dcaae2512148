//! Location-aware payload descriptor: the `compression`/`location`
//! attribute grammars, and the encode/decode pipeline that sits between
//! raw sample bytes and their on-disk, possibly compressed and
//! shuffled, form.

use crate::byte_buffer::ByteBuffer;
use crate::byte_shuffle::{shuffle, unshuffle};
use crate::codec::{Codec, SubBlock};
use crate::error::{Error, Result};

/// Inline text transport encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Base64,
    Base16,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Base64 => "base64",
            Encoding::Base16 => "base16",
        }
    }
}

/// Where a DataBlock's bytes live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Payload is a `<Data encoding="…">` child element.
    Embedded,
    /// Payload is the owning element's inner text, transport-encoded.
    Inline(Encoding),
    /// Payload lives past the header at an absolute byte offset.
    Attachment { pos: u64, size: u64 },
}

impl Location {
    /// Parse the `location` attribute grammar.
    pub fn parse(s: &str) -> Result<Self> {
        if s == "embedded" {
            return Ok(Location::Embedded);
        }
        if let Some(enc) = s.strip_prefix("inline:") {
            return match enc {
                "base64" => Ok(Location::Inline(Encoding::Base64)),
                "base16" => Ok(Location::Inline(Encoding::Base16)),
                other => Err(Error::InvalidReference(format!(
                    "unknown inline encoding: {other}"
                ))),
            };
        }
        if let Some(rest) = s.strip_prefix("attachment:") {
            let mut parts = rest.splitn(2, ':');
            let pos = parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| Error::InvalidReference(format!("bad attachment offset in {s}")))?;
            let size = parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| Error::InvalidReference(format!("bad attachment size in {s}")))?;
            return Ok(Location::Attachment { pos, size });
        }
        Err(Error::InvalidReference(format!("unknown location: {s}")))
    }

    /// Format the `location` attribute. `size` is required for the
    /// `Attachment` variant and governs the sentinel substitution the
    /// Writer performs before the true offset is known.
    pub fn format(&self) -> String {
        match self {
            Location::Embedded => "embedded".to_string(),
            Location::Inline(enc) => format!("inline:{}", enc.as_str()),
            Location::Attachment { pos, size } => format!("attachment:{pos}:{size}"),
        }
    }
}

/// Parse the `compression` attribute grammar:
/// `codecName ("+sh")? ":" uncompressedSize (":" itemSize)?`.
pub fn parse_compression(s: &str) -> Result<(Codec, u64, usize)> {
    let mut fields = s.split(':');
    let head = fields
        .next()
        .ok_or_else(|| Error::InvalidReference("empty compression attribute".into()))?;
    let (codec_name, shuffled) = match head.strip_suffix("+sh") {
        Some(name) => (name, true),
        None => (head, false),
    };
    let codec = Codec::from_name(codec_name)
        .ok_or_else(|| Error::InvalidReference(format!("unknown codec: {codec_name}")))??;

    let uncompressed_size: u64 = fields
        .next()
        .ok_or_else(|| Error::InvalidReference(format!("missing uncompressedSize in {s}")))?
        .parse()
        .map_err(|_| Error::InvalidReference(format!("malformed uncompressedSize in {s}")))?;

    let item_size_field = fields.next();
    if shuffled && item_size_field.is_none() {
        return Err(Error::InvalidReference(format!(
            "+sh suffix requires an itemSize field: {s}"
        )));
    }
    let item_size = match item_size_field {
        Some(text) => text
            .parse::<usize>()
            .map_err(|_| Error::InvalidReference(format!("malformed itemSize in {s}")))?,
        None => 0,
    };

    Ok((codec, uncompressed_size, item_size))
}

/// Format the `compression` attribute.
pub fn format_compression(codec: Codec, uncompressed_size: u64, byte_shuffling: usize) -> String {
    let name = codec.name().expect("format_compression called with Codec::None");
    if byte_shuffling > 1 {
        format!("{name}+sh:{uncompressed_size}:{byte_shuffling}")
    } else {
        format!("{name}:{uncompressed_size}")
    }
}

/// Parse the `subblocks` attribute: a `:`-separated list of `c,d` pairs.
pub fn parse_subblocks(s: &str) -> Result<Vec<SubBlock>> {
    s.split(':')
        .map(|pair| {
            let mut parts = pair.splitn(2, ',');
            let c = parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| Error::InvalidReference(format!("malformed subblock pair: {pair}")))?;
            let d = parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| Error::InvalidReference(format!("malformed subblock pair: {pair}")))?;
            Ok((c, d))
        })
        .collect()
}

/// Format the `subblocks` attribute.
pub fn format_subblocks(blocks: &[SubBlock]) -> String {
    blocks
        .iter()
        .map(|(c, d)| format!("{c},{d}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// A located, optionally compressed and shuffled payload.
#[derive(Debug, Clone)]
pub struct DataBlock {
    pub location: Location,
    pub codec: Codec,
    pub compress_level: Option<i32>,
    pub uncompressed_size: u64,
    pub byte_shuffling: usize,
    pub subblocks: Option<Vec<SubBlock>>,
    data: ByteBuffer,
}

impl DataBlock {
    /// Run the write-path pipeline over `raw` sample bytes: shuffle
    /// forward, then compress. `location` is left as `Embedded`; the
    /// caller (Image/Writer) reassigns it once the persisted location
    /// is decided.
    pub fn encode(raw: &[u8], codec: Codec, level: Option<i32>, byte_shuffling: usize) -> Result<Self> {
        let uncompressed_size = raw.len() as u64;
        let shuffled = shuffle(raw, byte_shuffling);
        let (compressed, subblocks) = codec.compress(&shuffled, level.unwrap_or(-1))?;
        Ok(Self {
            location: Location::Embedded,
            codec,
            compress_level: level,
            uncompressed_size,
            byte_shuffling,
            subblocks,
            data: ByteBuffer::from_vec(compressed),
        })
    }

    /// Construct directly from already-resident, still-encoded bytes
    /// (used by the Reader once the transport/attachment fetch has
    /// produced the raw compressed payload).
    pub fn from_resident(
        location: Location,
        codec: Codec,
        uncompressed_size: u64,
        byte_shuffling: usize,
        subblocks: Option<Vec<SubBlock>>,
        data: ByteBuffer,
    ) -> Self {
        Self {
            location,
            codec,
            compress_level: None,
            uncompressed_size,
            byte_shuffling,
            subblocks,
            data,
        }
    }

    /// The resident encoded bytes (compressed, pre-shuffle-inverse).
    pub fn resident_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Run the read-path pipeline: decompress (using the sub-block
    /// list if present, otherwise one implicit whole-buffer chunk),
    /// then unshuffle.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let decompressed =
            self.codec
                .decompress(self.data.as_slice(), self.uncompressed_size, self.subblocks.as_deref())?;
        Ok(unshuffle(&decompressed, self.byte_shuffling))
    }

    /// Mark this block fully resident: it no longer refers to an
    /// on-disk attachment offset.
    pub fn mark_resident(&mut self) {
        if matches!(self.location, Location::Attachment { .. }) {
            self.location = Location::Embedded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_round_trips_through_format() {
        for loc in [
            Location::Embedded,
            Location::Inline(Encoding::Base64),
            Location::Inline(Encoding::Base16),
            Location::Attachment { pos: 4096, size: 128 },
        ] {
            let formatted = loc.format();
            assert_eq!(Location::parse(&formatted).unwrap(), loc);
        }
    }

    #[test]
    fn compression_attr_round_trips_with_shuffle() {
        let formatted = format_compression(Codec::Lz4, 70, 2);
        assert_eq!(formatted, "lz4+sh:70:2");
        let (codec, size, item_size) = parse_compression(&formatted).unwrap();
        assert_eq!(codec, Codec::Lz4);
        assert_eq!(size, 70);
        assert_eq!(item_size, 2);
    }

    #[test]
    fn compression_attr_round_trips_without_shuffle() {
        let formatted = format_compression(Codec::Zlib, 8_388_608, 0);
        assert_eq!(formatted, "zlib:8388608");
        let (codec, size, item_size) = parse_compression(&formatted).unwrap();
        assert_eq!(codec, Codec::Zlib);
        assert_eq!(size, 8_388_608);
        assert_eq!(item_size, 0);
    }

    #[test]
    fn shuffle_suffix_without_item_size_is_structural_error() {
        assert!(parse_compression("zlib+sh:100").is_err());
    }

    #[test]
    fn subblocks_round_trip() {
        let blocks = vec![(100u64, 200u64), (50, 80)];
        let formatted = format_subblocks(&blocks);
        assert_eq!(formatted, "100,200:50,80");
        assert_eq!(parse_subblocks(&formatted).unwrap(), blocks);
    }

    #[test]
    fn encode_decode_round_trip_with_shuffle_and_codec() {
        let raw: Vec<u8> = (0..2000u32).map(|i| (i % 256) as u8).collect();
        let block = DataBlock::encode(&raw, Codec::Zlib, None, 2).unwrap();
        let decoded = block.decode().unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn encode_decode_round_trip_identity_codec() {
        let raw = b"abcxyz".to_vec();
        let block = DataBlock::encode(&raw, Codec::None, None, 0).unwrap();
        assert_eq!(block.resident_bytes(), raw.as_slice());
        assert_eq!(block.decode().unwrap(), raw);
    }

    #[test]
    fn mark_resident_clears_attachment_location() {
        let mut block = DataBlock::from_resident(
            Location::Attachment { pos: 64, size: 8 },
            Codec::None,
            8,
            0,
            None,
            ByteBuffer::from_slice(b"12345678"),
        );
        block.mark_resident();
        assert_eq!(block.location, Location::Embedded);
    }
}
