//! Compression adapter: `{none, zlib, lz4, lz4hc, zstd}` behind one
//! `compress`/`decompress` contract, with sub-block chunking for codecs
//! that cap the size of a single call.

use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Encoder/decoder-neutral level sentinel: "use the codec's own default".
pub const LEVEL_DEFAULT: i32 = -1;

/// zlib's `uLong` input parameter is a 32-bit count.
const ZLIB_MAX_INPUT: u64 = u32::MAX as u64;

/// `LZ4_MAX_INPUT_SIZE` from the reference LZ4 implementation.
const LZ4_MAX_INPUT: u64 = 0x7E00_0000;

/// A single `(compressedLen, decompressedLen)` chunk boundary.
pub type SubBlock = (u64, u64);

/// Named compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    None,
    Zlib,
    Lz4,
    Lz4Hc,
    #[cfg(feature = "zstd")]
    Zstd,
}

impl Codec {
    /// Wire name as it appears in the `compression` attribute, or `None`
    /// for the identity codec (which never appears in that attribute).
    pub fn name(self) -> Option<&'static str> {
        match self {
            Codec::None => None,
            Codec::Zlib => Some("zlib"),
            Codec::Lz4 => Some("lz4"),
            Codec::Lz4Hc => Some("lz4hc"),
            #[cfg(feature = "zstd")]
            Codec::Zstd => Some("zstd"),
        }
    }

    /// Parse a wire codec name. Returns `UnsupportedFeature` for a name
    /// that names a real codec not compiled into this build (`zstd`
    /// without the feature), and `None` for anything else unrecognized.
    pub fn from_name(s: &str) -> Option<Result<Self>> {
        match s {
            "zlib" => Some(Ok(Codec::Zlib)),
            "lz4" => Some(Ok(Codec::Lz4)),
            "lz4hc" => Some(Ok(Codec::Lz4Hc)),
            "zstd" => {
                #[cfg(feature = "zstd")]
                {
                    Some(Ok(Codec::Zstd))
                }
                #[cfg(not(feature = "zstd"))]
                {
                    Some(Err(Error::UnsupportedFeature(
                        "zstd codec not compiled in".into(),
                    )))
                }
            }
            _ => None,
        }
    }

    /// Maximum bytes this codec accepts in a single encode/decode call,
    /// or `None` if unbounded (identity, Zstd).
    fn max_single_call(self) -> Option<u64> {
        match self {
            Codec::None => None,
            Codec::Zlib => Some(ZLIB_MAX_INPUT),
            Codec::Lz4 | Codec::Lz4Hc => Some(LZ4_MAX_INPUT),
            #[cfg(feature = "zstd")]
            Codec::Zstd => None,
        }
    }

    /// Compress `input` at `level` (`-1` = codec default). Returns the
    /// concatenated compressed chunks and, if chunking was required to
    /// respect the codec's single-call limit, the ordered sub-block
    /// list describing each chunk.
    pub fn compress(self, input: &[u8], level: i32) -> Result<(Vec<u8>, Option<Vec<SubBlock>>)> {
        if matches!(self, Codec::None) {
            return Ok((input.to_vec(), None));
        }

        let Some(max) = self.max_single_call() else {
            let compressed = self.compress_chunk(input, level)?;
            return Ok((compressed, None));
        };
        let max = max as usize;

        if input.len() <= max {
            let compressed = self.compress_chunk(input, level)?;
            return Ok((compressed, None));
        }

        let mut output = Vec::new();
        let mut subblocks = Vec::new();
        for chunk in input.chunks(max) {
            let compressed = self.compress_chunk(chunk, level)?;
            subblocks.push((compressed.len() as u64, chunk.len() as u64));
            output.extend_from_slice(&compressed);
        }
        Ok((output, Some(subblocks)))
    }

    /// Decompress `input`, producing exactly `uncompressed_size` bytes.
    /// `subblocks`, when present, gives the chunk boundaries within
    /// `input`; its absence implies a single implicit chunk spanning
    /// the whole input and the whole output.
    pub fn decompress(
        self,
        input: &[u8],
        uncompressed_size: u64,
        subblocks: Option<&[SubBlock]>,
    ) -> Result<Vec<u8>> {
        if matches!(self, Codec::None) {
            return Ok(input.to_vec());
        }

        let mut output = Vec::with_capacity(uncompressed_size as usize);
        match subblocks {
            Some(blocks) => {
                let mut offset = 0usize;
                for &(compressed_len, decompressed_len) in blocks {
                    let end = offset + compressed_len as usize;
                    let chunk = input.get(offset..end).ok_or_else(|| {
                        Error::CodecFailure("sub-block extends past compressed data".into())
                    })?;
                    let decompressed = self.decompress_chunk(chunk, decompressed_len)?;
                    output.extend_from_slice(&decompressed);
                    offset = end;
                }
            }
            None => {
                let decompressed = self.decompress_chunk(input, uncompressed_size)?;
                output.extend_from_slice(&decompressed);
            }
        }

        if output.len() as u64 != uncompressed_size {
            return Err(Error::CodecFailure(format!(
                "decompressed {} bytes, expected {uncompressed_size}",
                output.len()
            )));
        }
        Ok(output)
    }

    fn compress_chunk(self, chunk: &[u8], level: i32) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(chunk.to_vec()),
            Codec::Zlib => zlib_compress(chunk, level),
            // lz4_flex exposes one fast block compressor; there is no
            // distinct high-compression mode, so lz4hc shares it.
            Codec::Lz4 | Codec::Lz4Hc => Ok(lz4_flex::compress(chunk)),
            #[cfg(feature = "zstd")]
            Codec::Zstd => {
                let level = if level == LEVEL_DEFAULT { 0 } else { level };
                zstd::bulk::compress(chunk, level)
                    .map_err(|e| Error::CodecFailure(format!("zstd compress: {e}")))
            }
        }
    }

    fn decompress_chunk(self, chunk: &[u8], expected_len: u64) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(chunk.to_vec()),
            Codec::Zlib => zlib_decompress(chunk, expected_len),
            Codec::Lz4 | Codec::Lz4Hc => lz4_flex::decompress(chunk, expected_len as usize)
                .map_err(|e| Error::CodecFailure(format!("lz4 decompress: {e}"))),
            #[cfg(feature = "zstd")]
            Codec::Zstd => zstd::bulk::decompress(chunk, expected_len as usize)
                .map_err(|e| Error::CodecFailure(format!("zstd decompress: {e}"))),
        }
    }
}

fn zlib_compress(chunk: &[u8], level: i32) -> Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let compression = if level == LEVEL_DEFAULT {
        Compression::default()
    } else {
        Compression::new(level.clamp(0, 9) as u32)
    };
    let mut encoder = ZlibEncoder::new(Vec::new(), compression);
    encoder
        .write_all(chunk)
        .map_err(|e| Error::CodecFailure(format!("zlib compress: {e}")))?;
    encoder
        .finish()
        .map_err(|e| Error::CodecFailure(format!("zlib compress: {e}")))
}

fn zlib_decompress(chunk: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;

    let mut decoder = ZlibDecoder::new(chunk);
    let mut out = Vec::with_capacity(expected_len as usize);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::CodecFailure(format!("zlib decompress: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(codec: Codec, input: &[u8]) {
        let (compressed, subblocks) = codec.compress(input, LEVEL_DEFAULT).unwrap();
        let restored = codec
            .decompress(&compressed, input.len() as u64, subblocks.as_deref())
            .unwrap();
        assert_eq!(restored, input, "codec={codec:?}");
    }

    #[test]
    fn identity_codec_is_passthrough() {
        round_trip(Codec::None, b"hello world");
    }

    #[test]
    fn zlib_round_trip_various_sizes() {
        for size in [1, 65, 4096, 1 << 20] {
            let input: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            round_trip(Codec::Zlib, &input);
        }
    }

    #[test]
    fn lz4_round_trip_various_sizes() {
        for size in [1, 65, 4096, 1 << 20] {
            let input: Vec<u8> = (0..size).map(|i| (i % 97) as u8).collect();
            round_trip(Codec::Lz4, &input);
            round_trip(Codec::Lz4Hc, &input);
        }
    }

    #[test]
    fn from_name_rejects_unknown_codec() {
        assert!(Codec::from_name("brotli").is_none());
    }

    #[test]
    fn from_name_round_trips_through_name() {
        for codec in [Codec::Zlib, Codec::Lz4, Codec::Lz4Hc] {
            let name = codec.name().unwrap();
            let parsed = Codec::from_name(name).unwrap().unwrap();
            assert_eq!(parsed, codec);
        }
    }

    #[test]
    fn empty_input_round_trips() {
        round_trip(Codec::Zlib, &[]);
        round_trip(Codec::Lz4, &[]);
    }
}
