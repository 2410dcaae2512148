//! Process-wide write-time compression override, read once from
//! `LIBXISF_COMPRESSION`.

use std::sync::OnceLock;

use xisf_core::codec::{Codec, LEVEL_DEFAULT};

/// `LIBXISF_COMPRESSION=<codec>[+sh][:<level>]` forces every written
/// DataBlock to use `codec` with byte-shuffling enabled, overriding
/// per-Image settings.
#[derive(Debug, Clone, Copy)]
pub struct CompressionOverride {
    pub codec: Codec,
    pub level: i32,
}

static OVERRIDE: OnceLock<Option<CompressionOverride>> = OnceLock::new();

/// The parsed override, or `None` if the environment variable is
/// unset, empty, or names an unrecognized codec. Parsing happens once
/// per process; later calls return the cached result.
pub fn compression_override() -> Option<CompressionOverride> {
    *OVERRIDE.get_or_init(|| std::env::var("LIBXISF_COMPRESSION").ok().and_then(|v| parse(&v)))
}

fn parse(spec: &str) -> Option<CompressionOverride> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }
    let (head, level_text) = match spec.split_once(':') {
        Some((h, l)) => (h, Some(l)),
        None => (spec, None),
    };
    let codec_name = head.strip_suffix("+sh").unwrap_or(head);
    let codec = Codec::from_name(codec_name)?.ok()?;

    let level = level_text
        .and_then(|l| l.parse::<i32>().ok())
        .unwrap_or(LEVEL_DEFAULT);

    Some(CompressionOverride { codec, level })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codec_shuffle_and_level() {
        let parsed = parse("zlib+sh:9").unwrap();
        assert_eq!(parsed.codec, Codec::Zlib);
        assert_eq!(parsed.level, 9);
    }

    #[test]
    fn tolerates_unparseable_level() {
        let parsed = parse("lz4:notanumber").unwrap();
        assert_eq!(parsed.codec, Codec::Lz4);
        assert_eq!(parsed.level, LEVEL_DEFAULT);
    }

    #[test]
    fn unknown_codec_disables_override() {
        assert!(parse("brotli").is_none());
    }

    #[test]
    fn empty_string_disables_override() {
        assert!(parse("").is_none());
    }

    #[test]
    fn plain_codec_without_level_uses_default() {
        let parsed = parse("lz4hc").unwrap();
        assert_eq!(parsed.codec, Codec::Lz4Hc);
        assert_eq!(parsed.level, LEVEL_DEFAULT);
    }
}
