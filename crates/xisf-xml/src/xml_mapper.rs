//! DOM-level mapping helpers: element/attribute text ↔ the typed
//! fields of `Image`, `Property`, `FITSKeyword`, `ColorFilterArray`.
//!
//! These are pure functions with no I/O and no `quick_xml::Reader`
//! state of their own; `reader`/`writer` drive the event loop and call
//! into this module to turn attribute text into typed values and back.

use quick_xml::events::BytesStart;

use crate::error::{Error, Result};

/// Attribute value by local (non-namespaced) name, or `None` if absent.
pub fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if local_name(&String::from_utf8_lossy(a.key.as_ref())) == name {
            Some(String::from_utf8_lossy(&a.value).to_string())
        } else {
            None
        }
    })
}

pub fn attr_or(e: &BytesStart, name: &str, default: &str) -> String {
    attr(e, name).unwrap_or_else(|| default.to_string())
}

/// Element or attribute local name (after a namespace-prefix colon).
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// `geometry="W:H:C"`: three positive integers.
pub fn parse_geometry(s: &str) -> Result<(u32, u32, u32)> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(Error::MalformedHeader(format!("malformed geometry: {s}")));
    }
    let mut dims = [0u32; 3];
    for (i, part) in parts.iter().enumerate() {
        dims[i] = part
            .parse()
            .map_err(|_| Error::MalformedHeader(format!("malformed geometry: {s}")))?;
        if dims[i] == 0 {
            return Err(Error::MalformedHeader(format!(
                "geometry dimensions must be positive: {s}"
            )));
        }
    }
    Ok((dims[0], dims[1], dims[2]))
}

pub fn format_geometry(width: u32, height: u32, channels: u32) -> String {
    format!("{width}:{height}:{channels}")
}

/// `bounds="lo:hi"`.
pub fn parse_bounds(s: &str) -> Result<(f64, f64)> {
    let (lo, hi) = s
        .split_once(':')
        .ok_or_else(|| Error::MalformedHeader(format!("malformed bounds: {s}")))?;
    let lo: f64 = lo
        .parse()
        .map_err(|_| Error::MalformedHeader(format!("malformed bounds: {s}")))?;
    let hi: f64 = hi
        .parse()
        .map_err(|_| Error::MalformedHeader(format!("malformed bounds: {s}")))?;
    Ok((lo, hi))
}

pub fn format_bounds(lo: f64, hi: f64) -> String {
    format!("{lo}:{hi}")
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_round_trips() {
        assert_eq!(parse_geometry("5:7:1").unwrap(), (5, 7, 1));
        assert_eq!(format_geometry(5, 7, 1), "5:7:1");
    }

    #[test]
    fn geometry_rejects_zero_dimension() {
        assert!(parse_geometry("0:7:1").is_err());
    }

    #[test]
    fn geometry_rejects_wrong_arity() {
        assert!(parse_geometry("5:7").is_err());
    }

    #[test]
    fn bounds_round_trips() {
        assert_eq!(parse_bounds("0:1").unwrap(), (0.0, 1.0));
        assert_eq!(format_bounds(0.0, 1.0), "0:1");
    }

    #[test]
    fn local_name_strips_prefix() {
        assert_eq!(local_name("xisf:Image"), "Image");
        assert_eq!(local_name("Image"), "Image");
    }
}
