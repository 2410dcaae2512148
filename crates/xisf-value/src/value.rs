//! The tagged-union property value type.
//!
//! `Value` is a closed sum over the forty XISF property types: sixteen
//! scalars (including the two complex widths and the UTC timestamp)
//! plus a `Vector` and a `Matrix` variant for each of the twelve
//! numeric element types. Dispatch is a single exhaustive `match`; there
//! is no open hierarchy to extend.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

/// Numeric element type carried by a `Vector`/`Matrix` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    I8,
    I16,
    I32,
    I64,
    UI8,
    UI16,
    UI32,
    UI64,
    F32,
    F64,
    C32,
    C64,
}

impl ElementType {
    /// Size in bytes of one sample on the wire.
    pub fn byte_size(self) -> usize {
        match self {
            ElementType::I8 | ElementType::UI8 => 1,
            ElementType::I16 | ElementType::UI16 => 2,
            ElementType::I32 | ElementType::UI32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::UI64 | ElementType::F64 | ElementType::C32 => 8,
            ElementType::C64 => 16,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ElementType::I8 => "I8",
            ElementType::I16 => "I16",
            ElementType::I32 => "I32",
            ElementType::I64 => "I64",
            ElementType::UI8 => "UI8",
            ElementType::UI16 => "UI16",
            ElementType::UI32 => "UI32",
            ElementType::UI64 => "UI64",
            ElementType::F32 => "F32",
            ElementType::F64 => "F64",
            ElementType::C32 => "C32",
            ElementType::C64 => "C64",
        }
    }

    fn from_prefix(s: &str) -> Option<Self> {
        Some(match s {
            "I8" => ElementType::I8,
            "I16" => ElementType::I16,
            "I32" => ElementType::I32,
            "I64" => ElementType::I64,
            "UI8" => ElementType::UI8,
            "UI16" => ElementType::UI16,
            "UI32" => ElementType::UI32,
            "UI64" => ElementType::UI64,
            "F32" => ElementType::F32,
            "F64" => ElementType::F64,
            "C32" => ElementType::C32,
            "C64" => ElementType::C64,
            _ => return None,
        })
    }
}

/// Tagged union of the XISF property types. The tag fully determines
/// the active payload; there is no way to read the wrong alternative
/// without going through a fallible accessor.
#[derive(Debug, Clone)]
#[must_use]
pub enum Value {
    Monostate,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    /// Real/imaginary pair, both `f32`.
    Complex32(f32, f32),
    /// Real/imaginary pair, both `f64`.
    Complex64(f64, f64),
    String(String),
    /// UTC instant, second precision.
    TimePoint(DateTime<Utc>),

    I8Vector(Vec<i8>),
    I16Vector(Vec<i16>),
    I32Vector(Vec<i32>),
    I64Vector(Vec<i64>),
    UI8Vector(Vec<u8>),
    UI16Vector(Vec<u16>),
    UI32Vector(Vec<u32>),
    UI64Vector(Vec<u64>),
    F32Vector(Vec<f32>),
    F64Vector(Vec<f64>),
    C32Vector(Vec<(f32, f32)>),
    C64Vector(Vec<(f64, f64)>),

    /// `(rows, columns, row-major data)`.
    I8Matrix(usize, usize, Vec<i8>),
    I16Matrix(usize, usize, Vec<i16>),
    I32Matrix(usize, usize, Vec<i32>),
    I64Matrix(usize, usize, Vec<i64>),
    UI8Matrix(usize, usize, Vec<u8>),
    UI16Matrix(usize, usize, Vec<u16>),
    UI32Matrix(usize, usize, Vec<u32>),
    UI64Matrix(usize, usize, Vec<u64>),
    F32Matrix(usize, usize, Vec<f32>),
    F64Matrix(usize, usize, Vec<f64>),
    C32Matrix(usize, usize, Vec<(f32, f32)>),
    C64Matrix(usize, usize, Vec<(f64, f64)>),
}

impl Value {
    /// The wire type name, exactly as it appears in the `type`
    /// attribute. Matrix names are never aliased to another type's
    /// name: `F32Matrix` and `F64Matrix` round-trip under their own
    /// names.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Monostate => "Monostate",
            Value::Boolean(_) => "Boolean",
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::UInt8(_) => "UInt8",
            Value::UInt16(_) => "UInt16",
            Value::UInt32(_) => "UInt32",
            Value::UInt64(_) => "UInt64",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Complex32(_, _) => "Complex32",
            Value::Complex64(_, _) => "Complex64",
            Value::String(_) => "String",
            Value::TimePoint(_) => "TimePoint",
            Value::I8Vector(_) => "I8Vector",
            Value::I16Vector(_) => "I16Vector",
            Value::I32Vector(_) => "I32Vector",
            Value::I64Vector(_) => "I64Vector",
            Value::UI8Vector(_) => "UI8Vector",
            Value::UI16Vector(_) => "UI16Vector",
            Value::UI32Vector(_) => "UI32Vector",
            Value::UI64Vector(_) => "UI64Vector",
            Value::F32Vector(_) => "F32Vector",
            Value::F64Vector(_) => "F64Vector",
            Value::C32Vector(_) => "C32Vector",
            Value::C64Vector(_) => "C64Vector",
            Value::I8Matrix(..) => "I8Matrix",
            Value::I16Matrix(..) => "I16Matrix",
            Value::I32Matrix(..) => "I32Matrix",
            Value::I64Matrix(..) => "I64Matrix",
            Value::UI8Matrix(..) => "UI8Matrix",
            Value::UI16Matrix(..) => "UI16Matrix",
            Value::UI32Matrix(..) => "UI32Matrix",
            Value::UI64Matrix(..) => "UI64Matrix",
            Value::F32Matrix(..) => "F32Matrix",
            Value::F64Matrix(..) => "F64Matrix",
            Value::C32Matrix(..) => "C32Matrix",
            Value::C64Matrix(..) => "C64Matrix",
        }
    }

    /// Parse a scalar value from its wire text form given the type
    /// name. Not valid for `Vector`/`Matrix` types, whose payload lives
    /// in a DataBlock rather than text (see `xisf-image`).
    pub fn parse_scalar(type_name: &str, text: &str) -> Result<Value> {
        let text = text.trim();
        Ok(match type_name {
            "Monostate" => Value::Monostate,
            "Boolean" => match text {
                "0" => Value::Boolean(false),
                "1" => Value::Boolean(true),
                other => return Err(invalid(type_name, other)),
            },
            "Int8" => Value::Int8(parse_num(type_name, text)?),
            "Int16" => Value::Int16(parse_num(type_name, text)?),
            "Int32" => Value::Int32(parse_num(type_name, text)?),
            "Int64" => Value::Int64(parse_num(type_name, text)?),
            "UInt8" => Value::UInt8(parse_num(type_name, text)?),
            "UInt16" => Value::UInt16(parse_num(type_name, text)?),
            "UInt32" => Value::UInt32(parse_num(type_name, text)?),
            "UInt64" => Value::UInt64(parse_num(type_name, text)?),
            "Float32" => Value::Float32(parse_num(type_name, text)?),
            "Float64" => Value::Float64(parse_num(type_name, text)?),
            "Complex32" => {
                let (re, im) = parse_complex(type_name, text)?;
                Value::Complex32(re as f32, im as f32)
            }
            "Complex64" => {
                let (re, im) = parse_complex(type_name, text)?;
                Value::Complex64(re, im)
            }
            "String" => Value::String(text.to_string()),
            "TimePoint" => Value::TimePoint(parse_time_point(type_name, text)?),
            other => return Err(Error::InvalidValue(format!("unknown type name: {other}"))),
        })
    }

    /// Format a scalar value to its wire text form. Not valid for
    /// `Vector`/`Matrix`/`String` — callers choose attribute vs. inner
    /// text for `String` themselves.
    pub fn format_scalar(&self) -> Option<String> {
        Some(match self {
            Value::Monostate => String::new(),
            Value::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::UInt8(v) => v.to_string(),
            Value::UInt16(v) => v.to_string(),
            Value::UInt32(v) => v.to_string(),
            Value::UInt64(v) => v.to_string(),
            Value::Float32(v) => format_float(*v as f64),
            Value::Float64(v) => format_float(*v),
            Value::Complex32(re, im) => format!("({},{})", format_float(*re as f64), format_float(*im as f64)),
            Value::Complex64(re, im) => format!("({},{})", format_float(*re), format_float(*im)),
            Value::String(s) => s.clone(),
            Value::TimePoint(t) => t.to_rfc3339_opts(SecondsFormat::Secs, true),
            _ => return None,
        })
    }

    /// The element type of a `Vector`/`Matrix` value, or `None` for a
    /// scalar.
    pub fn element_type(&self) -> Option<ElementType> {
        use ElementType::*;
        Some(match self {
            Value::I8Vector(_) | Value::I8Matrix(..) => I8,
            Value::I16Vector(_) | Value::I16Matrix(..) => I16,
            Value::I32Vector(_) | Value::I32Matrix(..) => I32,
            Value::I64Vector(_) | Value::I64Matrix(..) => I64,
            Value::UI8Vector(_) | Value::UI8Matrix(..) => UI8,
            Value::UI16Vector(_) | Value::UI16Matrix(..) => UI16,
            Value::UI32Vector(_) | Value::UI32Matrix(..) => UI32,
            Value::UI64Vector(_) | Value::UI64Matrix(..) => UI64,
            Value::F32Vector(_) | Value::F32Matrix(..) => F32,
            Value::F64Vector(_) | Value::F64Matrix(..) => F64,
            Value::C32Vector(_) | Value::C32Matrix(..) => C32,
            Value::C64Vector(_) | Value::C64Matrix(..) => C64,
            _ => return None,
        })
    }

    /// Element count of a `Vector`, or `None` for anything else.
    pub fn vector_len(&self) -> Option<usize> {
        Some(match self {
            Value::I8Vector(v) => v.len(),
            Value::I16Vector(v) => v.len(),
            Value::I32Vector(v) => v.len(),
            Value::I64Vector(v) => v.len(),
            Value::UI8Vector(v) => v.len(),
            Value::UI16Vector(v) => v.len(),
            Value::UI32Vector(v) => v.len(),
            Value::UI64Vector(v) => v.len(),
            Value::F32Vector(v) => v.len(),
            Value::F64Vector(v) => v.len(),
            Value::C32Vector(v) => v.len(),
            Value::C64Vector(v) => v.len(),
            _ => return None,
        })
    }

    /// `(rows, columns)` of a `Matrix`, or `None` for anything else.
    pub fn matrix_dims(&self) -> Option<(usize, usize)> {
        Some(match self {
            Value::I8Matrix(r, c, _) => (*r, *c),
            Value::I16Matrix(r, c, _) => (*r, *c),
            Value::I32Matrix(r, c, _) => (*r, *c),
            Value::I64Matrix(r, c, _) => (*r, *c),
            Value::UI8Matrix(r, c, _) => (*r, *c),
            Value::UI16Matrix(r, c, _) => (*r, *c),
            Value::UI32Matrix(r, c, _) => (*r, *c),
            Value::UI64Matrix(r, c, _) => (*r, *c),
            Value::F32Matrix(r, c, _) => (*r, *c),
            Value::F64Matrix(r, c, _) => (*r, *c),
            Value::C32Matrix(r, c, _) => (*r, *c),
            Value::C64Matrix(r, c, _) => (*r, *c),
            _ => return None,
        })
    }

    /// Encode a `Vector`/`Matrix` payload as raw little-endian sample
    /// bytes, row-major for matrices. `None` for scalar variants.
    pub fn to_le_bytes(&self) -> Option<Vec<u8>> {
        macro_rules! pack_ints {
            ($v:expr) => {
                $v.iter().flat_map(|x| x.to_le_bytes()).collect()
            };
        }
        macro_rules! pack_complex {
            ($v:expr) => {
                $v.iter()
                    .flat_map(|(re, im)| re.to_le_bytes().into_iter().chain(im.to_le_bytes()))
                    .collect()
            };
        }
        Some(match self {
            Value::I8Vector(v) | Value::I8Matrix(_, _, v) => pack_ints!(v),
            Value::I16Vector(v) | Value::I16Matrix(_, _, v) => pack_ints!(v),
            Value::I32Vector(v) | Value::I32Matrix(_, _, v) => pack_ints!(v),
            Value::I64Vector(v) | Value::I64Matrix(_, _, v) => pack_ints!(v),
            Value::UI8Vector(v) | Value::UI8Matrix(_, _, v) => pack_ints!(v),
            Value::UI16Vector(v) | Value::UI16Matrix(_, _, v) => pack_ints!(v),
            Value::UI32Vector(v) | Value::UI32Matrix(_, _, v) => pack_ints!(v),
            Value::UI64Vector(v) | Value::UI64Matrix(_, _, v) => pack_ints!(v),
            Value::F32Vector(v) | Value::F32Matrix(_, _, v) => pack_ints!(v),
            Value::F64Vector(v) | Value::F64Matrix(_, _, v) => pack_ints!(v),
            Value::C32Vector(v) | Value::C32Matrix(_, _, v) => pack_complex!(v),
            Value::C64Vector(v) | Value::C64Matrix(_, _, v) => pack_complex!(v),
            _ => return None,
        })
    }

    /// Decode a `Vector` from its type name and raw little-endian bytes.
    pub fn vector_from_le_bytes(type_name: &str, bytes: &[u8]) -> Result<Value> {
        let prefix = type_name
            .strip_suffix("Vector")
            .ok_or_else(|| Error::InvalidValue(format!("unknown type name: {type_name}")))?;
        let elem = ElementType::from_prefix(prefix).ok_or_else(|| Error::InvalidValue(format!("unknown type name: {type_name}")))?;
        if bytes.len() % elem.byte_size() != 0 {
            return Err(Error::InvalidValue(format!(
                "{type_name} payload length {} is not a multiple of element size {}",
                bytes.len(),
                elem.byte_size()
            )));
        }
        build_vector(elem, bytes)
    }

    /// Decode a `Matrix` from its type name, declared `rows`/`columns`,
    /// and raw little-endian row-major bytes.
    pub fn matrix_from_le_bytes(type_name: &str, rows: usize, columns: usize, bytes: &[u8]) -> Result<Value> {
        let prefix = type_name
            .strip_suffix("Matrix")
            .ok_or_else(|| Error::InvalidValue(format!("unknown type name: {type_name}")))?;
        let elem = ElementType::from_prefix(prefix).ok_or_else(|| Error::InvalidValue(format!("unknown type name: {type_name}")))?;
        let expected_len = rows
            .checked_mul(columns)
            .and_then(|n| n.checked_mul(elem.byte_size()))
            .ok_or_else(|| Error::InvalidValue(format!("{type_name} dimensions overflow")))?;
        if bytes.len() != expected_len {
            return Err(Error::InvalidValue(format!(
                "{type_name} expected {expected_len} bytes for {rows}x{columns}, got {}",
                bytes.len()
            )));
        }
        build_matrix(elem, rows, columns, bytes)
    }
}

fn build_vector(elem: ElementType, bytes: &[u8]) -> Result<Value> {
    macro_rules! unpack_ints {
        ($ty:ty, $variant:ident) => {{
            let n = elem.byte_size();
            let values: Vec<$ty> = bytes
                .chunks_exact(n)
                .map(|c| <$ty>::from_le_bytes(c.try_into().unwrap()))
                .collect();
            Value::$variant(values)
        }};
    }
    Ok(match elem {
        ElementType::I8 => unpack_ints!(i8, I8Vector),
        ElementType::I16 => unpack_ints!(i16, I16Vector),
        ElementType::I32 => unpack_ints!(i32, I32Vector),
        ElementType::I64 => unpack_ints!(i64, I64Vector),
        ElementType::UI8 => unpack_ints!(u8, UI8Vector),
        ElementType::UI16 => unpack_ints!(u16, UI16Vector),
        ElementType::UI32 => unpack_ints!(u32, UI32Vector),
        ElementType::UI64 => unpack_ints!(u64, UI64Vector),
        ElementType::F32 => unpack_ints!(f32, F32Vector),
        ElementType::F64 => unpack_ints!(f64, F64Vector),
        ElementType::C32 => Value::C32Vector(unpack_complex32(bytes)),
        ElementType::C64 => Value::C64Vector(unpack_complex64(bytes)),
    })
}

fn build_matrix(elem: ElementType, rows: usize, columns: usize, bytes: &[u8]) -> Result<Value> {
    macro_rules! unpack_ints {
        ($ty:ty, $variant:ident) => {{
            let n = elem.byte_size();
            let values: Vec<$ty> = bytes
                .chunks_exact(n)
                .map(|c| <$ty>::from_le_bytes(c.try_into().unwrap()))
                .collect();
            Value::$variant(rows, columns, values)
        }};
    }
    Ok(match elem {
        ElementType::I8 => unpack_ints!(i8, I8Matrix),
        ElementType::I16 => unpack_ints!(i16, I16Matrix),
        ElementType::I32 => unpack_ints!(i32, I32Matrix),
        ElementType::I64 => unpack_ints!(i64, I64Matrix),
        ElementType::UI8 => unpack_ints!(u8, UI8Matrix),
        ElementType::UI16 => unpack_ints!(u16, UI16Matrix),
        ElementType::UI32 => unpack_ints!(u32, UI32Matrix),
        ElementType::UI64 => unpack_ints!(u64, UI64Matrix),
        ElementType::F32 => unpack_ints!(f32, F32Matrix),
        ElementType::F64 => unpack_ints!(f64, F64Matrix),
        ElementType::C32 => Value::C32Matrix(rows, columns, unpack_complex32(bytes)),
        ElementType::C64 => Value::C64Matrix(rows, columns, unpack_complex64(bytes)),
    })
}

fn unpack_complex32(bytes: &[u8]) -> Vec<(f32, f32)> {
    bytes
        .chunks_exact(8)
        .map(|c| {
            let re = f32::from_le_bytes(c[0..4].try_into().unwrap());
            let im = f32::from_le_bytes(c[4..8].try_into().unwrap());
            (re, im)
        })
        .collect()
}

fn unpack_complex64(bytes: &[u8]) -> Vec<(f64, f64)> {
    bytes
        .chunks_exact(16)
        .map(|c| {
            let re = f64::from_le_bytes(c[0..8].try_into().unwrap());
            let im = f64::from_le_bytes(c[8..16].try_into().unwrap());
            (re, im)
        })
        .collect()
}

fn invalid(type_name: &str, text: &str) -> Error {
    Error::InvalidValue(format!("malformed {type_name} text: {text:?}"))
}

fn parse_num<T: std::str::FromStr>(type_name: &str, text: &str) -> Result<T> {
    text.parse().map_err(|_| invalid(type_name, text))
}

/// C-locale float formatting: Rust's `Display` for `f32`/`f64` is
/// already locale-independent, matching the wire requirement directly.
fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn parse_complex(type_name: &str, text: &str) -> Result<(f64, f64)> {
    let inner = text
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| invalid(type_name, text))?;
    let (re, im) = inner.split_once(',').ok_or_else(|| invalid(type_name, text))?;
    let re: f64 = re.trim().parse().map_err(|_| invalid(type_name, text))?;
    let im: f64 = im.trim().parse().map_err(|_| invalid(type_name, text))?;
    Ok((re, im))
}

fn parse_time_point(type_name: &str, text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid(type_name, text))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.format_scalar() {
            return write!(f, "{text}");
        }
        match (self.element_type(), self.vector_len(), self.matrix_dims()) {
            (Some(elem), Some(len), _) => write!(f, "<{}[{}Vector] {} elements>", elem.prefix(), elem.prefix(), len),
            (Some(elem), _, Some((rows, cols))) => {
                write!(f, "<{}Matrix {}x{}>", elem.prefix(), rows, cols)
            }
            _ => write!(f, "<value>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Monostate, Monostate) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Int8(a), Int8(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt8(a), UInt8(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Float32(a), Float32(b)) => a.to_bits() == b.to_bits(),
            (Float64(a), Float64(b)) => a.to_bits() == b.to_bits(),
            (Complex32(ar, ai), Complex32(br, bi)) => ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits(),
            (Complex64(ar, ai), Complex64(br, bi)) => ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits(),
            (String(a), String(b)) => a == b,
            (TimePoint(a), TimePoint(b)) => a == b,
            (I8Vector(a), I8Vector(b)) => a == b,
            (I16Vector(a), I16Vector(b)) => a == b,
            (I32Vector(a), I32Vector(b)) => a == b,
            (I64Vector(a), I64Vector(b)) => a == b,
            (UI8Vector(a), UI8Vector(b)) => a == b,
            (UI16Vector(a), UI16Vector(b)) => a == b,
            (UI32Vector(a), UI32Vector(b)) => a == b,
            (UI64Vector(a), UI64Vector(b)) => a == b,
            (F32Vector(a), F32Vector(b)) => f32_slice_bits_eq(a, b),
            (F64Vector(a), F64Vector(b)) => f64_slice_bits_eq(a, b),
            (C32Vector(a), C32Vector(b)) => c32_slice_bits_eq(a, b),
            (C64Vector(a), C64Vector(b)) => c64_slice_bits_eq(a, b),
            (I8Matrix(r1, c1, a), I8Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && a == b,
            (I16Matrix(r1, c1, a), I16Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && a == b,
            (I32Matrix(r1, c1, a), I32Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && a == b,
            (I64Matrix(r1, c1, a), I64Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && a == b,
            (UI8Matrix(r1, c1, a), UI8Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && a == b,
            (UI16Matrix(r1, c1, a), UI16Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && a == b,
            (UI32Matrix(r1, c1, a), UI32Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && a == b,
            (UI64Matrix(r1, c1, a), UI64Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && a == b,
            (F32Matrix(r1, c1, a), F32Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && f32_slice_bits_eq(a, b),
            (F64Matrix(r1, c1, a), F64Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && f64_slice_bits_eq(a, b),
            (C32Matrix(r1, c1, a), C32Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && c32_slice_bits_eq(a, b),
            (C64Matrix(r1, c1, a), C64Matrix(r2, c2, b)) => r1 == r2 && c1 == c2 && c64_slice_bits_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

fn f32_slice_bits_eq(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn f64_slice_bits_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn c32_slice_bits_eq(a: &[(f32, f32)], b: &[(f32, f32)]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.0.to_bits() == y.0.to_bits() && x.1.to_bits() == y.1.to_bits())
}

fn c64_slice_bits_eq(a: &[(f64, f64)], b: &[(f64, f64)]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.0.to_bits() == y.0.to_bits() && x.1.to_bits() == y.1.to_bits())
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Monostate => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int8(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::UInt8(v) => v.hash(state),
            Value::UInt16(v) => v.hash(state),
            Value::UInt32(v) => v.hash(state),
            Value::UInt64(v) => v.hash(state),
            Value::Float32(v) => v.to_bits().hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Complex32(re, im) => {
                re.to_bits().hash(state);
                im.to_bits().hash(state);
            }
            Value::Complex64(re, im) => {
                re.to_bits().hash(state);
                im.to_bits().hash(state);
            }
            Value::String(v) => v.hash(state),
            Value::TimePoint(v) => v.hash(state),
            _ => {
                // Vector/Matrix payloads are hashed via their byte
                // representation; identical content hashes identically
                // regardless of element type's in-memory width quirks.
                if let Some(bytes) = self.to_le_bytes() {
                    bytes.hash(state);
                }
                if let Some((rows, cols)) = self.matrix_dims() {
                    rows.hash(state);
                    cols.hash(state);
                }
            }
        }
    }
}
