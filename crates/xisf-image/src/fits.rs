//! Legacy FITS keyword triples and their adoption into typed properties.

use xisf_value::Value;

use crate::error::{Error, Result};
use crate::property::Property;

/// A legacy astronomical metadata triple. Values remain textual; use
/// [`FITSKeyword::as_property`] to convert a recognized keyword into a
/// typed [`Property`].
#[derive(Debug, Clone, PartialEq)]
pub struct FITSKeyword {
    pub name: String,
    pub value: String,
    pub comment: String,
}

impl FITSKeyword {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comment: String::new(),
        }
    }

    /// Convert to a typed `Property` if `name` appears in the FITS
    /// mapping table, parsing `value` per the mapped target type.
    /// `APTDIA`/`FOCALLEN` millimeters are divided by 1000 to store
    /// meters. Returns `Ok(None)` for an unmapped keyword name.
    pub fn as_property(&self) -> Result<Option<Property>> {
        let Some((id, kind)) = lookup(&self.name) else {
            return Ok(None);
        };
        let value = kind.parse(&self.value)?;
        Ok(Some(Property::new(id, value).with_comment(self.comment.clone())))
    }
}

#[derive(Debug, Clone, Copy)]
enum TargetKind {
    Str,
    F32,
    F64,
    I32,
    Time,
    /// Millimeters on the wire, stored in meters.
    F32DivThousand,
}

impl TargetKind {
    fn parse(self, text: &str) -> Result<Value> {
        let text = text.trim();
        Ok(match self {
            TargetKind::Str => Value::String(text.to_string()),
            TargetKind::F32 => Value::parse_scalar("Float32", text)?,
            TargetKind::F64 => Value::parse_scalar("Float64", text)?,
            TargetKind::I32 => match Value::parse_scalar("Int32", text)? {
                v @ Value::Int32(_) => v,
                _ => unreachable!(),
            },
            TargetKind::Time => Value::parse_scalar("TimePoint", text)?,
            TargetKind::F32DivThousand => match Value::parse_scalar("Float64", text)? {
                Value::Float64(v) => Value::Float32((v / 1000.0) as f32),
                _ => unreachable!(),
            },
        })
    }
}

fn lookup(name: &str) -> Option<(&'static str, TargetKind)> {
    use TargetKind::*;
    Some(match name {
        "OBSERVER" => ("Observer:Name", Str),
        "RADECSYS" => ("Observation:CelestialReferenceSystem", Str),
        "CRVAL1" => ("Observation:Center:Dec", F64),
        "CRVAL2" => ("Observation:Center:RA", F64),
        "CRPIX1" => ("Observation:Center:X", F64),
        "CRPIX2" => ("Observation:Center:Y", F64),
        "EQUINOX" => ("Observation:Equinox", F64),
        "SITELAT" => ("Observation:Location:Latitude", F64),
        "SITELONG" => ("Observation:Location:Longitude", F64),
        "OBJECT" => ("Observation:Object:Name", Str),
        "DEC" => ("Observation:Object:Dec", F64),
        "RA" => ("Observation:Object:RA", F64),
        "DATE-OBS" => ("Observation:Time:Start", Time),
        "DATE-END" => ("Observation:Time:End", Time),
        "GAIN" => ("Instrument:Camera:Gain", F32),
        "ISOSPEED" => ("Instrument:Camera:ISOSpeed", I32),
        "INSTRUME" => ("Instrument:Camera:Name", Str),
        "ROTATANG" => ("Instrument:Camera:Rotation", F32),
        "XBINNING" => ("Instrument:Camera:XBinning", I32),
        "YBINNING" => ("Instrument:Camera:YBinning", I32),
        "EXPTIME" => ("Instrument:ExposureTime", F32),
        "FILTER" => ("Instrument:Filter:Name", Str),
        "FOCUSPOS" => ("Instrument:Focuser:Position", F32),
        "CCD-TEMP" => ("Instrument:Sensor:Temperature", F32),
        "APTDIA" => ("Instrument:Telescope:Aperture", F32DivThousand),
        "FOCALLEN" => ("Instrument:Telescope:FocalLength", F32DivThousand),
        "TELESCOP" => ("Instrument:Telescope:Name", Str),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_keyword_yields_none() {
        let kw = FITSKeyword::new("BSCALE", "1.0");
        assert!(kw.as_property().unwrap().is_none());
    }

    #[test]
    fn string_keyword_maps() {
        let kw = FITSKeyword::new("TELESCOP", "  Celestron 8  ");
        let prop = kw.as_property().unwrap().unwrap();
        assert_eq!(prop.id, "Instrument:Telescope:Name");
        assert_eq!(prop.value, Value::String("Celestron 8".to_string()));
    }

    #[test]
    fn millimeter_keywords_convert_to_meters() {
        let kw = FITSKeyword::new("FOCALLEN", "2000.0");
        let prop = kw.as_property().unwrap().unwrap();
        assert_eq!(prop.id, "Instrument:Telescope:FocalLength");
        assert_eq!(prop.value, Value::Float32(2.0));
    }

    #[test]
    fn time_keyword_parses_as_time_point() {
        let kw = FITSKeyword::new("DATE-OBS", "2024-03-14T09:26:53Z");
        let prop = kw.as_property().unwrap().unwrap();
        assert_eq!(prop.id, "Observation:Time:Start");
        assert!(matches!(prop.value, Value::TimePoint(_)));
    }

    #[test]
    fn integer_keyword_maps() {
        let kw = FITSKeyword::new("XBINNING", "2");
        let prop = kw.as_property().unwrap().unwrap();
        assert_eq!(prop.value, Value::Int32(2));
    }
}
