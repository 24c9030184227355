//! Moving Features JSON (OGC MF-JSON) encoding of temporal values.

use serde_json::{Map, Value as JsonValue, json};
use tracing::debug;

use crate::catalog::{Interpolation, MeosType};
use crate::datatype::SpatialContext;
use crate::error::{MeosError, Result};
use crate::spatial::point::{Point, WGS84_SRID};
use crate::span::TstzSpan;
use crate::stbox::STBox;
use crate::tbox::{NumSpan, TBox};
use crate::temporal::{TInstant, TSequence, TSequenceSet, Temporal, TemporalValue};
use crate::time::{TimestampTz, format_timestamp, float_round, parse_timestamp};

/// Bounding boxes that have an MF-JSON `bbox` member.
pub trait MfjsonBox {
    fn bbox_json(&self, precision: usize) -> Option<JsonValue>;
}

impl MfjsonBox for TstzSpan {
    fn bbox_json(&self, _precision: usize) -> Option<JsonValue> {
        None
    }
}

impl MfjsonBox for TBox {
    fn bbox_json(&self, precision: usize) -> Option<JsonValue> {
        self.span.map(|s| match s {
            NumSpan::Int(s) => json!([s.lower(), s.upper()]),
            NumSpan::Float(s) => json!([float_round(s.lower, precision), float_round(s.upper, precision)]),
        })
    }
}

impl MfjsonBox for STBox {
    fn bbox_json(&self, precision: usize) -> Option<JsonValue> {
        let f = |v: f64| float_round(v, precision);
        self.space.map(|s| match s.z {
            Some((zmin, zmax)) => json!([[f(s.xmin), f(s.ymin), f(zmin)], [f(s.xmax), f(s.ymax), f(zmax)]]),
            None => json!([[f(s.xmin), f(s.ymin)], [f(s.xmax), f(s.ymax)]]),
        })
    }
}

fn type_name(temptype: MeosType) -> Result<&'static str> {
    match temptype {
        MeosType::TBool => Ok("MovingBoolean"),
        MeosType::TInt => Ok("MovingInteger"),
        MeosType::TFloat => Ok("MovingFloat"),
        MeosType::TText => Ok("MovingText"),
        MeosType::TGeomPoint | MeosType::TGeogPoint => Ok("MovingPoint"),
        other => Err(MeosError::MfjsonOutput(format!("Type {} has no MF-JSON representation", other))),
    }
}

fn accepts_type_name(temptype: MeosType, name: &str) -> bool {
    match temptype {
        MeosType::TGeomPoint | MeosType::TGeogPoint => {
            matches!(name, "MovingPoint" | "MovingGeomPoint" | "MovingGeogPoint")
        }
        other => type_name(other).map(|n| n == name).unwrap_or(false),
    }
}

fn datetime_json(t: &TimestampTz) -> JsonValue {
    JsonValue::String(format_timestamp(t).replacen(' ', "T", 1))
}

fn is_point<V: TemporalValue>() -> bool {
    V::TEMPORAL_TYPE == MeosType::TGeomPoint
}

fn period_json(period: &TstzSpan) -> JsonValue {
    json!({
        "begin": datetime_json(&period.lower),
        "end": datetime_json(&period.upper),
        "lowerInc": period.lower_inc,
        "upperInc": period.upper_inc,
    })
}

fn instants_json<V: TemporalValue>(instants: &[TInstant<V>], precision: usize, out: &mut Map<String, JsonValue>) -> Result<()> {
    let values = instants.iter().map(|i| i.value.to_json(precision)).collect::<Result<Vec<JsonValue>>>()?;
    let datetimes: Vec<JsonValue> = instants.iter().map(|i| datetime_json(&i.t)).collect();
    out.insert(if is_point::<V>() { "coordinates" } else { "values" }.to_string(), JsonValue::Array(values));
    out.insert("datetimes".to_string(), JsonValue::Array(datetimes));
    Ok(())
}

fn sequence_json<V: TemporalValue>(seq: &TSequence<V>, precision: usize, out: &mut Map<String, JsonValue>) -> Result<()> {
    instants_json(&seq.instants, precision, out)?;
    if !seq.is_discrete() {
        out.insert("lowerInc".to_string(), JsonValue::Bool(seq.lower_inc));
        out.insert("upperInc".to_string(), JsonValue::Bool(seq.upper_inc));
    }
    Ok(())
}

impl<V: TemporalValue> Temporal<V>
where
    V::BBox: MfjsonBox,
{
    /// MF-JSON of the value. `precision` bounds the decimal digits of
    /// floats; `srs` overrides the coordinate reference system name of
    /// points, which defaults to `EPSG:<srid>`.
    pub fn as_mfjson(&self, with_bbox: bool, precision: usize, srs: Option<&str>) -> Result<String> {
        let mut out = Map::new();
        out.insert("type".to_string(), JsonValue::String(type_name(self.temporal_type())?.to_string()));
        if is_point::<V>() {
            let srid = self.start_instant().value.spatial_context().map(|c| c.srid).unwrap_or(0);
            let name = match srs {
                Some(name) => Some(name.to_string()),
                None if srid != 0 => Some(format!("EPSG:{}", srid)),
                None => None,
            };
            if let Some(name) = name {
                out.insert("crs".to_string(), json!({"type": "Name", "properties": {"name": name}}));
            }
        }
        if with_bbox {
            if let Some(bbox) = self.bbox().bbox_json(precision) {
                out.insert("bbox".to_string(), bbox);
            }
            out.insert("period".to_string(), period_json(&self.tstzspan()));
        }
        match self {
            Temporal::Instant(i) => {
                let key = if is_point::<V>() { "coordinates" } else { "value" };
                out.insert(key.to_string(), i.value.to_json(precision)?);
                out.insert("datetime".to_string(), datetime_json(&i.t));
                out.insert("interpolation".to_string(), JsonValue::String("None".to_string()));
            }
            Temporal::Sequence(s) => {
                sequence_json(s, precision, &mut out)?;
                out.insert("interpolation".to_string(), JsonValue::String(s.interp.to_string()));
            }
            Temporal::SequenceSet(ss) => {
                let sequences = ss
                    .sequences
                    .iter()
                    .map(|s| {
                        let mut seq = Map::new();
                        sequence_json(s, precision, &mut seq)?;
                        Ok(JsonValue::Object(seq))
                    })
                    .collect::<Result<Vec<JsonValue>>>()?;
                out.insert("sequences".to_string(), JsonValue::Array(sequences));
                out.insert("interpolation".to_string(), JsonValue::String(ss.interp().to_string()));
            }
        }
        Ok(serde_json::to_string(&JsonValue::Object(out))?)
    }
}

fn member<'a>(obj: &'a JsonValue, key: &str) -> Result<&'a JsonValue> {
    obj.get(key).ok_or_else(|| MeosError::MfjsonInput(format!("Missing '{}' member", key)))
}

fn array<'a>(obj: &'a JsonValue, key: &str) -> Result<&'a Vec<JsonValue>> {
    member(obj, key)?
        .as_array()
        .ok_or_else(|| MeosError::MfjsonInput(format!("Member '{}' must be an array", key)))
}

fn datetime(value: &JsonValue) -> Result<TimestampTz> {
    let text = value
        .as_str()
        .ok_or_else(|| MeosError::MfjsonInput(format!("Invalid datetime {}", value)))?;
    parse_timestamp(text).map_err(|e| MeosError::MfjsonInput(e.to_string()))
}

fn bool_member(obj: &JsonValue, key: &str, default: bool) -> Result<bool> {
    match obj.get(key) {
        None => Ok(default),
        Some(v) => v.as_bool().ok_or_else(|| MeosError::MfjsonInput(format!("Member '{}' must be a boolean", key))),
    }
}

/// SRID of a `crs` member, from names such as `EPSG:4326` or
/// `urn:ogc:def:crs:EPSG::4326`.
fn crs_srid(obj: &JsonValue) -> Result<Option<i32>> {
    let Some(crs) = obj.get("crs") else {
        return Ok(None);
    };
    let name = crs
        .pointer("/properties/name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| MeosError::MfjsonInput("Invalid 'crs' member".to_string()))?;
    name.rsplit(':')
        .next()
        .and_then(|code| code.parse::<i32>().ok())
        .map(Some)
        .ok_or_else(|| MeosError::MfjsonInput(format!("Unsupported reference system: {}", name)))
}

fn parse_instants<V: TemporalValue>(obj: &JsonValue, ctx: &SpatialContext) -> Result<Vec<TInstant<V>>> {
    let values = array(obj, if is_point::<V>() { "coordinates" } else { "values" })?;
    let datetimes = array(obj, "datetimes")?;
    if values.len() != datetimes.len() {
        return Err(MeosError::MfjsonInput("Values and datetimes differ in length".to_string()));
    }
    values
        .iter()
        .zip(datetimes)
        .map(|(v, t)| Ok(TInstant::make(V::from_json(v, ctx)?, datetime(t)?)))
        .collect()
}

fn parse_sequence<V: TemporalValue>(obj: &JsonValue, ctx: &SpatialContext, interp: Interpolation) -> Result<TSequence<V>> {
    let instants = parse_instants(obj, ctx)?;
    let lower_inc = bool_member(obj, "lowerInc", true)?;
    let upper_inc = bool_member(obj, "upperInc", true)?;
    TSequence::make(instants, lower_inc, upper_inc, interp, true)
}

pub(crate) fn from_mfjson_with<V: TemporalValue>(text: &str, geodetic: bool) -> Result<Temporal<V>> {
    let obj: JsonValue = serde_json::from_str(text)?;
    let name = member(&obj, "type")?.as_str().unwrap_or_default();
    if !accepts_type_name(V::TEMPORAL_TYPE, name) {
        return Err(MeosError::MfjsonInput(format!("Unexpected MF-JSON type \"{}\" for {}", name, V::TEMPORAL_TYPE)));
    }
    let srid = match crs_srid(&obj)? {
        Some(srid) => srid,
        None if geodetic => WGS84_SRID,
        None => 0,
    };
    let ctx = SpatialContext { has_z: false, srid, geodetic };
    let interp_name = obj.get("interpolation").and_then(|i| i.as_str()).unwrap_or("None");
    debug!(kind = name, interpolation = interp_name, "Reading MF-JSON");
    if obj.get("sequences").is_some() {
        let interp = Interpolation::from_name(interp_name).map_err(|e| MeosError::MfjsonInput(e.to_string()))?;
        let sequences = array(&obj, "sequences")?
            .iter()
            .map(|s| parse_sequence(s, &ctx, interp))
            .collect::<Result<Vec<TSequence<V>>>>()?;
        return Ok(Temporal::SequenceSet(TSequenceSet::make(sequences, true)?));
    }
    if obj.get("datetime").is_some() {
        let value = member(&obj, if is_point::<V>() { "coordinates" } else { "value" })?;
        let t = datetime(member(&obj, "datetime")?)?;
        return Ok(Temporal::Instant(TInstant::make(V::from_json(value, &ctx)?, t)));
    }
    if interp_name == "None" {
        return Err(MeosError::MfjsonInput("A sequence needs an interpolation".to_string()));
    }
    let interp = Interpolation::from_name(interp_name).map_err(|e| MeosError::MfjsonInput(e.to_string()))?;
    Ok(Temporal::Sequence(parse_sequence(&obj, &ctx, interp)?))
}

impl<V: TemporalValue> Temporal<V> {
    pub fn from_mfjson(text: &str) -> Result<Temporal<V>> {
        from_mfjson_with(text, false)
    }
}

impl Temporal<Point> {
    /// Read a temporal geography point; the SRID defaults to WGS84.
    pub fn from_mfjson_geog(text: &str) -> Result<Temporal<Point>> {
        from_mfjson_with(text, true)
    }
}
