// used for dates and timestamps
use chrono::NaiveDate;

// used to compare values under the total order of their type
use std::cmp::Ordering;
// used to print out readable forms of a data type
use std::fmt;

use serde_json::Value as JsonValue;

use crate::catalog::MeosType;
use crate::error::{MeosError, Result};
use crate::io::wkb::{WkbReader, WkbWriter};
use crate::time::{
    TimestampTz, USECS_PER_SEC, date_from_pg_days, date_to_pg_days, float_round, format_date, format_timestamp,
    from_pg_micros, parse_date, parse_timestamp, to_pg_micros,
};

/// Spatial context carried by a collection rather than by each of its
/// values: dimensionality, reference system and geodetic flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpatialContext {
    pub has_z: bool,
    pub srid: i32,
    pub geodetic: bool,
}

/// A base type that can appear in sets, spans and temporal values.
pub trait DataType: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    // static stuff which needs to be implemented downstream
    const UID: MeosType;
    const DATA_TYPE: &'static str;
    fn compare(&self, other: &Self) -> Ordering;
    fn parse(text: &str) -> Result<Self>;
    fn output(&self, maxdd: usize) -> String;
    fn write_wkb(&self, w: &mut WkbWriter);
    fn read_wkb(r: &mut WkbReader, ctx: &SpatialContext) -> Result<Self>;
    fn hash_value(&self) -> u64;
    // instance callable with pre-made implementation
    fn round(&self, _maxdd: usize) -> Self {
        self.clone()
    }
    fn meos_type(&self) -> MeosType {
        Self::UID
    }
    fn data_type(&self) -> &'static str {
        Self::DATA_TYPE
    }
    fn identifier(&self) -> u16 {
        self.meos_type() as u16
    }
    fn spatial_context(&self) -> Option<SpatialContext> {
        None
    }
    fn with_spatial_context(self, _ctx: &SpatialContext) -> Self {
        self
    }
    fn to_json(&self, _maxdd: usize) -> Result<JsonValue> {
        Err(MeosError::MfjsonOutput(format!("Type {} has no MF-JSON representation", Self::DATA_TYPE)))
    }
    fn from_json(_value: &JsonValue, _ctx: &SpatialContext) -> Result<Self> {
        Err(MeosError::MfjsonInput(format!("Type {} has no MF-JSON representation", Self::DATA_TYPE)))
    }
    fn eq_value(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

/// A base type over which spans can be built.
pub trait SpanBase: DataType + Copy + PartialOrd {
    /// Distance between two values: integral for discrete types, seconds for
    /// timestamps, real for floats.
    type Delta: Copy + PartialOrd + fmt::Debug + fmt::Display;
    const DISCRETE: bool;
    /// Next value of a discrete type, `None` past the greatest value.
    fn succ(&self) -> Option<Self>;
    fn pred(&self) -> Option<Self>;
    fn delta(&self, other: &Self) -> Result<Self::Delta>;
    fn zero_delta() -> Self::Delta;
    fn to_f64(&self) -> f64;
}

/// Number types: arithmetic used by shift/scale, bins and temporal numbers.
pub trait NumberBase: SpanBase {
    fn zero() -> Self;
    fn from_f64(v: f64) -> Self;
    fn add(&self, other: &Self) -> Result<Self>;
    fn sub(&self, other: &Self) -> Result<Self>;
    fn mul(&self, other: &Self) -> Result<Self>;
    fn div(&self, other: &Self) -> Result<Self>;
    fn abs(&self) -> Result<Self>;
    /// `from_f64` failing for floats outside the range of an integer type.
    fn checked_from_f64(v: f64) -> Result<Self> {
        let value = Self::from_f64(v);
        if Self::DISCRETE && value.to_f64() != v.floor() {
            return Err(MeosError::OutOfRange(format!("Value out of range for type {}: {}", Self::DATA_TYPE, v)));
        }
        Ok(value)
    }
    fn is_zero(&self) -> bool {
        self.to_f64() == 0.0
    }
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    seahash::hash(bytes)
}

pub(crate) fn format_float(d: f64, maxdd: usize) -> String {
    let r = float_round(d, maxdd);
    // never print a negative zero
    if r == 0.0 { "0".to_string() } else { format!("{}", r) }
}

fn parse_float(text: &str) -> Result<f64> {
    let t = text.trim();
    match t.to_ascii_lowercase().as_str() {
        "inf" | "infinity" | "+inf" | "+infinity" => return Ok(f64::INFINITY),
        "-inf" | "-infinity" => return Ok(f64::NEG_INFINITY),
        _ => {}
    }
    t.parse::<f64>()
        .map_err(|_| MeosError::parse(format!("Invalid input syntax for type double: \"{}\"", t)))
}

// ------------- Data Types --------------
impl DataType for bool {
    const UID: MeosType = MeosType::Bool;
    const DATA_TYPE: &'static str = "bool";
    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn parse(text: &str) -> Result<bool> {
        match text.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "1" | "y" | "yes" | "on" => Ok(true),
            "f" | "false" | "0" | "n" | "no" | "off" => Ok(false),
            other => Err(MeosError::parse(format!("Invalid input syntax for type boolean: \"{}\"", other))),
        }
    }
    fn output(&self, _maxdd: usize) -> String {
        if *self { "t".into() } else { "f".into() }
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_u8(*self as u8);
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<bool> {
        Ok(r.get_u8()? != 0)
    }
    fn hash_value(&self) -> u64 {
        hash_bytes(&[*self as u8])
    }
    fn to_json(&self, _maxdd: usize) -> Result<JsonValue> {
        Ok(JsonValue::Bool(*self))
    }
    fn from_json(value: &JsonValue, _ctx: &SpatialContext) -> Result<bool> {
        value.as_bool().ok_or_else(|| MeosError::MfjsonInput(format!("Expected a boolean, found {}", value)))
    }
}

impl DataType for i32 {
    const UID: MeosType = MeosType::Int4;
    const DATA_TYPE: &'static str = "int4";
    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn parse(text: &str) -> Result<i32> {
        text.trim()
            .parse::<i32>()
            .map_err(|_| MeosError::parse(format!("Invalid input syntax for type integer: \"{}\"", text.trim())))
    }
    fn output(&self, _maxdd: usize) -> String {
        self.to_string()
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_i32(*self);
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<i32> {
        r.get_i32()
    }
    fn hash_value(&self) -> u64 {
        hash_bytes(&self.to_le_bytes())
    }
    fn to_json(&self, _maxdd: usize) -> Result<JsonValue> {
        Ok(JsonValue::from(*self))
    }
    fn from_json(value: &JsonValue, _ctx: &SpatialContext) -> Result<i32> {
        value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| MeosError::MfjsonInput(format!("Expected an integer, found {}", value)))
    }
}

impl DataType for i64 {
    const UID: MeosType = MeosType::Int8;
    const DATA_TYPE: &'static str = "int8";
    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn parse(text: &str) -> Result<i64> {
        text.trim()
            .parse::<i64>()
            .map_err(|_| MeosError::parse(format!("Invalid input syntax for type bigint: \"{}\"", text.trim())))
    }
    fn output(&self, _maxdd: usize) -> String {
        self.to_string()
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_i64(*self);
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<i64> {
        r.get_i64()
    }
    fn hash_value(&self) -> u64 {
        hash_bytes(&self.to_le_bytes())
    }
}

impl DataType for f64 {
    const UID: MeosType = MeosType::Float8;
    const DATA_TYPE: &'static str = "float8";
    fn compare(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
    fn parse(text: &str) -> Result<f64> {
        parse_float(text)
    }
    fn output(&self, maxdd: usize) -> String {
        format_float(*self, maxdd)
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_f64(*self);
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<f64> {
        r.get_f64()
    }
    fn hash_value(&self) -> u64 {
        // 0.0 and -0.0 compare equal and must hash equal
        let v = if *self == 0.0 { 0.0f64 } else { *self };
        hash_bytes(&v.to_le_bytes())
    }
    fn round(&self, maxdd: usize) -> f64 {
        float_round(*self, maxdd)
    }
    fn to_json(&self, maxdd: usize) -> Result<JsonValue> {
        serde_json::Number::from_f64(float_round(*self, maxdd))
            .map(JsonValue::Number)
            .ok_or_else(|| MeosError::MfjsonOutput(format!("Cannot represent {} in JSON", self)))
    }
    fn from_json(value: &JsonValue, _ctx: &SpatialContext) -> Result<f64> {
        value.as_f64().ok_or_else(|| MeosError::MfjsonInput(format!("Expected a number, found {}", value)))
    }
}

impl DataType for String {
    const UID: MeosType = MeosType::Text;
    const DATA_TYPE: &'static str = "text";
    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn parse(text: &str) -> Result<String> {
        let t = text.trim();
        if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
            let mut out = String::with_capacity(t.len());
            let mut chars = t[1..t.len() - 1].chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else {
                    out.push(c);
                }
            }
            Ok(out)
        } else {
            Ok(t.to_string())
        }
    }
    fn output(&self, _maxdd: usize) -> String {
        let mut out = String::with_capacity(self.len() + 2);
        out.push('"');
        for c in self.chars() {
            if c == '"' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
        out
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_u64(self.len() as u64 + 1);
        w.put_bytes(self.as_bytes());
        w.put_u8(0);
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<String> {
        let size = r.get_u64()?;
        if size == 0 || size > r.remaining() as u64 {
            return Err(MeosError::WkbInput(format!("Invalid text size {}", size)));
        }
        let size = size as usize;
        let bytes = r.get_bytes(size)?;
        let text = &bytes[..size - 1];
        String::from_utf8(text.to_vec()).map_err(|e| MeosError::WkbInput(e.to_string()))
    }
    fn hash_value(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
    fn to_json(&self, _maxdd: usize) -> Result<JsonValue> {
        Ok(JsonValue::String(self.clone()))
    }
    fn from_json(value: &JsonValue, _ctx: &SpatialContext) -> Result<String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| MeosError::MfjsonInput(format!("Expected a string, found {}", value)))
    }
}

impl DataType for NaiveDate {
    const UID: MeosType = MeosType::Date;
    const DATA_TYPE: &'static str = "date";
    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn parse(text: &str) -> Result<NaiveDate> {
        parse_date(text)
    }
    fn output(&self, _maxdd: usize) -> String {
        format_date(self)
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_i32(date_to_pg_days(self));
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<NaiveDate> {
        date_from_pg_days(r.get_i32()?).map_err(|e| MeosError::WkbInput(e.to_string()))
    }
    fn hash_value(&self) -> u64 {
        hash_bytes(&date_to_pg_days(self).to_le_bytes())
    }
}

impl DataType for TimestampTz {
    const UID: MeosType = MeosType::TimestampTz;
    const DATA_TYPE: &'static str = "timestamptz";
    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn parse(text: &str) -> Result<TimestampTz> {
        parse_timestamp(text)
    }
    fn output(&self, _maxdd: usize) -> String {
        format_timestamp(self)
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_i64(to_pg_micros(self));
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<TimestampTz> {
        from_pg_micros(r.get_i64()?).map_err(|e| MeosError::WkbInput(e.to_string()))
    }
    fn hash_value(&self) -> u64 {
        hash_bytes(&to_pg_micros(self).to_le_bytes())
    }
}

// ------------- Span bases --------------
fn out_of_range<T: fmt::Display>(op: &str, a: T, b: T) -> MeosError {
    MeosError::OutOfRange(format!("Integer out of range: {} {} {}", a, op, b))
}

macro_rules! impl_integer_base {
    ($t:ty) => {
        impl SpanBase for $t {
            type Delta = $t;
            const DISCRETE: bool = true;
            fn succ(&self) -> Option<$t> {
                self.checked_add(1)
            }
            fn pred(&self) -> Option<$t> {
                self.checked_sub(1)
            }
            fn delta(&self, other: &$t) -> Result<$t> {
                other.checked_sub(*self).ok_or_else(|| out_of_range("-", *other, *self))
            }
            fn zero_delta() -> $t {
                0
            }
            fn to_f64(&self) -> f64 {
                *self as f64
            }
        }

        impl NumberBase for $t {
            fn zero() -> $t {
                0
            }
            fn from_f64(v: f64) -> $t {
                v.floor() as $t
            }
            fn add(&self, other: &$t) -> Result<$t> {
                self.checked_add(*other).ok_or_else(|| out_of_range("+", *self, *other))
            }
            fn sub(&self, other: &$t) -> Result<$t> {
                self.checked_sub(*other).ok_or_else(|| out_of_range("-", *self, *other))
            }
            fn mul(&self, other: &$t) -> Result<$t> {
                self.checked_mul(*other).ok_or_else(|| out_of_range("*", *self, *other))
            }
            fn div(&self, other: &$t) -> Result<$t> {
                if *other == 0 {
                    return Err(MeosError::DivisionByZero);
                }
                self.checked_div(*other).ok_or_else(|| out_of_range("/", *self, *other))
            }
            fn abs(&self) -> Result<$t> {
                self.checked_abs().ok_or_else(|| MeosError::OutOfRange(format!("Integer out of range: abs({})", self)))
            }
        }
    };
}

impl_integer_base!(i32);
impl_integer_base!(i64);

impl SpanBase for f64 {
    type Delta = f64;
    const DISCRETE: bool = false;
    fn succ(&self) -> Option<f64> {
        Some(*self)
    }
    fn pred(&self) -> Option<f64> {
        Some(*self)
    }
    fn delta(&self, other: &f64) -> Result<f64> {
        Ok(other - self)
    }
    fn zero_delta() -> f64 {
        0.0
    }
    fn to_f64(&self) -> f64 {
        *self
    }
}

impl SpanBase for NaiveDate {
    type Delta = i32;
    const DISCRETE: bool = true;
    fn succ(&self) -> Option<NaiveDate> {
        self.succ_opt()
    }
    fn pred(&self) -> Option<NaiveDate> {
        self.pred_opt()
    }
    fn delta(&self, other: &NaiveDate) -> Result<i32> {
        Ok((*other - *self).num_days() as i32)
    }
    fn zero_delta() -> i32 {
        0
    }
    fn to_f64(&self) -> f64 {
        date_to_pg_days(self) as f64
    }
}

impl SpanBase for TimestampTz {
    type Delta = f64;
    const DISCRETE: bool = false;
    fn succ(&self) -> Option<TimestampTz> {
        Some(*self)
    }
    fn pred(&self) -> Option<TimestampTz> {
        Some(*self)
    }
    fn delta(&self, other: &TimestampTz) -> Result<f64> {
        Ok(crate::time::seconds_between(self, other))
    }
    fn zero_delta() -> f64 {
        0.0
    }
    fn to_f64(&self) -> f64 {
        to_pg_micros(self) as f64 / USECS_PER_SEC as f64
    }
}

// ------------- Number bases --------------
impl NumberBase for f64 {
    fn zero() -> f64 {
        0.0
    }
    fn from_f64(v: f64) -> f64 {
        v
    }
    fn add(&self, other: &f64) -> Result<f64> {
        Ok(self + other)
    }
    fn sub(&self, other: &f64) -> Result<f64> {
        Ok(self - other)
    }
    fn mul(&self, other: &f64) -> Result<f64> {
        Ok(self * other)
    }
    fn div(&self, other: &f64) -> Result<f64> {
        if *other == 0.0 {
            return Err(MeosError::DivisionByZero);
        }
        Ok(self / other)
    }
    fn abs(&self) -> Result<f64> {
        Ok(f64::abs(*self))
    }
}

// Special types below, only used as partial aggregation states

/// Running (sum, count) of an average.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Double2(pub f64, pub f64);

/// Running (sum x, sum y, count) of a 2D centroid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Double3(pub f64, pub f64, pub f64);

/// Running (sum x, sum y, sum z, count) of a 3D centroid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Double4(pub f64, pub f64, pub f64, pub f64);

macro_rules! impl_double {
    ($name:ident, $uid:expr, $label:expr, $($field:tt),+) => {
        impl $name {
            pub fn add(&self, other: &$name) -> $name {
                $name($(self.$field + other.$field),+)
            }
            pub fn scale(&self, ratio: f64) -> $name {
                $name($(self.$field * ratio),+)
            }
            pub fn lerp(&self, other: &$name, ratio: f64) -> $name {
                $name($(self.$field + (other.$field - self.$field) * ratio),+)
            }
            fn fields(&self) -> Vec<f64> {
                vec![$(self.$field),+]
            }
        }
        impl DataType for $name {
            const UID: MeosType = $uid;
            const DATA_TYPE: &'static str = $label;
            fn compare(&self, other: &Self) -> Ordering {
                for (a, b) in self.fields().iter().zip(other.fields()) {
                    match a.partial_cmp(&b).unwrap_or(Ordering::Equal) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                Ordering::Equal
            }
            fn parse(_text: &str) -> Result<Self> {
                Err(MeosError::NotSupported(format!("Text input of {} values", $label)))
            }
            fn output(&self, maxdd: usize) -> String {
                let parts: Vec<String> = self.fields().iter().map(|v| format_float(*v, maxdd)).collect();
                format!("({})", parts.join(", "))
            }
            fn write_wkb(&self, w: &mut WkbWriter) {
                for v in self.fields() {
                    w.put_f64(v);
                }
            }
            fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<Self> {
                Ok($name($({ let _ = stringify!($field); r.get_f64()? }),+))
            }
            fn hash_value(&self) -> u64 {
                let bytes: Vec<u8> = self.fields().iter().flat_map(|v| v.to_le_bytes()).collect();
                hash_bytes(&bytes)
            }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.output(15))
            }
        }
    };
}

impl_double!(Double2, MeosType::Double2, "double2", 0, 1);
impl_double!(Double3, MeosType::Double3, "double3", 0, 1, 2);
impl_double!(Double4, MeosType::Double4, "double4", 0, 1, 2, 3);
