//! Type catalog: the identifiers every value carries on the wire, their
//! canonical names, and the relations between base, collection and temporal
//! types.

use std::fmt;

use bimap::BiMap;
use lazy_static::lazy_static;

use crate::error::{MeosError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum MeosType {
    Unknown = 0,
    Bool = 1,
    Date = 2,
    DateSet = 5,
    DateSpan = 6,
    DateSpanSet = 7,
    Double2 = 8,
    Double3 = 9,
    Double4 = 10,
    Float8 = 11,
    FloatSet = 12,
    FloatSpan = 13,
    FloatSpanSet = 14,
    Int4 = 15,
    IntSet = 18,
    IntSpan = 19,
    IntSpanSet = 20,
    Int8 = 21,
    BigintSet = 22,
    BigintSpan = 23,
    BigintSpanSet = 24,
    STBox = 25,
    TBool = 26,
    TBox = 27,
    TDouble2 = 28,
    TDouble3 = 29,
    TDouble4 = 30,
    Text = 31,
    TextSet = 32,
    TFloat = 33,
    TimestampTz = 34,
    TInt = 35,
    TstzSet = 38,
    TstzSpan = 39,
    TstzSpanSet = 40,
    TText = 41,
    Geometry = 42,
    GeomSet = 43,
    Geography = 44,
    GeogSet = 45,
    TGeomPoint = 46,
    TGeogPoint = 47,
    Npoint = 48,
    NpointSet = 49,
    Nsegment = 50,
    TNpoint = 51,
}

const ALL_TYPES: [(MeosType, &str); 46] = [
    (MeosType::Unknown, "unknown"),
    (MeosType::Bool, "bool"),
    (MeosType::Date, "date"),
    (MeosType::DateSet, "dateset"),
    (MeosType::DateSpan, "datespan"),
    (MeosType::DateSpanSet, "datespanset"),
    (MeosType::Double2, "double2"),
    (MeosType::Double3, "double3"),
    (MeosType::Double4, "double4"),
    (MeosType::Float8, "float8"),
    (MeosType::FloatSet, "floatset"),
    (MeosType::FloatSpan, "floatspan"),
    (MeosType::FloatSpanSet, "floatspanset"),
    (MeosType::Int4, "int4"),
    (MeosType::IntSet, "intset"),
    (MeosType::IntSpan, "intspan"),
    (MeosType::IntSpanSet, "intspanset"),
    (MeosType::Int8, "int8"),
    (MeosType::BigintSet, "bigintset"),
    (MeosType::BigintSpan, "bigintspan"),
    (MeosType::BigintSpanSet, "bigintspanset"),
    (MeosType::STBox, "stbox"),
    (MeosType::TBool, "tbool"),
    (MeosType::TBox, "tbox"),
    (MeosType::TDouble2, "tdouble2"),
    (MeosType::TDouble3, "tdouble3"),
    (MeosType::TDouble4, "tdouble4"),
    (MeosType::Text, "text"),
    (MeosType::TextSet, "textset"),
    (MeosType::TFloat, "tfloat"),
    (MeosType::TimestampTz, "timestamptz"),
    (MeosType::TInt, "tint"),
    (MeosType::TstzSet, "tstzset"),
    (MeosType::TstzSpan, "tstzspan"),
    (MeosType::TstzSpanSet, "tstzspanset"),
    (MeosType::TText, "ttext"),
    (MeosType::Geometry, "geometry"),
    (MeosType::GeomSet, "geomset"),
    (MeosType::Geography, "geography"),
    (MeosType::GeogSet, "geogset"),
    (MeosType::TGeomPoint, "tgeompoint"),
    (MeosType::TGeogPoint, "tgeogpoint"),
    (MeosType::Npoint, "npoint"),
    (MeosType::NpointSet, "npointset"),
    (MeosType::Nsegment, "nsegment"),
    (MeosType::TNpoint, "tnpoint"),
];

lazy_static! {
    static ref TYPE_NAMES: BiMap<MeosType, &'static str> = ALL_TYPES.iter().copied().collect();
}

impl MeosType {
    pub fn name(&self) -> &'static str {
        TYPE_NAMES.get_by_left(self).copied().unwrap_or("unknown")
    }

    pub fn from_name(name: &str) -> Result<MeosType> {
        TYPE_NAMES
            .get_by_right(name.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| MeosError::InvalidArgType(format!("Unknown type name: {}", name)))
    }

    pub fn from_u16(value: u16) -> Result<MeosType> {
        ALL_TYPES
            .iter()
            .find(|(t, _)| *t as u16 == value)
            .map(|(t, _)| *t)
            .ok_or_else(|| MeosError::InvalidArgType(format!("Unknown type identifier: {}", value)))
    }

    /// Set type holding values of this base type.
    pub fn set_type(&self) -> Option<MeosType> {
        use MeosType::*;
        Some(match self {
            Int4 => IntSet,
            Int8 => BigintSet,
            Float8 => FloatSet,
            Text => TextSet,
            Date => DateSet,
            TimestampTz => TstzSet,
            Geometry => GeomSet,
            Geography => GeogSet,
            Npoint => NpointSet,
            _ => return None,
        })
    }

    pub fn span_type(&self) -> Option<MeosType> {
        use MeosType::*;
        Some(match self {
            Int4 | IntSet => IntSpan,
            Int8 | BigintSet => BigintSpan,
            Float8 | FloatSet => FloatSpan,
            Date | DateSet => DateSpan,
            TimestampTz | TstzSet => TstzSpan,
            IntSpanSet => IntSpan,
            BigintSpanSet => BigintSpan,
            FloatSpanSet => FloatSpan,
            DateSpanSet => DateSpan,
            TstzSpanSet => TstzSpan,
            _ => return None,
        })
    }

    pub fn spanset_type(&self) -> Option<MeosType> {
        use MeosType::*;
        Some(match self {
            Int4 | IntSpan => IntSpanSet,
            Int8 | BigintSpan => BigintSpanSet,
            Float8 | FloatSpan => FloatSpanSet,
            Date | DateSpan => DateSpanSet,
            TimestampTz | TstzSpan => TstzSpanSet,
            _ => return None,
        })
    }

    pub fn temporal_type(&self) -> Option<MeosType> {
        use MeosType::*;
        Some(match self {
            Bool => TBool,
            Int4 => TInt,
            Float8 => TFloat,
            Text => TText,
            Double2 => TDouble2,
            Double3 => TDouble3,
            Double4 => TDouble4,
            Geometry => TGeomPoint,
            Geography => TGeogPoint,
            Npoint => TNpoint,
            _ => return None,
        })
    }

    /// Base type of a collection or temporal type.
    pub fn base_type(&self) -> MeosType {
        use MeosType::*;
        match self {
            IntSet | IntSpan | IntSpanSet | TInt => Int4,
            BigintSet | BigintSpan | BigintSpanSet => Int8,
            FloatSet | FloatSpan | FloatSpanSet | TFloat => Float8,
            DateSet | DateSpan | DateSpanSet => Date,
            TstzSet | TstzSpan | TstzSpanSet => TimestampTz,
            TextSet | TText => Text,
            TBool => Bool,
            TDouble2 => Double2,
            TDouble3 => Double3,
            TDouble4 => Double4,
            GeomSet | TGeomPoint => Geometry,
            GeogSet | TGeogPoint => Geography,
            NpointSet | TNpoint => Npoint,
            other => *other,
        }
    }

    pub fn is_set_type(&self) -> bool {
        use MeosType::*;
        matches!(self, IntSet | BigintSet | FloatSet | TextSet | DateSet | TstzSet | GeomSet | GeogSet | NpointSet)
    }

    pub fn is_span_type(&self) -> bool {
        use MeosType::*;
        matches!(self, IntSpan | BigintSpan | FloatSpan | DateSpan | TstzSpan)
    }

    pub fn is_spanset_type(&self) -> bool {
        use MeosType::*;
        matches!(self, IntSpanSet | BigintSpanSet | FloatSpanSet | DateSpanSet | TstzSpanSet)
    }

    pub fn is_temporal_type(&self) -> bool {
        use MeosType::*;
        matches!(self, TBool | TInt | TFloat | TText | TDouble2 | TDouble3 | TDouble4 | TGeomPoint | TGeogPoint | TNpoint)
    }

    pub fn is_numeric(&self) -> bool {
        use MeosType::*;
        matches!(self.base_type(), Int4 | Int8 | Float8)
    }

    pub fn is_spatial(&self) -> bool {
        use MeosType::*;
        matches!(self.base_type(), Geometry | Geography | Npoint) || matches!(self, STBox | Nsegment)
    }

    /// Whether the base type admits linear interpolation.
    pub fn is_continuous(&self) -> bool {
        use MeosType::*;
        matches!(self.base_type(), Float8 | Double2 | Double3 | Double4 | Geometry | Geography | Npoint)
    }
}

impl fmt::Display for MeosType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Representation granularity of a temporal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TempSubtype {
    Instant = 1,
    Sequence = 2,
    SequenceSet = 3,
}

impl fmt::Display for TempSubtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TempSubtype::Instant => write!(f, "Instant"),
            TempSubtype::Sequence => write!(f, "Sequence"),
            TempSubtype::SequenceSet => write!(f, "SequenceSet"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Interpolation {
    Discrete = 1,
    Step = 2,
    Linear = 3,
}

impl Interpolation {
    pub fn from_name(name: &str) -> Result<Interpolation> {
        match name.trim().to_ascii_lowercase().as_str() {
            "discrete" => Ok(Interpolation::Discrete),
            "step" => Ok(Interpolation::Step),
            "linear" => Ok(Interpolation::Linear),
            other => Err(MeosError::value(format!("Unknown interpolation type: {}", other))),
        }
    }

    pub fn from_u8(value: u8) -> Result<Interpolation> {
        match value {
            1 => Ok(Interpolation::Discrete),
            2 => Ok(Interpolation::Step),
            3 => Ok(Interpolation::Linear),
            other => Err(MeosError::value(format!("Unknown interpolation code: {}", other))),
        }
    }

    pub fn is_continuous(&self) -> bool {
        !matches!(self, Interpolation::Discrete)
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Interpolation::Discrete => write!(f, "Discrete"),
            Interpolation::Step => write!(f, "Step"),
            Interpolation::Linear => write!(f, "Linear"),
        }
    }
}
