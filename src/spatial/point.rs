//! Points, the base values of temporal points, and general geometries used
//! as arguments of spatial operations.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use geo::{BoundingRect, Contains, Intersects, Relate};
use geo_types::{Coord, Geometry};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;
use wkt::ToWkt;

use crate::catalog::MeosType;
use crate::datatype::{DataType, SpatialContext, format_float};
use crate::error::{MeosError, Result};
use crate::io::wkb::{WkbReader, WkbWriter};
use crate::time::float_round;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
/// Default SRID of geodetic values.
pub const WGS84_SRID: i32 = 4326;

lazy_static! {
    static ref SRID_RE: Regex = Regex::new(r"(?i)^\s*SRID\s*=\s*(-?\d+)\s*;\s*").unwrap();
    static ref POINT_RE: Regex = Regex::new(
        r"(?i)^\s*POINT\s*(Z)?\s*\(\s*([-+0-9.eE]+|nan|inf)\s+([-+0-9.eE]+|nan|inf)(?:\s+([-+0-9.eE]+))?\s*\)\s*$"
    ).unwrap();
}

/// Split an optional `SRID=n;` prefix from EWKT-like text.
pub fn split_srid(text: &str) -> Result<(Option<i32>, &str)> {
    match SRID_RE.captures(text) {
        Some(caps) => {
            let srid = caps[1]
                .parse::<i32>()
                .map_err(|_| MeosError::parse(format!("Invalid SRID: {}", &caps[1])))?;
            Ok((Some(srid), &text[caps[0].len()..]))
        }
        None => Ok((None, text)),
    }
}

pub(crate) fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub srid: i32,
    pub geodetic: bool,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y, z: None, srid: 0, geodetic: false }
    }

    pub fn new_3d(x: f64, y: f64, z: f64) -> Point {
        Point { x, y, z: Some(z), srid: 0, geodetic: false }
    }

    /// Longitude/latitude point on the WGS84 spheroid.
    pub fn geodetic(lon: f64, lat: f64) -> Point {
        Point { x: lon, y: lat, z: None, srid: WGS84_SRID, geodetic: true }
    }

    pub fn with_srid(mut self, srid: i32) -> Point {
        self.srid = srid;
        self
    }

    pub fn has_z(&self) -> bool {
        self.z.is_some()
    }

    pub fn to_geo(&self) -> geo_types::Point<f64> {
        geo_types::Point::new(self.x, self.y)
    }

    pub fn coord(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }

    /// Distance in the units of the reference system, meters when geodetic.
    pub fn distance(&self, other: &Point) -> f64 {
        if self.geodetic {
            return haversine_distance(self.y, self.x, other.y, other.x);
        }
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        match (self.z, other.z) {
            (Some(z1), Some(z2)) => (dx * dx + dy * dy + (z2 - z1) * (z2 - z1)).sqrt(),
            _ => (dx * dx + dy * dy).sqrt(),
        }
    }

    /// Point at `ratio` of the way to `other`.
    pub fn lerp(&self, other: &Point, ratio: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * ratio,
            y: self.y + (other.y - self.y) * ratio,
            z: match (self.z, other.z) {
                (Some(z1), Some(z2)) => Some(z1 + (z2 - z1) * ratio),
                _ => None,
            },
            srid: self.srid,
            geodetic: self.geodetic,
        }
    }

    /// Azimuth from this point to `other` in radians, clockwise from north.
    pub fn azimuth(&self, other: &Point) -> Option<f64> {
        if self.x == other.x && self.y == other.y {
            return None;
        }
        let az = if self.geodetic {
            let (lat1, lat2) = (self.y.to_radians(), other.y.to_radians());
            let dlon = (other.x - self.x).to_radians();
            let y = dlon.sin() * lat2.cos();
            let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
            y.atan2(x)
        } else {
            (other.x - self.x).atan2(other.y - self.y)
        };
        Some(if az < 0.0 { az + 2.0 * std::f64::consts::PI } else { az })
    }

    pub(crate) fn same_coords(&self, other: &Point) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }

    pub(crate) fn check_same_srid(&self, other: &Point) -> Result<()> {
        if self.srid != other.srid {
            return Err(MeosError::value(format!(
                "Operation on mixed SRID: {} and {}",
                self.srid, other.srid
            )));
        }
        Ok(())
    }

    pub(crate) fn check_same_dimensionality(&self, other: &Point) -> Result<()> {
        if self.has_z() != other.has_z() {
            return Err(MeosError::value("Operation on mixed 2D/3D dimensions".to_string()));
        }
        Ok(())
    }

    fn output_coords(&self, maxdd: usize) -> String {
        match self.z {
            Some(z) => format!("{} {} {}", format_float(self.x, maxdd), format_float(self.y, maxdd), format_float(z, maxdd)),
            None => format!("{} {}", format_float(self.x, maxdd), format_float(self.y, maxdd)),
        }
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.same_coords(other) && self.srid == other.srid
    }
}

impl DataType for Point {
    const UID: MeosType = MeosType::Geometry;
    const DATA_TYPE: &'static str = "geometry";
    fn compare(&self, other: &Self) -> Ordering {
        let cmp = |a: f64, b: f64| a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        cmp(self.x, other.x)
            .then_with(|| cmp(self.y, other.y))
            .then_with(|| cmp(self.z.unwrap_or(0.0), other.z.unwrap_or(0.0)))
            .then_with(|| self.srid.cmp(&other.srid))
    }
    fn parse(text: &str) -> Result<Point> {
        let (srid, rest) = split_srid(text)?;
        let caps = POINT_RE
            .captures(rest)
            .ok_or_else(|| MeosError::parse(format!("Invalid point: \"{}\"", text.trim())))?;
        let coord = |i: usize| -> Result<Option<f64>> {
            match caps.get(i) {
                Some(m) => m
                    .as_str()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| MeosError::parse(format!("Invalid coordinate: {}", m.as_str()))),
                None => Ok(None),
            }
        };
        let x = coord(2)?.unwrap_or(0.0);
        let y = coord(3)?.unwrap_or(0.0);
        let z = coord(4)?;
        if caps.get(1).is_some() && z.is_none() {
            return Err(MeosError::parse(format!("Missing Z coordinate: \"{}\"", text.trim())));
        }
        Ok(Point { x, y, z, srid: srid.unwrap_or(0), geodetic: false })
    }
    fn output(&self, maxdd: usize) -> String {
        match self.z {
            Some(_) => format!("POINT Z ({})", self.output_coords(maxdd)),
            None => format!("POINT({})", self.output_coords(maxdd)),
        }
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_f64(self.x);
        w.put_f64(self.y);
        if let Some(z) = self.z {
            w.put_f64(z);
        }
    }
    fn read_wkb(r: &mut WkbReader, ctx: &SpatialContext) -> Result<Point> {
        let x = r.get_f64()?;
        let y = r.get_f64()?;
        let z = if ctx.has_z { Some(r.get_f64()?) } else { None };
        Ok(Point { x, y, z, srid: ctx.srid, geodetic: ctx.geodetic })
    }
    fn hash_value(&self) -> u64 {
        let mut bytes = Vec::with_capacity(28);
        bytes.extend_from_slice(&self.x.to_le_bytes());
        bytes.extend_from_slice(&self.y.to_le_bytes());
        if let Some(z) = self.z {
            bytes.extend_from_slice(&z.to_le_bytes());
        }
        bytes.extend_from_slice(&self.srid.to_le_bytes());
        seahash::hash(&bytes)
    }
    fn round(&self, maxdd: usize) -> Point {
        Point {
            x: float_round(self.x, maxdd),
            y: float_round(self.y, maxdd),
            z: self.z.map(|z| float_round(z, maxdd)),
            ..*self
        }
    }
    fn meos_type(&self) -> MeosType {
        if self.geodetic { MeosType::Geography } else { MeosType::Geometry }
    }
    fn spatial_context(&self) -> Option<SpatialContext> {
        Some(SpatialContext { has_z: self.has_z(), srid: self.srid, geodetic: self.geodetic })
    }
    fn with_spatial_context(mut self, ctx: &SpatialContext) -> Point {
        self.geodetic = ctx.geodetic;
        if ctx.srid != 0 {
            self.srid = ctx.srid;
        } else if ctx.geodetic && self.srid == 0 {
            self.srid = WGS84_SRID;
        }
        self
    }
    fn to_json(&self, maxdd: usize) -> Result<JsonValue> {
        let mut coords = vec![float_round(self.x, maxdd), float_round(self.y, maxdd)];
        if let Some(z) = self.z {
            coords.push(float_round(z, maxdd));
        }
        Ok(serde_json::json!(coords))
    }
    fn from_json(value: &JsonValue, ctx: &SpatialContext) -> Result<Point> {
        let coords: Vec<f64> = value
            .as_array()
            .ok_or_else(|| MeosError::MfjsonInput(format!("Expected coordinates, found {}", value)))?
            .iter()
            .map(|c| c.as_f64().ok_or_else(|| MeosError::MfjsonInput(format!("Invalid coordinate {}", c))))
            .collect::<Result<_>>()?;
        match coords.as_slice() {
            [x, y] => Ok(Point { x: *x, y: *y, z: None, srid: ctx.srid, geodetic: ctx.geodetic }),
            [x, y, z] => Ok(Point { x: *x, y: *y, z: Some(*z), srid: ctx.srid, geodetic: ctx.geodetic }),
            _ => Err(MeosError::MfjsonInput(format!("Invalid number of coordinates: {}", coords.len()))),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.srid != 0 {
            write!(f, "SRID={};", self.srid)?;
        }
        write!(f, "{}", self.output(crate::session::session().float_digits()))
    }
}

/// A planar geometry with its reference system, the argument of spatial
/// relationships and restrictions.
#[derive(Debug, Clone)]
pub struct Geom {
    pub geom: Geometry<f64>,
    pub srid: i32,
    pub geodetic: bool,
}

impl Geom {
    pub fn new(geom: Geometry<f64>, srid: i32) -> Geom {
        Geom { geom, srid, geodetic: false }
    }

    /// Parse WKT with an optional `SRID=n;` prefix.
    pub fn parse(text: &str) -> Result<Geom> {
        let (srid, rest) = split_srid(text)?;
        let geom = parse_wkt(rest)?;
        Ok(Geom { geom, srid: srid.unwrap_or(0), geodetic: false })
    }

    pub fn from_point(p: &Point) -> Geom {
        Geom { geom: Geometry::Point(p.to_geo()), srid: p.srid, geodetic: p.geodetic }
    }

    pub fn is_empty(&self) -> bool {
        match &self.geom {
            Geometry::GeometryCollection(gc) => gc.0.is_empty(),
            Geometry::MultiPoint(mp) => mp.0.is_empty(),
            Geometry::MultiLineString(ml) => ml.0.is_empty(),
            Geometry::MultiPolygon(mp) => mp.0.is_empty(),
            Geometry::LineString(ls) => ls.0.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> String {
        self.geom.wkt_string()
    }

    pub fn as_ewkt(&self) -> String {
        if self.srid != 0 { format!("SRID={};{}", self.srid, self.as_text()) } else { self.as_text() }
    }

    pub fn bounding_rect(&self) -> Option<geo_types::Rect<f64>> {
        self.geom.bounding_rect()
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        self.geom.contains(&p.to_geo())
    }

    pub fn intersects_point(&self, p: &Point) -> bool {
        self.geom.intersects(&p.to_geo())
    }

    /// The point lies on the boundary of the geometry.
    pub fn touches_point(&self, p: &Point) -> bool {
        let pg: Geometry<f64> = Geometry::Point(p.to_geo());
        self.geom.relate(&pg).is_touches()
    }

    pub fn distance_point(&self, p: &Point) -> f64 {
        crate::spatial::relate::point_geometry_distance(p, &self.geom, self.geodetic || p.geodetic)
    }

    pub(crate) fn check_srid(&self, srid: i32) -> Result<()> {
        if self.srid != srid {
            return Err(MeosError::value(format!("Operation on mixed SRID: {} and {}", srid, self.srid)));
        }
        Ok(())
    }
}

impl fmt::Display for Geom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_ewkt())
    }
}

pub fn parse_wkt(wkt: &str) -> Result<Geometry<f64>> {
    wkt::Wkt::from_str(wkt.trim())
        .map_err(|e| MeosError::parse(format!("{:?}", e)))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| MeosError::parse(format!("{:?}", e)))
        })
}
