//! Network-constrained points: positions along the routes of the session
//! network, and temporal network points.

use std::cmp::Ordering;
use std::fmt;

use geo_types::{Geometry, LineString};
use lazy_static::lazy_static;
use regex::Regex;

use crate::catalog::{Interpolation, MeosType};
use crate::datatype::{DataType, SpatialContext, format_float};
use crate::error::{MeosError, Result};
use crate::io::wkb::{WkbReader, WkbWriter, from_hex, to_hex, value_as_wkb, value_from_wkb};
use crate::session::session;
use crate::span::TstzSpan;
use crate::spatial::network::{line_interpolate, line_length, line_locate, line_substring};
use crate::spatial::point::{Geom, Point};
use crate::spatial::tpoint::TPoint;
use crate::stbox::STBox;
use crate::temporal::{EPSILON, TFloat, TInstant, TSequence, Temporal, TemporalValue};
use crate::time::{float_round, seconds_between};

lazy_static! {
    static ref NPOINT_RE: Regex =
        Regex::new(r"(?i)^\s*NPOINT\s*\(\s*(-?\d+)\s*,\s*([-+0-9.eE]+)\s*\)\s*$").unwrap();
    static ref NSEGMENT_RE: Regex =
        Regex::new(r"(?i)^\s*NSEGMENT\s*\(\s*(-?\d+)\s*,\s*([-+0-9.eE]+)\s*,\s*([-+0-9.eE]+)\s*\)\s*$").unwrap();
}

pub type TNpoint = Temporal<Npoint>;

/// A position, as a fraction of the length, along a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Npoint {
    pub rid: i64,
    pub pos: f64,
}

/// The portion of a route between two fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nsegment {
    pub rid: i64,
    pub pos1: f64,
    pub pos2: f64,
}

fn check_position(pos: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&pos) {
        return Err(MeosError::value(format!("The relative position must be a real number between 0 and 1: {}", pos)));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse::<T>().map_err(|_| MeosError::parse(format!("Invalid {}: {}", what, text)))
}

impl Npoint {
    pub fn make(rid: i64, pos: f64) -> Result<Npoint> {
        check_position(pos)?;
        Ok(Npoint { rid, pos })
    }

    pub fn to_nsegment(&self) -> Nsegment {
        Nsegment { rid: self.rid, pos1: self.pos, pos2: self.pos }
    }

    /// Position in the reference system of the network.
    pub fn to_geompoint(&self) -> Result<Point> {
        npoint_to_geompoint(self)
    }

    pub fn stbox(&self) -> Result<STBox> {
        Ok(STBox::from_point(&npoint_to_geompoint(self)?))
    }

    pub fn as_wkb(&self, variant: u8) -> Vec<u8> {
        value_as_wkb(self, variant)
    }

    pub fn as_hexwkb(&self, variant: u8) -> String {
        to_hex(&self.as_wkb(variant))
    }

    pub fn from_wkb(data: &[u8]) -> Result<Npoint> {
        value_from_wkb(data)
    }

    pub fn from_hexwkb(text: &str) -> Result<Npoint> {
        Npoint::from_wkb(&from_hex(text)?)
    }
}

impl Nsegment {
    /// The positions are ordered so that `pos1 <= pos2`.
    pub fn make(rid: i64, pos1: f64, pos2: f64) -> Result<Nsegment> {
        check_position(pos1)?;
        check_position(pos2)?;
        Ok(Nsegment { rid, pos1: pos1.min(pos2), pos2: pos1.max(pos2) })
    }

    pub fn start_position(&self) -> f64 {
        self.pos1
    }

    pub fn end_position(&self) -> f64 {
        self.pos2
    }

    pub fn contains(&self, np: &Npoint) -> bool {
        self.rid == np.rid && self.pos1 <= np.pos && np.pos <= self.pos2
    }
}

impl DataType for Npoint {
    const UID: MeosType = MeosType::Npoint;
    const DATA_TYPE: &'static str = "npoint";
    fn compare(&self, other: &Self) -> Ordering {
        self.rid.cmp(&other.rid).then_with(|| self.pos.partial_cmp(&other.pos).unwrap_or(Ordering::Equal))
    }
    fn parse(text: &str) -> Result<Npoint> {
        let caps = NPOINT_RE
            .captures(text)
            .ok_or_else(|| MeosError::parse(format!("Could not parse network point: \"{}\"", text.trim())))?;
        Npoint::make(parse_number(&caps[1], "route identifier")?, parse_number(&caps[2], "position")?)
    }
    fn output(&self, maxdd: usize) -> String {
        format!("NPoint({}, {})", self.rid, format_float(self.pos, maxdd))
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_i64(self.rid);
        w.put_f64(self.pos);
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<Npoint> {
        let rid = r.get_i64()?;
        let pos = r.get_f64()?;
        Npoint::make(rid, pos).map_err(|e| MeosError::WkbInput(e.to_string()))
    }
    fn hash_value(&self) -> u64 {
        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&self.rid.to_le_bytes());
        bytes.extend_from_slice(&self.pos.to_le_bytes());
        seahash::hash(&bytes)
    }
    fn round(&self, maxdd: usize) -> Npoint {
        Npoint { rid: self.rid, pos: float_round(self.pos, maxdd) }
    }
}

impl DataType for Nsegment {
    const UID: MeosType = MeosType::Nsegment;
    const DATA_TYPE: &'static str = "nsegment";
    fn compare(&self, other: &Self) -> Ordering {
        let cmp = |a: f64, b: f64| a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        self.rid
            .cmp(&other.rid)
            .then_with(|| cmp(self.pos1, other.pos1))
            .then_with(|| cmp(self.pos2, other.pos2))
    }
    fn parse(text: &str) -> Result<Nsegment> {
        let caps = NSEGMENT_RE
            .captures(text)
            .ok_or_else(|| MeosError::parse(format!("Could not parse network segment: \"{}\"", text.trim())))?;
        Nsegment::make(
            parse_number(&caps[1], "route identifier")?,
            parse_number(&caps[2], "position")?,
            parse_number(&caps[3], "position")?,
        )
    }
    fn output(&self, maxdd: usize) -> String {
        format!("NSegment({}, {}, {})", self.rid, format_float(self.pos1, maxdd), format_float(self.pos2, maxdd))
    }
    fn write_wkb(&self, w: &mut WkbWriter) {
        w.put_i64(self.rid);
        w.put_f64(self.pos1);
        w.put_f64(self.pos2);
    }
    fn read_wkb(r: &mut WkbReader, _ctx: &SpatialContext) -> Result<Nsegment> {
        let rid = r.get_i64()?;
        let pos1 = r.get_f64()?;
        let pos2 = r.get_f64()?;
        Nsegment::make(rid, pos1, pos2).map_err(|e| MeosError::WkbInput(e.to_string()))
    }
    fn hash_value(&self) -> u64 {
        let mut bytes = Vec::with_capacity(24);
        bytes.extend_from_slice(&self.rid.to_le_bytes());
        bytes.extend_from_slice(&self.pos1.to_le_bytes());
        bytes.extend_from_slice(&self.pos2.to_le_bytes());
        seahash::hash(&bytes)
    }
    fn round(&self, maxdd: usize) -> Nsegment {
        Nsegment { rid: self.rid, pos1: float_round(self.pos1, maxdd), pos2: float_round(self.pos2, maxdd) }
    }
}

impl fmt::Display for Npoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.output(session().float_digits()))
    }
}

impl fmt::Display for Nsegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.output(session().float_digits()))
    }
}

impl TemporalValue for Npoint {
    type BBox = TstzSpan;
    const CONTINUOUS: bool = true;
    const TEMPORAL_TYPE: MeosType = MeosType::TNpoint;
    fn interpolate(&self, other: &Npoint, ratio: f64) -> Npoint {
        Npoint { rid: self.rid, pos: self.pos + (other.pos - self.pos) * ratio }
    }
    fn locate(&self, other: &Npoint, value: &Npoint) -> Option<f64> {
        if value.rid != self.rid {
            return None;
        }
        self.pos.locate(&other.pos, &value.pos)
    }
    fn approx_eq(&self, other: &Npoint) -> bool {
        self.rid == other.rid && (self.pos - other.pos).abs() <= EPSILON
    }
    fn crossings(&self, end: &Npoint, other: &Npoint, other_end: &Npoint) -> Vec<f64> {
        if self.rid != other.rid {
            return vec![];
        }
        self.pos.crossings(&end.pos, &other.pos, &other_end.pos)
    }
    fn distance_to(&self, other: &Npoint) -> Option<f64> {
        let a = npoint_to_geompoint(self).ok()?;
        let b = npoint_to_geompoint(other).ok()?;
        Some(a.distance(&b))
    }
    fn check_continuous(&self, next: &Npoint) -> Result<()> {
        if self.rid != next.rid {
            return Err(MeosError::InvalidArgValue(
                "All network points of a continuous sequence must be on the same route".into(),
            ));
        }
        Ok(())
    }
}

// ------------- Routes --------------
fn with_route<R, F: FnOnce(&LineString<f64>) -> R>(rid: i64, f: F) -> Result<R> {
    let s = session();
    let line = s
        .network()
        .route(rid)
        .ok_or_else(|| MeosError::InvalidArgValue(format!("There is no route with gid value {} in table ways", rid)))?;
    Ok(f(line))
}

pub fn route_exists(rid: i64) -> bool {
    session().network().route(rid).is_some()
}

pub fn route_geom(rid: i64) -> Result<Geom> {
    with_route(rid, |line| Geom::new(Geometry::LineString(line.clone()), 0))
}

pub fn route_length(rid: i64) -> Result<f64> {
    with_route(rid, line_length)
}

pub fn npoint_to_geompoint(np: &Npoint) -> Result<Point> {
    let c = with_route(np.rid, |line| line_interpolate(line, np.pos))?;
    Ok(Point::new(c.x, c.y))
}

/// Closest position on the network within a small tolerance of the point,
/// `None` when no route passes through it. Ties go to the smallest route
/// identifier.
pub fn geompoint_to_npoint(p: &Point) -> Option<Npoint> {
    let s = session();
    let mut routes: Vec<(&i64, &LineString<f64>)> = s.network().routes().collect();
    routes.sort_by_key(|(rid, _)| **rid);
    routes.into_iter().find_map(|(rid, line)| {
        let (pos, dist) = line_locate(line, p.coord());
        if dist <= EPSILON { Some(Npoint { rid: *rid, pos }) } else { None }
    })
}

pub fn nsegment_to_geom(ns: &Nsegment) -> Result<Geom> {
    let geom = with_route(ns.rid, |line| line_substring(line, ns.pos1, ns.pos2))?;
    Ok(Geom::new(geom, 0))
}

// ------------- Temporal network points --------------
impl Temporal<Npoint> {
    pub fn to_tgeompoint(&self) -> Result<TPoint> {
        self.map_values(npoint_to_geompoint)
    }

    /// Network form of a temporal point lying on the network. Continuous
    /// sequences must stay on one route.
    pub fn from_tgeompoint(temp: &TPoint) -> Result<TNpoint> {
        let result = temp.map_values(|p| {
            geompoint_to_npoint(p)
                .ok_or_else(|| MeosError::InvalidArgValue(format!("The point {} is not on the route network", p)))
        })?;
        for seq in result.pieces() {
            if seq.interp != Interpolation::Discrete {
                for w in seq.instants.windows(2) {
                    w[0].value.check_continuous(&w[1].value)?;
                }
            }
        }
        Ok(result)
    }

    /// Route of the value, which must be unique.
    pub fn route(&self) -> Result<i64> {
        let rid = self.start_instant().value.rid;
        if self.instants().iter().any(|i| i.value.rid != rid) {
            return Err(MeosError::InvalidArg("The temporal network point is defined on several routes".into()));
        }
        Ok(rid)
    }

    /// Distinct routes traversed.
    pub fn routes(&self) -> Vec<i64> {
        let mut rids: Vec<i64> = self.instants().iter().map(|i| i.value.rid).collect();
        rids.sort_unstable();
        rids.dedup();
        rids
    }

    /// Network segments covered by the value, merged when they overlap on
    /// the same route.
    pub fn positions(&self) -> Vec<Nsegment> {
        let mut segments: Vec<Nsegment> = vec![];
        for seq in self.pieces() {
            if seq.interp == Interpolation::Linear {
                let rid = seq.instants[0].value.rid;
                let (lo, hi) = seq
                    .instants
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), i| (lo.min(i.value.pos), hi.max(i.value.pos)));
                segments.push(Nsegment { rid, pos1: lo, pos2: hi });
            } else {
                segments.extend(seq.instants.iter().map(|i| i.value.to_nsegment()));
            }
        }
        segments.sort_by(|a, b| a.compare(b));
        let mut merged: Vec<Nsegment> = Vec::with_capacity(segments.len());
        for seg in segments {
            match merged.last_mut() {
                Some(last) if last.rid == seg.rid && seg.pos1 <= last.pos2 => last.pos2 = last.pos2.max(seg.pos2),
                _ => merged.push(seg),
            }
        }
        merged
    }

    /// Distance traveled along the routes.
    pub fn length(&self) -> Result<f64> {
        if self.interp() != Interpolation::Linear {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for seq in self.pieces() {
            let length = route_length(seq.instants[0].value.rid)?;
            total += seq.instants.windows(2).map(|w| (w[1].value.pos - w[0].value.pos).abs()).sum::<f64>() * length;
        }
        Ok(total)
    }

    /// Distance traveled since the start.
    pub fn cumulative_length(&self) -> Result<TFloat> {
        if self.interp() != Interpolation::Linear {
            return self.map_values(|_| Ok(0.0));
        }
        let mut total = 0.0;
        let mut pieces = vec![];
        for seq in self.pieces() {
            let length = route_length(seq.instants[0].value.rid)?;
            let mut instants = Vec::with_capacity(seq.num_instants());
            for (k, inst) in seq.instants.iter().enumerate() {
                if k > 0 {
                    total += (inst.value.pos - seq.instants[k - 1].value.pos).abs() * length;
                }
                instants.push(TInstant::make(total, inst.t));
            }
            pieces.push(TSequence::make_valid(instants, seq.lower_inc, seq.upper_inc, Interpolation::Linear, true));
        }
        Temporal::from_pieces(pieces, matches!(self, Temporal::Sequence(_)))
            .ok_or_else(|| MeosError::Internal("Empty cumulative length".into()))
    }

    /// Speed along the route in units per second. `None` for values without
    /// duration.
    pub fn speed(&self) -> Result<Option<TFloat>> {
        match self.interp() {
            Interpolation::Discrete => return Ok(None),
            _ if matches!(self, Temporal::Instant(_)) => return Ok(None),
            Interpolation::Step => return Ok(Some(self.map_values(|_| Ok(0.0))?)),
            Interpolation::Linear => {}
        }
        let mut pieces = vec![];
        for seq in self.pieces() {
            let n = seq.num_instants();
            if n < 2 {
                continue;
            }
            let length = route_length(seq.instants[0].value.rid)?;
            let mut instants: Vec<TInstant<f64>> = seq
                .instants
                .windows(2)
                .map(|w| {
                    let d = (w[1].value.pos - w[0].value.pos).abs() * length;
                    TInstant::make(d / seconds_between(&w[0].t, &w[1].t), w[0].t)
                })
                .collect();
            let last = instants[n - 2].value;
            instants.push(TInstant::make(last, seq.end_timestamp()));
            pieces.push(TSequence::make_valid(instants, seq.lower_inc, seq.upper_inc, Interpolation::Step, true));
        }
        Ok(Temporal::from_pieces(pieces, matches!(self, Temporal::Sequence(_))))
    }

    pub fn trajectory(&self) -> Result<Geom> {
        Ok(self.to_tgeompoint()?.trajectory())
    }

    pub fn stbox(&self) -> Result<STBox> {
        Ok(self.to_tgeompoint()?.stbox())
    }

    pub fn tdistance_npoint(&self, np: &Npoint) -> Result<TFloat> {
        self.to_tgeompoint()?.tdistance_point(&npoint_to_geompoint(np)?)
    }

    pub fn tdistance_point(&self, p: &Point) -> Result<TFloat> {
        self.to_tgeompoint()?.tdistance_point(p)
    }

    pub fn tdistance(&self, other: &TNpoint) -> Result<Option<TFloat>> {
        self.to_tgeompoint()?.tdistance(&other.to_tgeompoint()?)
    }

    pub fn nearest_approach_distance_npoint(&self, np: &Npoint) -> Result<f64> {
        self.to_tgeompoint()?.nearest_approach_distance_point(&npoint_to_geompoint(np)?)
    }

    pub fn nearest_approach_distance_geom(&self, geom: &Geom) -> Result<f64> {
        self.to_tgeompoint()?.nearest_approach_distance_geom(geom)
    }

    pub fn nearest_approach_distance(&self, other: &TNpoint) -> Result<Option<f64>> {
        self.to_tgeompoint()?.nearest_approach_distance(&other.to_tgeompoint()?)
    }

    /// Instant of the closest approach to a network point.
    pub fn nearest_approach_instant_npoint(&self, np: &Npoint) -> Result<TInstant<Npoint>> {
        let t = self.to_tgeompoint()?.nearest_approach_instant_point(&npoint_to_geompoint(np)?)?.t;
        self.value_at_timestamp(&t, false)
            .map(|v| TInstant::make(v, t))
            .ok_or_else(|| MeosError::Internal("The closest approach lies outside the time of the value".into()))
    }

    pub fn shortest_line_npoint(&self, np: &Npoint) -> Result<Geom> {
        self.to_tgeompoint()?.shortest_line_point(&npoint_to_geompoint(np)?)
    }

    pub fn shortest_line(&self, other: &TNpoint) -> Result<Option<Geom>> {
        self.to_tgeompoint()?.shortest_line(&other.to_tgeompoint()?)
    }
}
