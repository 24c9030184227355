//! Temporal points: the point base type, spatial accessors, restrictions
//! to boxes and distances.

use geo::Intersects;
use geo_types::{Coord, Geometry, Line, LineString, MultiLineString, MultiPoint};

use crate::catalog::{Interpolation, MeosType};
use crate::error::{MeosError, Result};
use crate::span::{Span, TstzSpan};
use crate::spatial::point::{Geom, Point};
use crate::spatial::relate::{closest_coord, segment_geometry_nearest};
use crate::stbox::STBox;
use crate::temporal::lift::{LiftOp, lift_base, lift2};
use crate::temporal::split::merge_n_boxes;
use crate::temporal::{BoundingBox, EPSILON, TFloat, TInstant, TSequence, Temporal, TemporalValue};
use crate::time::{Interval, TimestampTz, seconds_between, time_at_ratio};

pub type TPoint = Temporal<Point>;

impl BoundingBox<Point> for STBox {
    fn from_instant(value: &Point, t: &TimestampTz) -> Self {
        STBox::from_point_timestamp(value, *t)
    }
    fn merge_with(&mut self, other: &Self) {
        *self = self.expand(other);
    }
    fn tstzspan(&self) -> TstzSpan {
        self.period.unwrap_or_else(|| Span::from_value(TimestampTz::default()))
    }
    fn set_period(&mut self, period: TstzSpan) {
        self.period = Some(period);
    }
}

/// Ratio of the closest approach of two synchronized moving points.
fn closest_approach(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> Vec<f64> {
    let z = |p: &Point| p.z.unwrap_or(0.0);
    let d0 = [a1.x - b1.x, a1.y - b1.y, z(a1) - z(b1)];
    let dd = [(a2.x - a1.x) - (b2.x - b1.x), (a2.y - a1.y) - (b2.y - b1.y), (z(a2) - z(a1)) - (z(b2) - z(b1))];
    let len2: f64 = dd.iter().map(|v| v * v).sum();
    if len2 == 0.0 {
        return vec![];
    }
    let r = -d0.iter().zip(dd.iter()).map(|(x, y)| x * y).sum::<f64>() / len2;
    vec![r]
}

impl TemporalValue for Point {
    type BBox = STBox;
    const CONTINUOUS: bool = true;
    const TEMPORAL_TYPE: MeosType = MeosType::TGeomPoint;
    fn interpolate(&self, other: &Point, ratio: f64) -> Point {
        self.lerp(other, ratio)
    }
    fn locate(&self, other: &Point, value: &Point) -> Option<f64> {
        let r = closest_approach(self, other, value, value).into_iter().next()?.clamp(0.0, 1.0);
        if self.lerp(other, r).distance(value) <= EPSILON { Some(r) } else { None }
    }
    fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= EPSILON
            && (self.y - other.y).abs() <= EPSILON
            && (self.z.unwrap_or(0.0) - other.z.unwrap_or(0.0)).abs() <= EPSILON
    }
    fn crossings(&self, end: &Point, other: &Point, other_end: &Point) -> Vec<f64> {
        closest_approach(self, end, other, other_end)
            .into_iter()
            .filter(|r| self.lerp(end, *r).distance(&other.lerp(other_end, *r)) <= EPSILON)
            .collect()
    }
    fn distance_to(&self, other: &Point) -> Option<f64> {
        Some(self.distance(other))
    }
    fn segment_distance(&self, start: &Point, end: &Point) -> Option<f64> {
        let c = crate::spatial::relate::closest_on_segment(self.coord(), start.coord(), end.coord());
        Some(self.distance(&Point { x: c.x, y: c.y, z: self.z, ..*self }))
    }
    fn check_compatible(&self, other: &Point) -> Result<()> {
        self.check_same_srid(other)?;
        self.check_same_dimensionality(other)
    }
    fn temporal_type(&self) -> MeosType {
        if self.geodetic { MeosType::TGeogPoint } else { MeosType::TGeomPoint }
    }
}

/// Geometry of a set of coordinates: a point or a multipoint.
fn points_geometry(mut coords: Vec<Coord<f64>>) -> Geometry<f64> {
    coords.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    coords.dedup();
    if coords.len() == 1 {
        Geometry::Point(coords[0].into())
    } else {
        Geometry::MultiPoint(MultiPoint::from(coords.into_iter().map(geo_types::Point::from).collect::<Vec<_>>()))
    }
}

fn seq_speed(seq: &TSequence<Point>) -> Option<TSequence<f64>> {
    let n = seq.num_instants();
    if n < 2 {
        return None;
    }
    let mut instants: Vec<TInstant<f64>> = seq
        .instants
        .windows(2)
        .map(|w| TInstant::make(w[0].value.distance(&w[1].value) / seconds_between(&w[0].t, &w[1].t), w[0].t))
        .collect();
    let last = instants[n - 2].value;
    instants.push(TInstant::make(last, seq.end_timestamp()));
    Some(TSequence::make_valid(instants, seq.lower_inc, seq.upper_inc, Interpolation::Step, true))
}

impl Temporal<Point> {
    pub fn srid(&self) -> i32 {
        self.start_instant().value.srid
    }

    pub fn is_geodetic(&self) -> bool {
        self.start_instant().value.geodetic
    }

    pub fn has_z(&self) -> bool {
        self.start_instant().value.has_z()
    }

    pub fn set_srid(&self, srid: i32) -> Result<TPoint> {
        self.map_values(|p| Ok(p.with_srid(srid)))
    }

    pub fn stbox(&self) -> STBox {
        self.bbox()
    }

    /// Boxes of every instant or segment.
    pub fn stboxes(&self) -> Vec<STBox> {
        self.segment_boxes()
    }

    /// At most `n` boxes, each merging consecutive segments.
    pub fn split_n_stboxes(&self, n: usize) -> Result<Vec<STBox>> {
        merge_n_boxes(self.segment_boxes(), n, |acc: &mut STBox, b: &STBox| *acc = acc.expand(b))
    }

    /// Geometry traversed by the point: lines for linear movements and
    /// points otherwise.
    pub fn trajectory(&self) -> Geom {
        let mut lines: Vec<LineString<f64>> = vec![];
        let mut points: Vec<Coord<f64>> = vec![];
        for seq in self.pieces() {
            let mut coords: Vec<Coord<f64>> = seq.instants.iter().map(|i| i.value.coord()).collect();
            coords.dedup();
            if seq.interp == Interpolation::Linear && coords.len() > 1 {
                lines.push(LineString::new(coords));
            } else {
                points.extend(coords);
            }
        }
        let geom = match (lines.len(), points.is_empty()) {
            (0, _) => points_geometry(points),
            (1, true) => Geometry::LineString(lines.remove(0)),
            (_, true) => Geometry::MultiLineString(MultiLineString::new(lines)),
            (_, false) => {
                let mut parts: Vec<Geometry<f64>> = lines.into_iter().map(Geometry::LineString).collect();
                parts.push(points_geometry(points));
                Geometry::GeometryCollection(geo_types::GeometryCollection::from(parts))
            }
        };
        let p = &self.start_instant().value;
        Geom { geom, srid: p.srid, geodetic: p.geodetic }
    }

    /// Distance traveled, zero unless the interpolation is linear.
    pub fn length(&self) -> f64 {
        if self.interp() != Interpolation::Linear {
            return 0.0;
        }
        self.pieces()
            .iter()
            .map(|s| s.instants.windows(2).map(|w| w[0].value.distance(&w[1].value)).sum::<f64>())
            .sum()
    }

    /// Distance traveled since the start, accumulated over all sequences.
    pub fn cumulative_length(&self) -> Result<TFloat> {
        if self.interp() != Interpolation::Linear {
            return self.map_values(|_| Ok(0.0));
        }
        let mut total = 0.0;
        let mut pieces = vec![];
        for seq in self.pieces() {
            let mut instants = Vec::with_capacity(seq.num_instants());
            for (k, inst) in seq.instants.iter().enumerate() {
                if k > 0 {
                    total += seq.instants[k - 1].value.distance(&inst.value);
                }
                instants.push(TInstant::make(total, inst.t));
            }
            pieces.push(TSequence::make_valid(instants, seq.lower_inc, seq.upper_inc, Interpolation::Linear, true));
        }
        Temporal::from_pieces(pieces, matches!(self, Temporal::Sequence(_)))
            .ok_or_else(|| MeosError::Internal("Empty cumulative length".into()))
    }

    /// Speed in units per second, constant between instants. `None` for
    /// values without duration.
    pub fn speed(&self) -> Result<Option<TFloat>> {
        match self.interp() {
            Interpolation::Discrete => Ok(None),
            _ if matches!(self, Temporal::Instant(_)) => Ok(None),
            Interpolation::Step => Ok(Some(self.map_values(|_| Ok(0.0))?)),
            Interpolation::Linear => {
                let pieces: Vec<TSequence<f64>> = self.pieces().iter().filter_map(seq_speed).collect();
                Ok(Temporal::from_pieces(pieces, matches!(self, Temporal::Sequence(_))))
            }
        }
    }

    pub fn get_x(&self) -> Result<TFloat> {
        self.map_values(|p| Ok(p.x))
    }

    pub fn get_y(&self) -> Result<TFloat> {
        self.map_values(|p| Ok(p.y))
    }

    pub fn get_z(&self) -> Result<TFloat> {
        if !self.has_z() {
            return Err(MeosError::InvalidArg("The temporal point must have Z dimension".into()));
        }
        self.map_values(|p| Ok(p.z.unwrap_or(0.0)))
    }

    /// Heading of every moving segment in radians, clockwise from north.
    /// Stationary segments leave gaps.
    pub fn azimuth(&self) -> Result<Option<TFloat>> {
        if self.interp() != Interpolation::Linear {
            return Ok(None);
        }
        let mut pieces = vec![];
        for seq in self.pieces() {
            let mut current: Vec<TInstant<f64>> = vec![];
            for w in seq.instants.windows(2) {
                match w[0].value.azimuth(&w[1].value) {
                    Some(az) => {
                        if current.last().map(|l| l.t != w[0].t).unwrap_or(false) {
                            pieces.push(TSequence::make_valid(std::mem::take(&mut current), true, false, Interpolation::Step, true));
                        }
                        if current.is_empty() {
                            current.push(TInstant::make(az, w[0].t));
                        } else if let Some(last) = current.last_mut() {
                            // the end of the previous segment starts this one
                            last.value = az;
                        }
                        current.push(TInstant::make(az, w[1].t));
                    }
                    None if !current.is_empty() => {
                        pieces.push(TSequence::make_valid(std::mem::take(&mut current), true, false, Interpolation::Step, true));
                    }
                    None => {}
                }
            }
            if !current.is_empty() {
                let upper_inc = current.last().map(|l| l.t == seq.end_timestamp() && seq.upper_inc).unwrap_or(false);
                pieces.push(TSequence::make_valid(current, true, upper_inc, Interpolation::Step, true));
            }
        }
        Ok(Temporal::from_pieces(pieces, false))
    }

    /// Azimuth from the start to the end position, `None` when they
    /// coincide.
    pub fn direction(&self) -> Option<f64> {
        self.start_value().azimuth(&self.end_value())
    }

    /// Time-weighted centroid of the positions.
    pub fn twcentroid(&self) -> Result<Point> {
        let p = self.start_value();
        let x = self.get_x()?.twavg();
        let y = self.get_y()?.twavg();
        let z = if p.has_z() { Some(self.get_z()?.twavg()) } else { None };
        Ok(Point { x, y, z, ..p })
    }

    /// The trajectory does not cross itself.
    pub fn is_simple(&self) -> bool {
        self.pieces().iter().all(|seq| {
            let mut coords: Vec<Coord<f64>> = seq.instants.iter().map(|i| i.value.coord()).collect();
            coords.dedup();
            if seq.interp != Interpolation::Linear {
                let n = coords.len();
                coords.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
                coords.dedup();
                return coords.len() == n;
            }
            let lines: Vec<Line<f64>> = coords.windows(2).map(|w| Line::new(w[0], w[1])).collect();
            for i in 0..lines.len() {
                for j in i + 2..lines.len() {
                    let closed_ring = i == 0 && j == lines.len() - 1 && coords[0] == coords[coords.len() - 1];
                    if !closed_ring && lines[i].intersects(&lines[j]) {
                        return false;
                    }
                }
            }
            true
        })
    }

    /// Restrict to a box: its period first, then its x/y extent.
    pub fn at_stbox(&self, bbox: &STBox) -> Result<Option<TPoint>> {
        let mut result = self.clone();
        if let Some(period) = bbox.period {
            match result.at_tstzspan(&period) {
                Some(r) => result = r,
                None => return Ok(None),
            }
        }
        if bbox.hasx() {
            if bbox.srid != self.srid() {
                return Err(MeosError::value(format!("Operation on mixed SRID: {} and {}", self.srid(), bbox.srid)));
            }
            return result.at_geom(&bbox.to_geom()?);
        }
        Ok(Some(result))
    }

    pub fn minus_stbox(&self, bbox: &STBox) -> Result<Option<TPoint>> {
        Ok(self.minus_restriction(self.at_stbox(bbox)?))
    }

    /// Time-weighted centroid of every time bin, at the start of the bin.
    pub fn tprecision(&self, duration: &Interval, origin: &TimestampTz) -> Result<TPoint> {
        self.tprecision_with(duration, origin, &|fragment: &TPoint| -> Result<Point> { fragment.twcentroid() })
    }

    /// Distance to a point over time.
    pub fn tdistance_point(&self, point: &Point) -> Result<TFloat> {
        self.start_instant().value.check_compatible(point)?;
        let func = |a: &Point, b: &Point| -> Result<f64> { Ok(a.distance(b)) };
        let breaks = |a1: &Point, a2: &Point, b1: &Point, b2: &Point| closest_approach(a1, a2, b1, b2);
        lift_base(self, point, &LiftOp::new(&func).linear().with_breaks(&breaks))
    }

    /// Distance between two temporal points over their common time.
    pub fn tdistance(&self, other: &TPoint) -> Result<Option<TFloat>> {
        self.start_instant().value.check_compatible(&other.start_instant().value)?;
        let func = |a: &Point, b: &Point| -> Result<f64> { Ok(a.distance(b)) };
        let breaks = |a1: &Point, a2: &Point, b1: &Point, b2: &Point| closest_approach(a1, a2, b1, b2);
        lift2(self, other, &LiftOp::new(&func).linear().with_breaks(&breaks))
    }

    pub fn nearest_approach_distance_point(&self, point: &Point) -> Result<f64> {
        Ok(self.tdistance_point(point)?.min_value())
    }

    pub fn nearest_approach_distance(&self, other: &TPoint) -> Result<Option<f64>> {
        Ok(self.tdistance(other)?.map(|d| d.min_value()))
    }

    /// Timestamp and distance of the closest approach to a geometry.
    fn nearest_to_geom(&self, geom: &Geom) -> Result<(f64, TimestampTz)> {
        geom.check_srid(self.srid())?;
        let mut best = (f64::INFINITY, self.start_timestamp());
        for seq in self.pieces() {
            if seq.interp == Interpolation::Linear && seq.num_instants() > 1 {
                for w in seq.instants.windows(2) {
                    let (d, r) = segment_geometry_nearest(&w[0].value, &w[1].value, &geom.geom);
                    if d < best.0 {
                        best = (d, time_at_ratio(&w[0].t, &w[1].t, r));
                    }
                }
            } else {
                for inst in &seq.instants {
                    let d = geom.distance_point(&inst.value);
                    if d < best.0 {
                        best = (d, inst.t);
                    }
                }
            }
        }
        Ok(best)
    }

    pub fn nearest_approach_distance_geom(&self, geom: &Geom) -> Result<f64> {
        Ok(self.nearest_to_geom(geom)?.0)
    }

    /// Instant of the closest approach to a geometry.
    pub fn nearest_approach_instant_geom(&self, geom: &Geom) -> Result<TInstant<Point>> {
        let (_, t) = self.nearest_to_geom(geom)?;
        self.instant_at(&t)
    }

    pub fn nearest_approach_instant_point(&self, point: &Point) -> Result<TInstant<Point>> {
        let t = self.tdistance_point(point)?.min_instant().t;
        self.instant_at(&t)
    }

    /// Instant of the closest approach to another temporal point, `None`
    /// when they share no time.
    pub fn nearest_approach_instant(&self, other: &TPoint) -> Result<Option<TInstant<Point>>> {
        match self.tdistance(other)? {
            Some(d) => Ok(Some(self.instant_at(&d.min_instant().t)?)),
            None => Ok(None),
        }
    }

    fn instant_at(&self, t: &TimestampTz) -> Result<TInstant<Point>> {
        self.value_at_timestamp(t, false)
            .map(|v| TInstant::make(v, *t))
            .ok_or_else(|| MeosError::Internal("The closest approach lies outside the time of the value".into()))
    }

    /// Line between the closest positions of the point and a geometry.
    pub fn shortest_line_geom(&self, geom: &Geom) -> Result<Geom> {
        let inst = self.nearest_approach_instant_geom(geom)?;
        let c = closest_coord(inst.value.coord(), &geom.geom)
            .ok_or_else(|| MeosError::InvalidArg("The geometry is empty".into()))?;
        Ok(segment_geom(&inst.value, c))
    }

    pub fn shortest_line_point(&self, point: &Point) -> Result<Geom> {
        let inst = self.nearest_approach_instant_point(point)?;
        Ok(segment_geom(&inst.value, point.coord()))
    }

    /// Line between the positions of both points at their closest approach.
    pub fn shortest_line(&self, other: &TPoint) -> Result<Option<Geom>> {
        let Some(d) = self.tdistance(other)? else {
            return Ok(None);
        };
        let t = d.min_instant().t;
        let a = self.instant_at(&t)?;
        let b = other.instant_at(&t)?;
        Ok(Some(segment_geom(&a.value, b.value.coord())))
    }
}

fn segment_geom(p: &Point, c: Coord<f64>) -> Geom {
    Geom {
        geom: Geometry::LineString(LineString::new(vec![p.coord(), c])),
        srid: p.srid,
        geodetic: p.geodetic,
    }
}
