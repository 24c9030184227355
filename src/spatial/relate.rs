//! Spatial relationships between temporal points and geometries: the ever
//! and always predicates, their temporal forms and restriction to a
//! geometry.
//!
//! Relationships with a geometry are evaluated planarly on the x/y
//! coordinates. A linear segment is cut where it crosses an edge of the
//! geometry or passes one of its vertices; the relationship is constant
//! between two cuts.

use geo::{Contains, Intersects};
use geo_types::{Coord, Geometry};

use crate::error::Result;
use crate::spatial::point::{Geom, Point, haversine_distance};
use crate::spatial::tpoint::TPoint;
use crate::temporal::lift::{LiftOp, lift_base, lift1, lift2};
use crate::temporal::{EPSILON, TBool, Temporal, TemporalValue};

/// Vertices and edges of a geometry.
#[derive(Debug, Default)]
pub(crate) struct GeomParts {
    pub points: Vec<Coord<f64>>,
    pub edges: Vec<(Coord<f64>, Coord<f64>)>,
}

impl GeomParts {
    pub fn of(geom: &Geometry<f64>) -> GeomParts {
        let mut parts = GeomParts::default();
        parts.collect(geom);
        parts
    }

    fn add_line(&mut self, coords: &[Coord<f64>]) {
        self.points.extend_from_slice(coords);
        self.edges.extend(coords.windows(2).map(|w| (w[0], w[1])));
    }

    fn collect(&mut self, geom: &Geometry<f64>) {
        match geom {
            Geometry::Point(p) => self.points.push(p.0),
            Geometry::Line(l) => self.add_line(&[l.start, l.end]),
            Geometry::LineString(ls) => self.add_line(&ls.0),
            Geometry::Polygon(poly) => {
                self.add_line(&poly.exterior().0);
                for ring in poly.interiors() {
                    self.add_line(&ring.0);
                }
            }
            Geometry::MultiPoint(mp) => self.points.extend(mp.0.iter().map(|p| p.0)),
            Geometry::MultiLineString(ml) => ml.0.iter().for_each(|ls| self.add_line(&ls.0)),
            Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| self.collect(&Geometry::Polygon(p.clone()))),
            Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| self.collect(g)),
            Geometry::Rect(r) => self.collect(&Geometry::Polygon(r.to_polygon())),
            Geometry::Triangle(t) => self.collect(&Geometry::Polygon(t.to_polygon())),
        }
    }
}

fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Closest point of the segment `[a, b]` to `c`.
pub(crate) fn closest_on_segment(c: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let d = b - a;
    let len2 = dot(d, d);
    if len2 == 0.0 {
        return a;
    }
    let r = (dot(c - a, d) / len2).clamp(0.0, 1.0);
    a + d * r
}

fn planar(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Closest point of a geometry to `c`; `c` itself when it lies inside.
pub(crate) fn closest_coord(c: Coord<f64>, geom: &Geometry<f64>) -> Option<Coord<f64>> {
    if geom.intersects(&geo_types::Point(c)) {
        return Some(c);
    }
    let parts = GeomParts::of(geom);
    let candidates = parts.points.iter().copied().chain(parts.edges.iter().map(|(a, b)| closest_on_segment(c, *a, *b)));
    candidates.min_by(|p, q| planar(c, *p).partial_cmp(&planar(c, *q)).unwrap_or(std::cmp::Ordering::Equal))
}

/// Distance from a point to a geometry, zero when the point lies inside.
/// Geodetic distances are measured along the sphere to the planar closest
/// point.
pub(crate) fn point_geometry_distance(p: &Point, geom: &Geometry<f64>, geodetic: bool) -> f64 {
    match closest_coord(p.coord(), geom) {
        Some(c) if geodetic => haversine_distance(p.y, p.x, c.y, c.x),
        Some(c) => planar(p.coord(), c),
        None => f64::INFINITY,
    }
}

/// Ratios inside the segment from `a` to `b` where it meets an edge or
/// passes a vertex of the geometry.
fn segment_cuts(a: Coord<f64>, b: Coord<f64>, parts: &GeomParts) -> Vec<f64> {
    let d = b - a;
    let len2 = dot(d, d);
    if len2 == 0.0 {
        return vec![];
    }
    let mut cuts = vec![];
    let on_segment = |c: Coord<f64>, cuts: &mut Vec<f64>| {
        let r = dot(c - a, d) / len2;
        if r > 0.0 && r < 1.0 && planar(a + d * r, c) <= EPSILON {
            cuts.push(r);
        }
    };
    for p in &parts.points {
        on_segment(*p, &mut cuts);
    }
    for (c, e) in &parts.edges {
        let f = *e - *c;
        let denom = cross(d, f);
        if denom.abs() < f64::EPSILON {
            continue;
        }
        let r = cross(*c - a, f) / denom;
        let s = cross(*c - a, d) / denom;
        if (0.0..=1.0).contains(&s) && r > 0.0 && r < 1.0 {
            cuts.push(r);
        }
    }
    cuts
}

/// Interval of `[0, 1]` where a convex function stays at or below `d`.
fn sublevel(f: &dyn Fn(f64) -> f64, d: f64) -> Option<(f64, f64)> {
    let rmin = convex_min(f);
    if f(rmin) > d {
        return None;
    }
    let bisect = |mut inside: f64, mut outside: f64| {
        if f(outside) <= d {
            return outside;
        }
        for _ in 0..100 {
            let m = (inside + outside) / 2.0;
            if f(m) <= d {
                inside = m;
            } else {
                outside = m;
            }
        }
        inside
    };
    Some((bisect(rmin, 0.0), bisect(rmin, 1.0)))
}

/// Ratio in `[0, 1]` minimizing a convex function.
fn convex_min(f: &dyn Fn(f64) -> f64) -> f64 {
    let (mut lo, mut hi) = (0.0, 1.0);
    for _ in 0..100 {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if f(m1) <= f(m2) {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    (lo + hi) / 2.0
}

/// Smallest distance between the point moving along a segment and a
/// geometry, with the ratio at which it is reached.
pub(crate) fn segment_geometry_nearest(a: &Point, b: &Point, geom: &Geometry<f64>) -> (f64, f64) {
    let parts = GeomParts::of(geom);
    let f = |r: f64| point_geometry_distance(&a.lerp(b, r), geom, a.geodetic);
    let mut candidates = vec![0.0, 1.0];
    candidates.extend(segment_cuts(a.coord(), b.coord(), &parts));
    for p in &parts.points {
        candidates.push(convex_min(&|r: f64| planar(a.lerp(b, r).coord(), *p)));
    }
    for (c, e) in &parts.edges {
        candidates.push(convex_min(&|r: f64| {
            let q = a.lerp(b, r).coord();
            planar(q, closest_on_segment(q, *c, *e))
        }));
    }
    candidates
        .into_iter()
        .map(|r| (f(r), r))
        .min_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((f64::INFINITY, 0.0))
}

/// Cuts of a segment where its distance to the geometry crosses `dist`.
fn dwithin_cuts(a: &Point, b: &Point, parts: &GeomParts, dist: f64) -> Vec<f64> {
    let (ca, cb) = (a.coord(), b.coord());
    let mut cuts = segment_cuts(ca, cb, parts);
    let at = |r: f64| a.lerp(b, r);
    let measure = |p: &Point, c: Coord<f64>| {
        if p.geodetic { haversine_distance(p.y, p.x, c.y, c.x) } else { planar(p.coord(), c) }
    };
    for p in &parts.points {
        let f = |r: f64| measure(&at(r), *p);
        if let Some((r1, r2)) = sublevel(&f, dist) {
            cuts.extend([r1, r2]);
        }
    }
    for (c, e) in &parts.edges {
        let f = |r: f64| {
            let q = at(r);
            measure(&q, closest_on_segment(q.coord(), *c, *e))
        };
        if let Some((r1, r2)) = sublevel(&f, dist) {
            cuts.extend([r1, r2]);
        }
    }
    cuts
}

/// Ratios where two synchronized segments are exactly `dist` apart.
fn tpoint_dwithin_cuts(a1: &Point, a2: &Point, b1: &Point, b2: &Point, dist: f64) -> Vec<f64> {
    if a1.geodetic {
        let f = |r: f64| a1.lerp(a2, r).distance(&b1.lerp(b2, r));
        return sublevel(&f, dist).map(|(r1, r2)| vec![r1, r2]).unwrap_or_default();
    }
    let z = |p: &Point| p.z.unwrap_or(0.0);
    let d0 = [a1.x - b1.x, a1.y - b1.y, z(a1) - z(b1)];
    let dd = [(a2.x - a1.x) - (b2.x - b1.x), (a2.y - a1.y) - (b2.y - b1.y), (z(a2) - z(a1)) - (z(b2) - z(b1))];
    let qa: f64 = dd.iter().map(|v| v * v).sum();
    if qa == 0.0 {
        return vec![];
    }
    let qb: f64 = 2.0 * d0.iter().zip(dd.iter()).map(|(x, y)| x * y).sum::<f64>();
    let qc: f64 = d0.iter().map(|v| v * v).sum::<f64>() - dist * dist;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return vec![];
    }
    let sq = disc.sqrt();
    vec![(-qb - sq) / (2.0 * qa), (-qb + sq) / (2.0 * qa)]
}

impl Temporal<Point> {
    fn check_geom(&self, geom: &Geom) -> Result<()> {
        geom.check_srid(self.srid())
    }

    /// Temporal form of a point predicate against a geometry.
    fn geom_relation(&self, geom: &Geom, pred: &dyn Fn(&Point) -> bool, dist: Option<f64>) -> Result<TBool> {
        self.check_geom(geom)?;
        let parts = GeomParts::of(&geom.geom);
        let func = |p: &Point| -> Result<bool> { Ok(pred(p)) };
        let cuts = |a: &Point, b: &Point| match dist {
            Some(d) => dwithin_cuts(a, b, &parts, d),
            None => segment_cuts(a.coord(), b.coord(), &parts),
        };
        lift1(self, &func, false, Some(&cuts))
    }

    /// Whether the point intersects the geometry over time.
    pub fn tintersects(&self, geom: &Geom) -> Result<TBool> {
        self.geom_relation(geom, &|p: &Point| geom.intersects_point(p), None)
    }

    /// Whether the geometry contains the point over time.
    pub fn tcontains(&self, geom: &Geom) -> Result<TBool> {
        self.geom_relation(geom, &|p: &Point| geom.geom.contains(&p.to_geo()), None)
    }

    /// Whether the point lies on the boundary of the geometry over time.
    pub fn ttouches(&self, geom: &Geom) -> Result<TBool> {
        self.geom_relation(geom, &|p: &Point| geom.touches_point(p), None)
    }

    pub fn tdisjoint(&self, geom: &Geom) -> Result<TBool> {
        self.tintersects(geom)?.tnot()
    }

    /// Whether the point is within `dist` of the geometry over time.
    pub fn tdwithin(&self, geom: &Geom, dist: f64) -> Result<TBool> {
        let geodetic = self.start_instant().value.geodetic;
        self.geom_relation(geom, &|p: &Point| point_geometry_distance(p, &geom.geom, geodetic) <= dist, Some(dist))
    }

    /// Whether two temporal points are within `dist` of each other over
    /// their common time.
    pub fn tdwithin_tpoint(&self, other: &TPoint, dist: f64) -> Result<Option<TBool>> {
        self.start_instant().value.check_compatible(&other.start_instant().value)?;
        let func = move |a: &Point, b: &Point| -> Result<bool> { Ok(a.distance(b) <= dist) };
        let breaks = move |a1: &Point, a2: &Point, b1: &Point, b2: &Point| tpoint_dwithin_cuts(a1, a2, b1, b2, dist);
        lift2(self, other, &LiftOp::new(&func).with_breaks(&breaks))
    }

    /// Whether the temporal point is within `dist` of a point over time.
    pub fn tdwithin_point(&self, point: &Point, dist: f64) -> Result<TBool> {
        self.start_instant().value.check_compatible(point)?;
        let func = move |a: &Point, b: &Point| -> Result<bool> { Ok(a.distance(b) <= dist) };
        let breaks = move |a1: &Point, a2: &Point, b1: &Point, b2: &Point| tpoint_dwithin_cuts(a1, a2, b1, b2, dist);
        lift_base(self, point, &LiftOp::new(&func).with_breaks(&breaks))
    }

    pub fn eintersects(&self, geom: &Geom) -> Result<bool> {
        Ok(self.tintersects(geom)?.ever_eq(&true))
    }
    pub fn aintersects(&self, geom: &Geom) -> Result<bool> {
        Ok(self.tintersects(geom)?.always_eq(&true))
    }
    /// The geometry ever contains the point.
    pub fn econtains(&self, geom: &Geom) -> Result<bool> {
        Ok(self.tcontains(geom)?.ever_eq(&true))
    }
    pub fn acontains(&self, geom: &Geom) -> Result<bool> {
        Ok(self.tcontains(geom)?.always_eq(&true))
    }
    pub fn etouches(&self, geom: &Geom) -> Result<bool> {
        Ok(self.ttouches(geom)?.ever_eq(&true))
    }
    pub fn atouches(&self, geom: &Geom) -> Result<bool> {
        Ok(self.ttouches(geom)?.always_eq(&true))
    }
    pub fn edisjoint(&self, geom: &Geom) -> Result<bool> {
        Ok(!self.aintersects(geom)?)
    }
    pub fn adisjoint(&self, geom: &Geom) -> Result<bool> {
        Ok(!self.eintersects(geom)?)
    }
    pub fn edwithin(&self, geom: &Geom, dist: f64) -> Result<bool> {
        Ok(self.nearest_approach_distance_geom(geom)? <= dist)
    }
    pub fn adwithin(&self, geom: &Geom, dist: f64) -> Result<bool> {
        Ok(self.tdwithin(geom, dist)?.always_eq(&true))
    }

    /// Both points are ever at the same position at the same time.
    pub fn eintersects_tpoint(&self, other: &TPoint) -> Result<bool> {
        self.ever_eq_temporal(other)
    }
    pub fn aintersects_tpoint(&self, other: &TPoint) -> Result<bool> {
        self.always_eq_temporal(other)
    }
    pub fn edisjoint_tpoint(&self, other: &TPoint) -> Result<bool> {
        self.ever_ne_temporal(other)
    }
    pub fn adisjoint_tpoint(&self, other: &TPoint) -> Result<bool> {
        self.always_ne_temporal(other)
    }
    /// The points are ever within `dist` of each other; false when they
    /// share no time.
    pub fn edwithin_tpoint(&self, other: &TPoint, dist: f64) -> Result<bool> {
        Ok(self.tdwithin_tpoint(other, dist)?.map(|r| r.ever_eq(&true)).unwrap_or(false))
    }
    pub fn adwithin_tpoint(&self, other: &TPoint, dist: f64) -> Result<bool> {
        Ok(self.tdwithin_tpoint(other, dist)?.map(|r| r.always_eq(&true)).unwrap_or(false))
    }

    /// Restrict to the times at which the point intersects the geometry.
    pub fn at_geom(&self, geom: &Geom) -> Result<Option<TPoint>> {
        Ok(self.tintersects(geom)?.when_true().and_then(|ss| self.restrict_time(&ss, true)))
    }

    pub fn minus_geom(&self, geom: &Geom) -> Result<Option<TPoint>> {
        Ok(self.minus_restriction(self.at_geom(geom)?))
    }
}
