//! Spatiotemporal boxes: an optional x/y(/z) extent with its reference
//! system times an optional period.

use std::cmp::Ordering;

use geo_types::{Coord, Geometry, LineString, Rect};

use crate::error::{MeosError, Result};
use crate::span::{Span, TstzSpan, span_adjacent, span_contains, span_left, span_overlaps, span_overleft, span_overright};
use crate::spatial::point::{Geom, Point, haversine_distance};
use crate::time::{Interval, TimestampTz, float_round};

/// Closed extent of the space dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceExtent {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub z: Option<(f64, f64)>,
}

impl SpaceExtent {
    pub fn from_point(p: &Point) -> SpaceExtent {
        SpaceExtent { xmin: p.x, xmax: p.x, ymin: p.y, ymax: p.y, z: p.z.map(|z| (z, z)) }
    }

    fn hull(&self, other: &SpaceExtent) -> SpaceExtent {
        SpaceExtent {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            ymin: self.ymin.min(other.ymin),
            ymax: self.ymax.max(other.ymax),
            z: match (self.z, other.z) {
                (Some((a1, a2)), Some((b1, b2))) => Some((a1.min(b1), a2.max(b2))),
                _ => None,
            },
        }
    }

    fn intersect(&self, other: &SpaceExtent) -> Option<SpaceExtent> {
        let (xmin, xmax) = (self.xmin.max(other.xmin), self.xmax.min(other.xmax));
        let (ymin, ymax) = (self.ymin.max(other.ymin), self.ymax.min(other.ymax));
        if xmin > xmax || ymin > ymax {
            return None;
        }
        let z = match (self.z, other.z) {
            (Some((a1, a2)), Some((b1, b2))) => {
                let (zmin, zmax) = (a1.max(b1), a2.min(b2));
                if zmin > zmax {
                    return None;
                }
                Some((zmin, zmax))
            }
            _ => None,
        };
        Some(SpaceExtent { xmin, xmax, ymin, ymax, z })
    }

    /// Per-dimension closed spans, z only when both extents have it.
    fn dims(&self, other: &SpaceExtent) -> Vec<(Span<f64>, Span<f64>)> {
        let closed = |a: f64, b: f64| Span { lower: a, upper: b, lower_inc: true, upper_inc: true };
        let mut dims = vec![
            (closed(self.xmin, self.xmax), closed(other.xmin, other.xmax)),
            (closed(self.ymin, self.ymax), closed(other.ymin, other.ymax)),
        ];
        if let (Some((a1, a2)), Some((b1, b2))) = (self.z, other.z) {
            dims.push((closed(a1, a2), closed(b1, b2)));
        }
        dims
    }
}

#[derive(Debug, Clone, Copy)]
pub struct STBox {
    pub(crate) space: Option<SpaceExtent>,
    pub(crate) period: Option<TstzSpan>,
    pub(crate) srid: i32,
    pub(crate) geodetic: bool,
}

impl STBox {
    pub fn make(space: Option<SpaceExtent>, period: Option<TstzSpan>, srid: i32, geodetic: bool) -> Result<STBox> {
        if space.is_none() && period.is_none() {
            return Err(MeosError::InvalidArg("A spatiotemporal box must have a space or a time dimension".into()));
        }
        if let Some(s) = &space {
            if s.xmin > s.xmax || s.ymin > s.ymax || s.z.map(|(a, b)| a > b).unwrap_or(false) {
                return Err(MeosError::value("The minimum of a box dimension cannot exceed its maximum".to_string()));
            }
        }
        Ok(STBox { space, period, srid, geodetic })
    }

    pub fn from_point(p: &Point) -> STBox {
        STBox { space: Some(SpaceExtent::from_point(p)), period: None, srid: p.srid, geodetic: p.geodetic }
    }

    pub fn from_point_timestamp(p: &Point, t: TimestampTz) -> STBox {
        STBox { period: Some(Span::from_value(t)), ..STBox::from_point(p) }
    }

    pub fn from_point_tstzspan(p: &Point, period: TstzSpan) -> STBox {
        STBox { period: Some(period), ..STBox::from_point(p) }
    }

    /// Box of the bounding rectangle of a geometry; `None` for empty
    /// geometries.
    pub fn from_geom(geom: &Geom) -> Option<STBox> {
        let rect = geom.bounding_rect()?;
        Some(STBox {
            space: Some(SpaceExtent { xmin: rect.min().x, xmax: rect.max().x, ymin: rect.min().y, ymax: rect.max().y, z: None }),
            period: None,
            srid: geom.srid,
            geodetic: geom.geodetic,
        })
    }

    pub fn from_timestamp(t: TimestampTz) -> STBox {
        STBox { space: None, period: Some(Span::from_value(t)), srid: 0, geodetic: false }
    }

    pub fn from_tstzspan(period: TstzSpan) -> STBox {
        STBox { space: None, period: Some(period), srid: 0, geodetic: false }
    }

    pub fn hasx(&self) -> bool {
        self.space.is_some()
    }
    pub fn hasz(&self) -> bool {
        self.space.map(|s| s.z.is_some()).unwrap_or(false)
    }
    pub fn hast(&self) -> bool {
        self.period.is_some()
    }
    pub fn is_geodetic(&self) -> bool {
        self.geodetic
    }
    pub fn srid(&self) -> i32 {
        self.srid
    }
    pub fn space(&self) -> Option<SpaceExtent> {
        self.space
    }
    pub fn period(&self) -> Option<TstzSpan> {
        self.period
    }
    pub fn xmin(&self) -> Option<f64> {
        self.space.map(|s| s.xmin)
    }
    pub fn xmax(&self) -> Option<f64> {
        self.space.map(|s| s.xmax)
    }
    pub fn ymin(&self) -> Option<f64> {
        self.space.map(|s| s.ymin)
    }
    pub fn ymax(&self) -> Option<f64> {
        self.space.map(|s| s.ymax)
    }
    pub fn zmin(&self) -> Option<f64> {
        self.space.and_then(|s| s.z).map(|z| z.0)
    }
    pub fn zmax(&self) -> Option<f64> {
        self.space.and_then(|s| s.z).map(|z| z.1)
    }
    pub fn tmin(&self) -> Option<TimestampTz> {
        self.period.map(|p| p.lower)
    }
    pub fn tmax(&self) -> Option<TimestampTz> {
        self.period.map(|p| p.upper)
    }
    pub fn tmin_inc(&self) -> Option<bool> {
        self.period.map(|p| p.lower_inc)
    }
    pub fn tmax_inc(&self) -> Option<bool> {
        self.period.map(|p| p.upper_inc)
    }

    fn require_space(&self) -> Result<SpaceExtent> {
        self.space.ok_or_else(|| MeosError::InvalidArg("The box has no space dimension".into()))
    }

    fn corners(s: &SpaceExtent) -> Vec<Coord<f64>> {
        vec![
            Coord { x: s.xmin, y: s.ymin },
            Coord { x: s.xmax, y: s.ymin },
            Coord { x: s.xmax, y: s.ymax },
            Coord { x: s.xmin, y: s.ymax },
            Coord { x: s.xmin, y: s.ymin },
        ]
    }

    /// Area of the x/y extent; square meters for geodetic boxes.
    pub fn area(&self) -> Result<f64> {
        let s = self.require_space()?;
        if !self.geodetic {
            return Ok((s.xmax - s.xmin) * (s.ymax - s.ymin));
        }
        // spherical rectangle between two parallels and two meridians
        let r = crate::spatial::point::EARTH_RADIUS_METERS;
        let dlon = (s.xmax - s.xmin).to_radians();
        Ok(r * r * dlon * (s.ymax.to_radians().sin() - s.ymin.to_radians().sin()).abs())
    }

    pub fn volume(&self) -> Result<f64> {
        let s = self.require_space()?;
        match s.z {
            Some((zmin, zmax)) => Ok((s.xmax - s.xmin) * (s.ymax - s.ymin) * (zmax - zmin)),
            None => Ok(0.0),
        }
    }

    /// Perimeter of the x/y extent; meters for geodetic boxes.
    pub fn perimeter(&self) -> Result<f64> {
        let s = self.require_space()?;
        if !self.geodetic {
            return Ok(2.0 * ((s.xmax - s.xmin) + (s.ymax - s.ymin)));
        }
        Ok(Self::corners(&s).windows(2).map(|w| haversine_distance(w[0].y, w[0].x, w[1].y, w[1].x)).sum())
    }

    /// The box without its time dimension.
    pub fn get_space(&self) -> Result<STBox> {
        let space = self.require_space()?;
        Ok(STBox { space: Some(space), period: None, ..*self })
    }

    pub fn set_srid(&self, srid: i32) -> STBox {
        STBox { srid, ..*self }
    }

    /// Smallest box containing both boxes.
    pub fn expand(&self, other: &STBox) -> STBox {
        let space = match (self.space, other.space) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
        let period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
        STBox { space, period, srid: self.srid, geodetic: self.geodetic }
    }

    /// Widen every space dimension by `d` on both sides.
    pub fn expand_space(&self, d: f64) -> Result<STBox> {
        let s = self.require_space()?;
        let space = SpaceExtent {
            xmin: s.xmin - d,
            xmax: s.xmax + d,
            ymin: s.ymin - d,
            ymax: s.ymax + d,
            z: s.z.map(|(a, b)| (a - d, b + d)),
        };
        STBox::make(Some(space), self.period, self.srid, self.geodetic)
    }

    pub fn expand_time(&self, interval: &Interval) -> Result<STBox> {
        match self.period {
            Some(p) => Ok(STBox { period: Some(p.expand_time(interval)?), ..*self }),
            None => Err(MeosError::InvalidArg("The box has no time dimension".into())),
        }
    }

    pub fn shift_scale_time(&self, shift: Option<&Interval>, duration: Option<&Interval>) -> Result<STBox> {
        match self.period {
            Some(p) => Ok(STBox { period: Some(p.shift_scale_time(shift, duration)?), ..*self }),
            None => Err(MeosError::InvalidArg("The box has no time dimension".into())),
        }
    }

    pub fn round(&self, maxdd: usize) -> STBox {
        let r = |v: f64| float_round(v, maxdd);
        let space = self.space.map(|s| SpaceExtent {
            xmin: r(s.xmin),
            xmax: r(s.xmax),
            ymin: r(s.ymin),
            ymax: r(s.ymax),
            z: s.z.map(|(a, b)| (r(a), r(b))),
        });
        STBox { space, ..*self }
    }

    /// Split the space extent in halves along every dimension, keeping the
    /// period: four boxes in 2D, eight in 3D.
    pub fn quad_split(&self) -> Result<Vec<STBox>> {
        let s = self.require_space()?;
        let halves = |a: f64, b: f64| {
            let m = a + (b - a) / 2.0;
            [(a, m), (m, b)]
        };
        let zs: Vec<Option<(f64, f64)>> = match s.z {
            Some((a, b)) => halves(a, b).iter().map(|z| Some(*z)).collect(),
            None => vec![None],
        };
        let mut result = Vec::with_capacity(4 * zs.len());
        for z in &zs {
            for (ymin, ymax) in halves(s.ymin, s.ymax) {
                for (xmin, xmax) in halves(s.xmin, s.xmax) {
                    result.push(STBox { space: Some(SpaceExtent { xmin, xmax, ymin, ymax, z: *z }), ..*self });
                }
            }
        }
        Ok(result)
    }

    fn check_compatible(&self, other: &STBox) -> Result<()> {
        if self.hasx() && other.hasx() {
            if self.srid != other.srid {
                return Err(MeosError::value(format!("Operation on mixed SRID: {} and {}", self.srid, other.srid)));
            }
            if self.geodetic != other.geodetic {
                return Err(MeosError::value("Operation on mixed planar and geodetic boxes".to_string()));
            }
        }
        Ok(())
    }

    /// Union of two boxes; with `strict` the boxes must overlap.
    pub fn union(&self, other: &STBox, strict: bool) -> Result<STBox> {
        self.check_compatible(other)?;
        if self.hasx() != other.hasx() || self.hasz() != other.hasz() || self.hast() != other.hast() {
            return Err(MeosError::InvalidArg("The boxes must be of the same dimensionality".into()));
        }
        if strict && !self.overlaps(other) {
            return Err(MeosError::value("The result of the union of the boxes would not be contiguous".to_string()));
        }
        Ok(self.expand(other))
    }

    pub fn intersection(&self, other: &STBox) -> Option<STBox> {
        let space = match (self.space, other.space) {
            (Some(a), Some(b)) => Some(a.intersect(&b)?),
            _ => None,
        };
        let period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.intersect_span(&b)?),
            _ => None,
        };
        if space.is_none() && period.is_none() {
            return None;
        }
        Some(STBox { space, period, srid: self.srid, geodetic: self.geodetic })
    }

    fn common<F, G>(&self, other: &STBox, fx: F, ft: G) -> bool
    where
        F: Fn(&Span<f64>, &Span<f64>) -> bool,
        G: Fn(&TstzSpan, &TstzSpan) -> bool,
    {
        let mut any = false;
        if let (Some(a), Some(b)) = (self.space, other.space) {
            any = true;
            if !a.dims(&b).iter().all(|(x, y)| fx(x, y)) {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (self.period, other.period) {
            any = true;
            if !ft(&a, &b) {
                return false;
            }
        }
        any
    }

    pub fn contains(&self, other: &STBox) -> bool {
        self.common(other, span_contains, span_contains)
    }
    pub fn contained(&self, other: &STBox) -> bool {
        other.contains(self)
    }
    pub fn overlaps(&self, other: &STBox) -> bool {
        self.common(other, span_overlaps, span_overlaps)
    }
    pub fn same(&self, other: &STBox) -> bool {
        self.common(other, |a, b| a == b, |a, b| a == b)
    }

    /// The boxes touch without their interiors overlapping.
    pub fn adjacent(&self, other: &STBox) -> bool {
        let Some(inter) = self.intersection(other) else {
            return false;
        };
        let flat_space = inter
            .space
            .map(|s| s.xmin == s.xmax || s.ymin == s.ymax || s.z.map(|(a, b)| a == b).unwrap_or(false))
            .unwrap_or(false);
        let flat_time = match (self.period, other.period) {
            (Some(a), Some(b)) => span_adjacent(&a, &b) || inter.period.map(|p| p.lower == p.upper).unwrap_or(false),
            _ => false,
        };
        flat_space || flat_time
    }

    fn dim(&self, other: &STBox, k: usize) -> Option<(Span<f64>, Span<f64>)> {
        let (a, b) = (self.space?, other.space?);
        a.dims(&b).get(k).copied()
    }

    fn time_dims(&self, other: &STBox) -> Option<(TstzSpan, TstzSpan)> {
        Some((self.period?, other.period?))
    }

    // Closed extents: strictly left means the maximum is below the other
    // minimum.
    pub fn left(&self, other: &STBox) -> bool {
        self.dim(other, 0).map(|(a, b)| a.upper < b.lower).unwrap_or(false)
    }
    pub fn overleft(&self, other: &STBox) -> bool {
        self.dim(other, 0).map(|(a, b)| a.upper <= b.upper).unwrap_or(false)
    }
    pub fn right(&self, other: &STBox) -> bool {
        self.dim(other, 0).map(|(a, b)| a.lower > b.upper).unwrap_or(false)
    }
    pub fn overright(&self, other: &STBox) -> bool {
        self.dim(other, 0).map(|(a, b)| a.lower >= b.lower).unwrap_or(false)
    }
    pub fn below(&self, other: &STBox) -> bool {
        self.dim(other, 1).map(|(a, b)| a.upper < b.lower).unwrap_or(false)
    }
    pub fn overbelow(&self, other: &STBox) -> bool {
        self.dim(other, 1).map(|(a, b)| a.upper <= b.upper).unwrap_or(false)
    }
    pub fn above(&self, other: &STBox) -> bool {
        self.dim(other, 1).map(|(a, b)| a.lower > b.upper).unwrap_or(false)
    }
    pub fn overabove(&self, other: &STBox) -> bool {
        self.dim(other, 1).map(|(a, b)| a.lower >= b.lower).unwrap_or(false)
    }
    pub fn front(&self, other: &STBox) -> bool {
        self.dim(other, 2).map(|(a, b)| a.upper < b.lower).unwrap_or(false)
    }
    pub fn overfront(&self, other: &STBox) -> bool {
        self.dim(other, 2).map(|(a, b)| a.upper <= b.upper).unwrap_or(false)
    }
    pub fn back(&self, other: &STBox) -> bool {
        self.dim(other, 2).map(|(a, b)| a.lower > b.upper).unwrap_or(false)
    }
    pub fn overback(&self, other: &STBox) -> bool {
        self.dim(other, 2).map(|(a, b)| a.lower >= b.lower).unwrap_or(false)
    }
    pub fn before(&self, other: &STBox) -> bool {
        self.time_dims(other).map(|(a, b)| span_left(&a, &b)).unwrap_or(false)
    }
    pub fn overbefore(&self, other: &STBox) -> bool {
        self.time_dims(other).map(|(a, b)| span_overleft(&a, &b)).unwrap_or(false)
    }
    pub fn after(&self, other: &STBox) -> bool {
        self.time_dims(other).map(|(a, b)| span_left(&b, &a)).unwrap_or(false)
    }
    pub fn overafter(&self, other: &STBox) -> bool {
        self.time_dims(other).map(|(a, b)| span_overright(&a, &b)).unwrap_or(false)
    }

    /// The x/y extent as a geometry: a polygon, or a line or point when the
    /// extent is flat.
    pub fn to_geom(&self) -> Result<Geom> {
        let s = self.require_space()?;
        let geom = if s.xmin == s.xmax && s.ymin == s.ymax {
            Geometry::Point(geo_types::Point::new(s.xmin, s.ymin))
        } else if s.xmin == s.xmax || s.ymin == s.ymax {
            Geometry::LineString(LineString::from(vec![(s.xmin, s.ymin), (s.xmax, s.ymax)]))
        } else {
            Geometry::Polygon(Rect::new(Coord { x: s.xmin, y: s.ymin }, Coord { x: s.xmax, y: s.ymax }).to_polygon())
        };
        Ok(Geom { geom, srid: self.srid, geodetic: self.geodetic })
    }

    /// Total order: SRID, time dimension, then the space dimensions.
    pub fn compare(&self, other: &STBox) -> Ordering {
        let cmp_f = |a: f64, b: f64| a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        let ord = self.srid.cmp(&other.srid);
        if ord != Ordering::Equal {
            return ord;
        }
        let t = match (self.period, other.period) {
            (Some(a), Some(b)) => a.compare(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if t != Ordering::Equal {
            return t;
        }
        match (self.space, other.space) {
            (Some(a), Some(b)) => cmp_f(a.xmin, b.xmin)
                .then_with(|| cmp_f(a.ymin, b.ymin))
                .then_with(|| cmp_f(a.z.map(|z| z.0).unwrap_or(0.0), b.z.map(|z| z.0).unwrap_or(0.0)))
                .then_with(|| cmp_f(a.xmax, b.xmax))
                .then_with(|| cmp_f(a.ymax, b.ymax))
                .then_with(|| cmp_f(a.z.map(|z| z.1).unwrap_or(0.0), b.z.map(|z| z.1).unwrap_or(0.0))),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialEq for STBox {
    fn eq(&self, other: &Self) -> bool {
        self.space == other.space && self.period == other.period && self.srid == other.srid && self.geodetic == other.geodetic
    }
}

impl PartialOrd for STBox {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
