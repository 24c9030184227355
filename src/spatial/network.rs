//! Route network backing network-constrained points: route id to line.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use geo::{Euclidean, Length};
use geo_types::{Coord, Geometry, LineString};
use tracing::info;

use crate::error::{MeosError, Result};
use crate::spatial::point::{parse_wkt, split_srid};

#[derive(Debug, Clone, Default)]
pub struct Network {
    routes: HashMap<i64, LineString<f64>>,
}

/// Parse the line of a route from WKT or EWKT.
pub fn parse_route(wkt: &str) -> Result<LineString<f64>> {
    let (_, rest) = split_srid(wkt)?;
    match parse_wkt(rest)? {
        Geometry::LineString(ls) if ls.0.len() >= 2 => Ok(ls),
        Geometry::LineString(_) => Err(MeosError::value("A route needs at least two points".to_string())),
        other => Err(MeosError::InvalidArgType(format!("A route must be a linestring, found {:?}", other))),
    }
}

impl Network {
    /// Load `rid,wkt` rows. The WKT may contain commas, so only the first
    /// comma separates the fields; surrounding double quotes are removed.
    pub fn load_csv(path: &Path) -> Result<Network> {
        let text = fs::read_to_string(path)
            .map_err(|e| MeosError::File(format!("Cannot read routes from {}: {}", path.display(), e)))?;
        let mut network = Network::default();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || (n == 0 && line.to_ascii_lowercase().starts_with("rid")) {
                continue;
            }
            let (rid, wkt) = line
                .split_once(',')
                .ok_or_else(|| MeosError::File(format!("{}:{}: expected rid,wkt", path.display(), n + 1)))?;
            let rid: i64 = rid
                .trim()
                .parse()
                .map_err(|_| MeosError::File(format!("{}:{}: invalid route identifier", path.display(), n + 1)))?;
            let route = parse_route(wkt.trim().trim_matches('"'))?;
            network.insert(rid, route);
        }
        info!(path = %path.display(), routes = network.len(), "route network loaded");
        Ok(network)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn insert(&mut self, rid: i64, route: LineString<f64>) {
        self.routes.insert(rid, route);
    }

    pub fn route(&self, rid: i64) -> Option<&LineString<f64>> {
        self.routes.get(&rid)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&i64, &LineString<f64>)> {
        self.routes.iter()
    }
}

pub(crate) fn line_length(line: &LineString<f64>) -> f64 {
    Euclidean.length(line)
}

/// Point at `fraction` of the length of the line.
pub(crate) fn line_interpolate(line: &LineString<f64>, fraction: f64) -> Coord<f64> {
    let coords = &line.0;
    if fraction <= 0.0 || coords.len() == 1 {
        return coords[0];
    }
    let total = line_length(line);
    let target = fraction.min(1.0) * total;
    let mut walked = 0.0;
    for w in coords.windows(2) {
        let seg = ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt();
        if walked + seg >= target && seg > 0.0 {
            let r = (target - walked) / seg;
            return Coord { x: w[0].x + (w[1].x - w[0].x) * r, y: w[0].y + (w[1].y - w[0].y) * r };
        }
        walked += seg;
    }
    coords[coords.len() - 1]
}

/// Fraction of the line length of the point of the line closest to `c`,
/// and the distance between them.
pub(crate) fn line_locate(line: &LineString<f64>, c: Coord<f64>) -> (f64, f64) {
    let total = line_length(line);
    let mut best = (0.0, f64::INFINITY);
    let mut walked = 0.0;
    for w in line.0.windows(2) {
        let (dx, dy) = (w[1].x - w[0].x, w[1].y - w[0].y);
        let seg2 = dx * dx + dy * dy;
        let r = if seg2 == 0.0 { 0.0 } else { (((c.x - w[0].x) * dx + (c.y - w[0].y) * dy) / seg2).clamp(0.0, 1.0) };
        let (px, py) = (w[0].x + dx * r, w[0].y + dy * r);
        let d = ((c.x - px).powi(2) + (c.y - py).powi(2)).sqrt();
        if d < best.1 {
            best = (walked + r * seg2.sqrt(), d);
        }
        walked += seg2.sqrt();
    }
    if total == 0.0 { (0.0, best.1) } else { (best.0 / total, best.1) }
}

/// Portion of the line between two fractions, as a line or a point.
pub(crate) fn line_substring(line: &LineString<f64>, from: f64, to: f64) -> Geometry<f64> {
    let start = line_interpolate(line, from);
    if from == to {
        return Geometry::Point(start.into());
    }
    let total = line_length(line);
    let mut coords = vec![start];
    let mut walked = 0.0;
    for w in line.0.windows(2) {
        walked += ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt();
        let frac = if total == 0.0 { 0.0 } else { walked / total };
        if frac > from && frac < to {
            coords.push(w[1]);
        }
    }
    coords.push(line_interpolate(line, to));
    Geometry::LineString(LineString::new(coords))
}
