//! Spatial reference system table: SRID to authority and geodetic flag.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{MeosError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SrsEntry {
    pub srid: i32,
    pub auth_name: String,
    pub auth_srid: i32,
    pub geodetic: bool,
}

#[derive(Debug, Clone)]
pub struct SrsTable {
    entries: HashMap<i32, SrsEntry>,
}

impl Default for SrsTable {
    fn default() -> Self {
        let mut table = SrsTable { entries: HashMap::new() };
        table.insert(0, "", 0, false);
        table.insert(3857, "EPSG", 3857, false);
        table.insert(4326, "EPSG", 4326, true);
        table.insert(4269, "EPSG", 4269, true);
        table.insert(5676, "EPSG", 5676, false);
        table
    }
}

impl SrsTable {
    /// Load `srid,auth_name,auth_srid,geodetic` rows on top of the built-in
    /// entries. A first line starting with `srid` is taken as a header.
    pub fn load_csv(path: &Path) -> Result<SrsTable> {
        let text = fs::read_to_string(path)
            .map_err(|e| MeosError::File(format!("Cannot read spatial reference systems from {}: {}", path.display(), e)))?;
        let mut table = SrsTable::default();
        let mut loaded = 0;
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || (n == 0 && line.to_ascii_lowercase().starts_with("srid")) {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 4 {
                return Err(MeosError::File(format!("{}:{}: expected 4 fields, found {}", path.display(), n + 1, fields.len())));
            }
            let bad = |what: &str| MeosError::File(format!("{}:{}: invalid {}", path.display(), n + 1, what));
            let srid: i32 = fields[0].parse().map_err(|_| bad("srid"))?;
            let auth_srid: i32 = fields[2].parse().map_err(|_| bad("auth_srid"))?;
            let geodetic = matches!(fields[3].to_ascii_lowercase().as_str(), "t" | "true" | "1");
            table.insert(srid, fields[1], auth_srid, geodetic);
            loaded += 1;
        }
        info!(path = %path.display(), loaded, "spatial reference systems loaded");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, srid: i32, auth_name: &str, auth_srid: i32, geodetic: bool) {
        debug!(srid, auth_name, "registering spatial reference system");
        self.entries.insert(srid, SrsEntry { srid, auth_name: auth_name.to_string(), auth_srid, geodetic });
    }

    pub fn get(&self, srid: i32) -> Option<&SrsEntry> {
        self.entries.get(&srid)
    }

    /// Geodetic flag of a registered SRID, false for unknown ones.
    pub fn is_geodetic(&self, srid: i32) -> bool {
        self.entries.get(&srid).map(|e| e.geodetic).unwrap_or(false)
    }

    /// `EPSG:4326` style name used by MF-JSON.
    pub fn urn(&self, srid: i32) -> Option<String> {
        self.entries
            .get(&srid)
            .filter(|e| !e.auth_name.is_empty())
            .map(|e| format!("{}:{}", e.auth_name, e.auth_srid))
    }

    /// SRID of an `EPSG:4326` or `urn:ogc:def:crs:EPSG::4326` name.
    pub fn srid_of(&self, name: &str) -> Option<i32> {
        let code = name.rsplit(':').next()?.parse::<i32>().ok()?;
        let auth = name.split(':').find(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphabetic()) && !p.eq_ignore_ascii_case("urn") && !p.eq_ignore_ascii_case("ogc") && !p.eq_ignore_ascii_case("def") && !p.eq_ignore_ascii_case("crs"));
        self.entries
            .values()
            .find(|e| e.auth_srid == code && auth.map(|a| a.eq_ignore_ascii_case(&e.auth_name)).unwrap_or(true))
            .map(|e| e.srid)
            .or(Some(code))
    }
}
