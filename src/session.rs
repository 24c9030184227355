//! Process-wide engine state: session time zone, date style, float output
//! digits, the spatial reference system table and the route network.
//!
//! The state is read-mostly. Readers take a cheap snapshot (`Arc`) under a
//! read lock; [`initialize`], [`finalize`] and the setters swap in a new
//! snapshot under the write lock.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{FixedOffset, Offset, Utc};
use lazy_static::lazy_static;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_FLOAT_DIGITS, Settings};
use crate::error::{MeosError, Result};
use crate::spatial::network::Network;
use crate::spatial::srs::SrsTable;
use crate::time::{format_offset, parse_offset};

#[derive(Debug, Clone)]
pub struct Session {
    offset: FixedOffset,
    timezone: String,
    datestyle: String,
    float_digits: usize,
    srs: SrsTable,
    network: Network,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            offset: Utc.fix(),
            timezone: "UTC".into(),
            datestyle: "ISO, YMD".into(),
            float_digits: DEFAULT_FLOAT_DIGITS,
            srs: SrsTable::default(),
            network: Network::default(),
        }
    }
}

impl Session {
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
    pub fn timezone(&self) -> &str {
        &self.timezone
    }
    pub fn datestyle(&self) -> &str {
        &self.datestyle
    }
    pub fn float_digits(&self) -> usize {
        self.float_digits
    }
    pub fn srs(&self) -> &SrsTable {
        &self.srs
    }
    pub fn network(&self) -> &Network {
        &self.network
    }
}

lazy_static! {
    static ref SESSION: RwLock<Arc<Session>> = RwLock::new(Arc::new(Session::default()));
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);
}

/// Snapshot of the current session.
pub fn session() -> Arc<Session> {
    let guard = SESSION.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(&guard)
}

fn update<F: FnOnce(&mut Session) -> Result<()>>(f: F) -> Result<()> {
    let mut guard = SESSION.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut next = (**guard).clone();
    f(&mut next)?;
    *guard = Arc::new(next);
    Ok(())
}

/// Install a session built from the settings. Calling it again replaces the
/// previous session.
pub fn initialize(settings: &Settings) -> Result<()> {
    settings.validate()?;
    if let Some(filter) = &settings.log_filter {
        // a subscriber installed by the host wins
        let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter)).try_init();
    }
    let offset = parse_offset(&settings.timezone)?;
    let srs = match &settings.spatial_ref_sys {
        Some(path) => SrsTable::load_csv(path)?,
        None => SrsTable::default(),
    };
    let network = match &settings.ways {
        Some(path) => Network::load_csv(path)?,
        None => Network::default(),
    };
    info!(
        timezone = %settings.timezone,
        float_digits = settings.float_digits,
        srs_entries = srs.len(),
        routes = network.len(),
        "engine initialized"
    );
    update(|s| {
        *s = Session {
            offset,
            timezone: settings.timezone.clone(),
            datestyle: "ISO, YMD".into(),
            float_digits: settings.float_digits,
            srs,
            network,
        };
        Ok(())
    })?;
    INITIALIZED.store(true, Ordering::SeqCst);
    Ok(())
}

/// Load settings from an optional file plus environment and initialize.
pub fn initialize_from(path: Option<&Path>) -> Result<()> {
    let settings = Settings::load(path)?;
    initialize(&settings)
}

/// Restore the default session.
pub fn finalize() {
    if !INITIALIZED.swap(false, Ordering::SeqCst) {
        debug!("finalize called on an engine that was not initialized");
    }
    let mut guard = SESSION.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Arc::new(Session::default());
    info!("engine finalized");
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

pub fn set_timezone(name: &str) -> Result<()> {
    let offset = parse_offset(name)?;
    update(|s| {
        s.offset = offset;
        s.timezone = if offset.local_minus_utc() == 0 { "UTC".into() } else { format_offset(&offset) };
        Ok(())
    })
}

pub fn get_timezone() -> String {
    session().timezone().to_string()
}

pub fn set_datestyle(style: &str) -> Result<()> {
    let upper = style.trim().to_ascii_uppercase();
    let mut parts = upper.split(',').map(str::trim);
    match (parts.next(), parts.next()) {
        (Some("ISO"), None) | (Some("ISO"), Some("YMD")) => update(|s| {
            s.datestyle = "ISO, YMD".into();
            Ok(())
        }),
        _ => {
            warn!(style, "rejected date style");
            Err(MeosError::NotSupported(format!("Date style {} is not supported", style)))
        }
    }
}

pub fn get_datestyle() -> String {
    session().datestyle().to_string()
}

pub fn set_float_digits(digits: usize) -> Result<()> {
    if digits > 15 {
        return Err(MeosError::value(format!("float_digits must be at most 15, got {}", digits)));
    }
    update(|s| {
        s.float_digits = digits;
        Ok(())
    })
}

/// Register or replace a route of the network.
pub fn register_route(rid: i64, wkt: &str) -> Result<()> {
    let line = crate::spatial::network::parse_route(wkt)?;
    update(|s| {
        s.network.insert(rid, line);
        Ok(())
    })
}

/// Register or replace an entry of the spatial reference system table.
pub fn register_srs(srid: i32, auth_name: &str, auth_srid: i32, geodetic: bool) -> Result<()> {
    update(|s| {
        s.srs.insert(srid, auth_name, auth_srid, geodetic);
        Ok(())
    })
}
