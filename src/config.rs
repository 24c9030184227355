//! Engine settings, resolved from built-in defaults, an optional settings
//! file and `MEOS_*` environment variables, in increasing precedence.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MeosError, Result};

pub const DEFAULT_FLOAT_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Session time zone, `UTC` or a fixed offset such as `+02` or `-05:30`.
    pub timezone: String,
    pub datestyle: String,
    /// Maximum number of decimal digits in float output.
    pub float_digits: usize,
    /// CSV file with `srid,auth_name,auth_srid,geodetic` rows.
    pub spatial_ref_sys: Option<PathBuf>,
    /// CSV file with `rid,wkt` rows describing the route network.
    pub ways: Option<PathBuf>,
    /// When set, a `tracing` subscriber is installed with this filter.
    pub log_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            timezone: "UTC".into(),
            datestyle: "ISO".into(),
            float_digits: DEFAULT_FLOAT_DIGITS,
            spatial_ref_sys: None,
            ways: None,
            log_filter: None,
        }
    }
}

impl Settings {
    /// Resolve the settings. A missing file is only an error when a path was
    /// given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("meos").required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("MEOS"));
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        crate::time::parse_offset(&self.timezone)?;
        let style = self.datestyle.to_ascii_uppercase().replace(' ', "");
        if style != "ISO" && style != "ISO,YMD" {
            return Err(MeosError::NotSupported(format!("Date style {} is not supported", self.datestyle)));
        }
        if self.float_digits > 15 {
            return Err(MeosError::value(format!("float_digits must be at most 15, got {}", self.float_digits)));
        }
        Ok(())
    }
}
