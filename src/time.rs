//! Time domain: timestamps with time zone, dates and intervals, with the
//! canonical text forms and the 2000-01-01 epoch used by the binary formats.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{MeosError, Result};
use crate::session;

pub type TimestampTz = DateTime<Utc>;

pub const USECS_PER_SEC: i64 = 1_000_000;
pub const USECS_PER_DAY: i64 = 86_400 * USECS_PER_SEC;
/// Days in a month when an interval has to be reduced to a single length.
pub const DAYS_PER_MONTH: i64 = 30;

lazy_static! {
    static ref TIMESTAMP_RE: Regex = Regex::new(
        r"(?i)^\s*(\d{4})-(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d{1,6})\d*)?)?)?\s*(Z|UTC|GMT|[+-]\d{1,2}(?::?\d{2})?)?\s*$"
    ).unwrap();
    static ref OFFSET_RE: Regex = Regex::new(r"^([+-])(\d{1,2})(?::?(\d{2}))?$").unwrap();
    static ref INTERVAL_UNIT_RE: Regex = Regex::new(
        r"(?i)^\s*([+-]?\d+(?:\.\d+)?)\s*(years?|y|mons?|months?|weeks?|w|days?|d|hours?|h|minutes?|mins?|seconds?|secs?|s|milliseconds?|ms|microseconds?|us)(?:\s+|$)"
    ).unwrap();
    static ref INTERVAL_TIME_RE: Regex = Regex::new(r"^\s*([+-])?(\d+):(\d{2})(?::(\d{2}(?:\.\d+)?))?(?:\s+|$)").unwrap();
    static ref PG_EPOCH: TimestampTz = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
}

/// Parse a time zone designation: `UTC`, `Z`, `GMT` or a fixed offset such
/// as `+02`, `-0530` or `+05:30`.
pub fn parse_offset(s: &str) -> Result<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("gmt") {
        return Ok(Utc.fix());
    }
    let caps = OFFSET_RE
        .captures(s)
        .ok_or_else(|| MeosError::value(format!("Invalid time zone: {}", s)))?;
    let hours: i32 = caps[2].parse().map_err(|_| MeosError::value(format!("Invalid time zone: {}", s)))?;
    let minutes: i32 = match caps.get(3) {
        Some(m) => m.as_str().parse().map_err(|_| MeosError::value(format!("Invalid time zone: {}", s)))?,
        None => 0,
    };
    let secs = (hours * 3600 + minutes * 60) * if &caps[1] == "-" { -1 } else { 1 };
    FixedOffset::east_opt(secs).ok_or_else(|| MeosError::OutOfRange(format!("Time zone offset out of range: {}", s)))
}

pub fn format_offset(offset: &FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    let (h, m) = (secs / 3600, (secs % 3600) / 60);
    if m == 0 { format!("{}{:02}", sign, h) } else { format!("{}{:02}:{:02}", sign, h, m) }
}

pub fn parse_timestamp(s: &str) -> Result<TimestampTz> {
    let caps = TIMESTAMP_RE
        .captures(s)
        .ok_or_else(|| MeosError::parse(format!("Invalid input syntax for type timestamptz: \"{}\"", s.trim())))?;
    let num = |i: usize| -> u32 { caps.get(i).and_then(|m| m.as_str().parse().ok()).unwrap_or(0) };
    let date = NaiveDate::from_ymd_opt(num(1) as i32, num(2), num(3))
        .ok_or_else(|| MeosError::OutOfRange(format!("Date out of range: \"{}\"", s.trim())))?;
    let micros = match caps.get(7) {
        Some(m) => {
            let digits = m.as_str();
            digits.parse::<u32>().unwrap_or(0) * 10u32.pow(6 - digits.len() as u32)
        }
        None => 0,
    };
    let time = NaiveTime::from_hms_micro_opt(num(4), num(5), num(6), micros)
        .ok_or_else(|| MeosError::OutOfRange(format!("Time out of range: \"{}\"", s.trim())))?;
    let offset = match caps.get(8) {
        Some(z) => parse_offset(z.as_str())?,
        None => session::session().offset(),
    };
    offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| MeosError::OutOfRange(format!("Timestamp out of range: \"{}\"", s.trim())))
}

pub fn format_timestamp(t: &TimestampTz) -> String {
    let offset = session::session().offset();
    let local = t.with_timezone(&offset);
    let mut out = local.format("%Y-%m-%d %H:%M:%S").to_string();
    let micros = local.nanosecond() / 1000;
    if micros != 0 {
        let frac = format!("{:06}", micros);
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out.push_str(&format_offset(&offset));
    out
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| MeosError::parse(format!("Invalid input syntax for type date: \"{}\"", s.trim())))
}

pub fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Microseconds since 2000-01-01 00:00:00 UTC.
pub fn to_pg_micros(t: &TimestampTz) -> i64 {
    (*t - *PG_EPOCH).num_microseconds().unwrap_or(i64::MAX)
}

pub fn from_pg_micros(micros: i64) -> Result<TimestampTz> {
    PG_EPOCH
        .checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(|| MeosError::OutOfRange(format!("Timestamp out of range: {} microseconds", micros)))
}

/// Days since 2000-01-01.
pub fn date_to_pg_days(d: &NaiveDate) -> i32 {
    (*d - PG_EPOCH.date_naive()).num_days() as i32
}

pub fn date_from_pg_days(days: i32) -> Result<NaiveDate> {
    PG_EPOCH
        .date_naive()
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| MeosError::OutOfRange(format!("Date out of range: {} days", days)))
}

/// Midnight of the date in the session time zone.
pub fn date_to_timestamp(d: &NaiveDate) -> TimestampTz {
    let offset = session::session().offset();
    match offset.from_local_datetime(&d.and_time(NaiveTime::MIN)).single() {
        Some(t) => t.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)),
    }
}

pub fn timestamp_to_date(t: &TimestampTz) -> NaiveDate {
    t.with_timezone(&session::session().offset()).date_naive()
}

/// Seconds between two timestamps, as a float.
pub fn seconds_between(t1: &TimestampTz, t2: &TimestampTz) -> f64 {
    let micros = (*t2 - *t1).num_microseconds().unwrap_or(i64::MAX);
    micros as f64 / USECS_PER_SEC as f64
}

pub fn add_micros(t: &TimestampTz, micros: i64) -> Result<TimestampTz> {
    t.checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(|| MeosError::OutOfRange("Timestamp out of range".into()))
}

/// Fraction of `[t1, t2]` elapsed at `t`.
pub fn time_ratio(t1: &TimestampTz, t2: &TimestampTz, t: &TimestampTz) -> f64 {
    let whole = (*t2 - *t1).num_microseconds().unwrap_or(1) as f64;
    let part = (*t - *t1).num_microseconds().unwrap_or(0) as f64;
    if whole == 0.0 { 0.0 } else { part / whole }
}

/// Timestamp at a fraction of `[t1, t2]`, rounded to the microsecond.
pub fn time_at_ratio(t1: &TimestampTz, t2: &TimestampTz, ratio: f64) -> TimestampTz {
    let whole = (*t2 - *t1).num_microseconds().unwrap_or(0) as f64;
    add_micros(t1, (whole * ratio.clamp(0.0, 1.0)).round() as i64).unwrap_or(*t2)
}

pub fn float_round(d: f64, maxdd: usize) -> f64 {
    if !d.is_finite() {
        return d;
    }
    let factor = 10f64.powi(maxdd.min(15) as i32);
    let r = (d * factor).round() / factor;
    if r.is_finite() { r } else { d }
}

/// Interval with the three independent fields PostgreSQL keeps apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl Interval {
    pub fn new(months: i32, days: i32, micros: i64) -> Self {
        Self { months, days, micros }
    }

    pub fn make(years: i32, months: i32, weeks: i32, days: i32, hours: i32, mins: i32, secs: f64) -> Self {
        Self {
            months: years * 12 + months,
            days: weeks * 7 + days,
            micros: (hours as i64 * 3600 + mins as i64 * 60) * USECS_PER_SEC + (secs * USECS_PER_SEC as f64).round() as i64,
        }
    }

    pub fn from_micros(micros: i64) -> Self {
        Self { months: 0, days: 0, micros }
    }

    pub fn from_days(days: i32) -> Self {
        Self { months: 0, days, micros: 0 }
    }

    /// Difference `t2 - t1`, with whole days split out.
    pub fn between(t1: &TimestampTz, t2: &TimestampTz) -> Self {
        let micros = (*t2 - *t1).num_microseconds().unwrap_or(i64::MAX);
        Self { months: 0, days: (micros / USECS_PER_DAY) as i32, micros: micros % USECS_PER_DAY }
    }

    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.days == 0 && self.micros == 0
    }

    /// Length in microseconds, counting a month as 30 days.
    pub fn total_micros(&self) -> i64 {
        (self.months as i64 * DAYS_PER_MONTH + self.days as i64) * USECS_PER_DAY + self.micros
    }

    pub fn is_positive(&self) -> bool {
        self.total_micros() > 0
    }

    pub fn add(&self, other: &Interval) -> Interval {
        Interval {
            months: self.months + other.months,
            days: self.days + other.days,
            micros: self.micros + other.micros,
        }
    }

    pub fn mul(&self, factor: f64) -> Interval {
        let months = self.months as f64 * factor;
        let days = self.days as f64 * factor + months.fract() * DAYS_PER_MONTH as f64;
        let micros = self.micros as f64 * factor + days.fract() * USECS_PER_DAY as f64;
        Interval { months: months.trunc() as i32, days: days.trunc() as i32, micros: micros.round() as i64 }
    }

    /// `t + self`, months first, then days, then the time part.
    pub fn add_to(&self, t: &TimestampTz) -> Result<TimestampTz> {
        let mut result = *t;
        if self.months != 0 {
            let m = Months::new(self.months.unsigned_abs());
            result = if self.months > 0 { result.checked_add_months(m) } else { result.checked_sub_months(m) }
                .ok_or_else(|| MeosError::OutOfRange("Timestamp out of range".into()))?;
        }
        result = result
            .checked_add_signed(Duration::days(self.days as i64))
            .and_then(|r| r.checked_add_signed(Duration::microseconds(self.micros)))
            .ok_or_else(|| MeosError::OutOfRange("Timestamp out of range".into()))?;
        Ok(result)
    }

    pub fn sub_from(&self, t: &TimestampTz) -> Result<TimestampTz> {
        self.mul(-1.0).add_to(t)
    }

    pub fn parse(s: &str) -> Result<Interval> {
        let invalid = || MeosError::parse(format!("Invalid input syntax for type interval: \"{}\"", s.trim()));
        let mut rest = s.trim();
        if rest.is_empty() {
            return Err(invalid());
        }
        let mut result = Interval::default();
        while !rest.is_empty() {
            if let Some(caps) = INTERVAL_TIME_RE.captures(rest) {
                let sign: i64 = if caps.get(1).map(|m| m.as_str()) == Some("-") { -1 } else { 1 };
                let hours: i64 = caps[2].parse().map_err(|_| invalid())?;
                let mins: i64 = caps[3].parse().map_err(|_| invalid())?;
                let secs: f64 = match caps.get(4) {
                    Some(m) => m.as_str().parse().map_err(|_| invalid())?,
                    None => 0.0,
                };
                let micros = (hours * 3600 + mins * 60) * USECS_PER_SEC + (secs * USECS_PER_SEC as f64).round() as i64;
                result.micros += sign * micros;
                rest = &rest[caps[0].len()..];
            } else if let Some(caps) = INTERVAL_UNIT_RE.captures(rest) {
                let qty: f64 = caps[1].parse().map_err(|_| invalid())?;
                let unit = caps[2].to_ascii_lowercase();
                let part = match unit.as_str() {
                    "year" | "years" | "y" => Interval::default().add(&Interval::new(12, 0, 0).mul(qty)),
                    "mon" | "mons" | "month" | "months" => Interval::new(1, 0, 0).mul(qty),
                    "week" | "weeks" | "w" => Interval::new(0, 7, 0).mul(qty),
                    "day" | "days" | "d" => Interval::new(0, 1, 0).mul(qty),
                    "hour" | "hours" | "h" => Interval::from_micros((qty * 3600.0 * USECS_PER_SEC as f64).round() as i64),
                    "minute" | "minutes" | "min" | "mins" => Interval::from_micros((qty * 60.0 * USECS_PER_SEC as f64).round() as i64),
                    "second" | "seconds" | "sec" | "secs" | "s" => Interval::from_micros((qty * USECS_PER_SEC as f64).round() as i64),
                    "millisecond" | "milliseconds" | "ms" => Interval::from_micros((qty * 1000.0).round() as i64),
                    _ => Interval::from_micros(qty.round() as i64),
                };
                result = result.add(&part);
                rest = &rest[caps[0].len()..];
            } else {
                return Err(invalid());
            }
            rest = rest.trim_start();
        }
        Ok(result)
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_micros().cmp(&other.total_micros())
    }
}
impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let (years, months) = (self.months / 12, self.months % 12);
        let plural = |n: i32, unit: &str| if n.abs() == 1 { format!("{} {}", n, unit) } else { format!("{} {}s", n, unit) };
        if years != 0 {
            parts.push(plural(years, "year"));
        }
        if months != 0 {
            parts.push(plural(months, "mon"));
        }
        if self.days != 0 {
            parts.push(plural(self.days, "day"));
        }
        if self.micros != 0 || parts.is_empty() {
            let sign = if self.micros < 0 { "-" } else { "" };
            let micros = self.micros.abs();
            let secs = micros / USECS_PER_SEC;
            let frac = micros % USECS_PER_SEC;
            let mut time = format!("{}{:02}:{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60, secs % 60);
            if frac != 0 {
                time.push('.');
                time.push_str(format!("{:06}", frac).trim_end_matches('0'));
            }
            parts.push(time);
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Add days to a date.
pub fn add_date_int(d: &NaiveDate, days: i32) -> Result<NaiveDate> {
    d.checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| MeosError::OutOfRange("Date out of range".into()))
}

/// The year of a timestamp in the session time zone, used by bin origins.
pub fn year_of(t: &TimestampTz) -> i32 {
    t.with_timezone(&session::session().offset()).year()
}
