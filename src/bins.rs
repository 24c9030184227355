//! Bucketing of values and timestamps into regular bins anchored at an
//! origin, shared by span bins, temporal splits, box tiles and
//! `tprecision`.

use crate::datatype::NumberBase;
use crate::error::{MeosError, Result};
use crate::time::{Interval, TimestampTz, add_micros, to_pg_micros};

/// Start of the bin of width `size` containing `value`.
pub fn value_bin<T: NumberBase>(value: T, size: T, origin: T) -> Result<T> {
    if size.to_f64() <= 0.0 {
        return Err(MeosError::value(format!("The bin size must be positive: {:?}", size)));
    }
    let offset = value.sub(&origin)?.to_f64() / size.to_f64();
    let k = offset.floor();
    origin.add(&T::checked_from_f64(k * size.to_f64())?)
}

/// Length of a bin duration in microseconds. Durations with a month part
/// have no fixed length and are rejected.
pub fn duration_micros(duration: &Interval) -> Result<i64> {
    if duration.months != 0 {
        return Err(MeosError::value("The duration cannot have a month part".to_string()));
    }
    let micros = duration.total_micros();
    if micros <= 0 {
        return Err(MeosError::value(format!("The duration must be positive: {}", duration)));
    }
    Ok(micros)
}

/// Start of the time bin of `duration` containing `t`.
pub fn time_bin(t: &TimestampTz, duration: &Interval, origin: &TimestampTz) -> Result<TimestampTz> {
    let size = duration_micros(duration)?;
    let offset = to_pg_micros(t)
        .checked_sub(to_pg_micros(origin))
        .ok_or_else(|| MeosError::OutOfRange("Timestamp out of range".into()))?;
    let k = offset.div_euclid(size);
    let micros = k.checked_mul(size).ok_or_else(|| MeosError::OutOfRange("Timestamp out of range".into()))?;
    add_micros(origin, micros)
}

/// Expected number of bins of `size` from `first` up to `upper`, at most
/// `MAX_RESERVED_BINS`.
fn bin_count(first: f64, upper: f64, size: f64) -> usize {
    let n = ((upper - first) / size).floor() + 1.0;
    if n.is_finite() && n > 0.0 { n.min(MAX_RESERVED_BINS) as usize } else { 0 }
}

const MAX_RESERVED_BINS: f64 = 65_536.0;

/// Starts of the value bins overlapping `[lower, upper]`. Fails when `size`
/// is too small to move from one start to the next.
pub fn value_bin_starts<T: NumberBase>(lower: T, upper: T, size: T, origin: T) -> Result<Vec<T>> {
    let mut start = value_bin(lower, size, origin)?;
    let mut starts = Vec::with_capacity(bin_count(start.to_f64(), upper.to_f64(), size.to_f64()));
    while start <= upper {
        starts.push(start);
        match start.add(&size) {
            Ok(next) if next > start => start = next,
            Ok(_) => {
                return Err(MeosError::value(format!(
                    "The bin size {:?} is too small for the value {:?}",
                    size, start
                )));
            }
            // no value of the type lies past this start
            Err(_) => break,
        }
    }
    Ok(starts)
}

/// Starts of the time bins overlapping `[lower, upper]`.
pub fn time_bin_starts(
    lower: &TimestampTz,
    upper: &TimestampTz,
    duration: &Interval,
    origin: &TimestampTz,
) -> Result<Vec<TimestampTz>> {
    let size = duration_micros(duration)?;
    let mut start = time_bin(lower, duration, origin)?;
    let span = (*upper - start).num_microseconds().unwrap_or(i64::MAX);
    let mut starts = Vec::with_capacity(bin_count(0.0, span as f64, size as f64));
    while start <= *upper {
        starts.push(start);
        match add_micros(&start, size) {
            Ok(next) => start = next,
            Err(_) => break,
        }
    }
    Ok(starts)
}
