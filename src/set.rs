//! Sets: ordered arrays of distinct base values.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::datatype::{DataType, NumberBase, SpanBase};
use crate::error::{MeosError, Result};
use crate::span::{Span, SpanOps, exclusive_upper};
use crate::spanset::SpanSet;
use crate::time::{Interval, TimestampTz, date_to_timestamp, timestamp_to_date};

#[derive(Debug, Clone)]
pub struct Set<T: DataType> {
    values: Vec<T>,
}

pub type IntSet = Set<i32>;
pub type BigintSet = Set<i64>;
pub type FloatSet = Set<f64>;
pub type TextSet = Set<String>;
pub type DateSet = Set<NaiveDate>;
pub type TstzSet = Set<TimestampTz>;

impl<T: DataType> Set<T> {
    /// Build a set from values in any order; duplicates are removed.
    pub fn make(mut values: Vec<T>) -> Result<Set<T>> {
        if values.is_empty() {
            return Err(MeosError::InvalidArg("A set must contain at least one value".into()));
        }
        if let Some(ctx) = values[0].spatial_context() {
            if let Some(bad) = values.iter().find(|v| v.spatial_context().map(|c| c.srid != ctx.srid || c.has_z != ctx.has_z).unwrap_or(true)) {
                return Err(MeosError::value(format!(
                    "The values of a set must have the same SRID and dimensionality: {}",
                    bad.output(15)
                )));
            }
        }
        values.sort_by(|a, b| a.compare(b));
        values.dedup_by(|a, b| a.eq_value(b));
        Ok(Set { values })
    }

    pub fn from_value(value: T) -> Set<T> {
        Set { values: vec![value] }
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn start_value(&self) -> &T {
        &self.values[0]
    }

    pub fn end_value(&self) -> &T {
        &self.values[self.values.len() - 1]
    }

    /// 1-based access.
    pub fn value_n(&self, n: usize) -> Option<&T> {
        if n == 0 { None } else { self.values.get(n - 1) }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Approximate size in bytes of the values.
    pub fn mem_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.values.len() * std::mem::size_of::<T>()
    }

    pub fn contains_value(&self, value: &T) -> bool {
        self.values.binary_search_by(|v| v.compare(value)).is_ok()
    }

    pub fn contains_set(&self, other: &Set<T>) -> bool {
        other.values.iter().all(|v| self.contains_value(v))
    }

    pub fn contained_in(&self, other: &Set<T>) -> bool {
        other.contains_set(self)
    }

    pub fn overlaps_set(&self, other: &Set<T>) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.values.len() && j < other.values.len() {
            match self.values[i].compare(&other.values[j]) {
                Ordering::Equal => return true,
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        false
    }

    /// Set is strictly before the other set.
    pub fn left_set(&self, other: &Set<T>) -> bool {
        self.end_value().compare(other.start_value()) == Ordering::Less
    }

    pub fn overleft_set(&self, other: &Set<T>) -> bool {
        self.end_value().compare(other.end_value()) != Ordering::Greater
    }

    pub fn right_set(&self, other: &Set<T>) -> bool {
        other.left_set(self)
    }

    pub fn overright_set(&self, other: &Set<T>) -> bool {
        self.start_value().compare(other.start_value()) != Ordering::Less
    }

    pub fn union(&self, other: &Set<T>) -> Set<T> {
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        let (mut i, mut j) = (0, 0);
        while i < self.values.len() && j < other.values.len() {
            match self.values[i].compare(&other.values[j]) {
                Ordering::Less => {
                    values.push(self.values[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    values.push(other.values[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    values.push(self.values[i].clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        values.extend_from_slice(&self.values[i..]);
        values.extend_from_slice(&other.values[j..]);
        Set { values }
    }

    pub fn union_value(&self, value: &T) -> Set<T> {
        self.union(&Set::from_value(value.clone()))
    }

    pub fn intersection(&self, other: &Set<T>) -> Option<Set<T>> {
        let values: Vec<T> = self.values.iter().filter(|v| other.contains_value(v)).cloned().collect();
        if values.is_empty() { None } else { Some(Set { values }) }
    }

    pub fn minus(&self, other: &Set<T>) -> Option<Set<T>> {
        let values: Vec<T> = self.values.iter().filter(|v| !other.contains_value(v)).cloned().collect();
        if values.is_empty() { None } else { Some(Set { values }) }
    }

    pub fn minus_value(&self, value: &T) -> Option<Set<T>> {
        self.minus(&Set::from_value(value.clone()))
    }

    /// Lexicographic order on the values, shorter sets first on ties.
    pub fn compare(&self, other: &Set<T>) -> Ordering {
        for (a, b) in self.values.iter().zip(other.values.iter()) {
            match a.compare(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.values.len().cmp(&other.values.len())
    }

    pub fn hash_value(&self) -> u64 {
        let bytes: Vec<u8> = self.values.iter().flat_map(|v| v.hash_value().to_le_bytes()).collect();
        seahash::hash(&bytes)
    }

    pub fn round(&self, maxdd: usize) -> Set<T> {
        let values = self.values.iter().map(|v| v.round(maxdd)).collect();
        // rounding may merge values
        Set::make(values).unwrap_or_else(|_| self.clone())
    }

    /// Apply a value transformation, restoring the set invariants.
    pub fn map<U: DataType, F: Fn(&T) -> Result<U>>(&self, f: F) -> Result<Set<U>> {
        Set::make(self.values.iter().map(f).collect::<Result<Vec<U>>>()?)
    }
}

impl<T: DataType> PartialEq for Set<T> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl<T: DataType> PartialOrd for Set<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl<T: SpanBase> Set<T> {
    /// Bounding span.
    pub fn span(&self) -> Span<T> {
        let lower = self.values[0];
        let upper = self.values[self.values.len() - 1];
        let (upper, upper_inc) = if T::DISCRETE { exclusive_upper(upper) } else { (upper, true) };
        Span { lower, upper, lower_inc: true, upper_inc }
    }

    pub fn to_spanset(&self) -> SpanSet<T> {
        SpanSet::from_set(self)
    }

    /// At most `n` spans covering the values, grouping consecutive values.
    pub fn split_n_spans(&self, n: usize) -> Result<Vec<Span<T>>> {
        if n == 0 {
            return Err(MeosError::value("The number of spans must be positive".to_string()));
        }
        let count = self.values.len();
        let groups = n.min(count);
        let size = count / groups;
        let remainder = count % groups;
        let mut result = Vec::with_capacity(groups);
        let mut start = 0;
        for i in 0..groups {
            let len = size + usize::from(i < remainder);
            let first = Span::from_value(self.values[start]);
            let last = Span::from_value(self.values[start + len - 1]);
            result.push(first.hull(&last));
            start += len;
        }
        Ok(result)
    }

    /// One span for every `n` consecutive values.
    pub fn split_each_n_spans(&self, n: usize) -> Result<Vec<Span<T>>> {
        if n == 0 {
            return Err(MeosError::value("The number of values must be positive".to_string()));
        }
        Ok(self
            .values
            .chunks(n)
            .map(|group| Span::from_value(group[0]).hull(&Span::from_value(group[group.len() - 1])))
            .collect())
    }
}

impl<T: SpanBase> SpanOps<T> for Set<T> {
    fn extent(&self) -> Span<T> {
        self.span()
    }
    fn span_list(&self) -> Cow<'_, [Span<T>]> {
        Cow::Owned(self.values.iter().map(|v| Span::from_value(*v)).collect())
    }
}

impl<T: NumberBase> Set<T> {
    /// Shift the values and/or scale them so that the set spans `width`.
    pub fn shift_scale(&self, shift: Option<T>, width: Option<T>) -> Result<Set<T>> {
        if shift.is_none() && width.is_none() {
            return Err(MeosError::InvalidArg("Shift and width cannot both be absent".into()));
        }
        if let Some(w) = width {
            if w.to_f64() <= 0.0 {
                return Err(MeosError::value(format!("The width must be positive: {:?}", w)));
            }
        }
        let start = self.values[0].to_f64();
        let old_width = self.values[self.values.len() - 1].to_f64() - start;
        let new_start = start + shift.map(|s| s.to_f64()).unwrap_or(0.0);
        let ratio = match width {
            Some(w) if old_width > 0.0 => w.to_f64() / old_width,
            _ => 1.0,
        };
        let values = self
            .values
            .iter()
            .map(|v| {
                let x = new_start + (v.to_f64() - start) * ratio;
                T::checked_from_f64(if T::DISCRETE { x.round() } else { x })
            })
            .collect::<Result<Vec<_>>>()?;
        Set::make(values)
    }
}

impl Set<i32> {
    pub fn to_floatset(&self) -> Set<f64> {
        Set { values: self.values.iter().map(|v| *v as f64).collect() }
    }
}

impl Set<f64> {
    pub fn to_intset(&self) -> Set<i32> {
        let mut values: Vec<i32> = self.values.iter().map(|v| v.floor() as i32).collect();
        values.dedup();
        Set { values }
    }
}

impl Set<NaiveDate> {
    pub fn to_tstzset(&self) -> Set<TimestampTz> {
        Set { values: self.values.iter().map(date_to_timestamp).collect() }
    }
}

impl Set<TimestampTz> {
    pub fn to_dateset(&self) -> Set<NaiveDate> {
        let mut values: Vec<NaiveDate> = self.values.iter().map(timestamp_to_date).collect();
        values.dedup();
        Set { values }
    }

    /// Shift the timestamps and/or scale them to span `duration`.
    pub fn shift_scale_time(&self, shift: Option<&Interval>, duration: Option<&Interval>) -> Result<Set<TimestampTz>> {
        let span = self.span().shift_scale_time(shift, duration)?;
        let start = self.values[0];
        let old_micros = (self.values[self.values.len() - 1] - start).num_microseconds().unwrap_or(0) as f64;
        let new_micros = (span.upper - span.lower).num_microseconds().unwrap_or(0) as f64;
        let ratio = if old_micros == 0.0 { 1.0 } else { new_micros / old_micros };
        let values = self
            .values
            .iter()
            .map(|t| {
                let offset = (*t - start).num_microseconds().unwrap_or(0) as f64;
                crate::time::add_micros(&span.lower, (offset * ratio).round() as i64)
            })
            .collect::<Result<Vec<_>>>()?;
        Set::make(values)
    }
}

impl Set<String> {
    pub fn upper(&self) -> Set<String> {
        Set::make(self.values.iter().map(|v| v.to_uppercase()).collect()).unwrap_or_else(|_| self.clone())
    }

    pub fn lower(&self) -> Set<String> {
        Set::make(self.values.iter().map(|v| v.to_lowercase()).collect()).unwrap_or_else(|_| self.clone())
    }

    pub fn textcat(&self, suffix: &str) -> Set<String> {
        Set::make(self.values.iter().map(|v| format!("{}{}", v, suffix)).collect()).unwrap_or_else(|_| self.clone())
    }
}
