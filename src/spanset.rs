//! Span sets: ordered arrays of disjoint, non-adjacent spans.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::datatype::{NumberBase, SpanBase};
use crate::error::{MeosError, Result};
use crate::set::Set;
use crate::span::{Span, SpanOps, cmp_lower, span_adjacent, span_overlaps};
use crate::time::{Interval, TimestampTz};

#[derive(Debug, Clone)]
pub struct SpanSet<T: SpanBase> {
    spans: Vec<Span<T>>,
    extent: Span<T>,
}

pub type IntSpanSet = SpanSet<i32>;
pub type BigintSpanSet = SpanSet<i64>;
pub type FloatSpanSet = SpanSet<f64>;
pub type DateSpanSet = SpanSet<NaiveDate>;
pub type TstzSpanSet = SpanSet<TimestampTz>;

impl<T: SpanBase> SpanSet<T> {
    /// Build a span set from arbitrary spans, merging the ones that overlap
    /// or are adjacent.
    pub fn make(spans: Vec<Span<T>>) -> Result<SpanSet<T>> {
        if spans.is_empty() {
            return Err(MeosError::InvalidArg("A span set must contain at least one span".into()));
        }
        Ok(SpanSet::normalize(spans))
    }

    /// Sort and merge. Callers guarantee a non-empty input.
    pub(crate) fn normalize(mut spans: Vec<Span<T>>) -> SpanSet<T> {
        spans.sort_by(cmp_lower);
        let mut merged: Vec<Span<T>> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last) if span_overlaps(last, &span) || span_adjacent(last, &span) => *last = last.hull(&span),
                _ => merged.push(span),
            }
        }
        debug_assert!(!merged.is_empty(), "span sets are never empty");
        let extent = merged[0].hull(&merged[merged.len() - 1]);
        SpanSet { spans: merged, extent }
    }

    pub fn from_span(span: Span<T>) -> SpanSet<T> {
        SpanSet { spans: vec![span], extent: span }
    }

    pub fn from_value(value: T) -> SpanSet<T> {
        SpanSet::from_span(Span::from_value(value))
    }

    pub fn from_set(set: &Set<T>) -> SpanSet<T> {
        SpanSet::normalize(set.values().iter().map(|v| Span::from_value(*v)).collect())
    }

    pub fn num_spans(&self) -> usize {
        self.spans.len()
    }

    /// 1-based access.
    pub fn span_n(&self, n: usize) -> Option<&Span<T>> {
        if n == 0 { None } else { self.spans.get(n - 1) }
    }

    pub fn start_span(&self) -> &Span<T> {
        &self.spans[0]
    }

    pub fn end_span(&self) -> &Span<T> {
        &self.spans[self.spans.len() - 1]
    }

    pub fn spans(&self) -> &[Span<T>] {
        &self.spans
    }

    /// Bounding span.
    pub fn span(&self) -> Span<T> {
        self.extent
    }

    pub fn lower(&self) -> T {
        self.extent.lower()
    }

    pub fn upper(&self) -> T {
        self.extent.upper()
    }

    pub fn lower_inc(&self) -> bool {
        self.extent.lower_inc()
    }

    pub fn upper_inc(&self) -> bool {
        self.extent.upper_inc()
    }

    pub fn compare(&self, other: &SpanSet<T>) -> Ordering {
        for (a, b) in self.spans.iter().zip(other.spans.iter()) {
            match a.compare(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.spans.len().cmp(&other.spans.len())
    }

    pub fn hash_value(&self) -> u64 {
        let bytes: Vec<u8> = self.spans.iter().flat_map(|s| s.hash_value().to_le_bytes()).collect();
        seahash::hash(&bytes)
    }

    /// At most `n` spans covering the span set, grouping consecutive spans.
    pub fn split_n_spans(&self, n: usize) -> Result<Vec<Span<T>>> {
        if n == 0 {
            return Err(MeosError::value("The number of spans must be positive".to_string()));
        }
        if self.spans.len() <= n {
            return Ok(self.spans.clone());
        }
        let size = self.spans.len() / n;
        let remainder = self.spans.len() % n;
        let mut result = Vec::with_capacity(n);
        let mut start = 0;
        for i in 0..n {
            let len = size + usize::from(i < remainder);
            let group = &self.spans[start..start + len];
            result.push(group[0].hull(&group[len - 1]));
            start += len;
        }
        Ok(result)
    }

    /// One span for every `n` consecutive spans.
    pub fn split_each_n_spans(&self, n: usize) -> Result<Vec<Span<T>>> {
        if n == 0 {
            return Err(MeosError::value("The number of spans must be positive".to_string()));
        }
        Ok(self.spans.chunks(n).map(|group| group[0].hull(&group[group.len() - 1])).collect())
    }

    pub(crate) fn map_spans<F: Fn(&Span<T>) -> Result<Span<T>>>(&self, f: F) -> Result<SpanSet<T>> {
        let spans = self.spans.iter().map(f).collect::<Result<Vec<_>>>()?;
        SpanSet::make(spans)
    }
}

impl<T: SpanBase> PartialEq for SpanSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl<T: SpanBase> PartialOrd for SpanSet<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl<T: SpanBase> SpanOps<T> for SpanSet<T> {
    fn extent(&self) -> Span<T> {
        self.extent
    }
    fn span_list(&self) -> Cow<'_, [Span<T>]> {
        Cow::Borrowed(&self.spans)
    }
}

impl<T: NumberBase> SpanSet<T> {
    /// Sum of the widths of the spans, or the width of the bounding span.
    pub fn width(&self, ignore_gaps: bool) -> Result<T> {
        if ignore_gaps {
            return self.extent.width();
        }
        self.spans.iter().try_fold(T::zero(), |acc, s| acc.add(&s.width()?))
    }

    pub fn shift_scale(&self, shift: Option<T>, width: Option<T>) -> Result<SpanSet<T>> {
        let new_extent = self.extent.shift_scale(shift, width)?;
        let old_lower = self.extent.lower.to_f64();
        let old_width = self.extent.width()?.to_f64();
        let ratio = if old_width == 0.0 { 1.0 } else { new_extent.width()?.to_f64() / old_width };
        let new_lower = new_extent.lower.to_f64();
        let scale = |v: T| -> Result<T> {
            let x = new_lower + (v.to_f64() - old_lower) * ratio;
            T::checked_from_f64(if T::DISCRETE { x.round() } else { x })
        };
        self.map_spans(|s| Span::make(scale(s.lower)?, scale(s.upper)?, s.lower_inc, s.upper_inc))
    }
}

impl SpanSet<f64> {
    pub fn round(&self, maxdd: usize) -> Result<SpanSet<f64>> {
        self.map_spans(|s| s.round(maxdd))
    }

    pub fn to_intspanset(&self) -> Result<SpanSet<i32>> {
        let spans = self.spans.iter().map(|s| s.to_intspan()).collect::<Result<Vec<_>>>()?;
        SpanSet::make(spans)
    }
}

impl SpanSet<i32> {
    pub fn to_floatspanset(&self) -> SpanSet<f64> {
        SpanSet::normalize(self.spans.iter().map(|s| s.to_floatspan()).collect())
    }
}

impl SpanSet<NaiveDate> {
    pub fn to_tstzspanset(&self) -> SpanSet<TimestampTz> {
        SpanSet::normalize(self.spans.iter().map(|s| s.to_tstzspan()).collect())
    }
}

impl SpanSet<TimestampTz> {
    /// Sum of the durations of the spans, or the duration of the bounding
    /// period.
    pub fn duration(&self, ignore_gaps: bool) -> Interval {
        if ignore_gaps {
            return self.extent.duration();
        }
        let micros: i64 = self.spans.iter().map(|s| s.duration().total_micros()).sum();
        let days = micros / crate::time::USECS_PER_DAY;
        Interval::new(0, days as i32, micros % crate::time::USECS_PER_DAY)
    }

    /// Distinct bounds of the composing periods.
    pub fn timestamps(&self) -> Vec<TimestampTz> {
        let mut result: Vec<TimestampTz> = Vec::with_capacity(self.spans.len() * 2);
        for s in &self.spans {
            if result.last() != Some(&s.lower) {
                result.push(s.lower);
            }
            if s.upper != s.lower {
                result.push(s.upper);
            }
        }
        result
    }

    pub fn num_timestamps(&self) -> usize {
        self.timestamps().len()
    }

    pub fn start_timestamp(&self) -> TimestampTz {
        self.extent.lower
    }

    pub fn end_timestamp(&self) -> TimestampTz {
        self.extent.upper
    }

    pub fn to_datespanset(&self) -> Result<SpanSet<NaiveDate>> {
        let spans = self.spans.iter().map(|s| s.to_datespan()).collect::<Result<Vec<_>>>()?;
        SpanSet::make(spans)
    }

    pub fn shift_scale_time(&self, shift: Option<&Interval>, duration: Option<&Interval>) -> Result<SpanSet<TimestampTz>> {
        let new_extent = self.extent.shift_scale_time(shift, duration)?;
        let old_lower = self.extent.lower;
        let old_micros = (self.extent.upper - self.extent.lower).num_microseconds().unwrap_or(0) as f64;
        let new_micros = (new_extent.upper - new_extent.lower).num_microseconds().unwrap_or(0) as f64;
        let ratio = if old_micros == 0.0 { 1.0 } else { new_micros / old_micros };
        let scale = |t: TimestampTz| -> Result<TimestampTz> {
            let offset = (t - old_lower).num_microseconds().unwrap_or(0) as f64;
            crate::time::add_micros(&new_extent.lower, (offset * ratio).round() as i64)
        };
        self.map_spans(|s| Span::make(scale(s.lower)?, scale(s.upper)?, s.lower_inc, s.upper_inc))
    }
}
