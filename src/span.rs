//! Spans: contiguous ranges over an ordered base type, and the predicates
//! and algebra shared by every span-like operand (sets, spans, span sets).

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::bins::{time_bin_starts, value_bin_starts};
use crate::datatype::{NumberBase, SpanBase};
use crate::error::{MeosError, Result};
use crate::spanset::SpanSet;
use crate::time::{Interval, TimestampTz, date_to_timestamp, timestamp_to_date};

#[derive(Debug, Clone, Copy)]
pub struct Span<T: SpanBase> {
    pub(crate) lower: T,
    pub(crate) upper: T,
    pub(crate) lower_inc: bool,
    pub(crate) upper_inc: bool,
}

pub type IntSpan = Span<i32>;
pub type BigintSpan = Span<i64>;
pub type FloatSpan = Span<f64>;
pub type DateSpan = Span<NaiveDate>;
pub type TstzSpan = Span<TimestampTz>;

pub(crate) fn cmp_lower<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> Ordering {
    match a.lower.compare(&b.lower) {
        Ordering::Equal => match (a.lower_inc, b.lower_inc) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        },
        ord => ord,
    }
}

pub(crate) fn cmp_upper<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> Ordering {
    match a.upper.compare(&b.upper) {
        Ordering::Equal => match (a.upper_inc, b.upper_inc) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        },
        ord => ord,
    }
}

/// Canonical exclusive form of an inclusive discrete upper bound. The
/// greatest value of the type has no successor and stays inclusive.
pub(crate) fn exclusive_upper<T: SpanBase>(upper: T) -> (T, bool) {
    match upper.succ() {
        Some(next) => (next, false),
        None => (upper, true),
    }
}

impl<T: SpanBase> Span<T> {
    /// Build a span, canonicalising discrete types to `[lower, upper)`.
    pub fn make(lower: T, upper: T, lower_inc: bool, upper_inc: bool) -> Result<Span<T>> {
        let (mut lower, mut upper, mut lower_inc, mut upper_inc) = (lower, upper, lower_inc, upper_inc);
        if T::DISCRETE {
            if !lower_inc {
                lower = lower.succ().ok_or_else(|| {
                    MeosError::OutOfRange(format!("Exclusive span lower bound out of range: {}", lower.output(15)))
                })?;
                lower_inc = true;
            }
            if upper_inc {
                (upper, upper_inc) = exclusive_upper(upper);
            }
        }
        match lower.compare(&upper) {
            Ordering::Greater => Err(MeosError::value(format!(
                "Span lower bound must be less than or equal to span upper bound: {} > {}",
                lower.output(15),
                upper.output(15)
            ))),
            Ordering::Equal if !(lower_inc && upper_inc) => Err(MeosError::value(format!(
                "Span lower bound must be less than span upper bound when a bound is exclusive: {}",
                lower.output(15)
            ))),
            _ => Ok(Span { lower, upper, lower_inc, upper_inc }),
        }
    }

    /// Span holding exactly one value.
    pub fn from_value(value: T) -> Span<T> {
        let (upper, upper_inc) = if T::DISCRETE { exclusive_upper(value) } else { (value, true) };
        Span { lower: value, upper, lower_inc: true, upper_inc }
    }

    /// Least value of the span, the lower bound for continuous types.
    pub fn lower(&self) -> T {
        self.lower
    }

    /// Greatest value of the span, the upper bound for continuous types.
    pub fn upper(&self) -> T {
        match self.upper.pred() {
            Some(pred) if T::DISCRETE && !self.upper_inc => pred,
            _ => self.upper,
        }
    }

    pub fn lower_bound(&self) -> T {
        self.lower
    }
    pub fn upper_bound(&self) -> T {
        self.upper
    }
    pub fn lower_inc(&self) -> bool {
        self.lower_inc
    }
    pub fn upper_inc(&self) -> bool {
        self.upper_inc
    }

    /// Whether the span holds a single value.
    pub fn is_singleton(&self) -> bool {
        self.lower().compare(&self.upper()) == Ordering::Equal
    }

    pub fn contains_value(&self, value: &T) -> bool {
        let lower_ok = match self.lower.compare(value) {
            Ordering::Less => true,
            Ordering::Equal => self.lower_inc,
            Ordering::Greater => false,
        };
        let upper_ok = match value.compare(&self.upper) {
            Ordering::Less => true,
            Ordering::Equal => self.upper_inc,
            Ordering::Greater => false,
        };
        lower_ok && upper_ok
    }

    /// Smallest span containing both spans.
    pub fn hull(&self, other: &Span<T>) -> Span<T> {
        let lower = if cmp_lower(self, other) != Ordering::Greater { self } else { other };
        let upper = if cmp_upper(self, other) != Ordering::Less { self } else { other };
        Span { lower: lower.lower, upper: upper.upper, lower_inc: lower.lower_inc, upper_inc: upper.upper_inc }
    }

    pub fn intersect_span(&self, other: &Span<T>) -> Option<Span<T>> {
        if !span_overlaps(self, other) {
            return None;
        }
        let lower = if cmp_lower(self, other) == Ordering::Greater { self } else { other };
        let upper = if cmp_upper(self, other) == Ordering::Less { self } else { other };
        Some(Span { lower: lower.lower, upper: upper.upper, lower_inc: lower.lower_inc, upper_inc: upper.upper_inc })
    }

    /// `self - other`, zero, one or two spans.
    pub fn minus_span(&self, other: &Span<T>) -> Vec<Span<T>> {
        if !span_overlaps(self, other) {
            return vec![*self];
        }
        let mut result = Vec::with_capacity(2);
        if cmp_lower(self, other) == Ordering::Less {
            if let Ok(left) = Span::make(self.lower, other.lower, self.lower_inc, !other.lower_inc) {
                result.push(left);
            }
        }
        if cmp_upper(self, other) == Ordering::Greater {
            if let Ok(right) = Span::make(other.upper, self.upper, !other.upper_inc, self.upper_inc) {
                result.push(right);
            }
        }
        result
    }

    /// Total order: lower bounds first, then upper bounds.
    pub fn compare(&self, other: &Span<T>) -> Ordering {
        match cmp_lower(self, other) {
            Ordering::Equal => cmp_upper(self, other),
            ord => ord,
        }
    }

    pub fn hash_value(&self) -> u64 {
        let flags = (self.lower_inc as u64) | ((self.upper_inc as u64) << 1);
        let mut bytes = Vec::with_capacity(24);
        bytes.extend_from_slice(&self.lower.hash_value().to_le_bytes());
        bytes.extend_from_slice(&self.upper.hash_value().to_le_bytes());
        bytes.extend_from_slice(&flags.to_le_bytes());
        seahash::hash(&bytes)
    }

    pub fn to_spanset(&self) -> SpanSet<T> {
        SpanSet::from_span(*self)
    }
}

impl<T: SpanBase> PartialEq for Span<T> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl<T: SpanBase> PartialOrd for Span<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

pub(crate) fn span_overlaps<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> bool {
    let left_ok = match a.lower.compare(&b.upper) {
        Ordering::Less => true,
        Ordering::Equal => a.lower_inc && b.upper_inc,
        Ordering::Greater => false,
    };
    let right_ok = match b.lower.compare(&a.upper) {
        Ordering::Less => true,
        Ordering::Equal => b.lower_inc && a.upper_inc,
        Ordering::Greater => false,
    };
    left_ok && right_ok
}

pub(crate) fn span_contains<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> bool {
    cmp_lower(a, b) != Ordering::Greater && cmp_upper(a, b) != Ordering::Less
}

/// The spans touch with exactly one of the two bounds inclusive.
pub(crate) fn span_adjacent<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> bool {
    (a.upper.compare(&b.lower) == Ordering::Equal && a.upper_inc != b.lower_inc)
        || (b.upper.compare(&a.lower) == Ordering::Equal && b.upper_inc != a.lower_inc)
}

/// `a` ends strictly before `b` starts.
pub(crate) fn span_left<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> bool {
    match a.upper.compare(&b.lower) {
        Ordering::Less => true,
        Ordering::Equal => !(a.upper_inc && b.lower_inc),
        Ordering::Greater => false,
    }
}

/// `a` does not extend to the right of `b`.
pub(crate) fn span_overleft<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> bool {
    cmp_upper(a, b) != Ordering::Greater
}

/// `a` does not extend to the left of `b`.
pub(crate) fn span_overright<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> bool {
    cmp_lower(a, b) != Ordering::Less
}

/// Gap between two non-overlapping spans, `a` left of `b`.
fn span_gap<T: SpanBase>(a: &Span<T>, b: &Span<T>) -> Result<T::Delta> {
    a.upper().delta(&b.lower())
}

/// Predicates and algebra over any operand that can be viewed as an ordered
/// list of disjoint spans.
pub trait SpanOps<T: SpanBase> {
    /// Bounding span.
    fn extent(&self) -> Span<T>;
    /// Composing spans, ordered and pairwise disjoint.
    fn span_list(&self) -> Cow<'_, [Span<T>]>;

    fn contains<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        if !span_contains(&self.extent(), &other.extent()) {
            return false;
        }
        let a = self.span_list();
        let b = other.span_list();
        let mut i = 0;
        for sb in b.iter() {
            while i < a.len() && cmp_upper(&a[i], sb) == Ordering::Less {
                i += 1;
            }
            if i == a.len() || !span_contains(&a[i], sb) {
                return false;
            }
        }
        true
    }

    fn contained<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        other.contains(self)
    }

    fn overlaps<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        if !span_overlaps(&self.extent(), &other.extent()) {
            return false;
        }
        let a = self.span_list();
        let b = other.span_list();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            if span_overlaps(&a[i], &b[j]) {
                return true;
            }
            if cmp_upper(&a[i], &b[j]) == Ordering::Less {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    fn adjacent<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        span_adjacent(&self.extent(), &other.extent())
    }

    fn left<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        span_left(&self.extent(), &other.extent())
    }

    fn overleft<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        span_overleft(&self.extent(), &other.extent())
    }

    fn right<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        span_left(&other.extent(), &self.extent())
    }

    fn overright<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        span_overright(&self.extent(), &other.extent())
    }

    fn before<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        self.left(other)
    }
    fn overbefore<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        self.overleft(other)
    }
    fn after<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        self.right(other)
    }
    fn overafter<O: SpanOps<T> + ?Sized>(&self, other: &O) -> bool {
        self.overright(other)
    }

    fn union<O: SpanOps<T> + ?Sized>(&self, other: &O) -> SpanSet<T> {
        let mut spans = self.span_list().into_owned();
        spans.extend_from_slice(&other.span_list());
        SpanSet::normalize(spans)
    }

    fn intersection<O: SpanOps<T> + ?Sized>(&self, other: &O) -> Option<SpanSet<T>> {
        if !span_overlaps(&self.extent(), &other.extent()) {
            return None;
        }
        let a = self.span_list();
        let b = other.span_list();
        let (mut i, mut j) = (0, 0);
        let mut result = vec![];
        while i < a.len() && j < b.len() {
            if let Some(inter) = a[i].intersect_span(&b[j]) {
                result.push(inter);
            }
            if cmp_upper(&a[i], &b[j]) == Ordering::Less {
                i += 1;
            } else {
                j += 1;
            }
        }
        if result.is_empty() { None } else { Some(SpanSet::normalize(result)) }
    }

    fn minus<O: SpanOps<T> + ?Sized>(&self, other: &O) -> Option<SpanSet<T>> {
        let b = other.span_list();
        let mut result = vec![];
        for sa in self.span_list().iter() {
            let mut pieces = vec![*sa];
            for sb in b.iter().filter(|sb| span_overlaps(sa, sb)) {
                pieces = pieces.iter().flat_map(|p| p.minus_span(sb)).collect();
                if pieces.is_empty() {
                    break;
                }
            }
            result.extend(pieces);
        }
        if result.is_empty() { None } else { Some(SpanSet::normalize(result)) }
    }

    /// Zero when the operands intersect, otherwise the smallest gap.
    fn distance<O: SpanOps<T> + ?Sized>(&self, other: &O) -> Result<T::Delta> {
        if self.overlaps(other) {
            return Ok(T::zero_delta());
        }
        let a = self.span_list();
        let b = other.span_list();
        let mut merged: Vec<(bool, &Span<T>)> = a.iter().map(|s| (true, s)).chain(b.iter().map(|s| (false, s))).collect();
        merged.sort_by(|x, y| cmp_lower(x.1, y.1));
        let mut best: Option<T::Delta> = None;
        for w in merged.windows(2) {
            if w[0].0 != w[1].0 {
                let gap = span_gap(w[0].1, w[1].1)?;
                best = match best {
                    Some(b) if b <= gap => Some(b),
                    _ => Some(gap),
                };
            }
        }
        Ok(best.unwrap_or_else(T::zero_delta))
    }

    fn contains_value(&self, value: &T) -> bool {
        self.contains(&Span::from_value(*value))
    }
    fn left_value(&self, value: &T) -> bool {
        self.left(&Span::from_value(*value))
    }
    fn overleft_value(&self, value: &T) -> bool {
        self.overleft(&Span::from_value(*value))
    }
    fn right_value(&self, value: &T) -> bool {
        self.right(&Span::from_value(*value))
    }
    fn overright_value(&self, value: &T) -> bool {
        self.overright(&Span::from_value(*value))
    }
    fn adjacent_value(&self, value: &T) -> bool {
        self.adjacent(&Span::from_value(*value))
    }
    fn distance_value(&self, value: &T) -> Result<T::Delta> {
        self.distance(&Span::from_value(*value))
    }
}

impl<T: SpanBase> SpanOps<T> for Span<T> {
    fn extent(&self) -> Span<T> {
        *self
    }
    fn span_list(&self) -> Cow<'_, [Span<T>]> {
        Cow::Owned(vec![*self])
    }
}

impl<T: NumberBase> Span<T> {
    /// Difference between the bounds; for discrete types, the number of
    /// values.
    pub fn width(&self) -> Result<T> {
        let width = self.upper.sub(&self.lower)?;
        if T::DISCRETE && self.upper_inc { width.add(&T::from_f64(1.0)) } else { Ok(width) }
    }

    /// Widen the span by `value` on both sides.
    pub fn expand(&self, value: T) -> Result<Span<T>> {
        Span::make(self.lower.sub(&value)?, self.upper.add(&value)?, self.lower_inc, self.upper_inc)
    }

    /// Shift the span by `shift` and/or set its width to `width`.
    pub fn shift_scale(&self, shift: Option<T>, width: Option<T>) -> Result<Span<T>> {
        if shift.is_none() && width.is_none() {
            return Err(MeosError::InvalidArg("Shift and width cannot both be absent".into()));
        }
        let lower = match shift {
            Some(s) => self.lower.add(&s)?,
            None => self.lower,
        };
        let upper = match (width, shift) {
            (Some(w), _) => {
                if w.to_f64() <= 0.0 {
                    return Err(MeosError::value(format!("The width must be positive: {:?}", w)));
                }
                lower.add(&w)?
            }
            (None, Some(s)) => self.upper.add(&s)?,
            (None, None) => self.upper,
        };
        let upper_inc = if lower.compare(&upper) == Ordering::Equal { true } else { self.upper_inc };
        let lower_inc = if lower.compare(&upper) == Ordering::Equal { true } else { self.lower_inc };
        Span::make(lower, upper, lower_inc, upper_inc)
    }

    /// Bin `[start, start + size)`. A bin running past the greatest value
    /// of the type ends with the span instead.
    pub(crate) fn bin_at(&self, start: T, size: T) -> Span<T> {
        match start.add(&size) {
            Ok(upper) => Span { lower: start, upper, lower_inc: true, upper_inc: false },
            Err(_) => Span { lower: start, upper: self.upper, lower_inc: true, upper_inc: self.upper_inc },
        }
    }

    /// Value bins of width `size` anchored at `origin` covering the span.
    pub fn bins(&self, size: T, origin: T) -> Result<Vec<Span<T>>> {
        let starts = value_bin_starts(self.lower, self.upper(), size, origin)?;
        let mut result = vec![];
        for start in starts {
            if let Some(piece) = self.bin_at(start, size).intersect_span(self) {
                result.push(piece);
            }
        }
        Ok(result)
    }
}

impl Span<f64> {
    pub fn round(&self, maxdd: usize) -> Result<Span<f64>> {
        let lower = crate::time::float_round(self.lower, maxdd);
        let upper = crate::time::float_round(self.upper, maxdd);
        let (lower_inc, upper_inc) = if lower == upper { (true, true) } else { (self.lower_inc, self.upper_inc) };
        Span::make(lower, upper, lower_inc, upper_inc)
    }

    pub fn to_intspan(&self) -> Result<Span<i32>> {
        Span::make(self.lower.floor() as i32, self.upper.floor() as i32, self.lower_inc, self.upper_inc)
    }
}

impl Span<i32> {
    pub fn to_floatspan(&self) -> Span<f64> {
        Span { lower: self.lower as f64, upper: self.upper as f64, lower_inc: self.lower_inc, upper_inc: self.upper_inc }
    }
}

impl Span<NaiveDate> {
    pub fn to_tstzspan(&self) -> Span<TimestampTz> {
        Span {
            lower: date_to_timestamp(&self.lower),
            upper: date_to_timestamp(&self.upper),
            lower_inc: self.lower_inc,
            upper_inc: self.upper_inc,
        }
    }

    pub fn shift_scale_date(&self, shift: Option<i32>, width: Option<i32>) -> Result<Span<NaiveDate>> {
        let lower = match shift {
            Some(days) => crate::time::add_date_int(&self.lower, days)?,
            None => self.lower,
        };
        let upper = match (width, shift) {
            (Some(w), _) if w <= 0 => return Err(MeosError::value(format!("The width must be positive: {}", w))),
            (Some(w), _) => crate::time::add_date_int(&lower, w)?,
            (None, Some(days)) => crate::time::add_date_int(&self.upper, days)?,
            (None, None) => return Err(MeosError::InvalidArg("Shift and width cannot both be absent".into())),
        };
        Span::make(lower, upper, self.lower_inc, self.upper_inc)
    }
}

impl Span<TimestampTz> {
    pub fn duration(&self) -> Interval {
        Interval::between(&self.lower, &self.upper)
    }

    pub fn to_datespan(&self) -> Result<Span<NaiveDate>> {
        Span::make(timestamp_to_date(&self.lower), timestamp_to_date(&self.upper), self.lower_inc, self.upper_inc)
    }

    /// Widen the period by `interval` on both sides.
    pub fn expand_time(&self, interval: &Interval) -> Result<Span<TimestampTz>> {
        Span::make(interval.sub_from(&self.lower)?, interval.add_to(&self.upper)?, self.lower_inc, self.upper_inc)
    }

    /// Shift the period and/or set its duration.
    pub fn shift_scale_time(&self, shift: Option<&Interval>, duration: Option<&Interval>) -> Result<Span<TimestampTz>> {
        if shift.is_none() && duration.is_none() {
            return Err(MeosError::InvalidArg("Shift and duration cannot both be absent".into()));
        }
        if let Some(d) = duration {
            if !d.is_positive() {
                return Err(MeosError::value(format!("The duration must be positive: {}", d)));
            }
        }
        let lower = match shift {
            Some(s) => s.add_to(&self.lower)?,
            None => self.lower,
        };
        let upper = match (duration, shift) {
            (Some(d), _) => {
                if self.lower == self.upper {
                    lower
                } else {
                    d.add_to(&lower)?
                }
            }
            (None, Some(s)) => s.add_to(&self.upper)?,
            (None, None) => self.upper,
        };
        Span::make(lower, upper, self.lower_inc, self.upper_inc)
    }

    /// Time bins of `duration` anchored at `origin` covering the period.
    pub fn time_bins(&self, duration: &Interval, origin: &TimestampTz) -> Result<Vec<Span<TimestampTz>>> {
        let starts = time_bin_starts(&self.lower, &self.upper, duration, origin)?;
        let size = crate::bins::duration_micros(duration)?;
        let mut result = vec![];
        for start in starts {
            let bin = Span {
                lower: start,
                upper: crate::time::add_micros(&start, size)?,
                lower_inc: true,
                upper_inc: false,
            };
            if let Some(piece) = bin.intersect_span(self) {
                result.push(piece);
            }
        }
        Ok(result)
    }
}
