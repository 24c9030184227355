//! Temporal values: functions from time to a base value, represented as a
//! single instant, a sequence of instants with one interpolation, or a set
//! of time-disjoint sequences.
//!
//! [`Temporal`] is the sum of the three representations. Operations match
//! on it exhaustively and return the most specific representation that can
//! express their result.

pub mod compare;
pub mod instant;
pub mod lift;
pub mod modify;
pub mod restrict;
pub mod sample;
pub mod sequence;
pub mod sequenceset;
pub mod similarity;
pub mod simplify;
pub mod split;
pub mod tbool;
pub mod tnumber;
pub mod ttext;

use std::cmp::Ordering;
use std::fmt;

pub use instant::TInstant;
pub use sequence::TSequence;
pub use sequenceset::TSequenceSet;

use crate::catalog::{Interpolation, MeosType, TempSubtype};
use crate::datatype::{DataType, Double2, Double3, Double4};
use crate::error::{MeosError, Result};
use crate::set::Set;
use crate::span::{Span, TstzSpan};
use crate::spanset::SpanSet;
use crate::tbox::TBox;
use crate::time::{Interval, TimestampTz};

/// Tolerance of float comparisons in normalization and crossings.
pub const EPSILON: f64 = 1.0e-6;

/// Bounding box cached by sequences and sequence sets.
pub trait BoundingBox<V>: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    fn from_instant(value: &V, t: &TimestampTz) -> Self;
    /// Box of a linear segment; the hull of the end points unless the base
    /// type bends between them.
    fn from_segment(v1: &V, v2: &V, t1: &TimestampTz, t2: &TimestampTz) -> Self {
        let mut bbox = Self::from_instant(v1, t1);
        bbox.merge_with(&Self::from_instant(v2, t2));
        bbox
    }
    fn merge_with(&mut self, other: &Self);
    fn tstzspan(&self) -> TstzSpan;
    fn set_period(&mut self, period: TstzSpan);
}

/// A base type that can vary over time.
pub trait TemporalValue: DataType {
    type BBox: BoundingBox<Self>;
    /// Whether linear interpolation is allowed.
    const CONTINUOUS: bool;
    const TEMPORAL_TYPE: MeosType;
    /// Value at `ratio` of the linear segment from `self` to `other`.
    fn interpolate(&self, _other: &Self, _ratio: f64) -> Self {
        self.clone()
    }
    /// Ratio in `[0, 1]` at which the linear segment from `self` to `other`
    /// takes `value`. Only called on non-constant segments.
    fn locate(&self, _other: &Self, _value: &Self) -> Option<f64> {
        None
    }
    fn approx_eq(&self, other: &Self) -> bool {
        self.eq_value(other)
    }
    /// Ratios in `(0, 1)` where the linear segment from `self` to `end`
    /// meets the synchronized segment from `other` to `other_end`.
    fn crossings(&self, _end: &Self, _other: &Self, _other_end: &Self) -> Vec<f64> {
        vec![]
    }
    /// Distance between two values, when the type has one.
    fn distance_to(&self, _other: &Self) -> Option<f64> {
        None
    }
    /// Distance from the value to the segment between two values, ignoring
    /// time. Types without a geometry of their own use the synchronized
    /// distance instead.
    fn segment_distance(&self, _start: &Self, _end: &Self) -> Option<f64> {
        None
    }
    /// Values of one temporal value must agree on SRID and dimensionality.
    fn check_compatible(&self, _other: &Self) -> Result<()> {
        Ok(())
    }
    /// Consecutive values of a continuous sequence must be connectable.
    fn check_continuous(&self, _next: &Self) -> Result<()> {
        Ok(())
    }
    fn temporal_type(&self) -> MeosType {
        Self::TEMPORAL_TYPE
    }
}

/// Linear for continuous types, step otherwise.
pub fn default_interp<V: TemporalValue>() -> Interpolation {
    if V::CONTINUOUS { Interpolation::Linear } else { Interpolation::Step }
}

// ------------- Bounding boxes --------------
impl<V> BoundingBox<V> for TstzSpan {
    fn from_instant(_value: &V, t: &TimestampTz) -> Self {
        Span::from_value(*t)
    }
    fn merge_with(&mut self, other: &Self) {
        *self = self.hull(other);
    }
    fn tstzspan(&self) -> TstzSpan {
        *self
    }
    fn set_period(&mut self, period: TstzSpan) {
        *self = period;
    }
}

fn tbox_period(bbox: &TBox) -> TstzSpan {
    bbox.period.unwrap_or_else(|| Span::from_value(TimestampTz::default()))
}

impl BoundingBox<i32> for TBox {
    fn from_instant(value: &i32, t: &TimestampTz) -> Self {
        TBox::from_int_timestamp(*value, *t)
    }
    fn merge_with(&mut self, other: &Self) {
        *self = self.expand(other);
    }
    fn tstzspan(&self) -> TstzSpan {
        tbox_period(self)
    }
    fn set_period(&mut self, period: TstzSpan) {
        self.period = Some(period);
    }
}

impl BoundingBox<f64> for TBox {
    fn from_instant(value: &f64, t: &TimestampTz) -> Self {
        TBox::from_float_timestamp(*value, *t)
    }
    fn merge_with(&mut self, other: &Self) {
        *self = self.expand(other);
    }
    fn tstzspan(&self) -> TstzSpan {
        tbox_period(self)
    }
    fn set_period(&mut self, period: TstzSpan) {
        self.period = Some(period);
    }
}

// ------------- Temporal base values --------------
impl TemporalValue for bool {
    type BBox = TstzSpan;
    const CONTINUOUS: bool = false;
    const TEMPORAL_TYPE: MeosType = MeosType::TBool;
}

impl TemporalValue for i32 {
    type BBox = TBox;
    const CONTINUOUS: bool = false;
    const TEMPORAL_TYPE: MeosType = MeosType::TInt;
    fn distance_to(&self, other: &i32) -> Option<f64> {
        Some((*other as f64 - *self as f64).abs())
    }
}

impl TemporalValue for f64 {
    type BBox = TBox;
    const CONTINUOUS: bool = true;
    const TEMPORAL_TYPE: MeosType = MeosType::TFloat;
    fn interpolate(&self, other: &f64, ratio: f64) -> f64 {
        self + (other - self) * ratio
    }
    fn locate(&self, other: &f64, value: &f64) -> Option<f64> {
        let (lo, hi) = if self < other { (*self, *other) } else { (*other, *self) };
        if *value < lo || *value > hi {
            return None;
        }
        Some((value - self) / (other - self))
    }
    fn approx_eq(&self, other: &f64) -> bool {
        (self - other).abs() <= EPSILON
    }
    fn crossings(&self, end: &f64, other: &f64, other_end: &f64) -> Vec<f64> {
        lift::float_crossing(*self, *end, *other, *other_end)
    }
    fn distance_to(&self, other: &f64) -> Option<f64> {
        Some((other - self).abs())
    }
}

impl TemporalValue for String {
    type BBox = TstzSpan;
    const CONTINUOUS: bool = false;
    const TEMPORAL_TYPE: MeosType = MeosType::TText;
}

macro_rules! impl_temporal_double {
    ($name:ident, $temptype:expr) => {
        impl TemporalValue for $name {
            type BBox = TstzSpan;
            const CONTINUOUS: bool = true;
            const TEMPORAL_TYPE: MeosType = $temptype;
            fn interpolate(&self, other: &$name, ratio: f64) -> $name {
                self.lerp(other, ratio)
            }
        }
    };
}

impl_temporal_double!(Double2, MeosType::TDouble2);
impl_temporal_double!(Double3, MeosType::TDouble3);
impl_temporal_double!(Double4, MeosType::TDouble4);

// ------------- Temporal --------------
#[derive(Debug, Clone)]
pub enum Temporal<V: TemporalValue> {
    Instant(TInstant<V>),
    Sequence(TSequence<V>),
    SequenceSet(TSequenceSet<V>),
}

pub type TBool = Temporal<bool>;
pub type TInt = Temporal<i32>;
pub type TFloat = Temporal<f64>;
pub type TText = Temporal<String>;

impl<V: TemporalValue> From<TInstant<V>> for Temporal<V> {
    fn from(inst: TInstant<V>) -> Self {
        Temporal::Instant(inst)
    }
}

impl<V: TemporalValue> From<TSequence<V>> for Temporal<V> {
    fn from(seq: TSequence<V>) -> Self {
        Temporal::Sequence(seq)
    }
}

impl<V: TemporalValue> From<TSequenceSet<V>> for Temporal<V> {
    fn from(ss: TSequenceSet<V>) -> Self {
        Temporal::SequenceSet(ss)
    }
}

fn base_instants<V: TemporalValue>(value: &V, span: &TstzSpan) -> Vec<TInstant<V>> {
    if span.lower == span.upper {
        vec![TInstant::make(value.clone(), span.lower)]
    } else {
        vec![TInstant::make(value.clone(), span.lower), TInstant::make(value.clone(), span.upper)]
    }
}

impl<V: TemporalValue> Temporal<V> {
    pub fn from_instant(value: V, t: TimestampTz) -> Temporal<V> {
        Temporal::Instant(TInstant::make(value, t))
    }

    /// Constant discrete sequence over the timestamps of a set.
    pub fn from_base_tstzset(value: V, set: &Set<TimestampTz>) -> Temporal<V> {
        let instants = set.values().iter().map(|t| TInstant::make(value.clone(), *t)).collect();
        Temporal::Sequence(TSequence::make_valid(instants, true, true, Interpolation::Discrete, false))
    }

    /// Constant sequence over a period.
    pub fn from_base_tstzspan(value: V, span: &TstzSpan, interp: Interpolation) -> Result<Temporal<V>> {
        let interp = if interp == Interpolation::Discrete { default_interp::<V>() } else { interp };
        Ok(Temporal::Sequence(TSequence::make(base_instants(&value, span), span.lower_inc, span.upper_inc, interp, false)?))
    }

    /// Constant sequence set over a span set.
    pub fn from_base_tstzspanset(value: V, ss: &SpanSet<TimestampTz>, interp: Interpolation) -> Result<Temporal<V>> {
        let interp = if interp == Interpolation::Discrete { default_interp::<V>() } else { interp };
        let sequences = ss
            .spans()
            .iter()
            .map(|s| TSequence::make(base_instants(&value, s), s.lower_inc, s.upper_inc, interp, false))
            .collect::<Result<Vec<_>>>()?;
        Ok(Temporal::SequenceSet(TSequenceSet::make(sequences, false)?))
    }

    /// Constant value over the time domain of another temporal value, with
    /// its interpolation when the base type allows it.
    pub fn from_base_temp<W: TemporalValue>(value: V, temp: &Temporal<W>) -> Temporal<V> {
        let from_seq = |s: &TSequence<W>| -> TSequence<V> {
            if s.is_discrete() {
                let instants = s.instants.iter().map(|i| TInstant::make(value.clone(), i.t)).collect();
                TSequence::make_valid(instants, true, true, Interpolation::Discrete, false)
            } else {
                let interp = if s.interp == Interpolation::Linear && !V::CONTINUOUS { Interpolation::Step } else { s.interp };
                TSequence::make_valid(base_instants(&value, &s.period()), s.lower_inc, s.upper_inc, interp, false)
            }
        };
        match temp {
            Temporal::Instant(i) => Temporal::Instant(TInstant::make(value.clone(), i.t)),
            Temporal::Sequence(s) => Temporal::Sequence(from_seq(s)),
            Temporal::SequenceSet(ss) => {
                Temporal::SequenceSet(TSequenceSet::make_valid(ss.sequences.iter().map(from_seq).collect(), false))
            }
        }
    }

    pub fn subtype(&self) -> TempSubtype {
        match self {
            Temporal::Instant(_) => TempSubtype::Instant,
            Temporal::Sequence(_) => TempSubtype::Sequence,
            Temporal::SequenceSet(_) => TempSubtype::SequenceSet,
        }
    }

    pub fn interp(&self) -> Interpolation {
        match self {
            Temporal::Instant(_) => Interpolation::Discrete,
            Temporal::Sequence(s) => s.interp,
            Temporal::SequenceSet(ss) => ss.interp(),
        }
    }

    pub fn temporal_type(&self) -> MeosType {
        self.start_instant().value.temporal_type()
    }

    /// Instants and discrete sequences are defined at isolated timestamps.
    pub fn is_continuous(&self) -> bool {
        self.interp().is_continuous() && !matches!(self, Temporal::Instant(_))
    }

    pub fn bbox(&self) -> V::BBox {
        match self {
            Temporal::Instant(i) => i.bbox(),
            Temporal::Sequence(s) => s.bbox.clone(),
            Temporal::SequenceSet(ss) => ss.bbox.clone(),
        }
    }

    /// Bounding period.
    pub fn tstzspan(&self) -> TstzSpan {
        match self {
            Temporal::Instant(i) => Span::from_value(i.t),
            Temporal::Sequence(s) => s.period(),
            Temporal::SequenceSet(ss) => ss.period(),
        }
    }

    pub fn time(&self) -> SpanSet<TimestampTz> {
        match self {
            Temporal::Instant(i) => SpanSet::from_value(i.t),
            Temporal::Sequence(s) => s.time(),
            Temporal::SequenceSet(ss) => ss.time(),
        }
    }

    pub fn duration(&self, ignore_gaps: bool) -> Interval {
        match self {
            Temporal::Instant(_) => Interval::default(),
            Temporal::Sequence(s) if s.is_discrete() => Interval::default(),
            Temporal::Sequence(s) => s.period().duration(),
            Temporal::SequenceSet(ss) => ss.time().duration(ignore_gaps),
        }
    }

    pub fn instants(&self) -> Vec<&TInstant<V>> {
        match self {
            Temporal::Instant(i) => vec![i],
            Temporal::Sequence(s) => s.instants.iter().collect(),
            Temporal::SequenceSet(ss) => ss.instants(),
        }
    }

    pub fn num_instants(&self) -> usize {
        match self {
            Temporal::Instant(_) => 1,
            Temporal::Sequence(s) => s.num_instants(),
            Temporal::SequenceSet(ss) => ss.num_instants(),
        }
    }

    /// 1-based access.
    pub fn instant_n(&self, n: usize) -> Option<&TInstant<V>> {
        if n == 0 { None } else { self.instants().get(n - 1).copied() }
    }

    pub fn start_instant(&self) -> &TInstant<V> {
        match self {
            Temporal::Instant(i) => i,
            Temporal::Sequence(s) => s.start_instant(),
            Temporal::SequenceSet(ss) => ss.start_sequence().start_instant(),
        }
    }

    pub fn end_instant(&self) -> &TInstant<V> {
        match self {
            Temporal::Instant(i) => i,
            Temporal::Sequence(s) => s.end_instant(),
            Temporal::SequenceSet(ss) => ss.end_sequence().end_instant(),
        }
    }

    /// Instant with the least value, the first one on ties.
    pub fn min_instant(&self) -> &TInstant<V> {
        let instants = self.instants();
        let mut best = instants[0];
        for inst in &instants[1..] {
            if inst.value.compare(&best.value) == Ordering::Less {
                best = inst;
            }
        }
        best
    }

    pub fn max_instant(&self) -> &TInstant<V> {
        let instants = self.instants();
        let mut best = instants[0];
        for inst in &instants[1..] {
            if inst.value.compare(&best.value) == Ordering::Greater {
                best = inst;
            }
        }
        best
    }

    /// Distinct timestamps in increasing order.
    pub fn timestamps(&self) -> Vec<TimestampTz> {
        let mut result: Vec<TimestampTz> = self.instants().iter().map(|i| i.t).collect();
        result.dedup();
        result
    }

    pub fn num_timestamps(&self) -> usize {
        self.timestamps().len()
    }

    pub fn timestamp_n(&self, n: usize) -> Option<TimestampTz> {
        if n == 0 { None } else { self.timestamps().get(n - 1).copied() }
    }

    pub fn start_timestamp(&self) -> TimestampTz {
        self.start_instant().t
    }

    pub fn end_timestamp(&self) -> TimestampTz {
        self.end_instant().t
    }

    pub fn num_sequences(&self) -> Result<usize> {
        Ok(self.sequences()?.len())
    }

    /// Composing sequences of a continuous value.
    pub fn sequences(&self) -> Result<Vec<TSequence<V>>> {
        match self {
            Temporal::Sequence(s) if !s.is_discrete() => Ok(vec![s.clone()]),
            Temporal::SequenceSet(ss) => Ok(ss.sequences.clone()),
            _ => Err(MeosError::InvalidArg("The temporal value must be of continuous interpolation".into())),
        }
    }

    pub fn sequence_n(&self, n: usize) -> Result<Option<TSequence<V>>> {
        Ok(if n == 0 { None } else { self.sequences()?.into_iter().nth(n - 1) })
    }

    pub fn start_sequence(&self) -> Result<TSequence<V>> {
        self.sequences()?
            .into_iter()
            .next()
            .ok_or_else(|| MeosError::Internal("Empty sequence list".into()))
    }

    pub fn end_sequence(&self) -> Result<TSequence<V>> {
        self.sequences()?
            .into_iter()
            .last()
            .ok_or_else(|| MeosError::Internal("Empty sequence list".into()))
    }

    pub fn segments(&self) -> Vec<TSequence<V>> {
        match self {
            Temporal::Instant(i) => vec![TSequence::singleton(i.clone(), default_interp::<V>())],
            Temporal::Sequence(s) => s.segments(),
            Temporal::SequenceSet(ss) => ss.sequences.iter().flat_map(|s| s.segments()).collect(),
        }
    }

    pub fn lower_inc(&self) -> bool {
        self.tstzspan().lower_inc
    }

    pub fn upper_inc(&self) -> bool {
        self.tstzspan().upper_inc
    }

    /// Distinct values in increasing order.
    pub fn values(&self) -> Vec<V> {
        let mut values: Vec<V> = self.instants().iter().map(|i| i.value.clone()).collect();
        values.sort_by(|a, b| a.compare(b));
        values.dedup_by(|a, b| a.eq_value(b));
        values
    }

    pub fn start_value(&self) -> V {
        self.start_instant().value.clone()
    }

    pub fn end_value(&self) -> V {
        self.end_instant().value.clone()
    }

    pub fn min_value(&self) -> V {
        self.min_instant().value.clone()
    }

    pub fn max_value(&self) -> V {
        self.max_instant().value.clone()
    }

    /// Value of the n-th instant, 1-based.
    pub fn value_n(&self, n: usize) -> Option<V> {
        self.instant_n(n).map(|i| i.value.clone())
    }

    /// Value at a timestamp. Without `strict`, exclusive bounds yield the
    /// limit value.
    pub fn value_at_timestamp(&self, t: &TimestampTz, strict: bool) -> Option<V> {
        match self {
            Temporal::Instant(i) => if i.t == *t { Some(i.value.clone()) } else { None },
            Temporal::Sequence(s) => s.value_at(t, strict),
            Temporal::SequenceSet(ss) => ss.value_at(t, strict),
        }
    }

    /// Composing pieces: the sequence itself, the sequences of a set, or a
    /// singleton sequence for an instant.
    pub(crate) fn pieces(&self) -> Vec<TSequence<V>> {
        match self {
            Temporal::Instant(i) => vec![TSequence::singleton(i.clone(), default_interp::<V>())],
            Temporal::Sequence(s) => vec![s.clone()],
            Temporal::SequenceSet(ss) => ss.sequences.clone(),
        }
    }

    /// Assemble restriction pieces. A single continuous piece becomes a
    /// sequence when `prefer_sequence`, a discrete piece stays discrete.
    pub(crate) fn from_pieces(pieces: Vec<TSequence<V>>, prefer_sequence: bool) -> Option<Temporal<V>> {
        if pieces.is_empty() {
            return None;
        }
        if pieces.len() == 1 && (pieces[0].is_discrete() || prefer_sequence) {
            return pieces.into_iter().next().map(Temporal::Sequence);
        }
        let ss = TSequenceSet::from_pieces(pieces)?;
        if prefer_sequence && ss.sequences.len() == 1 {
            return ss.sequences.into_iter().next().map(Temporal::Sequence);
        }
        Some(Temporal::SequenceSet(ss))
    }

    // ------------- Subtype conversion --------------
    pub fn to_tinstant(&self) -> Result<TInstant<V>> {
        if self.num_instants() != 1 {
            return Err(MeosError::value("Cannot transform input value to a temporal instant".to_string()));
        }
        Ok(self.start_instant().clone())
    }

    pub fn to_tsequence(&self, interp: Interpolation) -> Result<TSequence<V>> {
        match self.set_interp(interp)? {
            Temporal::Instant(i) => Ok(TSequence::singleton(i, interp)),
            Temporal::Sequence(s) => Ok(s),
            Temporal::SequenceSet(ss) if ss.sequences.len() == 1 => {
                ss.sequences.into_iter().next().ok_or_else(|| MeosError::Internal("Empty sequence set".into()))
            }
            Temporal::SequenceSet(_) => {
                Err(MeosError::value("Cannot transform input value to a temporal sequence".to_string()))
            }
        }
    }

    pub fn to_tsequenceset(&self, interp: Interpolation) -> Result<TSequenceSet<V>> {
        if interp == Interpolation::Discrete {
            return Err(MeosError::value("Sequence sets cannot have discrete interpolation".to_string()));
        }
        match self.set_interp(interp)? {
            Temporal::Instant(i) => Ok(TSequenceSet::make_valid(vec![TSequence::singleton(i, interp)], false)),
            Temporal::Sequence(s) => Ok(TSequenceSet::make_valid(vec![s], false)),
            Temporal::SequenceSet(ss) => Ok(ss),
        }
    }

    /// Change the interpolation, failing when the value cannot be expressed
    /// with the new one.
    pub fn set_interp(&self, interp: Interpolation) -> Result<Temporal<V>> {
        if interp == Interpolation::Linear && !V::CONTINUOUS {
            return Err(MeosError::value(format!("The {} type does not support linear interpolation", V::DATA_TYPE)));
        }
        let current = self.interp();
        match self {
            Temporal::Instant(i) => Ok(match interp {
                Interpolation::Discrete => Temporal::Instant(i.clone()),
                _ => Temporal::Sequence(TSequence::singleton(i.clone(), interp)),
            }),
            _ if current == interp => Ok(self.clone()),
            Temporal::Sequence(s) if s.is_discrete() => {
                let pieces: Vec<TSequence<V>> = s.instants.iter().map(|i| TSequence::singleton(i.clone(), interp)).collect();
                Ok(Temporal::from_pieces(pieces, true).ok_or_else(|| MeosError::Internal("Empty sequence".into()))?)
            }
            _ => {
                let seqs = self.sequences()?;
                if interp == Interpolation::Discrete {
                    if seqs.iter().any(|s| s.num_instants() > 1) {
                        return Err(MeosError::value(
                            "Cannot transform input value to a temporal discrete sequence".to_string(),
                        ));
                    }
                    let instants = seqs.into_iter().map(|s| s.instants[0].clone()).collect();
                    return Ok(Temporal::Sequence(TSequence::make_valid(instants, true, true, Interpolation::Discrete, false)));
                }
                let mut pieces = vec![];
                for s in &seqs {
                    if interp == Interpolation::Linear {
                        pieces.extend(lift::step_to_linear(s));
                    } else {
                        if s.instants.windows(2).any(|w| !w[0].value.eq_value(&w[1].value)) {
                            return Err(MeosError::value(
                                "Cannot transform a linear temporal value with varying values to step interpolation".to_string(),
                            ));
                        }
                        pieces.push(TSequence::make_valid(s.instants.clone(), s.lower_inc, s.upper_inc, interp, true));
                    }
                }
                Ok(Temporal::from_pieces(pieces, matches!(self, Temporal::Sequence(_)))
                    .ok_or_else(|| MeosError::Internal("Empty sequence".into()))?)
            }
        }
    }

    // ------------- Time transformations --------------
    pub(crate) fn map_times<F: Fn(&TimestampTz) -> Result<TimestampTz>>(&self, f: F) -> Result<Temporal<V>> {
        Ok(match self {
            Temporal::Instant(i) => Temporal::Instant(i.with_time(f(&i.t)?)),
            Temporal::Sequence(s) => Temporal::Sequence(s.map_times(&f)?),
            Temporal::SequenceSet(ss) => Temporal::SequenceSet(ss.map_times(&f)?),
        })
    }

    pub fn shift_time(&self, shift: &Interval) -> Result<Temporal<V>> {
        self.shift_scale_time(Some(shift), None)
    }

    pub fn scale_time(&self, duration: &Interval) -> Result<Temporal<V>> {
        self.shift_scale_time(None, Some(duration))
    }

    /// Shift the value in time and/or scale it to the given duration.
    pub fn shift_scale_time(&self, shift: Option<&Interval>, duration: Option<&Interval>) -> Result<Temporal<V>> {
        let old = self.tstzspan();
        let new = old.shift_scale_time(shift, duration)?;
        let old_micros = (old.upper - old.lower).num_microseconds().unwrap_or(0) as f64;
        let new_micros = (new.upper - new.lower).num_microseconds().unwrap_or(0) as f64;
        let ratio = if old_micros == 0.0 { 1.0 } else { new_micros / old_micros };
        self.map_times(|t| {
            let offset = (*t - old.lower).num_microseconds().unwrap_or(0) as f64;
            crate::time::add_micros(&new.lower, (offset * ratio).round() as i64)
        })
    }

    /// Apply a value transformation keeping the time domain. The result
    /// keeps the interpolation when the target type allows it.
    pub(crate) fn map_values<U: TemporalValue, F: Fn(&V) -> Result<U>>(&self, f: F) -> Result<Temporal<U>> {
        let interp_of = |i: Interpolation| if i == Interpolation::Linear && !U::CONTINUOUS { Interpolation::Step } else { i };
        Ok(match self {
            Temporal::Instant(i) => Temporal::Instant(TInstant::make(f(&i.value)?, i.t)),
            Temporal::Sequence(s) => Temporal::Sequence(s.map_values(&f, interp_of(s.interp))?),
            Temporal::SequenceSet(ss) => {
                let seqs = ss
                    .sequences
                    .iter()
                    .map(|s| s.map_values(&f, interp_of(s.interp)))
                    .collect::<Result<Vec<_>>>()?;
                Temporal::SequenceSet(TSequenceSet::make(seqs, true)?)
            }
        })
    }

    /// Round the values to `maxdd` decimal digits.
    pub fn round(&self, maxdd: usize) -> Result<Temporal<V>> {
        self.map_values(|v| Ok(v.round(maxdd)))
    }

    /// Total order: period first, then the instants, then the
    /// interpolation.
    pub fn compare(&self, other: &Temporal<V>) -> Ordering {
        let ord = self.tstzspan().compare(&other.tstzspan());
        if ord != Ordering::Equal {
            return ord;
        }
        let (a, b) = (self.instants(), other.instants());
        for (x, y) in a.iter().zip(b.iter()) {
            let ord = x.compare(y);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.len().cmp(&b.len()).then_with(|| self.interp().cmp(&other.interp()))
    }

    pub fn hash_value(&self) -> u64 {
        let mut bytes: Vec<u8> = Vec::with_capacity(self.num_instants() * 16 + 2);
        bytes.push(self.interp() as u8);
        for inst in self.instants() {
            bytes.extend_from_slice(&inst.value.hash_value().to_le_bytes());
            bytes.extend_from_slice(&crate::time::to_pg_micros(&inst.t).to_le_bytes());
        }
        let span = self.tstzspan();
        bytes.push((span.lower_inc as u8) | ((span.upper_inc as u8) << 1));
        seahash::hash(&bytes)
    }

    /// Canonical pieces used by equality: instants and discrete values
    /// become singleton sequences.
    fn canonical(&self) -> Vec<TSequence<V>> {
        match self {
            Temporal::Sequence(s) if s.is_discrete() => {
                s.instants.iter().map(|i| TSequence::singleton(i.clone(), default_interp::<V>())).collect()
            }
            _ => self.pieces(),
        }
    }
}

/// Equal when they define the same function of time, whatever their
/// representation.
impl<V: TemporalValue> PartialEq for Temporal<V> {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl<V: TemporalValue> PartialOrd for Temporal<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
