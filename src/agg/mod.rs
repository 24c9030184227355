//! Temporal aggregation.
//!
//! A partial aggregate is a time-ordered list of disjoint instants or
//! sequences kept in a skip list. Every new value is spliced in: the
//! elements it overlaps are replaced by their combination with it, so the
//! state always reads as the aggregate over the values seen so far.
//! Transition functions take an optional state and return the updated one;
//! final functions turn a state into a temporal value.

pub mod skiplist;

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::catalog::Interpolation;
use crate::datatype::{DataType, Double2, Double3, Double4, NumberBase, SpanBase};
use crate::error::{MeosError, Result};
use crate::set::Set;
use crate::span::{Span, TstzSpan, cmp_lower};
use crate::spanset::SpanSet;
use crate::spatial::point::Point;
use crate::spatial::tpoint::TPoint;
use crate::stbox::STBox;
use crate::tbox::TBox;
use crate::temporal::lift::{LiftOp, lift2};
use crate::temporal::tnumber::NumberValue;
use crate::temporal::{BoundingBox, TBool, TFloat, TInstant, TSequence, TSequenceSet, Temporal, TemporalValue};
use crate::time::Interval;

pub use skiplist::{SkipList, TimeKeyed};

type CombineFn<V> = fn(&V, &V) -> Result<V>;

#[derive(Debug, Clone)]
enum Pieces<V: TemporalValue> {
    Instants(SkipList<TInstant<V>>),
    Sequences(SkipList<TSequence<V>>),
}

/// Partial aggregate of temporal values combined with one base function.
#[derive(Debug, Clone)]
pub struct TemporalAgg<V: TemporalValue> {
    combine: CombineFn<V>,
    /// Combined linear values change at the crossings of the inputs.
    crossings: bool,
    pieces: Option<Pieces<V>>,
}

fn mixed_subtypes() -> MeosError {
    warn!("aggregation of instants and sequences rejected");
    MeosError::Aggregation("Cannot aggregate temporal values of instant and sequence subtypes".into())
}

/// Union of two sorted instant lists, combining the values at equal times.
fn merge_instants<V: TemporalValue>(old: Vec<TInstant<V>>, new: Vec<TInstant<V>>, combine: CombineFn<V>) -> Result<Vec<TInstant<V>>> {
    let mut out = Vec::with_capacity(old.len() + new.len());
    let mut a = old.into_iter().peekable();
    let mut b = new.into_iter().peekable();
    loop {
        let next = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => match x.t.cmp(&y.t) {
                Ordering::Less => a.next(),
                Ordering::Greater => b.next(),
                Ordering::Equal => match (a.next(), b.next()) {
                    (Some(x), Some(y)) => Some(TInstant::make(combine(&x.value, &y.value)?, x.t)),
                    _ => None,
                },
            },
            (Some(_), None) => a.next(),
            (None, Some(_)) => b.next(),
            (None, None) => break,
        };
        out.extend(next);
    }
    Ok(out)
}

/// Combination over the common time, each side alone elsewhere.
fn merge_sequences<V: TemporalValue>(
    old: Vec<TSequence<V>>,
    new: Vec<TSequence<V>>,
    combine: CombineFn<V>,
    crossings: bool,
) -> Result<Vec<TSequence<V>>> {
    let (Some(a), Some(b)) = (Temporal::from_pieces(old, false), Temporal::from_pieces(new, false)) else {
        return Err(MeosError::Internal("Empty aggregation pieces".into()));
    };
    let func = |x: &V, y: &V| -> Result<V> { combine(x, y) };
    let breaks = |a1: &V, a2: &V, b1: &V, b2: &V| a1.crossings(a2, b1, b2);
    let op = if crossings { LiftOp::new(&func).linear().with_breaks(&breaks) } else { LiftOp::new(&func).linear() };
    let mut pieces: Vec<TSequence<V>> = vec![];
    if let Some(both) = lift2(&a, &b, &op)? {
        pieces.extend(both.pieces());
    }
    if let Some(rest) = a.minus_tstzspanset(&b.time()) {
        pieces.extend(rest.pieces());
    }
    if let Some(rest) = b.minus_tstzspanset(&a.time()) {
        pieces.extend(rest.pieces());
    }
    pieces.sort_by(|x, y| cmp_lower(&x.period(), &y.period()));
    Ok(TSequenceSet::from_pieces(pieces).map(|ss| ss.sequences).unwrap_or_default())
}

impl<V: TemporalValue> TemporalAgg<V> {
    pub fn new(combine: CombineFn<V>, crossings: bool) -> Self {
        TemporalAgg { combine, crossings, pieces: None }
    }

    /// Number of instants or sequences of the state.
    pub fn len(&self) -> usize {
        match &self.pieces {
            None => 0,
            Some(Pieces::Instants(list)) => list.len(),
            Some(Pieces::Sequences(list)) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_instants(&mut self, instants: Vec<TInstant<V>>) -> Result<()> {
        let combine = self.combine;
        match self.pieces.get_or_insert_with(|| Pieces::Instants(SkipList::new())) {
            Pieces::Instants(list) => list.splice(instants, |old, new| merge_instants(old, new, combine)),
            Pieces::Sequences(_) => Err(mixed_subtypes()),
        }
    }

    fn add_sequence(&mut self, seq: TSequence<V>) -> Result<()> {
        let (combine, crossings) = (self.combine, self.crossings);
        match self.pieces.get_or_insert_with(|| Pieces::Sequences(SkipList::new())) {
            Pieces::Sequences(list) => list.splice(vec![seq], |old, new| merge_sequences(old, new, combine, crossings)),
            Pieces::Instants(_) => Err(mixed_subtypes()),
        }
    }

    /// Transition: fold one more value into the aggregate. Instants and
    /// discrete sequences aggregate instant-wise, other values sequence-wise.
    pub fn add(&mut self, temp: &Temporal<V>) -> Result<()> {
        let discrete = match temp {
            Temporal::Instant(_) => true,
            Temporal::Sequence(s) => s.is_discrete(),
            Temporal::SequenceSet(_) => false,
        };
        if discrete {
            return self.add_instants(temp.instants().into_iter().cloned().collect());
        }
        for seq in temp.pieces() {
            self.add_sequence(seq)?;
        }
        Ok(())
    }

    /// Combine with another partial aggregate of the same function.
    pub fn merge(&mut self, other: TemporalAgg<V>) -> Result<()> {
        match other.pieces {
            None => Ok(()),
            Some(Pieces::Instants(list)) => self.add_instants(list.values()),
            Some(Pieces::Sequences(list)) => {
                for seq in list.values() {
                    self.add_sequence(seq)?;
                }
                Ok(())
            }
        }
    }

    /// The aggregate so far, `None` when nothing was added.
    pub fn finish(&self) -> Option<Temporal<V>> {
        match self.pieces.as_ref()? {
            Pieces::Instants(list) => {
                let mut instants = list.values();
                debug!(instants = instants.len(), "instant aggregate finished");
                match instants.len() {
                    0 => None,
                    1 => instants.pop().map(Temporal::Instant),
                    _ => Some(Temporal::Sequence(TSequence::make_valid(instants, true, true, Interpolation::Discrete, false))),
                }
            }
            Pieces::Sequences(list) => {
                let sequences = list.values();
                debug!(sequences = sequences.len(), "sequence aggregate finished");
                Temporal::from_pieces(sequences, true)
            }
        }
    }
}

// ------------- Base functions --------------
fn min_of<V: DataType>(a: &V, b: &V) -> Result<V> {
    Ok(if a.compare(b) != Ordering::Greater { a.clone() } else { b.clone() })
}

fn max_of<V: DataType>(a: &V, b: &V) -> Result<V> {
    Ok(if a.compare(b) != Ordering::Less { a.clone() } else { b.clone() })
}

fn sum_of<V: NumberBase>(a: &V, b: &V) -> Result<V> {
    NumberBase::add(a, b)
}

fn and_of(a: &bool, b: &bool) -> Result<bool> {
    Ok(*a && *b)
}

fn or_of(a: &bool, b: &bool) -> Result<bool> {
    Ok(*a || *b)
}

fn double2_sum(a: &Double2, b: &Double2) -> Result<Double2> {
    Ok(a.add(b))
}

fn double3_sum(a: &Double3, b: &Double3) -> Result<Double3> {
    Ok(a.add(b))
}

fn double4_sum(a: &Double4, b: &Double4) -> Result<Double4> {
    Ok(a.add(b))
}

fn transfn<V: TemporalValue>(
    state: Option<TemporalAgg<V>>,
    temp: &Temporal<V>,
    combine: CombineFn<V>,
    crossings: bool,
) -> Result<TemporalAgg<V>> {
    let mut agg = state.unwrap_or_else(|| TemporalAgg::new(combine, crossings));
    agg.add(temp)?;
    Ok(agg)
}

/// Generic final function.
pub fn temporal_tagg_finalfn<V: TemporalValue>(state: Option<TemporalAgg<V>>) -> Option<Temporal<V>> {
    state.and_then(|agg| agg.finish())
}

/// Number of values defined at every time.
pub fn tcount_transfn<V: TemporalValue>(state: Option<TemporalAgg<i32>>, temp: &Temporal<V>) -> Result<TemporalAgg<i32>> {
    transfn(state, &temp.map_values(|_| Ok(1))?, sum_of::<i32>, false)
}

pub fn tmin_transfn<V: TemporalValue>(state: Option<TemporalAgg<V>>, temp: &Temporal<V>) -> Result<TemporalAgg<V>> {
    transfn(state, temp, min_of::<V>, V::CONTINUOUS)
}

pub fn tmax_transfn<V: TemporalValue>(state: Option<TemporalAgg<V>>, temp: &Temporal<V>) -> Result<TemporalAgg<V>> {
    transfn(state, temp, max_of::<V>, V::CONTINUOUS)
}

pub fn tsum_transfn<V: NumberValue>(state: Option<TemporalAgg<V>>, temp: &Temporal<V>) -> Result<TemporalAgg<V>> {
    transfn(state, temp, sum_of::<V>, false)
}

pub fn tand_transfn(state: Option<TemporalAgg<bool>>, temp: &TBool) -> Result<TemporalAgg<bool>> {
    transfn(state, temp, and_of, false)
}

pub fn tor_transfn(state: Option<TemporalAgg<bool>>, temp: &TBool) -> Result<TemporalAgg<bool>> {
    transfn(state, temp, or_of, false)
}

/// Average through running (sum, count) pairs.
pub fn tavg_transfn<V: NumberValue>(state: Option<TemporalAgg<Double2>>, temp: &Temporal<V>) -> Result<TemporalAgg<Double2>> {
    let pairs = temp.map_values(|v| Ok(Double2(v.to_f64(), 1.0)))?;
    transfn(state, &pairs, double2_sum, false)
}

pub fn tavg_finalfn(state: Option<TemporalAgg<Double2>>) -> Result<Option<TFloat>> {
    match temporal_tagg_finalfn(state) {
        None => Ok(None),
        Some(pairs) => Ok(Some(pairs.map_values(|d: &Double2| {
            if d.1 == 0.0 { Err(MeosError::DivisionByZero) } else { Ok(d.0 / d.1) }
        })?)),
    }
}

// ------------- Centroid --------------
#[derive(Debug, Clone)]
enum CentroidSums {
    Planar(TemporalAgg<Double3>),
    Solid(TemporalAgg<Double4>),
}

/// Running coordinate sums of a temporal centroid.
#[derive(Debug, Clone)]
pub struct CentroidAgg {
    sums: CentroidSums,
    srid: i32,
    geodetic: bool,
}

pub fn tcentroid_transfn(state: Option<CentroidAgg>, temp: &TPoint) -> Result<CentroidAgg> {
    let first = temp.start_value();
    let mut agg = match state {
        Some(agg) => agg,
        None => CentroidAgg {
            sums: if first.has_z() {
                CentroidSums::Solid(TemporalAgg::new(double4_sum, false))
            } else {
                CentroidSums::Planar(TemporalAgg::new(double3_sum, false))
            },
            srid: first.srid,
            geodetic: first.geodetic,
        },
    };
    if agg.srid != first.srid {
        warn!(state = agg.srid, value = first.srid, "centroid of mixed SRIDs rejected");
        return Err(MeosError::Aggregation(format!("Operation on mixed SRID: {} and {}", agg.srid, first.srid)));
    }
    match &mut agg.sums {
        CentroidSums::Planar(sums) if !first.has_z() => sums.add(&temp.map_values(|p| Ok(Double3(p.x, p.y, 1.0)))?)?,
        CentroidSums::Solid(sums) if first.has_z() => {
            sums.add(&temp.map_values(|p| Ok(Double4(p.x, p.y, p.z.unwrap_or(0.0), 1.0)))?)?
        }
        _ => {
            warn!("centroid of mixed dimensionality rejected");
            return Err(MeosError::Aggregation("Operation on mixed 2D/3D dimensions".into()));
        }
    }
    Ok(agg)
}

pub fn tcentroid_finalfn(state: Option<CentroidAgg>) -> Result<Option<TPoint>> {
    let Some(agg) = state else {
        return Ok(None);
    };
    let (srid, geodetic) = (agg.srid, agg.geodetic);
    let point = |x: f64, y: f64, z: Option<f64>| Point { x, y, z, srid, geodetic };
    match &agg.sums {
        CentroidSums::Planar(sums) => sums
            .finish()
            .map(|t| t.map_values(|d: &Double3| Ok(point(d.0 / d.2, d.1 / d.2, None))))
            .transpose(),
        CentroidSums::Solid(sums) => sums
            .finish()
            .map(|t| t.map_values(|d: &Double4| Ok(point(d.0 / d.3, d.1 / d.3, Some(d.2 / d.3)))))
            .transpose(),
    }
}

// ------------- Windowed aggregates --------------
/// Pieces covering, at every time, the contributions made within the
/// preceding window. Linear segments keep their running minimum or maximum
/// when `extremum` says which one is wanted.
fn extend<V: TemporalValue>(temp: &Temporal<V>, interval: &Interval, extremum: Option<bool>) -> Result<Vec<TSequence<V>>> {
    if !interval.is_positive() {
        return Err(MeosError::InvalidArgValue("The window of an aggregate must be positive".into()));
    }
    let mut out = vec![];
    for seq in temp.pieces() {
        let n = seq.num_instants();
        if seq.is_discrete() || n == 1 {
            let interp = if seq.interp == Interpolation::Linear { Interpolation::Linear } else { Interpolation::Step };
            for inst in &seq.instants {
                let end = interval.add_to(&inst.t)?;
                out.push(TSequence::make_valid(vec![inst.clone(), inst.with_time(end)], true, true, interp, false));
            }
            continue;
        }
        if seq.interp == Interpolation::Linear && extremum.is_none() {
            return Err(MeosError::InvalidArgType(
                "Operation not supported for temporal float sequences with linear interpolation".into(),
            ));
        }
        for k in 0..n - 1 {
            let (a, b) = (&seq.instants[k], &seq.instants[k + 1]);
            let lower_inc = if k == 0 { seq.lower_inc } else { true };
            let end = interval.add_to(&b.t)?;
            if seq.interp == Interpolation::Step || a.value.eq_value(&b.value) {
                let upper_inc = seq.interp == Interpolation::Linear && k == n - 2 && seq.upper_inc;
                let pair = vec![a.clone(), a.with_time(end)];
                out.push(TSequence::make_valid(pair, lower_inc, upper_inc, seq.interp, false));
                continue;
            }
            let upper_inc = k == n - 2 && seq.upper_inc;
            let increasing = a.value.compare(&b.value) == Ordering::Less;
            // the extremum holds the start value while it stays in the window
            let holds_start = extremum == Some(increasing);
            let instants = if holds_start {
                vec![a.clone(), a.with_time(interval.add_to(&a.t)?), b.with_time(end)]
            } else {
                vec![a.clone(), b.clone(), b.with_time(end)]
            };
            out.push(TSequence::make_valid(instants, lower_inc, upper_inc, Interpolation::Linear, false));
        }
        if seq.interp == Interpolation::Step && seq.upper_inc {
            let last = &seq.instants[n - 1];
            let end = interval.add_to(&last.t)?;
            out.push(TSequence::make_valid(vec![last.clone(), last.with_time(end)], true, true, Interpolation::Step, false));
        }
    }
    Ok(out)
}

fn wtransfn<V: TemporalValue>(
    state: Option<TemporalAgg<V>>,
    pieces: Vec<TSequence<V>>,
    combine: CombineFn<V>,
    crossings: bool,
) -> Result<TemporalAgg<V>> {
    let mut agg = state.unwrap_or_else(|| TemporalAgg::new(combine, crossings));
    for piece in pieces {
        agg.add_sequence(piece)?;
    }
    Ok(agg)
}

/// Number of contributions within the window preceding every time.
pub fn wcount_transfn<V: TemporalValue>(
    state: Option<TemporalAgg<i32>>,
    temp: &Temporal<V>,
    interval: &Interval,
) -> Result<TemporalAgg<i32>> {
    let ones: Temporal<i32> = temp.map_values(|_| Ok(1))?;
    wtransfn(state, extend(&ones, interval, None)?, sum_of::<i32>, false)
}

pub fn wmin_transfn<V: NumberValue>(state: Option<TemporalAgg<V>>, temp: &Temporal<V>, interval: &Interval) -> Result<TemporalAgg<V>> {
    wtransfn(state, extend(temp, interval, Some(true))?, min_of::<V>, V::CONTINUOUS)
}

pub fn wmax_transfn<V: NumberValue>(state: Option<TemporalAgg<V>>, temp: &Temporal<V>, interval: &Interval) -> Result<TemporalAgg<V>> {
    wtransfn(state, extend(temp, interval, Some(false))?, max_of::<V>, V::CONTINUOUS)
}

pub fn wsum_transfn<V: NumberValue>(state: Option<TemporalAgg<V>>, temp: &Temporal<V>, interval: &Interval) -> Result<TemporalAgg<V>> {
    wtransfn(state, extend(temp, interval, None)?, sum_of::<V>, false)
}

pub fn wavg_transfn<V: NumberValue>(
    state: Option<TemporalAgg<Double2>>,
    temp: &Temporal<V>,
    interval: &Interval,
) -> Result<TemporalAgg<Double2>> {
    let pieces = extend(temp, interval, None)?
        .into_iter()
        .map(|seq| seq.map_values(&|v: &V| Ok(Double2(v.to_f64(), 1.0)), Interpolation::Step))
        .collect::<Result<Vec<_>>>()?;
    wtransfn(state, pieces, double2_sum, false)
}

// ------------- Extents and unions --------------
/// Bounding box of all the values.
pub fn temporal_extent_transfn<V: TemporalValue>(state: Option<V::BBox>, temp: &Temporal<V>) -> V::BBox {
    let bbox = temp.bbox();
    match state {
        None => bbox,
        Some(mut acc) => {
            acc.merge_with(&bbox);
            acc
        }
    }
}

pub fn tstzspan_extent_transfn<V: TemporalValue>(state: Option<TstzSpan>, temp: &Temporal<V>) -> TstzSpan {
    let period = temp.tstzspan();
    state.map(|acc| acc.hull(&period)).unwrap_or(period)
}

pub fn span_extent_transfn<T: SpanBase>(state: Option<Span<T>>, span: &Span<T>) -> Span<T> {
    state.map(|acc| acc.hull(span)).unwrap_or(*span)
}

pub fn tbox_extent_transfn(state: Option<TBox>, bbox: &TBox) -> TBox {
    state.map(|acc| acc.expand(bbox)).unwrap_or(*bbox)
}

pub fn stbox_extent_transfn(state: Option<STBox>, bbox: &STBox) -> Result<STBox> {
    match state {
        None => Ok(*bbox),
        Some(acc) => acc.union(bbox, false),
    }
}

/// Values collected for a set union.
pub fn set_union_transfn<T: DataType>(state: Option<Vec<T>>, value: T) -> Vec<T> {
    let mut values = state.unwrap_or_default();
    values.push(value);
    values
}

pub fn set_union_transfn_set<T: DataType>(state: Option<Vec<T>>, set: &Set<T>) -> Vec<T> {
    let mut values = state.unwrap_or_default();
    values.extend(set.values().iter().cloned());
    values
}

pub fn set_union_finalfn<T: DataType>(state: Option<Vec<T>>) -> Result<Option<Set<T>>> {
    match state {
        Some(values) if !values.is_empty() => Set::make(values).map(Some),
        _ => Ok(None),
    }
}

pub fn span_union_transfn<T: SpanBase>(state: Option<Vec<Span<T>>>, span: &Span<T>) -> Vec<Span<T>> {
    let mut spans = state.unwrap_or_default();
    spans.push(*span);
    spans
}

pub fn spanset_union_transfn<T: SpanBase>(state: Option<Vec<Span<T>>>, ss: &SpanSet<T>) -> Vec<Span<T>> {
    let mut spans = state.unwrap_or_default();
    spans.extend_from_slice(ss.spans());
    spans
}

pub fn span_union_finalfn<T: SpanBase>(state: Option<Vec<Span<T>>>) -> Option<SpanSet<T>> {
    state.and_then(|spans| SpanSet::make(spans).ok())
}
