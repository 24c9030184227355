//! Lifting of base-value functions to temporal values.
//!
//! Binary operations first synchronize their operands: both are restricted
//! to their common time domain and evaluated at the union of their instants,
//! plus any break points the function asks for inside a segment (crossings
//! of two linear segments, turning points of a distance). The result is then
//! assembled with the interpolation the function and the inputs call for.

use std::cmp::Ordering;

use crate::catalog::Interpolation;
use crate::error::Result;
use crate::span::{TstzSpan, cmp_upper};
use crate::temporal::{TInstant, TSequence, TSequenceSet, Temporal, TemporalValue};
use crate::time::{TimestampTz, time_at_ratio};

pub(crate) type BinaryFn<'a, V, W, R> = &'a dyn Fn(&V, &W) -> Result<R>;
pub(crate) type BreakFn<'a, V, W> = &'a dyn Fn(&V, &V, &W, &W) -> Vec<f64>;

/// A base function of two arguments and how it behaves along segments.
pub(crate) struct LiftOp<'a, V, W, R> {
    pub func: BinaryFn<'a, V, W, R>,
    /// Results of linear inputs interpolate linearly between the
    /// synchronized instants.
    pub linear: bool,
    /// Ratios inside a synchronized segment where the result must be
    /// evaluated explicitly, given the start and end values of both inputs.
    pub breaks: Option<BreakFn<'a, V, W>>,
}

impl<'a, V, W, R> LiftOp<'a, V, W, R> {
    pub fn new(func: BinaryFn<'a, V, W, R>) -> Self {
        LiftOp { func, linear: false, breaks: None }
    }

    pub fn linear(mut self) -> Self {
        self.linear = true;
        self
    }

    pub fn with_breaks(mut self, breaks: BreakFn<'a, V, W>) -> Self {
        self.breaks = Some(breaks);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutMode {
    Linear,
    Step,
    /// Step result of linear inputs: the value may change at any break and
    /// hold a different value at the break itself.
    Discontinuous,
}

/// Ratio in `(0, 1)` where two linear float segments cross.
pub(crate) fn float_crossing(a1: f64, a2: f64, b1: f64, b2: f64) -> Vec<f64> {
    let (d1, d2) = (a1 - b1, a2 - b2);
    if d1 * d2 < 0.0 { vec![d1 / (d1 - d2)] } else { vec![] }
}

/// Convert a step sequence into linear pieces with constant values,
/// splitting at every value change.
pub(crate) fn step_to_linear<V: TemporalValue>(seq: &TSequence<V>) -> Vec<TSequence<V>> {
    let n = seq.instants.len();
    if seq.interp == Interpolation::Linear {
        return vec![seq.clone()];
    }
    if n == 1 || seq.is_discrete() {
        return seq.instants.iter().map(|i| TSequence::singleton(i.clone(), Interpolation::Linear)).collect();
    }
    let mut pieces = Vec::with_capacity(n);
    for k in 0..n - 1 {
        let (a, b) = (&seq.instants[k], &seq.instants[k + 1]);
        let lower_inc = if k == 0 { seq.lower_inc } else { true };
        let upper_inc = k == n - 2 && seq.upper_inc && a.value.eq_value(&b.value);
        let pair = vec![a.clone(), a.with_time(b.t)];
        pieces.push(TSequence::make_valid(pair, lower_inc, upper_inc, Interpolation::Linear, false));
    }
    let last = &seq.instants[n - 1];
    if seq.upper_inc && !last.value.eq_value(&seq.instants[n - 2].value) {
        pieces.push(TSequence::singleton(last.clone(), Interpolation::Linear));
    }
    TSequenceSet::from_pieces(pieces).map(|ss| ss.sequences).unwrap_or_default()
}

/// Timestamps of both sequences strictly inside `inter`, plus its bounds.
fn sync_times<V: TemporalValue, W: TemporalValue>(a: &TSequence<V>, b: &TSequence<W>, inter: &TstzSpan) -> Vec<TimestampTz> {
    let inside = |t: &TimestampTz| *t > inter.lower && *t < inter.upper;
    let mut times = vec![inter.lower];
    times.extend(a.instants.iter().map(|i| i.t).filter(|t| inside(t)));
    times.extend(b.instants.iter().map(|i| i.t).filter(|t| inside(t)));
    if inter.upper != inter.lower {
        times.push(inter.upper);
    }
    times.sort();
    times.dedup();
    times
}

/// Insert the break ratios of every segment.
fn add_breaks<F: Fn(&TimestampTz, &TimestampTz) -> Vec<f64>>(times: Vec<TimestampTz>, ratios: F) -> Vec<TimestampTz> {
    let mut result = Vec::with_capacity(times.len());
    for w in times.windows(2) {
        result.push(w[0]);
        let mut inner: Vec<TimestampTz> = ratios(&w[0], &w[1])
            .into_iter()
            .filter(|r| *r > 0.0 && *r < 1.0)
            .map(|r| time_at_ratio(&w[0], &w[1], r))
            .filter(|t| *t > w[0] && *t < w[1])
            .collect();
        inner.sort();
        inner.dedup();
        result.extend(inner);
    }
    if let Some(last) = times.last() {
        result.push(*last);
    }
    result
}

/// Build the result pieces over synchronized times. `eval(t, left)` gives
/// the result at `t`, or its limit from the left.
fn build_pieces<R: TemporalValue>(
    times: &[TimestampTz],
    lower_inc: bool,
    upper_inc: bool,
    mode: OutMode,
    eval: &dyn Fn(&TimestampTz, bool) -> Result<R>,
) -> Result<Vec<TSequence<R>>> {
    let n = times.len();
    let interp = if mode == OutMode::Linear { Interpolation::Linear } else { Interpolation::Step };
    if n == 1 {
        return Ok(vec![TSequence::singleton(TInstant::make(eval(&times[0], false)?, times[0]), interp)]);
    }
    match mode {
        OutMode::Linear | OutMode::Step => {
            let instants = times
                .iter()
                .map(|t| Ok(TInstant::make(eval(t, false)?, *t)))
                .collect::<Result<Vec<_>>>()?;
            Ok(vec![TSequence::make_valid(instants, lower_inc, upper_inc, interp, true)])
        }
        OutMode::Discontinuous => {
            let mut pieces = Vec::with_capacity(2 * n);
            for k in 0..n - 1 {
                let (t1, t2) = (times[k], times[k + 1]);
                if k > 0 || lower_inc {
                    pieces.push(TSequence::singleton(TInstant::make(eval(&t1, false)?, t1), interp));
                }
                let tm = time_at_ratio(&t1, &t2, 0.5);
                let mid = if tm > t1 { eval(&tm, false)? } else { eval(&t2, true)? };
                let pair = vec![TInstant::make(mid.clone(), t1), TInstant::make(mid, t2)];
                pieces.push(TSequence::make_valid(pair, false, false, interp, false));
            }
            if upper_inc {
                pieces.push(TSequence::singleton(TInstant::make(eval(&times[n - 1], false)?, times[n - 1]), interp));
            }
            Ok(pieces)
        }
    }
}

fn lift_discrete<V, W, R>(a: &Temporal<V>, b: &Temporal<W>, op: &LiftOp<V, W, R>) -> Result<Option<Temporal<R>>>
where
    V: TemporalValue,
    W: TemporalValue,
    R: TemporalValue,
{
    // the discrete operand drives the evaluation
    let a_drives = matches!(a, Temporal::Instant(_))
        || (matches!(a, Temporal::Sequence(s) if s.is_discrete()) && !matches!(b, Temporal::Instant(_)));
    let mut instants = vec![];
    if a_drives {
        for inst in a.instants() {
            if let Some(w) = b.value_at_timestamp(&inst.t, true) {
                instants.push(TInstant::make((op.func)(&inst.value, &w)?, inst.t));
            }
        }
    } else {
        for inst in b.instants() {
            if let Some(v) = a.value_at_timestamp(&inst.t, true) {
                instants.push(TInstant::make((op.func)(&v, &inst.value)?, inst.t));
            }
        }
    }
    if instants.is_empty() {
        return Ok(None);
    }
    let driver_is_instant = if a_drives { matches!(a, Temporal::Instant(_)) } else { matches!(b, Temporal::Instant(_)) };
    if driver_is_instant {
        return Ok(instants.into_iter().next().map(Temporal::Instant));
    }
    Ok(Some(Temporal::Sequence(TSequence::make_valid(instants, true, true, Interpolation::Discrete, false))))
}

/// Apply a binary function to two temporal values over their common time
/// domain. `None` when they share no time.
pub(crate) fn lift2<V, W, R>(a: &Temporal<V>, b: &Temporal<W>, op: &LiftOp<V, W, R>) -> Result<Option<Temporal<R>>>
where
    V: TemporalValue,
    W: TemporalValue,
    R: TemporalValue,
{
    if !a.is_continuous() || !b.is_continuous() {
        return lift_discrete(a, b, op);
    }
    let (a_interp, b_interp) = (a.interp(), b.interp());
    let any_linear = a_interp == Interpolation::Linear || b_interp == Interpolation::Linear;
    let mode = if op.linear && R::CONTINUOUS && any_linear {
        OutMode::Linear
    } else if any_linear {
        OutMode::Discontinuous
    } else {
        OutMode::Step
    };
    let (a_seqs, b_seqs) = if mode == OutMode::Linear {
        (
            a.pieces().iter().flat_map(|s| step_to_linear(s)).collect::<Vec<_>>(),
            b.pieces().iter().flat_map(|s| step_to_linear(s)).collect::<Vec<_>>(),
        )
    } else {
        (a.pieces(), b.pieces())
    };

    let mut pieces: Vec<TSequence<R>> = vec![];
    let (mut i, mut j) = (0, 0);
    while i < a_seqs.len() && j < b_seqs.len() {
        let (sa, sb) = (&a_seqs[i], &b_seqs[j]);
        let (pa, pb) = (sa.period(), sb.period());
        if let Some(inter) = pa.intersect_span(&pb) {
            let times = sync_times(sa, sb, &inter);
            let times = match op.breaks {
                Some(breaks) => add_breaks(times, |t1, t2| {
                    breaks(
                        &sa.value_at_inner(t1, false),
                        &sa.value_at_inner(t2, true),
                        &sb.value_at_inner(t1, false),
                        &sb.value_at_inner(t2, true),
                    )
                }),
                None => times,
            };
            let eval = |t: &TimestampTz, left: bool| (op.func)(&sa.value_at_inner(t, left), &sb.value_at_inner(t, left));
            pieces.extend(build_pieces(&times, inter.lower_inc, inter.upper_inc, mode, &eval)?);
        }
        match cmp_upper(&pa, &pb) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    let prefer_sequence = matches!(a, Temporal::Sequence(_)) && matches!(b, Temporal::Sequence(_));
    Ok(Temporal::from_pieces(pieces, prefer_sequence))
}

/// Apply a binary function between a temporal value and a constant.
pub(crate) fn lift_base<V, W, R>(a: &Temporal<V>, value: &W, op: &LiftOp<V, W, R>) -> Result<Temporal<R>>
where
    V: TemporalValue,
    W: TemporalValue,
    R: TemporalValue,
{
    let constant = Temporal::from_base_temp(value.clone(), a);
    lift2(a, &constant, op)?.ok_or_else(|| crate::error::MeosError::Internal("Lifting lost the time domain".into()))
}

/// Apply a unary function. With `linear`, results of linear inputs
/// interpolate linearly; `breaks` gives extra ratios inside a segment.
pub(crate) fn lift1<V, R>(
    a: &Temporal<V>,
    func: &dyn Fn(&V) -> Result<R>,
    linear: bool,
    breaks: Option<&dyn Fn(&V, &V) -> Vec<f64>>,
) -> Result<Temporal<R>>
where
    V: TemporalValue,
    R: TemporalValue,
{
    if !a.is_continuous() {
        return a.map_values(func);
    }
    let mode = match a.interp() {
        Interpolation::Linear if linear && R::CONTINUOUS => OutMode::Linear,
        Interpolation::Linear => OutMode::Discontinuous,
        _ => OutMode::Step,
    };
    let mut pieces: Vec<TSequence<R>> = vec![];
    for seq in a.pieces() {
        let times: Vec<TimestampTz> = seq.instants.iter().map(|i| i.t).collect();
        let times = match breaks {
            Some(breaks) => {
                add_breaks(times, |t1, t2| breaks(&seq.value_at_inner(t1, false), &seq.value_at_inner(t2, true)))
            }
            None => times,
        };
        let eval = |t: &TimestampTz, left: bool| func(&seq.value_at_inner(t, left));
        pieces.extend(build_pieces(&times, seq.lower_inc, seq.upper_inc, mode, &eval)?);
    }
    Temporal::from_pieces(pieces, matches!(a, Temporal::Sequence(_)))
        .ok_or_else(|| crate::error::MeosError::Internal("Lifting lost the time domain".into()))
}
