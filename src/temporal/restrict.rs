//! Restriction of temporal values to, and removal of, values and times.
//!
//! Results are `None` when nothing remains. Instants restrict to instants and
//! discrete sequences to discrete sequences; value and span-set restrictions
//! of continuous values produce sequence sets, since the result may break
//! into several pieces.

use crate::catalog::Interpolation;
use crate::datatype::NumberBase;
use crate::set::Set;
use crate::span::{Span, SpanOps};
use crate::spanset::SpanSet;
use crate::temporal::{TInstant, TSequence, Temporal, TemporalValue};
use crate::time::{TimestampTz, time_at_ratio};

impl<V: TemporalValue> Temporal<V> {
    /// Restrict to, or remove, a set of periods.
    pub(crate) fn restrict_time(&self, ss: &SpanSet<TimestampTz>, at: bool) -> Option<Temporal<V>> {
        match self {
            Temporal::Instant(i) => {
                if ss.contains_value(&i.t) == at { Some(self.clone()) } else { None }
            }
            Temporal::Sequence(s) if at && ss.num_spans() == 1 && !s.is_discrete() => {
                s.at_period(ss.start_span()).map(Temporal::Sequence)
            }
            _ => {
                let pieces: Vec<TSequence<V>> = self
                    .pieces()
                    .iter()
                    .flat_map(|s| if at { s.at_spanset(ss) } else { s.minus_spanset(ss) })
                    .collect();
                Temporal::from_pieces(pieces, false)
            }
        }
    }

    /// Complement of a restriction result within the time of `self`.
    pub(crate) fn minus_restriction(&self, at: Option<Temporal<V>>) -> Option<Temporal<V>> {
        match at {
            None => Some(self.clone()),
            Some(restricted) => {
                let rest = self.time().minus(&restricted.time())?;
                self.restrict_time(&rest, true)
            }
        }
    }

    pub fn at_timestamp(&self, t: &TimestampTz) -> Option<Temporal<V>> {
        self.value_at_timestamp(t, true).map(|v| Temporal::Instant(TInstant::make(v, *t)))
    }

    pub fn minus_timestamp(&self, t: &TimestampTz) -> Option<Temporal<V>> {
        self.restrict_time(&SpanSet::from_value(*t), false)
    }

    /// Values at the timestamps of a set, as a discrete sequence.
    pub fn at_tstzset(&self, set: &Set<TimestampTz>) -> Option<Temporal<V>> {
        if let Temporal::Instant(i) = self {
            return if set.contains_value(&i.t) { Some(self.clone()) } else { None };
        }
        let instants: Vec<TInstant<V>> = set
            .values()
            .iter()
            .filter_map(|t| self.value_at_timestamp(t, true).map(|v| TInstant::make(v, *t)))
            .collect();
        if instants.is_empty() {
            return None;
        }
        Some(Temporal::Sequence(TSequence::make_valid(instants, true, true, Interpolation::Discrete, false)))
    }

    pub fn minus_tstzset(&self, set: &Set<TimestampTz>) -> Option<Temporal<V>> {
        self.restrict_time(&SpanSet::from_set(set), false)
    }

    pub fn at_tstzspan(&self, span: &Span<TimestampTz>) -> Option<Temporal<V>> {
        self.restrict_time(&SpanSet::from_span(*span), true)
    }

    pub fn minus_tstzspan(&self, span: &Span<TimestampTz>) -> Option<Temporal<V>> {
        self.restrict_time(&SpanSet::from_span(*span), false)
    }

    pub fn at_tstzspanset(&self, ss: &SpanSet<TimestampTz>) -> Option<Temporal<V>> {
        if !self.tstzspan().overlaps(ss) {
            return None;
        }
        self.restrict_time(ss, true)
    }

    pub fn minus_tstzspanset(&self, ss: &SpanSet<TimestampTz>) -> Option<Temporal<V>> {
        if !self.tstzspan().overlaps(ss) {
            return Some(self.clone());
        }
        self.restrict_time(ss, false)
    }

    /// Restrict to the instants and crossings where the value equals
    /// `value`.
    pub fn at_value(&self, value: &V) -> Option<Temporal<V>> {
        if let Temporal::Instant(i) = self {
            return if i.value.eq_value(value) { Some(self.clone()) } else { None };
        }
        let pieces: Vec<TSequence<V>> = self.pieces().iter().flat_map(|s| s.at_value_pieces(value)).collect();
        Temporal::from_pieces(pieces, false)
    }

    pub fn minus_value(&self, value: &V) -> Option<Temporal<V>> {
        self.minus_restriction(self.at_value(value))
    }

    pub fn at_values(&self, values: &Set<V>) -> Option<Temporal<V>> {
        if let Temporal::Instant(i) = self {
            return if values.contains_value(&i.value) { Some(self.clone()) } else { None };
        }
        let pieces: Vec<TSequence<V>> = self
            .pieces()
            .iter()
            .flat_map(|s| values.values().iter().flat_map(move |v| s.at_value_pieces(v)))
            .collect();
        merge_discrete(pieces)
    }

    pub fn minus_values(&self, values: &Set<V>) -> Option<Temporal<V>> {
        self.minus_restriction(self.at_values(values))
    }

    pub fn at_min(&self) -> Option<Temporal<V>> {
        self.at_value(&self.min_value())
    }

    pub fn at_max(&self) -> Option<Temporal<V>> {
        self.at_value(&self.max_value())
    }

    pub fn minus_min(&self) -> Option<Temporal<V>> {
        self.minus_value(&self.min_value())
    }

    pub fn minus_max(&self) -> Option<Temporal<V>> {
        self.minus_value(&self.max_value())
    }
}

/// Discrete pieces coming from several values are merged by time; others
/// are joined as sequence pieces.
fn merge_discrete<V: TemporalValue>(mut pieces: Vec<TSequence<V>>) -> Option<Temporal<V>> {
    if pieces.iter().all(|p| p.is_discrete()) && !pieces.is_empty() {
        let mut instants: Vec<TInstant<V>> = pieces.drain(..).flat_map(|p| p.instants).collect();
        instants.sort_by(|a, b| a.t.cmp(&b.t));
        return Some(Temporal::Sequence(TSequence::make_valid(instants, true, true, Interpolation::Discrete, false)));
    }
    Temporal::from_pieces(pieces, false)
}

/// Part of a linear segment whose values fall in a span, with the values at
/// the crossings set exactly to the span bounds.
fn segment_at_span<V: TemporalValue + NumberBase>(
    a: &TInstant<V>,
    b: &TInstant<V>,
    lower_inc: bool,
    upper_inc: bool,
    span: &Span<V>,
) -> Option<TSequence<V>> {
    let (v1, v2) = (a.value.to_f64(), b.value.to_f64());
    if v1 == v2 {
        if !span.contains_value(&a.value) {
            return None;
        }
        return Some(TSequence::make_valid(vec![a.clone(), b.clone()], lower_inc, upper_inc, Interpolation::Linear, false));
    }
    let ratio = |x: f64| (x - v1) / (v2 - v1);
    let (lo, hi) = (span.lower.to_f64(), span.upper.to_f64());
    // (ratio, inclusive, bound value) at each end of the value range
    let (start, end) = if v1 < v2 {
        ((ratio(lo), span.lower_inc, span.lower), (ratio(hi), span.upper_inc, span.upper))
    } else {
        ((ratio(hi), span.upper_inc, span.upper), (ratio(lo), span.lower_inc, span.lower))
    };
    let (r1, inc1, val1) = if start.0 < 0.0 {
        (0.0, lower_inc, a.value)
    } else if start.0 == 0.0 {
        (0.0, lower_inc && start.1, a.value)
    } else {
        (start.0, start.1, start.2)
    };
    let (r2, inc2, val2) = if end.0 > 1.0 {
        (1.0, upper_inc, b.value)
    } else if end.0 == 1.0 {
        (1.0, upper_inc && end.1, b.value)
    } else {
        (end.0, end.1, end.2)
    };
    if r1 > r2 || r1 > 1.0 || r2 < 0.0 {
        return None;
    }
    let (t1, t2) = (time_at_ratio(&a.t, &b.t, r1), time_at_ratio(&a.t, &b.t, r2));
    if t1 == t2 {
        if inc1 && inc2 {
            return Some(TSequence::singleton(TInstant::make(val1, t1), Interpolation::Linear));
        }
        return None;
    }
    Some(TSequence::make_valid(
        vec![TInstant::make(val1, t1), TInstant::make(val2, t2)],
        inc1,
        inc2,
        Interpolation::Linear,
        false,
    ))
}

fn sequence_at_span<V: TemporalValue + NumberBase>(seq: &TSequence<V>, span: &Span<V>) -> Vec<TSequence<V>> {
    let n = seq.instants.len();
    if seq.is_discrete() || n == 1 {
        let instants: Vec<TInstant<V>> = seq.instants.iter().filter(|i| span.contains_value(&i.value)).cloned().collect();
        if instants.is_empty() {
            return vec![];
        }
        return vec![TSequence::make_valid(instants, true, true, seq.interp, false)];
    }
    let mut pieces = vec![];
    for k in 0..n - 1 {
        let (a, b) = (&seq.instants[k], &seq.instants[k + 1]);
        let lower_inc = if k == 0 { seq.lower_inc } else { true };
        let upper_inc = if k == n - 2 { seq.upper_inc } else { false };
        if seq.interp == Interpolation::Linear {
            pieces.extend(segment_at_span(a, b, lower_inc, upper_inc, span));
        } else if span.contains_value(&a.value) {
            let pair = vec![a.clone(), a.with_time(b.t)];
            pieces.push(TSequence::make_valid(pair, lower_inc, false, seq.interp, false));
        }
    }
    let last = &seq.instants[n - 1];
    if seq.interp == Interpolation::Step && seq.upper_inc && span.contains_value(&last.value) {
        pieces.push(TSequence::singleton(last.clone(), seq.interp));
    }
    pieces
}

impl<V: TemporalValue + NumberBase> Temporal<V> {
    /// Restrict to the values of a span.
    pub fn at_span(&self, span: &Span<V>) -> Option<Temporal<V>> {
        if let Temporal::Instant(i) = self {
            return if span.contains_value(&i.value) { Some(self.clone()) } else { None };
        }
        let pieces: Vec<TSequence<V>> = self.pieces().iter().flat_map(|s| sequence_at_span(s, span)).collect();
        Temporal::from_pieces(pieces, false)
    }

    pub fn minus_span(&self, span: &Span<V>) -> Option<Temporal<V>> {
        self.minus_restriction(self.at_span(span))
    }

    pub fn at_spanset(&self, ss: &SpanSet<V>) -> Option<Temporal<V>> {
        if let Temporal::Instant(i) = self {
            return if ss.contains_value(&i.value) { Some(self.clone()) } else { None };
        }
        let pieces: Vec<TSequence<V>> = self
            .pieces()
            .iter()
            .flat_map(|s| ss.spans().iter().flat_map(move |span| sequence_at_span(s, span)))
            .collect();
        merge_discrete(pieces)
    }

    pub fn minus_spanset(&self, ss: &SpanSet<V>) -> Option<Temporal<V>> {
        self.minus_restriction(self.at_spanset(ss))
    }
}
