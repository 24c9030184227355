use std::cmp::Ordering;

use crate::catalog::Interpolation;
use crate::error::{MeosError, Result};
use crate::span::{Span, SpanOps, TstzSpan};
use crate::spanset::SpanSet;
use crate::temporal::instant::TInstant;
use crate::temporal::{BoundingBox, TemporalValue};
use crate::time::{TimestampTz, format_timestamp, time_at_ratio, time_ratio};

/// Instants sharing one interpolation, with explicit bound inclusivity.
#[derive(Debug, Clone)]
pub struct TSequence<V: TemporalValue> {
    pub(crate) instants: Vec<TInstant<V>>,
    pub(crate) lower_inc: bool,
    pub(crate) upper_inc: bool,
    pub(crate) interp: Interpolation,
    pub(crate) bbox: V::BBox,
}

/// `b` lies on the interpolation of `a` and `c`.
fn collinear<V: TemporalValue>(a: &TInstant<V>, b: &TInstant<V>, c: &TInstant<V>) -> bool {
    let ratio = time_ratio(&a.t, &c.t, &b.t);
    a.value.interpolate(&c.value, ratio).approx_eq(&b.value)
}

fn normalize_instants<V: TemporalValue>(instants: Vec<TInstant<V>>, interp: Interpolation) -> Vec<TInstant<V>> {
    if instants.len() < 3 || interp == Interpolation::Discrete {
        return instants;
    }
    let n = instants.len();
    let mut out: Vec<TInstant<V>> = Vec::with_capacity(n);
    let mut iter = instants.into_iter().peekable();
    while let Some(cur) = iter.next() {
        let redundant = match (out.last(), iter.peek()) {
            (Some(prev), Some(next)) => match interp {
                Interpolation::Step => prev.value.eq_value(&cur.value),
                _ => collinear(prev, &cur, next),
            },
            _ => false,
        };
        if !redundant {
            out.push(cur);
        }
    }
    out
}

pub(crate) fn compute_bbox<V: TemporalValue>(
    instants: &[TInstant<V>],
    lower_inc: bool,
    upper_inc: bool,
    interp: Interpolation,
) -> V::BBox {
    let mut bbox = V::BBox::from_instant(&instants[0].value, &instants[0].t);
    for w in instants.windows(2) {
        if interp == Interpolation::Linear {
            bbox.merge_with(&V::BBox::from_segment(&w[0].value, &w[1].value, &w[0].t, &w[1].t));
        } else {
            bbox.merge_with(&V::BBox::from_instant(&w[1].value, &w[1].t));
        }
    }
    bbox.set_period(Span {
        lower: instants[0].t,
        upper: instants[instants.len() - 1].t,
        lower_inc,
        upper_inc,
    });
    bbox
}

impl<V: TemporalValue> TSequence<V> {
    /// Validate and build a sequence. With `normalize`, redundant instants
    /// are removed.
    pub fn make(
        instants: Vec<TInstant<V>>,
        lower_inc: bool,
        upper_inc: bool,
        interp: Interpolation,
        normalize: bool,
    ) -> Result<TSequence<V>> {
        if instants.is_empty() {
            return Err(MeosError::InvalidArg("A temporal sequence must have at least one instant".into()));
        }
        for w in instants.windows(2) {
            if w[0].t >= w[1].t {
                return Err(MeosError::value(format!(
                    "Timestamps for temporal value must be increasing: {}, {}",
                    format_timestamp(&w[0].t),
                    format_timestamp(&w[1].t)
                )));
            }
            w[0].value.check_compatible(&w[1].value)?;
            if interp != Interpolation::Discrete {
                w[0].value.check_continuous(&w[1].value)?;
            }
        }
        if instants.len() == 1 && !(lower_inc && upper_inc) {
            return Err(MeosError::value("The lower and upper bounds must be inclusive for an instantaneous temporal sequence".to_string()));
        }
        if interp == Interpolation::Discrete && !(lower_inc && upper_inc) {
            return Err(MeosError::value("The bounds of a discrete sequence must be inclusive".to_string()));
        }
        if interp == Interpolation::Linear && !V::CONTINUOUS {
            return Err(MeosError::value(format!("The {} type does not support linear interpolation", V::DATA_TYPE)));
        }
        Ok(TSequence::make_valid(instants, lower_inc, upper_inc, interp, normalize))
    }

    /// Build from instants already known to satisfy the invariants.
    pub(crate) fn make_valid(
        mut instants: Vec<TInstant<V>>,
        lower_inc: bool,
        upper_inc: bool,
        interp: Interpolation,
        normalize: bool,
    ) -> TSequence<V> {
        let n = instants.len();
        // a step sequence never reaches the value of an excluded last instant
        if interp == Interpolation::Step && n > 1 && !upper_inc && !instants[n - 1].value.eq_value(&instants[n - 2].value) {
            instants[n - 1].value = instants[n - 2].value.clone();
        }
        let instants = if normalize { normalize_instants(instants, interp) } else { instants };
        let (lower_inc, upper_inc) = if instants.len() == 1 { (true, true) } else { (lower_inc, upper_inc) };
        let bbox = compute_bbox(&instants, lower_inc, upper_inc, interp);
        TSequence { instants, lower_inc, upper_inc, interp, bbox }
    }

    pub(crate) fn singleton(inst: TInstant<V>, interp: Interpolation) -> TSequence<V> {
        TSequence::make_valid(vec![inst], true, true, interp, false)
    }

    pub fn interp(&self) -> Interpolation {
        self.interp
    }

    pub fn lower_inc(&self) -> bool {
        self.lower_inc
    }

    pub fn upper_inc(&self) -> bool {
        self.upper_inc
    }

    pub fn bbox(&self) -> &V::BBox {
        &self.bbox
    }

    pub fn instants(&self) -> &[TInstant<V>] {
        &self.instants
    }

    pub fn num_instants(&self) -> usize {
        self.instants.len()
    }

    pub fn start_instant(&self) -> &TInstant<V> {
        &self.instants[0]
    }

    pub fn end_instant(&self) -> &TInstant<V> {
        &self.instants[self.instants.len() - 1]
    }

    pub fn start_timestamp(&self) -> TimestampTz {
        self.instants[0].t
    }

    pub fn end_timestamp(&self) -> TimestampTz {
        self.instants[self.instants.len() - 1].t
    }

    pub fn is_discrete(&self) -> bool {
        self.interp == Interpolation::Discrete
    }

    pub fn period(&self) -> TstzSpan {
        if self.is_discrete() {
            return Span { lower: self.start_timestamp(), upper: self.end_timestamp(), lower_inc: true, upper_inc: true };
        }
        Span { lower: self.start_timestamp(), upper: self.end_timestamp(), lower_inc: self.lower_inc, upper_inc: self.upper_inc }
    }

    /// Time domain: the instants for discrete sequences, the period otherwise.
    pub fn time(&self) -> SpanSet<TimestampTz> {
        if self.is_discrete() {
            return SpanSet::normalize(self.instants.iter().map(|i| Span::from_value(i.t)).collect());
        }
        SpanSet::from_span(self.period())
    }

    /// Index of the segment whose start is the last instant at or before `t`.
    fn segment_index(&self, t: &TimestampTz) -> usize {
        let idx = self.instants.partition_point(|i| i.t <= *t);
        idx.saturating_sub(1)
    }

    /// Value of a continuous sequence at a timestamp of its closed period.
    /// With `left_limit`, the limit from the left is taken at a step jump.
    pub(crate) fn value_at_inner(&self, t: &TimestampTz, left_limit: bool) -> V {
        let i = self.segment_index(t);
        let inst = &self.instants[i];
        if inst.t == *t {
            if left_limit && i > 0 && self.interp == Interpolation::Step {
                return self.instants[i - 1].value.clone();
            }
            return inst.value.clone();
        }
        if i + 1 >= self.instants.len() || self.interp != Interpolation::Linear {
            return inst.value.clone();
        }
        let next = &self.instants[i + 1];
        let ratio = time_ratio(&inst.t, &next.t, t);
        inst.value.interpolate(&next.value, ratio)
    }

    /// Value at a timestamp. Without `strict`, the value at an exclusive
    /// bound is returned as well.
    pub fn value_at(&self, t: &TimestampTz, strict: bool) -> Option<V> {
        if self.is_discrete() {
            return self
                .instants
                .binary_search_by(|i| i.t.cmp(t))
                .ok()
                .map(|idx| self.instants[idx].value.clone());
        }
        let period = self.period();
        if period.contains_value(t) {
            return Some(self.value_at_inner(t, false));
        }
        if !strict && (*t == period.lower || *t == period.upper) {
            return Some(self.value_at_inner(t, *t == period.upper));
        }
        None
    }

    pub fn min_instant(&self) -> &TInstant<V> {
        let mut best = &self.instants[0];
        for inst in &self.instants[1..] {
            if inst.value.compare(&best.value) == Ordering::Less {
                best = inst;
            }
        }
        best
    }

    pub fn max_instant(&self) -> &TInstant<V> {
        let mut best = &self.instants[0];
        for inst in &self.instants[1..] {
            if inst.value.compare(&best.value) == Ordering::Greater {
                best = inst;
            }
        }
        best
    }

    /// Segments as two-instant sequences; a single instant is its own
    /// segment.
    pub fn segments(&self) -> Vec<TSequence<V>> {
        if self.instants.len() == 1 || self.is_discrete() {
            return self.instants.iter().map(|i| TSequence::singleton(i.clone(), self.interp)).collect();
        }
        let n = self.instants.len();
        let mut result = Vec::with_capacity(n - 1);
        for (k, w) in self.instants.windows(2).enumerate() {
            let lower_inc = if k == 0 { self.lower_inc } else { true };
            let upper_inc = if k == n - 2 { self.upper_inc } else { false };
            let mut pair = vec![w[0].clone(), w[1].clone()];
            if self.interp == Interpolation::Step && !upper_inc {
                pair[1].value = w[0].value.clone();
            }
            result.push(TSequence::make_valid(pair, lower_inc, upper_inc, self.interp, false));
        }
        if self.upper_inc && self.interp == Interpolation::Step && !self.instants[n - 1].value.eq_value(&self.instants[n - 2].value) {
            result.push(TSequence::singleton(self.instants[n - 1].clone(), self.interp));
        }
        result
    }

    /// Restrict to a period.
    pub(crate) fn at_period(&self, p: &TstzSpan) -> Option<TSequence<V>> {
        if self.is_discrete() {
            let instants: Vec<TInstant<V>> = self.instants.iter().filter(|i| p.contains_value(&i.t)).cloned().collect();
            if instants.is_empty() {
                return None;
            }
            return Some(TSequence::make_valid(instants, true, true, Interpolation::Discrete, false));
        }
        let inter = self.period().intersect_span(p)?;
        if inter.lower == inter.upper {
            let inst = TInstant::make(self.value_at_inner(&inter.lower, false), inter.lower);
            return Some(TSequence::singleton(inst, self.interp));
        }
        let mut instants = Vec::with_capacity(self.instants.len() + 2);
        instants.push(TInstant::make(self.value_at_inner(&inter.lower, false), inter.lower));
        instants.extend(self.instants.iter().filter(|i| i.t > inter.lower && i.t < inter.upper).cloned());
        instants.push(TInstant::make(self.value_at_inner(&inter.upper, !inter.upper_inc), inter.upper));
        Some(TSequence::make_valid(instants, inter.lower_inc, inter.upper_inc, self.interp, true))
    }

    /// Restrict to a span set, one piece per overlapped span.
    pub(crate) fn at_spanset(&self, ss: &SpanSet<TimestampTz>) -> Vec<TSequence<V>> {
        if self.is_discrete() {
            let instants: Vec<TInstant<V>> = self.instants.iter().filter(|i| ss.contains_value(&i.t)).cloned().collect();
            if instants.is_empty() {
                return vec![];
            }
            return vec![TSequence::make_valid(instants, true, true, Interpolation::Discrete, false)];
        }
        let period = self.period();
        ss.spans().iter().filter_map(|s| if s.overlaps(&period) { self.at_period(s) } else { None }).collect()
    }

    pub(crate) fn minus_spanset(&self, ss: &SpanSet<TimestampTz>) -> Vec<TSequence<V>> {
        if self.is_discrete() {
            let instants: Vec<TInstant<V>> = self.instants.iter().filter(|i| !ss.contains_value(&i.t)).cloned().collect();
            if instants.is_empty() {
                return vec![];
            }
            return vec![TSequence::make_valid(instants, true, true, Interpolation::Discrete, false)];
        }
        match self.period().minus(ss) {
            Some(rest) => self.at_spanset(&rest),
            None => vec![],
        }
    }

    /// Pieces where the sequence takes `value`, with exact values at the
    /// crossings.
    pub(crate) fn at_value_pieces(&self, value: &V) -> Vec<TSequence<V>> {
        let n = self.instants.len();
        if self.is_discrete() || n == 1 {
            let instants: Vec<TInstant<V>> = self.instants.iter().filter(|i| i.value.eq_value(value)).cloned().collect();
            if instants.is_empty() {
                return vec![];
            }
            return vec![TSequence::make_valid(instants, true, true, self.interp, false)];
        }
        let mut pieces = vec![];
        let singleton = |t: TimestampTz| TSequence::singleton(TInstant::make(value.clone(), t), self.interp);
        for k in 0..n - 1 {
            let (a, b) = (&self.instants[k], &self.instants[k + 1]);
            let lower_inc = if k == 0 { self.lower_inc } else { true };
            let constant = self.interp == Interpolation::Step || a.value.eq_value(&b.value);
            if constant {
                if a.value.eq_value(value) {
                    let pair = vec![TInstant::make(value.clone(), a.t), TInstant::make(value.clone(), b.t)];
                    pieces.push(TSequence::make_valid(pair, lower_inc, false, self.interp, false));
                }
                continue;
            }
            if let Some(ratio) = a.value.locate(&b.value, value) {
                let t = time_at_ratio(&a.t, &b.t, ratio);
                if t == a.t {
                    if lower_inc {
                        pieces.push(singleton(a.t));
                    }
                } else if t < b.t {
                    pieces.push(singleton(t));
                }
            }
        }
        let last = &self.instants[n - 1];
        if self.upper_inc && last.value.eq_value(value) {
            pieces.push(singleton(last.t));
        }
        pieces
    }

    /// Apply a time transformation to every instant.
    pub(crate) fn map_times<F: Fn(&TimestampTz) -> Result<TimestampTz>>(&self, f: &F) -> Result<TSequence<V>> {
        let instants = self.instants.iter().map(|i| Ok(i.with_time(f(&i.t)?))).collect::<Result<Vec<_>>>()?;
        TSequence::make(instants, self.lower_inc, self.upper_inc, self.interp, false)
    }

    /// Apply a value transformation to every instant.
    pub(crate) fn map_values<U: TemporalValue, F: Fn(&V) -> Result<U>>(&self, f: &F, interp: Interpolation) -> Result<TSequence<U>> {
        let instants = self
            .instants
            .iter()
            .map(|i| Ok(TInstant::make(f(&i.value)?, i.t)))
            .collect::<Result<Vec<_>>>()?;
        TSequence::make(instants, self.lower_inc, self.upper_inc, interp, true)
    }
}

/// Two consecutive sequences can be merged into one.
pub(crate) fn joinable<V: TemporalValue>(a: &TSequence<V>, b: &TSequence<V>) -> bool {
    if a.is_discrete() || b.is_discrete() || a.end_timestamp() != b.start_timestamp() {
        return false;
    }
    if a.upper_inc == b.lower_inc {
        // either overlapping or a one-point gap
        return false;
    }
    let (last, first) = (&a.end_instant().value, &b.start_instant().value);
    match (a.interp, a.upper_inc) {
        (Interpolation::Step, false) => true,
        (Interpolation::Linear, _) => last.approx_eq(first),
        _ => last.eq_value(first),
    }
}

pub(crate) fn join<V: TemporalValue>(a: &TSequence<V>, b: &TSequence<V>) -> TSequence<V> {
    let interp = if a.instants.len() == 1 { b.interp } else { a.interp };
    let mut instants: Vec<TInstant<V>> = a.instants[..a.instants.len() - 1].to_vec();
    instants.extend(b.instants.iter().cloned());
    TSequence::make_valid(instants, a.lower_inc, b.upper_inc, interp, true)
}

impl<V: TemporalValue> PartialEq for TSequence<V> {
    fn eq(&self, other: &Self) -> bool {
        let interp_ok = self.instants.len() == 1 || self.interp == other.interp;
        interp_ok
            && self.lower_inc == other.lower_inc
            && self.upper_inc == other.upper_inc
            && self.instants.len() == other.instants.len()
            && self.instants.iter().zip(other.instants.iter()).all(|(a, b)| a.same(b))
    }
}
