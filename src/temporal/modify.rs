//! Modification of temporal values: appending, merging, inserting, updating
//! and deleting.

use tracing::debug;

use crate::catalog::Interpolation;
use crate::error::{MeosError, Result};
use crate::set::Set;
use crate::span::{Span, SpanOps, cmp_lower};
use crate::spanset::SpanSet;
use crate::temporal::sequence::{join, joinable};
use crate::temporal::{TInstant, TSequence, TSequenceSet, Temporal, TemporalValue};
use crate::time::{Interval, TimestampTz, format_timestamp};

/// The new instant starts a new sequence when it is too far, in time or
/// value, from the last one.
fn exceeds_gap<V: TemporalValue>(last: &TInstant<V>, inst: &TInstant<V>, maxdist: Option<f64>, maxt: Option<&Interval>) -> bool {
    let time_gap = maxt
        .map(|m| (inst.t - last.t).num_microseconds().unwrap_or(i64::MAX) > m.total_micros())
        .unwrap_or(false);
    let dist_gap = match (maxdist, last.value.distance_to(&inst.value)) {
        (Some(m), Some(d)) => m > 0.0 && d > m,
        _ => false,
    };
    time_gap || dist_gap
}

/// Append an instant to a sequence. `Err` when the instant is before the
/// end, `Ok(None)` when it repeats the last instant.
fn seq_append<V: TemporalValue>(seq: &TSequence<V>, inst: &TInstant<V>) -> Result<Option<TSequence<V>>> {
    let last = seq.end_instant();
    seq.start_instant().value.check_compatible(&inst.value)?;
    if inst.t < last.t || (inst.t == last.t && !last.value.eq_value(&inst.value)) {
        return Err(MeosError::value(format!(
            "The timestamps of the values must be increasing: {}, {}",
            format_timestamp(&last.t),
            format_timestamp(&inst.t)
        )));
    }
    if inst.t == last.t {
        if seq.upper_inc {
            return Ok(None);
        }
        let mut instants = seq.instants.clone();
        let n = instants.len();
        instants[n - 1] = inst.clone();
        return Ok(Some(TSequence::make_valid(instants, seq.lower_inc, true, seq.interp, true)));
    }
    let mut instants = seq.instants.clone();
    instants.push(inst.clone());
    Ok(Some(TSequence::make_valid(instants, seq.lower_inc, true, seq.interp, true)))
}

impl<V: TemporalValue> Temporal<V> {
    /// Append an instant. With `maxdist` or `maxt`, a value too far from
    /// the last instant starts a new sequence.
    pub fn append_tinstant(
        &self,
        inst: &TInstant<V>,
        interp: Interpolation,
        maxdist: Option<f64>,
        maxt: Option<&Interval>,
    ) -> Result<Temporal<V>> {
        match self {
            Temporal::Instant(i) => {
                if interp == Interpolation::Linear && !V::CONTINUOUS {
                    return Err(MeosError::value(format!("The {} type does not support linear interpolation", V::DATA_TYPE)));
                }
                let seq = TSequence::singleton(i.clone(), interp);
                if interp != Interpolation::Discrete && exceeds_gap(i, inst, maxdist, maxt) {
                    debug!(at = %format_timestamp(&inst.t), "gap before appended instant, starting a new sequence");
                    let next = TSequence::singleton(inst.clone(), interp);
                    return Ok(Temporal::SequenceSet(TSequenceSet::make(vec![seq, next], true)?));
                }
                Ok(match seq_append(&seq, inst)? {
                    Some(s) => Temporal::Sequence(s),
                    None => self.clone(),
                })
            }
            Temporal::Sequence(s) => {
                if !s.is_discrete() && exceeds_gap(s.end_instant(), inst, maxdist, maxt) {
                    debug!(at = %format_timestamp(&inst.t), "gap before appended instant, starting a new sequence");
                    let next = TSequence::singleton(inst.clone(), s.interp);
                    return Ok(Temporal::SequenceSet(TSequenceSet::make(vec![s.clone(), next], true)?));
                }
                Ok(match seq_append(s, inst)? {
                    Some(s) => Temporal::Sequence(s),
                    None => self.clone(),
                })
            }
            Temporal::SequenceSet(ss) => {
                let mut sequences = ss.sequences.clone();
                let last = ss.end_sequence();
                if exceeds_gap(last.end_instant(), inst, maxdist, maxt) {
                    debug!(at = %format_timestamp(&inst.t), "gap before appended instant, starting a new sequence");
                    sequences.push(TSequence::singleton(inst.clone(), ss.interp()));
                } else if let Some(s) = seq_append(last, inst)? {
                    let n = sequences.len();
                    sequences[n - 1] = s;
                }
                Ok(Temporal::SequenceSet(TSequenceSet::make(sequences, true)?))
            }
        }
    }

    /// Append a sequence after the end of the value.
    pub fn append_tsequence(&self, seq: &TSequence<V>) -> Result<Temporal<V>> {
        let end = self.end_instant();
        let start = seq.start_instant();
        if start.t < end.t || (start.t == end.t && (self.upper_inc() && seq.lower_inc) && !start.value.eq_value(&end.value)) {
            return Err(MeosError::value(format!(
                "The temporal values cannot overlap in time: {}, {}",
                format_timestamp(&end.t),
                format_timestamp(&start.t)
            )));
        }
        match self {
            Temporal::Sequence(s) if s.is_discrete() || seq.is_discrete() => {
                if !(s.is_discrete() && seq.is_discrete()) {
                    return Err(MeosError::value("Cannot append a discrete and a continuous sequence".to_string()));
                }
                let mut instants = s.instants.clone();
                let skip = usize::from(start.t == end.t);
                instants.extend(seq.instants.iter().skip(skip).cloned());
                Ok(Temporal::Sequence(TSequence::make(instants, true, true, Interpolation::Discrete, false)?))
            }
            _ => {
                let mut pieces = self.pieces();
                let n = pieces.len();
                if joinable(&pieces[n - 1], seq) {
                    pieces[n - 1] = join(&pieces[n - 1], seq);
                } else if start.t == end.t && seq.lower_inc && pieces[n - 1].upper_inc {
                    // shared instant with equal values
                    pieces[n - 1] = overlap_join(&pieces[n - 1], seq);
                } else {
                    pieces.push(seq.clone());
                }
                if pieces.len() == 1 && !matches!(self, Temporal::SequenceSet(_)) {
                    return Ok(Temporal::Sequence(pieces.remove(0)));
                }
                Ok(Temporal::SequenceSet(TSequenceSet::make(pieces, true)?))
            }
        }
    }

    /// Merge two values whose time domains do not overlap, except on
    /// instants where they agree.
    pub fn merge(&self, other: &Temporal<V>) -> Result<Temporal<V>> {
        Temporal::merge_array(&[self.clone(), other.clone()])?
            .ok_or_else(|| MeosError::Internal("Empty merge result".into()))
    }

    pub fn merge_array(values: &[Temporal<V>]) -> Result<Option<Temporal<V>>> {
        if values.is_empty() {
            return Ok(None);
        }
        if values.len() == 1 {
            return Ok(Some(values[0].clone()));
        }
        let all_discrete = values.iter().all(|v| !v.is_continuous());
        if all_discrete {
            let mut instants: Vec<TInstant<V>> = values.iter().flat_map(|v| v.instants().into_iter().cloned()).collect();
            instants.sort_by(|a, b| a.t.cmp(&b.t));
            let mut merged: Vec<TInstant<V>> = Vec::with_capacity(instants.len());
            for inst in instants {
                match merged.last() {
                    Some(last) if last.t == inst.t => {
                        if !last.value.eq_value(&inst.value) {
                            return Err(merge_error(&inst.t));
                        }
                    }
                    _ => merged.push(inst),
                }
            }
            if merged.len() == 1 {
                return Ok(merged.into_iter().next().map(Temporal::Instant));
            }
            return Ok(Some(Temporal::Sequence(TSequence::make(merged, true, true, Interpolation::Discrete, false)?)));
        }
        let interp = values
            .iter()
            .filter(|v| v.is_continuous())
            .map(|v| v.interp())
            .next()
            .unwrap_or_else(crate::temporal::default_interp::<V>);
        let mut pieces: Vec<TSequence<V>> = vec![];
        for v in values {
            if v.is_continuous() {
                if v.interp() != interp {
                    return Err(MeosError::value("The temporal values must have the same interpolation".to_string()));
                }
                pieces.extend(v.pieces());
            } else {
                pieces.extend(v.instants().into_iter().map(|i| TSequence::singleton(i.clone(), interp)));
            }
        }
        pieces.sort_by(|a, b| cmp_lower(&a.period(), &b.period()));
        let mut merged: Vec<TSequence<V>> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match merged.last_mut() {
                Some(last) if last.end_timestamp() > piece.start_timestamp() => {
                    return Err(merge_error(&piece.start_timestamp()));
                }
                Some(last) if last.end_timestamp() == piece.start_timestamp() && last.upper_inc && piece.lower_inc => {
                    if !last.end_instant().value.eq_value(&piece.start_instant().value) {
                        return Err(merge_error(&piece.start_timestamp()));
                    }
                    *last = overlap_join(last, &piece);
                }
                _ => merged.push(piece),
            }
        }
        let prefer_sequence = values.iter().all(|v| !matches!(v, Temporal::SequenceSet(_)));
        Ok(Temporal::from_pieces(merged, prefer_sequence))
    }

    /// Insert the values of `other`. With `connect`, the inserted pieces are
    /// connected to the neighbouring pieces of `self`.
    pub fn insert(&self, other: &Temporal<V>, connect: bool) -> Result<Temporal<V>> {
        let merged = self.merge(other)?;
        if !connect || !merged.is_continuous() {
            return Ok(merged);
        }
        let inserted = other.time();
        let from_other = |s: &TSequence<V>| inserted.overlaps(&s.period());
        let mut result: Vec<TSequence<V>> = vec![];
        for seq in merged.pieces() {
            match result.last_mut() {
                Some(last) if from_other(&*last) != from_other(&seq) => *last = bridge(&*last, &seq),
                _ => result.push(seq),
            }
        }
        Temporal::from_pieces(result, !matches!(merged, Temporal::SequenceSet(_)))
            .ok_or_else(|| MeosError::Internal("Empty insert result".into()))
    }

    /// Replace the values of `self` on the time of `other`.
    pub fn update(&self, other: &Temporal<V>, connect: bool) -> Result<Temporal<V>> {
        match self.minus_tstzspanset(&other.time()) {
            None => Ok(other.clone()),
            Some(rest) => rest.insert(other, connect),
        }
    }

    pub fn delete_timestamp(&self, t: &TimestampTz, connect: bool) -> Option<Temporal<V>> {
        self.delete_tstzspanset(&SpanSet::from_value(*t), connect)
    }

    pub fn delete_tstzset(&self, set: &Set<TimestampTz>, connect: bool) -> Option<Temporal<V>> {
        self.delete_tstzspanset(&SpanSet::from_set(set), connect)
    }

    pub fn delete_tstzspan(&self, span: &Span<TimestampTz>, connect: bool) -> Option<Temporal<V>> {
        self.delete_tstzspanset(&SpanSet::from_span(*span), connect)
    }

    /// Remove the values on a set of periods. With `connect`, the instants
    /// on both sides of each removed period are joined.
    pub fn delete_tstzspanset(&self, ss: &SpanSet<TimestampTz>, connect: bool) -> Option<Temporal<V>> {
        if !connect || !self.is_continuous() {
            return self.minus_tstzspanset(ss);
        }
        let mut pieces = vec![];
        for seq in self.pieces() {
            let kept: Vec<TInstant<V>> = seq.instants.iter().filter(|i| !ss.contains_value(&i.t)).cloned().collect();
            if kept.is_empty() {
                continue;
            }
            let lower_inc = if kept[0].t == seq.start_timestamp() { seq.lower_inc } else { true };
            let upper_inc = if kept[kept.len() - 1].t == seq.end_timestamp() { seq.upper_inc } else { true };
            pieces.push(TSequence::make_valid(kept, lower_inc, upper_inc, seq.interp, true));
        }
        Temporal::from_pieces(pieces, matches!(self, Temporal::Sequence(_)))
    }
}

fn merge_error(t: &TimestampTz) -> MeosError {
    MeosError::value(format!("The temporal values have different value at their overlapping instant {}", format_timestamp(t)))
}

/// Join two sequences sharing their boundary instant.
fn overlap_join<V: TemporalValue>(a: &TSequence<V>, b: &TSequence<V>) -> TSequence<V> {
    if b.num_instants() == 1 {
        return a.clone();
    }
    let interp = if a.num_instants() == 1 { b.interp } else { a.interp };
    let mut instants: Vec<TInstant<V>> = a.instants[..a.instants.len() - 1].to_vec();
    instants.extend(b.instants.iter().cloned());
    TSequence::make_valid(instants, a.lower_inc, b.upper_inc, interp, true)
}

/// Connect two consecutive sequences over the gap between them.
fn bridge<V: TemporalValue>(a: &TSequence<V>, b: &TSequence<V>) -> TSequence<V> {
    let interp = if a.num_instants() == 1 { b.interp } else { a.interp };
    let mut instants: Vec<TInstant<V>> = a.instants.clone();
    let skip = usize::from(a.end_timestamp() == b.start_timestamp());
    instants.extend(b.instants.iter().skip(skip).cloned());
    TSequence::make_valid(instants, a.lower_inc, b.upper_inc, interp, true)
}
