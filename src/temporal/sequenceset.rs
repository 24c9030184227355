use crate::catalog::Interpolation;
use crate::error::{MeosError, Result};
use crate::span::{Span, TstzSpan, cmp_lower};
use crate::spanset::SpanSet;
use crate::temporal::instant::TInstant;
use crate::temporal::sequence::{TSequence, join, joinable};
use crate::temporal::{BoundingBox, TemporalValue};
use crate::time::{TimestampTz, format_timestamp};

/// Time-disjoint continuous sequences sharing one interpolation.
#[derive(Debug, Clone)]
pub struct TSequenceSet<V: TemporalValue> {
    pub(crate) sequences: Vec<TSequence<V>>,
    pub(crate) bbox: V::BBox,
}

fn compute_bbox<V: TemporalValue>(sequences: &[TSequence<V>]) -> V::BBox {
    let mut bbox = sequences[0].bbox.clone();
    for seq in &sequences[1..] {
        bbox.merge_with(&seq.bbox);
    }
    let first = sequences[0].period();
    let last = sequences[sequences.len() - 1].period();
    bbox.set_period(first.hull(&last));
    bbox
}

fn join_all<V: TemporalValue>(sequences: Vec<TSequence<V>>) -> Vec<TSequence<V>> {
    let mut out: Vec<TSequence<V>> = Vec::with_capacity(sequences.len());
    for seq in sequences {
        match out.last_mut() {
            Some(last) if joinable(last, &seq) => *last = join(last, &seq),
            _ => out.push(seq),
        }
    }
    out
}

impl<V: TemporalValue> TSequenceSet<V> {
    /// Validate and build a sequence set. With `normalize`, sequences that
    /// can be joined are merged.
    pub fn make(sequences: Vec<TSequence<V>>, normalize: bool) -> Result<TSequenceSet<V>> {
        if sequences.is_empty() {
            return Err(MeosError::InvalidArg("A temporal sequence set must have at least one sequence".into()));
        }
        let interp = sequences.iter().find(|s| s.num_instants() > 1).map(|s| s.interp).unwrap_or(sequences[0].interp);
        for seq in &sequences {
            if seq.is_discrete() {
                return Err(MeosError::value("A sequence set cannot contain discrete sequences".to_string()));
            }
            if seq.num_instants() > 1 && seq.interp != interp {
                return Err(MeosError::value("The sequences of a sequence set must have the same interpolation".to_string()));
            }
        }
        for w in sequences.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            let (end, start) = (a.end_timestamp(), b.start_timestamp());
            if end > start || (end == start && a.upper_inc && b.lower_inc) {
                return Err(MeosError::value(format!(
                    "The temporal sequences have invalid bounds: {}, {}",
                    format_timestamp(&end),
                    format_timestamp(&start)
                )));
            }
            a.end_instant().value.check_compatible(&b.start_instant().value)?;
        }
        Ok(TSequenceSet::make_valid(sequences, normalize))
    }

    pub(crate) fn make_valid(sequences: Vec<TSequence<V>>, normalize: bool) -> TSequenceSet<V> {
        let interp = sequences.iter().find(|s| s.num_instants() > 1).map(|s| s.interp);
        // singletons take the interpolation of the set
        let sequences: Vec<TSequence<V>> = match interp {
            Some(interp) => sequences
                .into_iter()
                .map(|s| if s.interp != interp { TSequence::make_valid(s.instants, true, true, interp, false) } else { s })
                .collect(),
            None => sequences,
        };
        let sequences = if normalize { join_all(sequences) } else { sequences };
        let bbox = compute_bbox(&sequences);
        TSequenceSet { sequences, bbox }
    }

    /// Sort arbitrary time-disjoint pieces and join them. `None` when there
    /// are no pieces.
    pub(crate) fn from_pieces(mut pieces: Vec<TSequence<V>>) -> Option<TSequenceSet<V>> {
        if pieces.is_empty() {
            return None;
        }
        pieces.sort_by(|a, b| cmp_lower(&a.period(), &b.period()));
        Some(TSequenceSet::make_valid(pieces, true))
    }

    /// Split instants into sequences wherever the time gap exceeds `maxt` or
    /// the value distance exceeds `maxdist`.
    pub fn make_gaps(
        instants: Vec<TInstant<V>>,
        interp: Interpolation,
        maxt: Option<&crate::time::Interval>,
        maxdist: Option<f64>,
    ) -> Result<TSequenceSet<V>> {
        if instants.is_empty() {
            return Err(MeosError::InvalidArg("Cannot build a sequence set without instants".into()));
        }
        if interp == Interpolation::Discrete {
            return Err(MeosError::value("Sequence sets cannot have discrete interpolation".to_string()));
        }
        let mut sequences = vec![];
        let mut current: Vec<TInstant<V>> = vec![];
        for inst in instants {
            if let Some(prev) = current.last() {
                let time_gap = maxt.map(|m| (inst.t - prev.t).num_microseconds().unwrap_or(i64::MAX) > m.total_micros()).unwrap_or(false);
                let dist_gap = match (maxdist, prev.value.distance_to(&inst.value)) {
                    (Some(m), Some(d)) => d > m,
                    _ => false,
                };
                if time_gap || dist_gap {
                    sequences.push(TSequence::make(std::mem::take(&mut current), true, true, interp, true)?);
                }
            }
            current.push(inst);
        }
        sequences.push(TSequence::make(current, true, true, interp, true)?);
        TSequenceSet::make(sequences, true)
    }

    pub fn sequences(&self) -> &[TSequence<V>] {
        &self.sequences
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn bbox(&self) -> &V::BBox {
        &self.bbox
    }

    pub fn interp(&self) -> Interpolation {
        self.sequences.iter().find(|s| s.num_instants() > 1).map(|s| s.interp).unwrap_or(self.sequences[0].interp)
    }

    pub fn start_sequence(&self) -> &TSequence<V> {
        &self.sequences[0]
    }

    pub fn end_sequence(&self) -> &TSequence<V> {
        &self.sequences[self.sequences.len() - 1]
    }

    pub fn period(&self) -> TstzSpan {
        self.start_sequence().period().hull(&self.end_sequence().period())
    }

    pub fn time(&self) -> SpanSet<TimestampTz> {
        SpanSet::normalize(self.sequences.iter().map(|s| s.period()).collect::<Vec<Span<TimestampTz>>>())
    }

    pub fn instants(&self) -> Vec<&TInstant<V>> {
        self.sequences.iter().flat_map(|s| s.instants.iter()).collect()
    }

    pub fn num_instants(&self) -> usize {
        self.sequences.iter().map(|s| s.num_instants()).sum()
    }

    pub fn value_at(&self, t: &TimestampTz, strict: bool) -> Option<V> {
        let idx = self.sequences.partition_point(|s| s.end_timestamp() < *t);
        let candidates = self.sequences.get(idx..(idx + 2).min(self.sequences.len()))?;
        candidates
            .iter()
            .find_map(|s| s.value_at(t, true))
            .or_else(|| if strict { None } else { candidates.iter().find_map(|s| s.value_at(t, false)) })
    }

    pub(crate) fn map_times<F: Fn(&TimestampTz) -> Result<TimestampTz>>(&self, f: &F) -> Result<TSequenceSet<V>> {
        let sequences = self.sequences.iter().map(|s| s.map_times(f)).collect::<Result<Vec<_>>>()?;
        TSequenceSet::make(sequences, false)
    }
}

impl<V: TemporalValue> PartialEq for TSequenceSet<V> {
    fn eq(&self, other: &Self) -> bool {
        self.sequences == other.sequences
    }
}
