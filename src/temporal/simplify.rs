//! Simplification of continuous temporal values and detection of stops.
//!
//! All algorithms keep the first and last instant of every sequence and
//! only drop instants in between, so the time extent is preserved.

use crate::catalog::Interpolation;
use crate::error::{MeosError, Result};
use crate::temporal::{TInstant, TSequence, TSequenceSet, Temporal, TemporalValue};
use crate::time::{Interval, time_ratio};

fn value_distance<V: TemporalValue>(a: &V, b: &V) -> Result<f64> {
    a.distance_to(b)
        .ok_or_else(|| MeosError::InvalidArg(format!("The {} type has no distance", V::DATA_TYPE)))
}

/// Distance of an instant to the segment between two others. Synchronized
/// distances compare with the segment value at the same time.
fn segment_distance<V: TemporalValue>(inst: &TInstant<V>, a: &TInstant<V>, b: &TInstant<V>, synchronized: bool) -> Result<f64> {
    if !synchronized {
        if let Some(d) = inst.value.segment_distance(&a.value, &b.value) {
            return Ok(d);
        }
    }
    let ratio = time_ratio(&a.t, &b.t, &inst.t);
    value_distance(&inst.value, &a.value.interpolate(&b.value, ratio))
}

fn dp_split<V: TemporalValue>(
    instants: &[TInstant<V>],
    first: usize,
    last: usize,
    eps: f64,
    synchronized: bool,
    keep: &mut [bool],
) -> Result<()> {
    if last <= first + 1 {
        return Ok(());
    }
    let (mut split, mut max) = (first, -1.0);
    for k in first + 1..last {
        let d = segment_distance(&instants[k], &instants[first], &instants[last], synchronized)?;
        if d > max {
            split = k;
            max = d;
        }
    }
    if max > eps {
        keep[split] = true;
        dp_split(instants, first, split, eps, synchronized, keep)?;
        dp_split(instants, split, last, eps, synchronized, keep)?;
    }
    Ok(())
}

fn max_dist_keep<V: TemporalValue>(instants: &[TInstant<V>], eps: f64, synchronized: bool, keep: &mut [bool]) -> Result<()> {
    let n = instants.len();
    let mut anchor = 0;
    let mut end = 2;
    while end < n {
        let mut fits = true;
        for k in anchor + 1..end {
            if segment_distance(&instants[k], &instants[anchor], &instants[end], synchronized)? > eps {
                fits = false;
                break;
            }
        }
        if fits {
            end += 1;
        } else {
            keep[end - 1] = true;
            anchor = end - 1;
            end = anchor + 2;
        }
    }
    Ok(())
}

/// Keep the instants flagged by `select`, always including both ends.
fn simplify_seq<V: TemporalValue>(
    seq: &TSequence<V>,
    select: &dyn Fn(&[TInstant<V>], &mut [bool]) -> Result<()>,
) -> Result<TSequence<V>> {
    let n = seq.instants.len();
    if n <= 2 {
        return Ok(seq.clone());
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    select(&seq.instants, &mut keep)?;
    let instants: Vec<TInstant<V>> = seq.instants.iter().zip(keep).filter(|(_, k)| *k).map(|(i, _)| i.clone()).collect();
    Ok(TSequence::make_valid(instants, seq.lower_inc, seq.upper_inc, seq.interp, true))
}

impl<V: TemporalValue> Temporal<V> {
    fn simplify_with(&self, linear_only: bool, select: &dyn Fn(&[TInstant<V>], &mut [bool]) -> Result<()>) -> Result<Temporal<V>> {
        let applies = |s: &TSequence<V>| !linear_only || s.interp == Interpolation::Linear;
        Ok(match self {
            Temporal::Instant(_) => self.clone(),
            Temporal::Sequence(s) if !applies(s) => self.clone(),
            Temporal::Sequence(s) => Temporal::Sequence(simplify_seq(s, select)?),
            Temporal::SequenceSet(ss) if ss.interp() != Interpolation::Linear && linear_only => self.clone(),
            Temporal::SequenceSet(ss) => {
                let seqs = ss.sequences.iter().map(|s| simplify_seq(s, select)).collect::<Result<Vec<_>>>()?;
                Temporal::SequenceSet(TSequenceSet::make_valid(seqs, true))
            }
        })
    }

    /// Douglas-Peucker simplification of linear values: an instant is kept
    /// when it lies further than `eps` from the simplified segment.
    pub fn simplify_dp(&self, eps: f64, synchronized: bool) -> Result<Temporal<V>> {
        if eps < 0.0 {
            return Err(MeosError::value(format!("The distance must be non-negative: {}", eps)));
        }
        self.simplify_with(true, &|instants: &[TInstant<V>], keep: &mut [bool]| -> Result<()> {
            dp_split(instants, 0, instants.len() - 1, eps, synchronized, keep)
        })
    }

    /// Opening-window simplification of linear values: a segment is
    /// extended while every skipped instant stays within `eps` of it.
    pub fn simplify_max_dist(&self, eps: f64, synchronized: bool) -> Result<Temporal<V>> {
        if eps < 0.0 {
            return Err(MeosError::value(format!("The distance must be non-negative: {}", eps)));
        }
        self.simplify_with(true, &|instants: &[TInstant<V>], keep: &mut [bool]| -> Result<()> {
            max_dist_keep(instants, eps, synchronized, keep)
        })
    }

    /// Drop the instants closer than `dist` to the last kept one.
    pub fn simplify_min_dist(&self, dist: f64) -> Result<Temporal<V>> {
        if dist <= 0.0 {
            return Err(MeosError::value(format!("The distance must be positive: {}", dist)));
        }
        self.simplify_with(false, &|instants: &[TInstant<V>], keep: &mut [bool]| -> Result<()> {
            let mut last = 0;
            for k in 1..instants.len() - 1 {
                if value_distance(&instants[last].value, &instants[k].value)? > dist {
                    keep[k] = true;
                    last = k;
                }
            }
            Ok(())
        })
    }

    /// Drop the instants closer in time than `mint` to the last kept one.
    pub fn simplify_min_tdelta(&self, mint: &Interval) -> Result<Temporal<V>> {
        if !mint.is_positive() {
            return Err(MeosError::value(format!("The interval must be positive: {}", mint)));
        }
        let micros = mint.total_micros();
        self.simplify_with(false, &|instants: &[TInstant<V>], keep: &mut [bool]| -> Result<()> {
            let mut last = 0;
            for k in 1..instants.len() - 1 {
                if (instants[k].t - instants[last].t).num_microseconds().unwrap_or(i64::MAX) > micros {
                    keep[k] = true;
                    last = k;
                }
            }
            Ok(())
        })
    }

    /// Periods of at least `mindur` during which all values stay within
    /// `maxdist` of each other.
    pub fn stops(&self, maxdist: f64, mindur: &Interval) -> Result<Option<TSequenceSet<V>>> {
        if maxdist < 0.0 {
            return Err(MeosError::value(format!("The distance must be non-negative: {}", maxdist)));
        }
        if mindur.total_micros() < 0 {
            return Err(MeosError::value(format!("The duration must be non-negative: {}", mindur)));
        }
        if self.interp() == Interpolation::Discrete {
            return Err(MeosError::InvalidArg("Stops are only defined for continuous values".into()));
        }
        let min_micros = mindur.total_micros();
        let mut stops = vec![];
        for seq in self.pieces() {
            seq_stops(&seq, maxdist, min_micros, &mut stops)?;
        }
        if stops.is_empty() {
            return Ok(None);
        }
        Ok(Some(TSequenceSet::make_valid(stops, true)))
    }
}

fn seq_stops<V: TemporalValue>(seq: &TSequence<V>, maxdist: f64, min_micros: i64, stops: &mut Vec<TSequence<V>>) -> Result<()> {
    let instants = &seq.instants;
    let n = instants.len();
    let long_enough = |start: usize, end: usize| {
        end > start && (instants[end].t - instants[start].t).num_microseconds().unwrap_or(i64::MAX) >= min_micros
    };
    let fits = |start: usize, end: usize| -> Result<bool> {
        for k in start..end {
            if value_distance(&instants[k].value, &instants[end].value)? > maxdist {
                return Ok(false);
            }
        }
        Ok(true)
    };
    let mut start = 0;
    for end in 1..n {
        if fits(start, end)? {
            continue;
        }
        if long_enough(start, end - 1) {
            stops.push(TSequence::make_valid(instants[start..end].to_vec(), true, true, seq.interp, true));
            start = end;
        } else {
            while !fits(start, end)? {
                start += 1;
            }
        }
    }
    if n > 0 && long_enough(start, n - 1) {
        stops.push(TSequence::make_valid(instants[start..n].to_vec(), true, true, seq.interp, true));
    }
    Ok(())
}
