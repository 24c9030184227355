//! Temporal precision and sampling on a regular time grid.

use crate::bins::{duration_micros, time_bin, time_bin_starts};
use crate::catalog::Interpolation;
use crate::error::{MeosError, Result};
use crate::span::Span;
use crate::temporal::tnumber::NumberValue;
use crate::temporal::{TInstant, TSequence, Temporal, TemporalValue};
use crate::time::{Interval, TimestampTz, add_micros};

impl<V: TemporalValue> Temporal<V> {
    /// Value averaged over every time bin, located at the start of the bin.
    /// Bins without values leave a gap in the result.
    pub(crate) fn tprecision_with(
        &self,
        duration: &Interval,
        origin: &TimestampTz,
        average: &dyn Fn(&Temporal<V>) -> Result<V>,
    ) -> Result<Temporal<V>> {
        let size = duration_micros(duration)?;
        if let Temporal::Instant(i) = self {
            return Ok(Temporal::Instant(i.with_time(time_bin(&i.t, duration, origin)?)));
        }
        let interp = self.interp();
        let period = self.tstzspan();
        let mut pieces = vec![];
        let mut current: Vec<TInstant<V>> = vec![];
        for start in time_bin_starts(&period.lower, &period.upper, duration, origin)? {
            let bin = Span { lower: start, upper: add_micros(&start, size)?, lower_inc: true, upper_inc: false };
            match self.at_tstzspan(&bin) {
                Some(fragment) => current.push(TInstant::make(average(&fragment)?, start)),
                None if interp != Interpolation::Discrete && !current.is_empty() => {
                    pieces.push(TSequence::make_valid(std::mem::take(&mut current), true, true, interp, true));
                }
                None => {}
            }
        }
        if !current.is_empty() {
            pieces.push(TSequence::make_valid(current, true, true, interp, interp != Interpolation::Discrete));
        }
        Temporal::from_pieces(pieces, true).ok_or_else(|| MeosError::Internal("Empty precision result".into()))
    }

    /// Values at the timestamps of the grid of `duration` anchored at
    /// `origin`, connected with `interp`. Consecutive samples taken from
    /// different sequences are not connected.
    pub fn tsample(&self, duration: &Interval, origin: &TimestampTz, interp: Interpolation) -> Result<Option<Temporal<V>>> {
        if interp == Interpolation::Linear && !V::CONTINUOUS {
            return Err(MeosError::value(format!("The {} type does not support linear interpolation", V::DATA_TYPE)));
        }
        let size = duration_micros(duration)?;
        let period = self.tstzspan();
        let mut t = time_bin(&period.lower, duration, origin)?;
        if t < period.lower {
            t = add_micros(&t, size)?;
        }
        if let Temporal::Instant(i) = self {
            return Ok(if t == i.t { Some(self.clone()) } else { None });
        }
        let seqs = self.pieces();
        let mut pieces = vec![];
        let mut current: Vec<TInstant<V>> = vec![];
        let mut current_piece = None;
        while t <= period.upper {
            let piece = seqs.iter().position(|s| s.value_at(&t, true).is_some());
            match piece {
                Some(k) => {
                    if interp != Interpolation::Discrete && current_piece != Some(k) && !current.is_empty() {
                        pieces.push(TSequence::make_valid(std::mem::take(&mut current), true, true, interp, true));
                    }
                    if let Some(v) = seqs[k].value_at(&t, true) {
                        current.push(TInstant::make(v, t));
                    }
                    current_piece = Some(k);
                }
                None if interp != Interpolation::Discrete && !current.is_empty() => {
                    pieces.push(TSequence::make_valid(std::mem::take(&mut current), true, true, interp, true));
                    current_piece = None;
                }
                None => {}
            }
            t = add_micros(&t, size)?;
        }
        if !current.is_empty() {
            pieces.push(TSequence::make_valid(current, true, true, interp, interp != Interpolation::Discrete));
        }
        Ok(Temporal::from_pieces(pieces, true))
    }
}

impl<V: NumberValue> Temporal<V> {
    /// Time-weighted average of every time bin of `duration`, located at the
    /// start of the bin.
    pub fn tprecision(&self, duration: &Interval, origin: &TimestampTz) -> Result<Temporal<V>> {
        self.tprecision_with(duration, origin, &|fragment: &Temporal<V>| -> Result<V> { Ok(V::from_f64(fragment.twavg())) })
    }
}
