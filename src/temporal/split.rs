//! Fragmentation of temporal values into time and value bins, and their
//! coarse bounding boxes.

use crate::bins::{duration_micros, time_bin_starts, value_bin_starts};
use crate::error::{MeosError, Result};
use crate::span::{Span, TstzSpan};
use crate::tbox::TBox;
use crate::temporal::tnumber::NumberValue;
use crate::temporal::{BoundingBox, Temporal, TemporalValue};
use crate::time::{Interval, TimestampTz, add_micros};

/// Group consecutive boxes into at most `n` boxes of about the same number
/// of elements.
pub(crate) fn merge_n_boxes<B: Clone, F: Fn(&mut B, &B)>(boxes: Vec<B>, n: usize, merge: F) -> Result<Vec<B>> {
    if n == 0 {
        return Err(MeosError::value("The number of boxes must be positive".to_string()));
    }
    if boxes.len() <= n {
        return Ok(boxes);
    }
    let size = boxes.len() / n;
    let remainder = boxes.len() % n;
    let mut result = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let len = size + usize::from(i < remainder);
        let mut acc = boxes[start].clone();
        for b in &boxes[start + 1..start + len] {
            merge(&mut acc, b);
        }
        result.push(acc);
        start += len;
    }
    Ok(result)
}

impl<V: TemporalValue> Temporal<V> {
    /// Box of every instant of a discrete value and of every segment of a
    /// continuous one, in time order.
    pub(crate) fn segment_boxes(&self) -> Vec<V::BBox> {
        let mut boxes = vec![];
        for seq in self.pieces() {
            if seq.is_discrete() || seq.instants.len() == 1 {
                boxes.extend(seq.instants.iter().map(|i| <V::BBox as BoundingBox<V>>::from_instant(&i.value, &i.t)));
                continue;
            }
            for w in seq.instants.windows(2) {
                let (a, b) = (&w[0], &w[1]);
                let bbox = if seq.interp == crate::catalog::Interpolation::Linear {
                    <V::BBox as BoundingBox<V>>::from_segment(&a.value, &b.value, &a.t, &b.t)
                } else {
                    let mut bbox = <V::BBox as BoundingBox<V>>::from_instant(&a.value, &a.t);
                    bbox.merge_with(&<V::BBox as BoundingBox<V>>::from_instant(&a.value, &b.t));
                    bbox
                };
                boxes.push(bbox);
            }
        }
        boxes
    }

    /// At most `n` boxes covering the value, each merging consecutive
    /// segments.
    pub fn split_n_bboxes(&self, n: usize) -> Result<Vec<V::BBox>> {
        merge_n_boxes(self.segment_boxes(), n, |acc: &mut V::BBox, b: &V::BBox| acc.merge_with(b))
    }

    /// At most `n` periods covering the time of the value.
    pub fn split_n_spans(&self, n: usize) -> Result<Vec<TstzSpan>> {
        let spans: Vec<TstzSpan> = self.segment_boxes().iter().map(|b| b.tstzspan()).collect();
        merge_n_boxes(spans, n, |acc: &mut TstzSpan, b: &TstzSpan| *acc = acc.hull(b))
    }

    /// Fragments of the value in each time bin of `duration` anchored at
    /// `origin`, with the start of their bin.
    pub fn time_split(&self, duration: &Interval, origin: &TimestampTz) -> Result<(Vec<Temporal<V>>, Vec<TimestampTz>)> {
        let size = duration_micros(duration)?;
        let period = self.tstzspan();
        let mut fragments = vec![];
        let mut starts = vec![];
        for start in time_bin_starts(&period.lower, &period.upper, duration, origin)? {
            let bin = Span { lower: start, upper: add_micros(&start, size)?, lower_inc: true, upper_inc: false };
            if let Some(fragment) = self.at_tstzspan(&bin) {
                fragments.push(fragment);
                starts.push(start);
            }
        }
        Ok((fragments, starts))
    }

    /// Time bins intersecting the value.
    pub fn time_bins(&self, duration: &Interval, origin: &TimestampTz) -> Result<Vec<TstzSpan>> {
        let size = duration_micros(duration)?;
        let (_, starts) = self.time_split(duration, origin)?;
        starts
            .into_iter()
            .map(|s| add_micros(&s, size).map(|upper| Span { lower: s, upper, lower_inc: true, upper_inc: false }))
            .collect()
    }
}

impl<V: NumberValue> Temporal<V> {
    /// Fragments of the value in each value bin of `size` anchored at
    /// `origin`, with the start of their bin.
    pub fn value_split(&self, size: V, origin: V) -> Result<(Vec<Temporal<V>>, Vec<V>)> {
        let span = self.value_span();
        let mut fragments = vec![];
        let mut starts = vec![];
        for start in value_bin_starts(span.lower(), span.upper(), size, origin)? {
            if let Some(fragment) = self.at_span(&span.bin_at(start, size)) {
                fragments.push(fragment);
                starts.push(start);
            }
        }
        Ok((fragments, starts))
    }

    /// Fragments in each tile of the value and time grid, with the value and
    /// time start of their tile.
    #[allow(clippy::type_complexity)]
    pub fn value_time_split(
        &self,
        size: V,
        duration: &Interval,
        vorigin: V,
        torigin: &TimestampTz,
    ) -> Result<(Vec<Temporal<V>>, Vec<V>, Vec<TimestampTz>)> {
        let (by_value, vstarts) = self.value_split(size, vorigin)?;
        let mut fragments = vec![];
        let mut values = vec![];
        let mut times = vec![];
        for (fragment, vstart) in by_value.iter().zip(vstarts) {
            let (pieces, tstarts) = fragment.time_split(duration, torigin)?;
            for (piece, tstart) in pieces.into_iter().zip(tstarts) {
                fragments.push(piece);
                values.push(vstart);
                times.push(tstart);
            }
        }
        Ok((fragments, values, times))
    }

    /// Value bins intersecting the value.
    pub fn value_bins(&self, size: V, origin: V) -> Result<Vec<Span<V>>> {
        let span = self.value_span();
        let (_, starts) = self.value_split(size, origin)?;
        Ok(starts.into_iter().map(|s| span.bin_at(s, size)).collect())
    }

    /// Boxes of the fragments of every time bin.
    pub fn time_boxes(&self, duration: &Interval, origin: &TimestampTz) -> Result<Vec<TBox>> {
        Ok(self.time_split(duration, origin)?.0.iter().map(|f| f.tbox()).collect())
    }

    /// Boxes of the fragments of every value bin.
    pub fn value_boxes(&self, size: V, origin: V) -> Result<Vec<TBox>> {
        Ok(self.value_split(size, origin)?.0.iter().map(|f| f.tbox()).collect())
    }

    /// Boxes of the fragments of every tile of the value and time grid.
    pub fn value_time_boxes(&self, size: V, duration: &Interval, vorigin: V, torigin: &TimestampTz) -> Result<Vec<TBox>> {
        Ok(self.value_time_split(size, duration, vorigin, torigin)?.0.iter().map(|f| f.tbox()).collect())
    }

    /// At most `n` boxes covering the value.
    pub fn split_n_tboxes(&self, n: usize) -> Result<Vec<TBox>> {
        self.split_n_bboxes(n)
    }
}
