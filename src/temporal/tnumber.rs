//! Temporal numbers: arithmetic, value restrictions through boxes,
//! distances and the integral-based aggregates.

use crate::catalog::Interpolation;
use crate::datatype::NumberBase;
use crate::error::{MeosError, Result};
use crate::span::Span;
use crate::spanset::SpanSet;
use crate::tbox::{NumSpan, TBox};
use crate::temporal::lift::{LiftOp, float_crossing, lift_base, lift1, lift2};
use crate::temporal::{TFloat, TInstant, TInt, TSequence, Temporal, TemporalValue};
use crate::time::seconds_between;

/// Base values of temporal numbers.
pub trait NumberValue: TemporalValue<BBox = TBox> + NumberBase {
    fn to_num_span(span: Span<Self>) -> NumSpan;
    fn from_num_span(span: &NumSpan) -> Result<Span<Self>>;
}

impl NumberValue for i32 {
    fn to_num_span(span: Span<i32>) -> NumSpan {
        NumSpan::Int(span)
    }
    fn from_num_span(span: &NumSpan) -> Result<Span<i32>> {
        match span {
            NumSpan::Int(s) => Ok(*s),
            NumSpan::Float(s) => s.to_intspan(),
        }
    }
}

impl NumberValue for f64 {
    fn to_num_span(span: Span<f64>) -> NumSpan {
        NumSpan::Float(span)
    }
    fn from_num_span(span: &NumSpan) -> Result<Span<f64>> {
        Ok(span.to_float())
    }
}

/// Ratio where the product of two linear segments reaches an extremum.
fn mult_turning_point<V: NumberBase>(a1: &V, a2: &V, b1: &V, b2: &V) -> Vec<f64> {
    let (a1, b1) = (a1.to_f64(), b1.to_f64());
    let (da, db) = (a2.to_f64() - a1, b2.to_f64() - b1);
    if da == 0.0 || db == 0.0 {
        return vec![];
    }
    vec![-(da * b1 + db * a1) / (2.0 * da * db)]
}

fn distance_breaks<V: NumberBase>(a1: &V, a2: &V, b1: &V, b2: &V) -> Vec<f64> {
    float_crossing(a1.to_f64(), a2.to_f64(), b1.to_f64(), b2.to_f64())
}

fn seq_integral<V: NumberValue>(seq: &TSequence<V>) -> f64 {
    if seq.is_discrete() {
        return 0.0;
    }
    seq.instants
        .windows(2)
        .map(|w| {
            let dt = (w[1].t - w[0].t).num_microseconds().unwrap_or(0) as f64;
            let (v1, v2) = (w[0].value.to_f64(), w[1].value.to_f64());
            if seq.interp == Interpolation::Linear { (v1 + v2) / 2.0 * dt } else { v1 * dt }
        })
        .sum()
}

impl<V: NumberValue> Temporal<V> {
    /// Smallest span holding every value.
    pub fn value_span(&self) -> Span<V> {
        let (lo, hi) = (self.min_value(), self.max_value());
        Span::make(lo, hi, true, true).unwrap_or_else(|_| Span::from_value(lo))
    }

    /// Values taken over time, as spans.
    pub fn value_spanset(&self) -> SpanSet<V> {
        let mut spans: Vec<Span<V>> = vec![];
        for seq in self.pieces() {
            if seq.interp == Interpolation::Linear && seq.num_instants() > 1 {
                for w in seq.instants.windows(2) {
                    let (a, b) = if w[0].value <= w[1].value { (w[0].value, w[1].value) } else { (w[1].value, w[0].value) };
                    spans.push(Span::make(a, b, true, true).unwrap_or_else(|_| Span::from_value(a)));
                }
            } else {
                spans.extend(seq.instants.iter().map(|i| Span::from_value(i.value)));
            }
        }
        SpanSet::normalize(spans)
    }

    /// Bounding box with the value span of the number type.
    pub fn tbox(&self) -> TBox {
        self.bbox()
    }

    pub fn at_tbox(&self, bbox: &TBox) -> Option<Temporal<V>> {
        let mut result = self.clone();
        if let Some(span) = bbox.span {
            let span = V::from_num_span(&span).ok()?;
            result = result.at_span(&span)?;
        }
        if let Some(period) = bbox.period {
            result = result.at_tstzspan(&period)?;
        }
        Some(result)
    }

    pub fn minus_tbox(&self, bbox: &TBox) -> Option<Temporal<V>> {
        self.minus_restriction(self.at_tbox(bbox))
    }

    fn arith_base(&self, value: V, func: &dyn Fn(&V, &V) -> Result<V>) -> Result<Temporal<V>> {
        lift_base(self, &value, &LiftOp::new(func).linear())
    }

    pub fn add_value(&self, value: V) -> Result<Temporal<V>> {
        self.arith_base(value, &|a: &V, b: &V| -> Result<V> { a.add(b) })
    }

    pub fn sub_value(&self, value: V) -> Result<Temporal<V>> {
        self.arith_base(value, &|a: &V, b: &V| -> Result<V> { a.sub(b) })
    }

    /// `value - self`.
    pub fn value_sub(&self, value: V) -> Result<Temporal<V>> {
        self.arith_base(value, &|a: &V, b: &V| -> Result<V> { b.sub(a) })
    }

    pub fn mul_value(&self, value: V) -> Result<Temporal<V>> {
        self.arith_base(value, &|a: &V, b: &V| -> Result<V> { a.mul(b) })
    }

    pub fn div_value(&self, value: V) -> Result<Temporal<V>> {
        if value.is_zero() {
            return Err(MeosError::DivisionByZero);
        }
        self.arith_base(value, &|a: &V, b: &V| -> Result<V> { a.div(b) })
    }

    /// `value / self`.
    pub fn value_div(&self, value: V) -> Result<Temporal<V>> {
        if self.ever_eq(&V::zero()) {
            return Err(MeosError::DivisionByZero);
        }
        self.arith_base(value, &|a: &V, b: &V| -> Result<V> { b.div(a) })
    }

    pub fn add(&self, other: &Temporal<V>) -> Result<Option<Temporal<V>>> {
        lift2(self, other, &LiftOp::new(&|a: &V, b: &V| -> Result<V> { a.add(b) }).linear())
    }

    pub fn sub(&self, other: &Temporal<V>) -> Result<Option<Temporal<V>>> {
        lift2(self, other, &LiftOp::new(&|a: &V, b: &V| -> Result<V> { a.sub(b) }).linear())
    }

    /// Product; linear segments are evaluated at the extremum of the
    /// product as well.
    pub fn mul(&self, other: &Temporal<V>) -> Result<Option<Temporal<V>>> {
        let func = |a: &V, b: &V| -> Result<V> { a.mul(b) };
        let breaks = |a1: &V, a2: &V, b1: &V, b2: &V| mult_turning_point(a1, a2, b1, b2);
        lift2(self, other, &LiftOp::new(&func).linear().with_breaks(&breaks))
    }

    pub fn div(&self, other: &Temporal<V>) -> Result<Option<Temporal<V>>> {
        let common = match self.at_tstzspanset(&other.time()) {
            Some(_) => other.at_tstzspanset(&self.time()),
            None => None,
        };
        if common.map(|c| c.ever_eq(&V::zero())).unwrap_or(false) {
            return Err(MeosError::DivisionByZero);
        }
        lift2(self, other, &LiftOp::new(&|a: &V, b: &V| -> Result<V> { a.div(b) }).linear())
    }

    pub fn abs(&self) -> Result<Temporal<V>> {
        lift1(
            self,
            &|v: &V| -> Result<V> { v.abs() },
            true,
            Some(&|a: &V, b: &V| float_crossing(a.to_f64(), b.to_f64(), 0.0, 0.0)),
        )
    }

    pub fn shift_value(&self, shift: V) -> Result<Temporal<V>> {
        self.shift_scale_value(Some(shift), None)
    }

    pub fn scale_value(&self, width: V) -> Result<Temporal<V>> {
        self.shift_scale_value(None, Some(width))
    }

    /// Shift the values and/or scale their extent to `width`.
    pub fn shift_scale_value(&self, shift: Option<V>, width: Option<V>) -> Result<Temporal<V>> {
        if let Some(w) = width {
            if w.to_f64() <= 0.0 {
                return Err(MeosError::value("The width must be a positive number".to_string()));
            }
        }
        let (lo, hi) = (self.min_value().to_f64(), self.max_value().to_f64());
        let ratio = match width {
            Some(w) if hi > lo => w.to_f64() / (hi - lo),
            _ => 1.0,
        };
        let delta = shift.map(|s| s.to_f64()).unwrap_or(0.0);
        self.map_values(|v| V::checked_from_f64(lo + (v.to_f64() - lo) * ratio + delta))
    }

    /// Difference between consecutive values, held until the next instant.
    pub fn delta_value(&self) -> Result<Option<Temporal<V>>> {
        let mut pieces = vec![];
        for seq in self.pieces() {
            let n = seq.num_instants();
            if n < 2 || seq.is_discrete() {
                continue;
            }
            let mut instants: Vec<TInstant<V>> = seq
                .instants
                .windows(2)
                .map(|w| Ok(TInstant::make(w[1].value.sub(&w[0].value)?, w[0].t)))
                .collect::<Result<Vec<_>>>()?;
            let last = instants[n - 2].value;
            instants.push(TInstant::make(last, seq.end_timestamp()));
            pieces.push(TSequence::make_valid(instants, seq.lower_inc, false, Interpolation::Step, true));
        }
        Ok(Temporal::from_pieces(pieces, matches!(self, Temporal::Sequence(_))))
    }

    /// Area under the curve, with time in microseconds.
    pub fn integral(&self) -> f64 {
        self.pieces().iter().map(|s| seq_integral(s)).sum()
    }

    /// Time-weighted average. Values without duration are averaged
    /// arithmetically.
    pub fn twavg(&self) -> f64 {
        let duration = self.duration(true).total_micros() as f64;
        if duration == 0.0 {
            let instants = self.instants();
            let sum: f64 = instants.iter().map(|i| i.value.to_f64()).sum();
            return sum / instants.len() as f64;
        }
        self.integral() / duration
    }

    /// Temporal distance to a number.
    pub fn tdistance_value(&self, value: V) -> Result<Temporal<V>> {
        let func = |a: &V, b: &V| -> Result<V> { a.sub(b)?.abs() };
        let breaks = |a1: &V, a2: &V, b1: &V, b2: &V| distance_breaks(a1, a2, b1, b2);
        lift_base(self, &value, &LiftOp::new(&func).linear().with_breaks(&breaks))
    }

    pub fn tdistance(&self, other: &Temporal<V>) -> Result<Option<Temporal<V>>> {
        let func = |a: &V, b: &V| -> Result<V> { a.sub(b)?.abs() };
        let breaks = |a1: &V, a2: &V, b1: &V, b2: &V| distance_breaks(a1, a2, b1, b2);
        lift2(self, other, &LiftOp::new(&func).linear().with_breaks(&breaks))
    }

    pub fn nearest_approach_distance_value(&self, value: V) -> Result<f64> {
        Ok(self.tdistance_value(value)?.min_value().to_f64())
    }

    /// Smallest distance at a common time, `None` when there is none.
    pub fn nearest_approach_distance(&self, other: &Temporal<V>) -> Result<Option<f64>> {
        Ok(self.tdistance(other)?.map(|d| d.min_value().to_f64()))
    }
}

impl Temporal<f64> {
    /// Rate of change per second, constant between instants.
    pub fn derivative(&self) -> Result<Option<TFloat>> {
        if self.interp() != Interpolation::Linear || matches!(self, Temporal::Instant(_)) {
            return Err(MeosError::InvalidArg("The temporal value must have linear interpolation".into()));
        }
        let mut pieces = vec![];
        for seq in self.pieces() {
            let n = seq.num_instants();
            if n < 2 {
                continue;
            }
            let mut instants: Vec<TInstant<f64>> = seq
                .instants
                .windows(2)
                .map(|w| TInstant::make((w[1].value - w[0].value) / seconds_between(&w[0].t, &w[1].t), w[0].t))
                .collect();
            let last = instants[n - 2].value;
            instants.push(TInstant::make(last, seq.end_timestamp()));
            pieces.push(TSequence::make_valid(instants, seq.lower_inc, seq.upper_inc, Interpolation::Step, true));
        }
        Ok(Temporal::from_pieces(pieces, matches!(self, Temporal::Sequence(_))))
    }

    pub fn to_tint(&self) -> Result<TInt> {
        if self.interp() == Interpolation::Linear && self.num_instants() > 1 {
            return Err(MeosError::InvalidArg(
                "Cannot convert a temporal float with linear interpolation to a temporal integer".into(),
            ));
        }
        self.map_values(|v| Ok(*v as i32))
    }

    pub fn ceil(&self) -> Result<TFloat> {
        self.map_values(|v| Ok(v.ceil()))
    }

    pub fn floor(&self) -> Result<TFloat> {
        self.map_values(|v| Ok(v.floor()))
    }

    /// Radians to degrees, optionally normalized to `[0, 360)`.
    pub fn degrees(&self, normalize: bool) -> Result<TFloat> {
        self.map_values(|v| {
            let d = v.to_degrees();
            Ok(if normalize { d.rem_euclid(360.0) } else { d })
        })
    }

    pub fn radians(&self) -> Result<TFloat> {
        self.map_values(|v| Ok(v.to_radians()))
    }

    pub fn exp(&self) -> Result<TFloat> {
        self.map_values(|v| Ok(v.exp()))
    }

    pub fn ln(&self) -> Result<TFloat> {
        self.map_values(|v| {
            if *v <= 0.0 {
                return Err(MeosError::InvalidArgValue("Cannot take logarithm of a non-positive number".into()));
            }
            Ok(v.ln())
        })
    }

    pub fn log10(&self) -> Result<TFloat> {
        self.map_values(|v| {
            if *v <= 0.0 {
                return Err(MeosError::InvalidArgValue("Cannot take logarithm of a non-positive number".into()));
            }
            Ok(v.log10())
        })
    }
}

impl Temporal<i32> {
    pub fn to_tfloat(&self) -> Result<TFloat> {
        self.map_values(|v| Ok(*v as f64))
    }
}

impl Temporal<bool> {
    pub fn to_tint(&self) -> Result<TInt> {
        self.map_values(|v| Ok(i32::from(*v)))
    }
}
