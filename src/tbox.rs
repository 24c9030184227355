//! Temporal boxes: an optional number span times an optional period.

use std::cmp::Ordering;

use crate::catalog::MeosType;
use crate::error::{MeosError, Result};
use crate::set::Set;
use crate::span::{
    Span, TstzSpan, span_adjacent, span_contains, span_left, span_overlaps, span_overleft, span_overright,
};
use crate::spanset::SpanSet;
use crate::time::{Interval, TimestampTz};

/// Value extent of a temporal box, integer or float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumSpan {
    Int(Span<i32>),
    Float(Span<f64>),
}

impl NumSpan {
    pub fn span_type(&self) -> MeosType {
        match self {
            NumSpan::Int(_) => MeosType::IntSpan,
            NumSpan::Float(_) => MeosType::FloatSpan,
        }
    }

    /// The span as floats, used when comparing mixed boxes.
    pub fn to_float(&self) -> Span<f64> {
        match self {
            NumSpan::Int(s) => s.to_floatspan(),
            NumSpan::Float(s) => *s,
        }
    }

    fn hull(&self, other: &NumSpan) -> NumSpan {
        match (self, other) {
            (NumSpan::Int(a), NumSpan::Int(b)) => NumSpan::Int(a.hull(b)),
            (a, b) => NumSpan::Float(a.to_float().hull(&b.to_float())),
        }
    }

    fn intersect(&self, other: &NumSpan) -> Option<NumSpan> {
        match (self, other) {
            (NumSpan::Int(a), NumSpan::Int(b)) => a.intersect_span(b).map(NumSpan::Int),
            (a, b) => a.to_float().intersect_span(&b.to_float()).map(NumSpan::Float),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TBox {
    pub(crate) span: Option<NumSpan>,
    pub(crate) period: Option<TstzSpan>,
}

impl TBox {
    pub fn make(span: Option<NumSpan>, period: Option<TstzSpan>) -> Result<TBox> {
        if span.is_none() && period.is_none() {
            return Err(MeosError::InvalidArg("A temporal box must have a value or a time dimension".into()));
        }
        Ok(TBox { span, period })
    }

    pub fn from_int(value: i32) -> TBox {
        TBox { span: Some(NumSpan::Int(Span::from_value(value))), period: None }
    }

    pub fn from_float(value: f64) -> TBox {
        TBox { span: Some(NumSpan::Float(Span::from_value(value))), period: None }
    }

    pub fn from_intspan(span: Span<i32>) -> TBox {
        TBox { span: Some(NumSpan::Int(span)), period: None }
    }

    pub fn from_floatspan(span: Span<f64>) -> TBox {
        TBox { span: Some(NumSpan::Float(span)), period: None }
    }

    pub fn from_timestamp(t: TimestampTz) -> TBox {
        TBox { span: None, period: Some(Span::from_value(t)) }
    }

    pub fn from_tstzspan(period: TstzSpan) -> TBox {
        TBox { span: None, period: Some(period) }
    }

    pub fn from_tstzset(set: &Set<TimestampTz>) -> TBox {
        TBox::from_tstzspan(set.span())
    }

    pub fn from_tstzspanset(ss: &SpanSet<TimestampTz>) -> TBox {
        TBox::from_tstzspan(ss.span())
    }

    pub fn from_intset(set: &Set<i32>) -> TBox {
        TBox::from_intspan(set.span())
    }

    pub fn from_floatset(set: &Set<f64>) -> TBox {
        TBox::from_floatspan(set.span())
    }

    pub fn from_int_timestamp(value: i32, t: TimestampTz) -> TBox {
        TBox { span: Some(NumSpan::Int(Span::from_value(value))), period: Some(Span::from_value(t)) }
    }

    pub fn from_float_timestamp(value: f64, t: TimestampTz) -> TBox {
        TBox { span: Some(NumSpan::Float(Span::from_value(value))), period: Some(Span::from_value(t)) }
    }

    pub fn from_span_tstzspan(span: NumSpan, period: TstzSpan) -> TBox {
        TBox { span: Some(span), period: Some(period) }
    }

    pub fn hasx(&self) -> bool {
        self.span.is_some()
    }
    pub fn hast(&self) -> bool {
        self.period.is_some()
    }
    pub fn span(&self) -> Option<NumSpan> {
        self.span
    }
    pub fn period(&self) -> Option<TstzSpan> {
        self.period
    }
    pub fn xmin(&self) -> Option<f64> {
        self.span.map(|s| s.to_float().lower_bound())
    }
    pub fn xmax(&self) -> Option<f64> {
        self.span.map(|s| match s {
            NumSpan::Int(i) => i.upper() as f64,
            NumSpan::Float(f) => f.upper_bound(),
        })
    }
    pub fn xmin_inc(&self) -> Option<bool> {
        self.span.map(|s| s.to_float().lower_inc())
    }
    pub fn xmax_inc(&self) -> Option<bool> {
        self.span.map(|s| match s {
            NumSpan::Int(_) => true,
            NumSpan::Float(f) => f.upper_inc(),
        })
    }
    pub fn tmin(&self) -> Option<TimestampTz> {
        self.period.map(|p| p.lower_bound())
    }
    pub fn tmax(&self) -> Option<TimestampTz> {
        self.period.map(|p| p.upper_bound())
    }
    pub fn tmin_inc(&self) -> Option<bool> {
        self.period.map(|p| p.lower_inc())
    }
    pub fn tmax_inc(&self) -> Option<bool> {
        self.period.map(|p| p.upper_inc())
    }

    /// Smallest box containing both boxes.
    pub fn expand(&self, other: &TBox) -> TBox {
        let span = match (self.span, other.span) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
        let period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
        TBox { span, period }
    }

    pub fn expand_value(&self, delta: f64) -> Result<TBox> {
        let span = match self.span {
            Some(NumSpan::Int(s)) => NumSpan::Int(s.expand(delta.round() as i32)?),
            Some(NumSpan::Float(s)) => NumSpan::Float(s.expand(delta)?),
            None => return Err(MeosError::InvalidArg("The box has no value dimension".into())),
        };
        Ok(TBox { span: Some(span), period: self.period })
    }

    pub fn expand_time(&self, interval: &Interval) -> Result<TBox> {
        match self.period {
            Some(p) => Ok(TBox { span: self.span, period: Some(p.expand_time(interval)?) }),
            None => Err(MeosError::InvalidArg("The box has no time dimension".into())),
        }
    }

    pub fn shift_scale_value(&self, shift: Option<f64>, width: Option<f64>) -> Result<TBox> {
        let span = match self.span {
            Some(NumSpan::Int(s)) => NumSpan::Int(s.shift_scale(shift.map(|v| v.round() as i32), width.map(|v| v.round() as i32))?),
            Some(NumSpan::Float(s)) => NumSpan::Float(s.shift_scale(shift, width)?),
            None => return Err(MeosError::InvalidArg("The box has no value dimension".into())),
        };
        Ok(TBox { span: Some(span), period: self.period })
    }

    pub fn shift_scale_time(&self, shift: Option<&Interval>, duration: Option<&Interval>) -> Result<TBox> {
        match self.period {
            Some(p) => Ok(TBox { span: self.span, period: Some(p.shift_scale_time(shift, duration)?) }),
            None => Err(MeosError::InvalidArg("The box has no time dimension".into())),
        }
    }

    pub fn round(&self, maxdd: usize) -> Result<TBox> {
        let span = match self.span {
            Some(NumSpan::Float(s)) => Some(NumSpan::Float(s.round(maxdd)?)),
            other => other,
        };
        Ok(TBox { span, period: self.period })
    }

    /// Union of two boxes; with `strict` the boxes must overlap.
    pub fn union(&self, other: &TBox, strict: bool) -> Result<TBox> {
        if self.hasx() != other.hasx() || self.hast() != other.hast() {
            return Err(MeosError::InvalidArg("The boxes must be of the same dimensionality".into()));
        }
        if strict && !self.overlaps(other) {
            return Err(MeosError::value("The result of the union of the boxes would not be contiguous".to_string()));
        }
        Ok(self.expand(other))
    }

    pub fn intersection(&self, other: &TBox) -> Option<TBox> {
        let span = match (self.span, other.span) {
            (Some(a), Some(b)) => Some(a.intersect(&b)?),
            _ => None,
        };
        let period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.intersect_span(&b)?),
            _ => None,
        };
        if span.is_none() && period.is_none() { None } else { Some(TBox { span, period }) }
    }

    fn common<F, G>(&self, other: &TBox, fx: F, ft: G) -> bool
    where
        F: Fn(&Span<f64>, &Span<f64>) -> bool,
        G: Fn(&TstzSpan, &TstzSpan) -> bool,
    {
        let mut any = false;
        if let (Some(a), Some(b)) = (self.span, other.span) {
            any = true;
            if !fx(&a.to_float(), &b.to_float()) {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (self.period, other.period) {
            any = true;
            if !ft(&a, &b) {
                return false;
            }
        }
        any
    }

    pub fn contains(&self, other: &TBox) -> bool {
        self.common(other, span_contains, span_contains)
    }
    pub fn contained(&self, other: &TBox) -> bool {
        other.contains(self)
    }
    pub fn overlaps(&self, other: &TBox) -> bool {
        self.common(other, span_overlaps, span_overlaps)
    }
    pub fn same(&self, other: &TBox) -> bool {
        self.common(other, |a, b| a == b, |a, b| a == b)
    }

    /// Adjacent in at least one shared dimension and overlapping or
    /// adjacent in the others.
    pub fn adjacent(&self, other: &TBox) -> bool {
        if self.expand_inclusive().intersection(&other.expand_inclusive()).is_none() {
            return false;
        }
        let x_adj = match (self.span, other.span) {
            (Some(a), Some(b)) => span_adjacent(&a.to_float(), &b.to_float()),
            _ => false,
        };
        let t_adj = match (self.period, other.period) {
            (Some(a), Some(b)) => span_adjacent(&a, &b),
            _ => false,
        };
        x_adj || t_adj
    }

    fn expand_inclusive(&self) -> TBox {
        let inclusive_f = |s: Span<f64>| Span { lower: s.lower, upper: s.upper, lower_inc: true, upper_inc: true };
        TBox {
            span: self.span.map(|s| NumSpan::Float(inclusive_f(s.to_float()))),
            period: self.period.map(|p| Span { lower: p.lower, upper: p.upper, lower_inc: true, upper_inc: true }),
        }
    }

    fn value_dims(&self, other: &TBox) -> Option<(Span<f64>, Span<f64>)> {
        match (self.span, other.span) {
            (Some(a), Some(b)) => Some((a.to_float(), b.to_float())),
            _ => None,
        }
    }

    fn time_dims(&self, other: &TBox) -> Option<(TstzSpan, TstzSpan)> {
        match (self.period, other.period) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    pub fn left(&self, other: &TBox) -> bool {
        self.value_dims(other).map(|(a, b)| span_left(&a, &b)).unwrap_or(false)
    }
    pub fn overleft(&self, other: &TBox) -> bool {
        self.value_dims(other).map(|(a, b)| span_overleft(&a, &b)).unwrap_or(false)
    }
    pub fn right(&self, other: &TBox) -> bool {
        self.value_dims(other).map(|(a, b)| span_left(&b, &a)).unwrap_or(false)
    }
    pub fn overright(&self, other: &TBox) -> bool {
        self.value_dims(other).map(|(a, b)| span_overright(&a, &b)).unwrap_or(false)
    }
    pub fn before(&self, other: &TBox) -> bool {
        self.time_dims(other).map(|(a, b)| span_left(&a, &b)).unwrap_or(false)
    }
    pub fn overbefore(&self, other: &TBox) -> bool {
        self.time_dims(other).map(|(a, b)| span_overleft(&a, &b)).unwrap_or(false)
    }
    pub fn after(&self, other: &TBox) -> bool {
        self.time_dims(other).map(|(a, b)| span_left(&b, &a)).unwrap_or(false)
    }
    pub fn overafter(&self, other: &TBox) -> bool {
        self.time_dims(other).map(|(a, b)| span_overright(&a, &b)).unwrap_or(false)
    }

    /// Total order: time dimension first, then the value dimension.
    pub fn compare(&self, other: &TBox) -> Ordering {
        let t = match (self.period, other.period) {
            (Some(a), Some(b)) => a.compare(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if t != Ordering::Equal {
            return t;
        }
        match (self.span, other.span) {
            (Some(a), Some(b)) => a.to_float().compare(&b.to_float()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Tiles of the box: value bins of `vsize` times time bins of
    /// `duration`, restricted to the box.
    pub fn value_time_tiles(
        &self,
        vsize: Option<f64>,
        duration: Option<&Interval>,
        vorigin: f64,
        torigin: TimestampTz,
    ) -> Result<Vec<TBox>> {
        let values: Vec<Option<NumSpan>> = match (self.span, vsize) {
            (Some(NumSpan::Float(s)), Some(size)) => s.bins(size, vorigin)?.into_iter().map(|b| Some(NumSpan::Float(b))).collect(),
            (Some(NumSpan::Int(s)), Some(size)) => {
                s.bins(size.round() as i32, vorigin.round() as i32)?.into_iter().map(|b| Some(NumSpan::Int(b))).collect()
            }
            (span, _) => vec![span],
        };
        let times: Vec<Option<TstzSpan>> = match (self.period, duration) {
            (Some(p), Some(d)) => p.time_bins(d, &torigin)?.into_iter().map(Some).collect(),
            (period, _) => vec![period],
        };
        let mut result = Vec::with_capacity(values.len() * times.len());
        for v in &values {
            for t in &times {
                result.push(TBox { span: *v, period: *t });
            }
        }
        Ok(result)
    }
}

impl PartialEq for TBox {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.period == other.period
    }
}

impl PartialOrd for TBox {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
