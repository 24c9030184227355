//! Ever, always and temporal comparisons.

use std::cmp::Ordering;

use crate::catalog::Interpolation;
use crate::error::Result;
use crate::temporal::lift::{LiftOp, lift_base, lift2};
use crate::temporal::{TBool, TSequence, Temporal, TemporalValue};

/// Comparison operators of the ever, always and temporal comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn test(&self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }

    pub fn negate(&self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    /// Whether some value strictly between `lo` and `hi` satisfies the
    /// comparison with `value`.
    fn test_open<V: TemporalValue>(&self, lo: &V, hi: &V, value: &V) -> bool {
        match self {
            CmpOp::Eq => lo.compare(value) == Ordering::Less && value.compare(hi) == Ordering::Less,
            CmpOp::Ne => true,
            CmpOp::Lt | CmpOp::Le => lo.compare(value) == Ordering::Less,
            CmpOp::Gt | CmpOp::Ge => hi.compare(value) == Ordering::Greater,
        }
    }
}

fn cmp_values<V: TemporalValue>(a: &V, b: &V) -> Ordering {
    if a.eq_value(b) { Ordering::Equal } else { a.compare(b) }
}

/// Some value reached by the sequence satisfies the comparison.
fn seq_ever<V: TemporalValue>(seq: &TSequence<V>, op: CmpOp, value: &V) -> bool {
    let n = seq.instants.len();
    let linear = seq.interp == Interpolation::Linear && n > 1;
    for (k, inst) in seq.instants.iter().enumerate() {
        // an excluded bound of a linear sequence is never reached
        let excluded = linear && ((k == 0 && !seq.lower_inc) || (k == n - 1 && !seq.upper_inc));
        if !excluded && op.test(cmp_values(&inst.value, value)) {
            return true;
        }
    }
    if linear {
        for w in seq.instants.windows(2) {
            let (a, b) = (&w[0].value, &w[1].value);
            if a.eq_value(b) {
                continue;
            }
            let (lo, hi) = if a.compare(b) == Ordering::Less { (a, b) } else { (b, a) };
            if op.test_open(lo, hi, value) {
                return true;
            }
        }
    }
    false
}

impl<V: TemporalValue> Temporal<V> {
    /// Whether the value ever satisfies the comparison with a base value.
    pub fn ever_cmp(&self, op: CmpOp, value: &V) -> bool {
        self.pieces().iter().any(|s| seq_ever(s, op, value))
    }

    /// Whether the value always satisfies the comparison with a base value.
    pub fn always_cmp(&self, op: CmpOp, value: &V) -> bool {
        !self.ever_cmp(op.negate(), value)
    }

    pub fn ever_eq(&self, value: &V) -> bool {
        self.ever_cmp(CmpOp::Eq, value)
    }
    pub fn always_eq(&self, value: &V) -> bool {
        self.always_cmp(CmpOp::Eq, value)
    }
    pub fn ever_ne(&self, value: &V) -> bool {
        self.ever_cmp(CmpOp::Ne, value)
    }
    pub fn always_ne(&self, value: &V) -> bool {
        self.always_cmp(CmpOp::Ne, value)
    }
    pub fn ever_lt(&self, value: &V) -> bool {
        self.ever_cmp(CmpOp::Lt, value)
    }
    pub fn always_lt(&self, value: &V) -> bool {
        self.always_cmp(CmpOp::Lt, value)
    }
    pub fn ever_le(&self, value: &V) -> bool {
        self.ever_cmp(CmpOp::Le, value)
    }
    pub fn always_le(&self, value: &V) -> bool {
        self.always_cmp(CmpOp::Le, value)
    }
    pub fn ever_gt(&self, value: &V) -> bool {
        self.ever_cmp(CmpOp::Gt, value)
    }
    pub fn always_gt(&self, value: &V) -> bool {
        self.always_cmp(CmpOp::Gt, value)
    }
    pub fn ever_ge(&self, value: &V) -> bool {
        self.ever_cmp(CmpOp::Ge, value)
    }
    pub fn always_ge(&self, value: &V) -> bool {
        self.always_cmp(CmpOp::Ge, value)
    }

    /// Temporal comparison with a base value.
    pub fn tcmp(&self, op: CmpOp, value: &V) -> Result<TBool> {
        let func = move |a: &V, b: &V| -> Result<bool> { Ok(op.test(cmp_values(a, b))) };
        let breaks = |a1: &V, a2: &V, b1: &V, b2: &V| a1.crossings(a2, b1, b2);
        lift_base(self, value, &LiftOp::new(&func).with_breaks(&breaks))
    }

    /// Temporal comparison of two temporal values over their common time.
    pub fn tcmp_temporal(&self, op: CmpOp, other: &Temporal<V>) -> Result<Option<TBool>> {
        self.start_instant().value.check_compatible(&other.start_instant().value)?;
        let func = move |a: &V, b: &V| -> Result<bool> { Ok(op.test(cmp_values(a, b))) };
        let breaks = |a1: &V, a2: &V, b1: &V, b2: &V| a1.crossings(a2, b1, b2);
        lift2(self, other, &LiftOp::new(&func).with_breaks(&breaks))
    }

    pub fn teq(&self, value: &V) -> Result<TBool> {
        self.tcmp(CmpOp::Eq, value)
    }
    pub fn tne(&self, value: &V) -> Result<TBool> {
        self.tcmp(CmpOp::Ne, value)
    }
    pub fn tlt(&self, value: &V) -> Result<TBool> {
        self.tcmp(CmpOp::Lt, value)
    }
    pub fn tle(&self, value: &V) -> Result<TBool> {
        self.tcmp(CmpOp::Le, value)
    }
    pub fn tgt(&self, value: &V) -> Result<TBool> {
        self.tcmp(CmpOp::Gt, value)
    }
    pub fn tge(&self, value: &V) -> Result<TBool> {
        self.tcmp(CmpOp::Ge, value)
    }

    pub fn teq_temporal(&self, other: &Temporal<V>) -> Result<Option<TBool>> {
        self.tcmp_temporal(CmpOp::Eq, other)
    }
    pub fn tne_temporal(&self, other: &Temporal<V>) -> Result<Option<TBool>> {
        self.tcmp_temporal(CmpOp::Ne, other)
    }
    pub fn tlt_temporal(&self, other: &Temporal<V>) -> Result<Option<TBool>> {
        self.tcmp_temporal(CmpOp::Lt, other)
    }
    pub fn tle_temporal(&self, other: &Temporal<V>) -> Result<Option<TBool>> {
        self.tcmp_temporal(CmpOp::Le, other)
    }
    pub fn tgt_temporal(&self, other: &Temporal<V>) -> Result<Option<TBool>> {
        self.tcmp_temporal(CmpOp::Gt, other)
    }
    pub fn tge_temporal(&self, other: &Temporal<V>) -> Result<Option<TBool>> {
        self.tcmp_temporal(CmpOp::Ge, other)
    }

    /// Whether the comparison ever holds at a common time of both values.
    /// False when they share no time.
    pub fn ever_cmp_temporal(&self, op: CmpOp, other: &Temporal<V>) -> Result<bool> {
        Ok(self.tcmp_temporal(op, other)?.map(|r| r.ever_eq(&true)).unwrap_or(false))
    }

    /// Whether the comparison holds at every common time of both values.
    /// False when they share no time.
    pub fn always_cmp_temporal(&self, op: CmpOp, other: &Temporal<V>) -> Result<bool> {
        Ok(self.tcmp_temporal(op, other)?.map(|r| r.always_eq(&true)).unwrap_or(false))
    }

    pub fn ever_eq_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.ever_cmp_temporal(CmpOp::Eq, other)
    }
    pub fn always_eq_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.always_cmp_temporal(CmpOp::Eq, other)
    }
    pub fn ever_ne_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.ever_cmp_temporal(CmpOp::Ne, other)
    }
    pub fn always_ne_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.always_cmp_temporal(CmpOp::Ne, other)
    }
    pub fn ever_lt_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.ever_cmp_temporal(CmpOp::Lt, other)
    }
    pub fn always_lt_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.always_cmp_temporal(CmpOp::Lt, other)
    }
    pub fn ever_le_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.ever_cmp_temporal(CmpOp::Le, other)
    }
    pub fn always_le_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.always_cmp_temporal(CmpOp::Le, other)
    }
    pub fn ever_gt_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.ever_cmp_temporal(CmpOp::Gt, other)
    }
    pub fn always_gt_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.always_cmp_temporal(CmpOp::Gt, other)
    }
    pub fn ever_ge_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.ever_cmp_temporal(CmpOp::Ge, other)
    }
    pub fn always_ge_temporal(&self, other: &Temporal<V>) -> Result<bool> {
        self.always_cmp_temporal(CmpOp::Ge, other)
    }
}
