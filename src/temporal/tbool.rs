//! Temporal booleans.

use crate::error::Result;
use crate::spanset::SpanSet;
use crate::temporal::lift::{LiftOp, lift_base, lift1, lift2};
use crate::temporal::{TBool, Temporal};
use crate::time::TimestampTz;

impl Temporal<bool> {
    pub fn tnot(&self) -> Result<TBool> {
        lift1(self, &|b: &bool| -> Result<bool> { Ok(!b) }, false, None)
    }

    pub fn tand(&self, value: bool) -> Result<TBool> {
        lift_base(self, &value, &LiftOp::new(&|a: &bool, b: &bool| -> Result<bool> { Ok(*a && *b) }))
    }

    pub fn tor(&self, value: bool) -> Result<TBool> {
        lift_base(self, &value, &LiftOp::new(&|a: &bool, b: &bool| -> Result<bool> { Ok(*a || *b) }))
    }

    /// Conjunction over the common time of both values.
    pub fn tand_temporal(&self, other: &TBool) -> Result<Option<TBool>> {
        lift2(self, other, &LiftOp::new(&|a: &bool, b: &bool| -> Result<bool> { Ok(*a && *b) }))
    }

    pub fn tor_temporal(&self, other: &TBool) -> Result<Option<TBool>> {
        lift2(self, other, &LiftOp::new(&|a: &bool, b: &bool| -> Result<bool> { Ok(*a || *b) }))
    }

    /// Time during which the value is true.
    pub fn when_true(&self) -> Option<SpanSet<TimestampTz>> {
        self.at_value(&true).map(|t| t.time())
    }
}
