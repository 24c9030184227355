use std::cmp::Ordering;

use crate::temporal::{BoundingBox, TemporalValue};
use crate::time::TimestampTz;

/// A base value at a timestamp.
#[derive(Debug, Clone)]
pub struct TInstant<V: TemporalValue> {
    pub(crate) value: V,
    pub(crate) t: TimestampTz,
}

impl<V: TemporalValue> TInstant<V> {
    pub fn make(value: V, t: TimestampTz) -> TInstant<V> {
        TInstant { value, t }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn timestamp(&self) -> TimestampTz {
        self.t
    }

    pub fn bbox(&self) -> V::BBox {
        V::BBox::from_instant(&self.value, &self.t)
    }

    pub(crate) fn with_time(&self, t: TimestampTz) -> TInstant<V> {
        TInstant { value: self.value.clone(), t }
    }

    /// Timestamp first, then value.
    pub fn compare(&self, other: &TInstant<V>) -> Ordering {
        self.t.cmp(&other.t).then_with(|| self.value.compare(&other.value))
    }

    pub(crate) fn same(&self, other: &TInstant<V>) -> bool {
        self.t == other.t && self.value.eq_value(&other.value)
    }
}

impl<V: TemporalValue> PartialEq for TInstant<V> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}
