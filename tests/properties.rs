use chrono::TimeDelta;
use meos::agg::{tcount_transfn, temporal_tagg_finalfn};
use meos::catalog::Interpolation;
use meos::set::IntSet;
use meos::span::{FloatSpan, IntSpan, TstzSpan};
use meos::temporal::{TFloat, TInstant, TInt, TSequence, Temporal};
use meos::time::{TimestampTz, parse_timestamp};
use proptest::prelude::*;

fn origin() -> TimestampTz {
    parse_timestamp("2020-01-01").expect("valid timestamp")
}

fn at_hour(hours: i64) -> TimestampTz {
    origin() + TimeDelta::hours(hours)
}

/// Linear float sequence over strictly increasing hours.
fn linear(values: &[i32], steps: &[i64]) -> TFloat {
    let mut hour = 0;
    let instants: Vec<TInstant<f64>> = values
        .iter()
        .zip(std::iter::once(&0).chain(steps))
        .map(|(v, step)| {
            hour += step;
            TInstant::make(*v as f64, at_hour(hour))
        })
        .collect();
    Temporal::Sequence(TSequence::make(instants, true, true, Interpolation::Linear, false).expect("valid sequence"))
}

fn arb_sequence() -> impl Strategy<Value = (Vec<i32>, Vec<i64>)> {
    (2usize..8).prop_flat_map(|n| (prop::collection::vec(-100i32..100, n), prop::collection::vec(1i64..48, n - 1)))
}

fn close(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs())),
        (None, None) => true,
        _ => false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Text output of a span parses back to the same span.
    #[test]
    fn int_span_text_round_trip(lower in -1000i32..1000, width in 0i32..100, lower_inc: bool, upper_inc: bool) {
        prop_assume!(width > 0 || (lower_inc && upper_inc));
        let span = IntSpan::make(lower, lower + width, lower_inc, upper_inc);
        prop_assume!(span.is_ok());
        let span = span.expect("checked above");
        prop_assert_eq!(IntSpan::parse(&span.to_string()).expect("reparse"), span);
    }

    #[test]
    fn float_span_text_round_trip(lower in -4000i32..4000, width in 1i32..400, lower_inc: bool, upper_inc: bool) {
        let (lo, hi) = (lower as f64 / 4.0, (lower + width) as f64 / 4.0);
        let span = FloatSpan::make(lo, hi, lower_inc, upper_inc).expect("valid span");
        prop_assert_eq!(FloatSpan::parse(&span.to_string()).expect("reparse"), span);
    }

    #[test]
    fn set_union_and_intersection_laws(
        a in prop::collection::vec(-50i32..50, 1..20),
        b in prop::collection::vec(-50i32..50, 1..20),
    ) {
        let a = IntSet::make(a).expect("non-empty set");
        let b = IntSet::make(b).expect("non-empty set");
        let ab = a.union(&b);
        prop_assert_eq!(&ab, &b.union(&a));
        prop_assert!(ab.contains_set(&a));
        prop_assert!(ab.contains_set(&b));
        prop_assert_eq!(a.intersection(&a), Some(a.clone()));
        prop_assert_eq!(a.intersection(&b), b.intersection(&a));
    }

    /// Restricting to a period keeps the interpolated values inside it.
    #[test]
    fn restriction_keeps_interpolated_values((values, steps) in arb_sequence(), from in 0i64..200, len in 1i64..100) {
        let temp = linear(&values, &steps);
        let period = TstzSpan::make(at_hour(from), at_hour(from + len), true, true).expect("valid period");
        if let Some(restricted) = temp.at_tstzspan(&period) {
            for hour in from..=from + len {
                let t = at_hour(hour);
                let expected = temp.value_at_timestamp(&t, false);
                prop_assert!(close(restricted.value_at_timestamp(&t, false), expected), "at hour {}", hour);
            }
        }
    }

    /// Deleting a period and merging it back restores the value.
    #[test]
    fn delete_then_merge_reconstructs((values, steps) in arb_sequence(), a in 1i64..1000, b in 1i64..1000) {
        let temp = linear(&values, &steps);
        let total: i64 = steps.iter().sum();
        prop_assume!(total >= 2);
        let (a, b) = (a % total, b % total);
        prop_assume!(a > 0 && b > 0 && a != b);
        let period = TstzSpan::make(at_hour(a.min(b)), at_hour(a.max(b)), true, true).expect("valid period");
        let kept = temp.delete_tstzspan(&period, false).expect("time remains outside the period");
        let removed = temp.at_tstzspan(&period).expect("period inside the value");
        let merged = kept.merge(&removed).expect("pieces merge");
        prop_assert_eq!(merged.time(), temp.time());
        for hour in 0..=total {
            let t = at_hour(hour);
            prop_assert!(close(merged.value_at_timestamp(&t, false), temp.value_at_timestamp(&t, false)), "at hour {}", hour);
        }
    }

    /// The midpoint of a linear segment carries the mean of its end values.
    #[test]
    fn linear_midpoint(start in -1000i32..1000, end in -1000i32..1000, half in 1i64..100) {
        let temp = linear(&[start, end], &[2 * half]);
        let mid = temp.value_at_timestamp(&at_hour(half), false).expect("defined at the midpoint");
        let expected = (start as f64 + end as f64) / 2.0;
        prop_assert!((mid - expected).abs() < 1e-9);
    }

    /// Counting disjoint instants yields one at each of them.
    #[test]
    fn count_of_disjoint_instants(hours in prop::collection::btree_set(0i64..1000, 1..20)) {
        let mut state = None;
        for (k, hour) in hours.iter().enumerate() {
            let inst: TInt = Temporal::Instant(TInstant::make(k as i32, at_hour(*hour)));
            state = Some(tcount_transfn(state, &inst).expect("count transition"));
        }
        let count = temporal_tagg_finalfn(state).expect("non-empty aggregate");
        prop_assert_eq!(count.num_instants(), hours.len());
        for hour in &hours {
            prop_assert_eq!(count.value_at_timestamp(&at_hour(*hour), false), Some(1));
        }
        prop_assert!(count.always_eq(&1));
    }
}

#[test]
fn int_span_bounds_are_canonical() {
    let span = IntSpan::parse("[1, 10)").expect("valid span");
    assert_eq!(span.lower(), 1);
    assert_eq!(span.upper(), 9);
}

#[test]
fn linear_float_at_midday() {
    let temp = TFloat::parse("[0@2020-01-01, 10@2020-01-11]").expect("valid temporal float");
    let t = parse_timestamp("2020-01-06").expect("valid timestamp");
    assert_eq!(temp.value_at_timestamp(&t, false), Some(5.0));
}
