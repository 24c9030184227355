use meos::MeosError;
use meos::agg::{
    span_extent_transfn, span_union_finalfn, span_union_transfn, set_union_finalfn, set_union_transfn,
    tavg_finalfn, tavg_transfn, tcount_transfn, temporal_tagg_finalfn, tmax_transfn, tmin_transfn, tsum_transfn,
    wcount_transfn, wsum_transfn,
};
use meos::agg::TemporalAgg;
use meos::span::IntSpan;
use meos::temporal::{TFloat, TInt};
use meos::time::{Interval, TimestampTz, parse_timestamp};

fn ts(text: &str) -> TimestampTz {
    parse_timestamp(text).expect("valid timestamp")
}

fn tfloat(text: &str) -> TFloat {
    TFloat::parse(text).expect("valid temporal float")
}

fn tint(text: &str) -> TInt {
    TInt::parse(text).expect("valid temporal int")
}

#[test]
fn count_of_disjoint_instants() {
    let mut state = None;
    for text in ["1@2020-01-01", "2@2020-01-02", "3@2020-01-03"] {
        state = Some(tcount_transfn(state, &tint(text)).expect("count transition"));
    }
    let count = temporal_tagg_finalfn(state).expect("non-empty aggregate");
    assert_eq!(count.num_instants(), 3);
    assert!(count.always_eq(&1));
    assert_eq!(count.value_at_timestamp(&ts("2020-01-02"), false), Some(1));
}

#[test]
fn count_of_three_instants_instantwise_and_cumulative() {
    let instants = ["1@2020-01-01", "2@2020-01-02", "3@2020-01-03"];
    let mut state = None;
    for text in instants {
        state = Some(tcount_transfn(state, &tint(text)).expect("count transition"));
    }
    let count = temporal_tagg_finalfn(state).expect("non-empty aggregate");
    for day in ["2020-01-01", "2020-01-02", "2020-01-03"] {
        assert_eq!(count.value_at_timestamp(&ts(day), false), Some(1), "tcount at {}", day);
    }

    // a window reaching past the last instant counts every earlier one
    let window = Interval::parse("3 days").expect("valid interval");
    let mut state = None;
    for text in instants {
        state = Some(wcount_transfn(state, &tint(text), &window).expect("wcount transition"));
    }
    let count = temporal_tagg_finalfn(state).expect("non-empty aggregate");
    for (day, expected) in [("2020-01-01", 1), ("2020-01-02", 2), ("2020-01-03", 3)] {
        assert_eq!(count.value_at_timestamp(&ts(day), false), Some(expected), "wcount at {}", day);
    }
}

#[test]
fn failed_transition_keeps_the_state() {
    let mut state: TemporalAgg<i32> = tsum_transfn(None, &tint("2147483647@2020-01-01")).expect("sum transition");
    let err = state.add(&tint("1@2020-01-01")).expect_err("sum past the greatest int");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);
    assert_eq!(state.len(), 1);
    let sum = state.finish().expect("non-empty aggregate");
    assert_eq!(sum.value_at_timestamp(&ts("2020-01-01"), false), Some(i32::MAX));

    let mut state = tsum_transfn(None, &tint("[2147483647@2020-01-01, 2147483647@2020-01-03]")).expect("sum transition");
    let before = state.finish().expect("non-empty aggregate");
    let err = state.add(&tint("[1@2020-01-02, 1@2020-01-04]")).expect_err("sum past the greatest int");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);
    assert_eq!(state.finish().expect("non-empty aggregate"), before);
}

#[test]
fn count_of_overlapping_sequences() {
    let state = tcount_transfn(None, &tfloat("[1@2020-01-01, 5@2020-01-03]")).expect("count transition");
    let state = tcount_transfn(Some(state), &tfloat("[2@2020-01-02, 8@2020-01-04]")).expect("count transition");
    let count = temporal_tagg_finalfn(Some(state)).expect("non-empty aggregate");
    assert_eq!(count.value_at_timestamp(&ts("2020-01-01 12:00:00"), false), Some(1));
    assert_eq!(count.value_at_timestamp(&ts("2020-01-02 12:00:00"), false), Some(2));
    assert_eq!(count.value_at_timestamp(&ts("2020-01-03 12:00:00"), false), Some(1));
}

#[test]
fn min_and_max_split_at_crossings() {
    let up = tfloat("[0@2020-01-01, 10@2020-01-11]");
    let down = tfloat("[10@2020-01-01, 0@2020-01-11]");

    let state = tmin_transfn(None, &up).expect("min transition");
    let state = tmin_transfn(Some(state), &down).expect("min transition");
    let min = temporal_tagg_finalfn(Some(state)).expect("non-empty aggregate");
    assert_eq!(min.value_at_timestamp(&ts("2020-01-03"), false), Some(2.0));
    assert_eq!(min.value_at_timestamp(&ts("2020-01-06"), false), Some(5.0));
    assert_eq!(min.value_at_timestamp(&ts("2020-01-09"), false), Some(2.0));

    let state = tmax_transfn(None, &up).expect("max transition");
    let state = tmax_transfn(Some(state), &down).expect("max transition");
    let max = temporal_tagg_finalfn(Some(state)).expect("non-empty aggregate");
    assert_eq!(max.value_at_timestamp(&ts("2020-01-03"), false), Some(8.0));
    assert_eq!(max.max_value(), 10.0);
}

#[test]
fn sum_over_common_time() {
    let state = tsum_transfn(None, &tint("[1@2020-01-01, 1@2020-01-03]")).expect("sum transition");
    let state = tsum_transfn(Some(state), &tint("[2@2020-01-02, 2@2020-01-04]")).expect("sum transition");
    let sum = temporal_tagg_finalfn(Some(state)).expect("non-empty aggregate");
    assert_eq!(sum.value_at_timestamp(&ts("2020-01-01 12:00:00"), false), Some(1));
    assert_eq!(sum.value_at_timestamp(&ts("2020-01-02 12:00:00"), false), Some(3));
    assert_eq!(sum.value_at_timestamp(&ts("2020-01-03 12:00:00"), false), Some(2));
}

#[test]
fn average_of_instants() {
    let state = tavg_transfn(None, &tfloat("2@2020-01-01")).expect("avg transition");
    let state = tavg_transfn(Some(state), &tfloat("4@2020-01-01")).expect("avg transition");
    let avg = tavg_finalfn(Some(state)).expect("avg final").expect("non-empty aggregate");
    assert_eq!(avg.start_value(), 3.0);
}

#[test]
fn mixing_instants_and_sequences_fails() {
    let state = tcount_transfn(None, &tint("1@2020-01-01")).expect("count transition");
    let err = tcount_transfn(Some(state), &tint("[1@2020-01-02, 1@2020-01-03]")).expect_err("mixed subtypes");
    assert!(matches!(err, MeosError::Aggregation(_)), "unexpected error {:?}", err);
}

#[test]
fn windowed_count() {
    let window = Interval::parse("2 days").expect("valid interval");
    let state = wcount_transfn(None, &tint("1@2020-01-01"), &window).expect("wcount transition");
    let state = wcount_transfn(Some(state), &tint("1@2020-01-02"), &window).expect("wcount transition");
    let count = temporal_tagg_finalfn(Some(state)).expect("non-empty aggregate");
    assert_eq!(count.value_at_timestamp(&ts("2020-01-01 12:00:00"), false), Some(1));
    assert_eq!(count.value_at_timestamp(&ts("2020-01-02 12:00:00"), false), Some(2));
    assert_eq!(count.value_at_timestamp(&ts("2020-01-03 12:00:00"), false), Some(1));
}

#[test]
fn windowed_sum_rejects_linear_values() {
    let window = Interval::parse("1 day").expect("valid interval");
    let err = wsum_transfn(None, &tfloat("[1@2020-01-01, 2@2020-01-02]"), &window).expect_err("linear input");
    assert!(matches!(err, MeosError::InvalidArgType(_)), "unexpected error {:?}", err);
}

#[test]
fn extents_and_unions() {
    let a = IntSpan::parse("[1, 3)").expect("valid span");
    let b = IntSpan::parse("[5, 7)").expect("valid span");
    let extent = span_extent_transfn(Some(span_extent_transfn(None, &a)), &b);
    assert_eq!(extent.to_string(), "[1, 7)");

    let mut state = None;
    for v in [3, 1, 3] {
        state = Some(set_union_transfn(state, v));
    }
    let set = set_union_finalfn(state).expect("valid set").expect("non-empty set");
    assert_eq!(set.to_string(), "{1, 3}");

    let mut state = None;
    for text in ["[1, 3)", "[2, 5)", "[8, 9)"] {
        state = Some(span_union_transfn(state, &IntSpan::parse(text).expect("valid span")));
    }
    let union = span_union_finalfn(state).expect("non-empty union");
    assert_eq!(union.to_string(), "{[1, 5), [8, 9)}");
}
