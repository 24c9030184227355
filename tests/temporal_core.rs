use meos::MeosError;
use meos::catalog::{Interpolation, TempSubtype};
use meos::span::TstzSpan;
use meos::temporal::{TBool, TFloat, TInstant, TInt, TSequence, TText};
use meos::time::{Interval, TimestampTz, parse_timestamp};

fn ts(text: &str) -> TimestampTz {
    parse_timestamp(text).expect("valid timestamp")
}

fn tfloat(text: &str) -> TFloat {
    TFloat::parse(text).expect("valid temporal float")
}

fn ramp() -> TFloat {
    tfloat("[0@2020-01-01, 10@2020-01-11]")
}

#[test]
fn subtypes_and_interpolations() {
    let inst = tfloat("5@2020-01-01");
    assert_eq!(inst.subtype(), TempSubtype::Instant);

    let discrete = tfloat("{1@2020-01-01, 2@2020-01-02}");
    assert_eq!(discrete.interp(), Interpolation::Discrete);
    assert_eq!(discrete.value_at_timestamp(&ts("2020-01-01 12:00:00"), false), None);

    let linear = tfloat("[1@2020-01-01, 3@2020-01-03]");
    assert_eq!(linear.interp(), Interpolation::Linear);
    assert_eq!(linear.subtype(), TempSubtype::Sequence);

    let step = tfloat("Interp=Step;[1@2020-01-01, 3@2020-01-03]");
    assert_eq!(step.interp(), Interpolation::Step);
    assert_eq!(step.value_at_timestamp(&ts("2020-01-02"), false), Some(1.0));
    assert!(step.to_string().starts_with("Interp=Step;["));

    let seqset = tfloat("{[1@2020-01-01, 2@2020-01-02], [3@2020-01-03, 3@2020-01-04]}");
    assert_eq!(seqset.subtype(), TempSubtype::SequenceSet);
    assert_eq!(seqset.num_sequences().expect("sequence set"), 2);
}

#[test]
fn linear_evaluation() {
    let temp = ramp();
    assert_eq!(temp.value_at_timestamp(&ts("2020-01-06"), false), Some(5.0));
    assert_eq!(temp.value_at_timestamp(&ts("2020-01-12"), false), None);
    assert_eq!(temp.start_value(), 0.0);
    assert_eq!(temp.end_value(), 10.0);
    assert_eq!(temp.min_value(), 0.0);
    assert_eq!(temp.max_value(), 10.0);
}

#[test]
fn text_output() {
    let temp = tfloat("[1@2020-01-01, 3@2020-01-03)");
    assert_eq!(temp.to_string(), "[1@2020-01-01 00:00:00+00, 3@2020-01-03 00:00:00+00)");
    let tint = TInt::parse("{5@2020-01-01}").expect("valid temporal int");
    assert_eq!(tint.to_string(), "{5@2020-01-01 00:00:00+00}");
}

#[test]
fn collinear_instants_are_normalized() {
    let temp = tfloat("[1@2020-01-01, 2@2020-01-02, 3@2020-01-03]");
    assert_eq!(temp.num_instants(), 2);
    assert_eq!(temp.value_at_timestamp(&ts("2020-01-02"), false), Some(2.0));
}

#[test]
fn invalid_sequences_are_rejected() {
    let err = TFloat::parse("[1@2020-01-02, 2@2020-01-01]").expect_err("decreasing timestamps");
    assert!(matches!(err, MeosError::InvalidArgValue(_)), "unexpected error {:?}", err);
    let err = TInt::parse("Interp=Linear;[1@2020-01-01, 2@2020-01-02]").expect_err("linear integers");
    assert!(matches!(err, MeosError::InvalidArgValue(_)), "unexpected error {:?}", err);
}

#[test]
fn restriction_to_time() {
    let temp = ramp();
    let period = TstzSpan::parse("[2020-01-03, 2020-01-05]").expect("valid period");
    let at = temp.at_tstzspan(&period).expect("overlapping period");
    assert_eq!(at.start_value(), 2.0);
    assert_eq!(at.end_value(), 4.0);
    assert_eq!(at.tstzspan(), period);

    let minus = temp.minus_tstzspan(&period).expect("remaining time");
    assert_eq!(minus.num_sequences().expect("sequence set"), 2);
    assert_eq!(minus.value_at_timestamp(&ts("2020-01-04"), false), None);

    let outside = TstzSpan::parse("[2021-01-01, 2021-01-02]").expect("valid period");
    assert!(temp.at_tstzspan(&outside).is_none());
}

#[test]
fn restriction_to_values() {
    let temp = TInt::parse("[1@2020-01-01, 5@2020-01-03, 1@2020-01-05]").expect("valid temporal int");
    let at = temp.at_value(&1).expect("value is reached");
    assert_eq!(at.num_sequences().expect("sequence set"), 2);
    let minus = temp.minus_value(&1).expect("other values remain");
    assert!(minus.always_eq(&5));
    assert!(temp.at_value(&7).is_none());
}

#[test]
fn comparisons() {
    let temp = ramp();
    assert!(temp.ever_eq(&5.0));
    assert!(temp.always_ge(&0.0));
    assert!(!temp.always_gt(&0.0));
    assert!(!temp.ever_gt(&10.0));

    let above = temp.tgt(&5.0).expect("comparison");
    let when = above.when_true().expect("true somewhere");
    assert_eq!(when.num_spans(), 1);
    assert_eq!(when.lower(), ts("2020-01-06"));
    assert!(!when.lower_inc());
}

#[test]
fn arithmetic_and_aggregates() {
    let temp = ramp();
    let shifted = temp.add_value(2.0).expect("addition");
    assert_eq!(shifted.start_value(), 2.0);
    assert_eq!(shifted.end_value(), 12.0);
    assert_eq!(temp.twavg(), 5.0);
    assert_eq!(temp.integral(), 5.0 * 10.0 * 86_400_000_000.0);

    let err = temp.div_value(0.0).expect_err("division by zero");
    assert!(matches!(err, MeosError::DivisionByZero), "unexpected error {:?}", err);
}

#[test]
fn boolean_operations() {
    let temp = TBool::parse("[true@2020-01-01, false@2020-01-02, true@2020-01-03]").expect("valid temporal bool");
    assert!(!temp.tnot().expect("negation").start_value());
    let when = temp.when_true().expect("true somewhere");
    assert_eq!(when.num_spans(), 2);
    assert!(temp.tand(false).expect("conjunction").always_eq(&false));
    assert!(temp.tor(true).expect("disjunction").always_eq(&true));
}

#[test]
fn text_operations() {
    let temp = TText::parse("[\"abc\"@2020-01-01, \"xyz\"@2020-01-02]").expect("valid temporal text");
    assert_eq!(temp.upper().expect("upper").start_value(), "ABC");
    assert_eq!(temp.textcat("!").expect("concatenation").end_value(), "xyz!");
}

#[test]
fn time_shifting() {
    let temp = ramp();
    let day = Interval::parse("1 day").expect("valid interval");
    let shifted = temp.shift_time(&day).expect("shift");
    assert_eq!(shifted.start_timestamp(), ts("2020-01-02"));
    assert_eq!(shifted.end_timestamp(), ts("2020-01-12"));
    assert_eq!(shifted.start_value(), 0.0);

    let far = Interval::parse("100000000 years").expect("valid interval");
    let err = temp.shift_time(&far).expect_err("past the last timestamp");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);
}

#[test]
fn appending_instants() {
    let temp = tfloat("[1@2020-01-01, 2@2020-01-02]");
    let appended = temp
        .append_tinstant(&TInstant::make(5.0, ts("2020-01-03")), Interpolation::Linear, None, None)
        .expect("append");
    assert_eq!(appended.num_instants(), 3);
    assert_eq!(appended.end_value(), 5.0);
    assert_eq!(appended.num_sequences().expect("continuous"), 1);
    // the source value is left as it was
    assert_eq!(temp.num_instants(), 2);

    let half_day = Interval::parse("12 hours").expect("valid interval");
    let split = temp
        .append_tinstant(&TInstant::make(5.0, ts("2020-01-04")), Interpolation::Linear, None, Some(&half_day))
        .expect("append after a time gap");
    assert_eq!(split.num_sequences().expect("continuous"), 2);
    assert_eq!(split.value_at_timestamp(&ts("2020-01-03"), false), None);

    let split = temp
        .append_tinstant(&TInstant::make(100.0, ts("2020-01-03")), Interpolation::Linear, Some(10.0), None)
        .expect("append after a value gap");
    assert_eq!(split.num_sequences().expect("continuous"), 2);

    let err = temp
        .append_tinstant(&TInstant::make(0.0, ts("2020-01-01 12:00:00")), Interpolation::Linear, None, None)
        .expect_err("earlier timestamp");
    assert!(matches!(err, MeosError::InvalidArgValue(_)), "unexpected error {:?}", err);
}

#[test]
fn appending_sequences() {
    let temp = tfloat("[1@2020-01-01, 2@2020-01-02]");
    let tail = TSequence::make(
        vec![TInstant::make(2.0, ts("2020-01-02")), TInstant::make(0.0, ts("2020-01-04"))],
        true,
        true,
        Interpolation::Linear,
        true,
    )
    .expect("valid sequence");
    let joined = temp.append_tsequence(&tail).expect("append");
    assert_eq!(joined.num_sequences().expect("continuous"), 1);
    assert_eq!(joined.end_timestamp(), ts("2020-01-04"));
    assert_eq!(joined.value_at_timestamp(&ts("2020-01-03"), false), Some(1.0));

    let overlapping = TSequence::make(
        vec![TInstant::make(7.0, ts("2020-01-01 12:00:00")), TInstant::make(8.0, ts("2020-01-05"))],
        true,
        true,
        Interpolation::Linear,
        true,
    )
    .expect("valid sequence");
    assert!(matches!(temp.append_tsequence(&overlapping), Err(MeosError::InvalidArgValue(_))));
}

#[test]
fn delete_then_merge_restores_the_value() {
    let temp = ramp();
    let period = TstzSpan::parse("[2020-01-03, 2020-01-05]").expect("valid period");
    let kept = temp.delete_tstzspan(&period, false).expect("remaining time");
    let removed = temp.at_tstzspan(&period).expect("overlapping period");
    let merged = kept.merge(&removed).expect("disjoint pieces merge");
    assert_eq!(merged.time(), temp.time());
    for day in ["2020-01-01", "2020-01-03", "2020-01-04", "2020-01-05", "2020-01-08", "2020-01-11"] {
        let t = ts(day);
        assert_eq!(merged.value_at_timestamp(&t, false), temp.value_at_timestamp(&t, false), "at {}", day);
    }
}
