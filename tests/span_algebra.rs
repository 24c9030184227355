use meos::MeosError;
use meos::set::IntSet;
use meos::span::{FloatSpan, IntSpan, SpanOps, TstzSpan};
use meos::spanset::{FloatSpanSet, IntSpanSet};

fn ispan(text: &str) -> IntSpan {
    IntSpan::parse(text).expect("valid int span")
}

fn fspan(text: &str) -> FloatSpan {
    FloatSpan::parse(text).expect("valid float span")
}

#[test]
fn integer_spans_are_canonical() {
    let span = ispan("[1, 10]");
    assert_eq!(span.to_string(), "[1, 11)");
    let span = ispan("(0, 10)");
    assert_eq!(span.to_string(), "[1, 10)");
    assert_eq!(span.lower(), 1);
    assert_eq!(span.upper(), 9);
    assert!(span.lower_inc());
    assert!(!span.upper_inc());
}

#[test]
fn float_spans_keep_their_bounds() {
    let span = fspan("(1.5, 2.5]");
    assert_eq!(span.to_string(), "(1.5, 2.5]");
    assert!(!span.contains_value(&1.5));
    assert!(span.contains_value(&2.5));
    assert_eq!(span.width().expect("width"), 1.0);
}

#[test]
fn invalid_bounds_are_rejected() {
    let err = IntSpan::parse("[3, 1]").expect_err("lower above upper");
    assert!(matches!(err, MeosError::InvalidArgValue(_)), "unexpected error {:?}", err);
    let err = FloatSpan::parse("[1, 1)").expect_err("empty span");
    assert!(matches!(err, MeosError::InvalidArgValue(_)), "unexpected error {:?}", err);
    let err = IntSpan::parse("[1, 3").expect_err("unterminated span");
    assert!(matches!(err, MeosError::TextInput { .. }), "unexpected error {:?}", err);
}

#[test]
fn topological_predicates() {
    let a = ispan("[1, 3)");
    let b = ispan("[3, 5)");
    let c = ispan("[2, 8)");
    assert!(a.adjacent(&b));
    assert!(!a.overlaps(&b));
    assert!(a.overlaps(&c));
    assert!(a.left(&b));
    assert!(b.right(&a));
    assert!(c.contains(&ispan("[4, 6)")));
    assert!(ispan("[4, 6)").contained(&c));
}

#[test]
fn union_intersection_and_difference() {
    let a = fspan("[1, 3]");
    let b = fspan("[2, 5]");
    let union = a.union(&b);
    assert_eq!(union.num_spans(), 1);
    assert_eq!(union.to_string(), "{[1, 5]}");

    let inter = a.intersection(&b).expect("overlapping spans");
    assert_eq!(inter.to_string(), "{[2, 3]}");

    let diff = a.minus(&b).expect("non-empty difference");
    assert_eq!(diff.to_string(), "{[1, 2)}");

    let disjoint = fspan("[10, 11]");
    assert!(a.intersection(&disjoint).is_none());
    assert_eq!(a.union(&disjoint).num_spans(), 2);
    assert!(a.minus(&fspan("[0, 4]")).is_none());
}

#[test]
fn distance_between_spans() {
    assert_eq!(fspan("[1, 2]").distance(&fspan("[5, 6]")).expect("distance"), 3.0);
    assert_eq!(fspan("[1, 5]").distance(&fspan("[2, 6]")).expect("distance"), 0.0);
    assert_eq!(ispan("[1, 3)").distance(&ispan("[5, 7)")).expect("distance"), 3);
}

#[test]
fn span_sets_normalize() {
    let ss = IntSpanSet::parse("{[1, 3), [3, 5), [8, 9]}").expect("valid span set");
    assert_eq!(ss.num_spans(), 2);
    assert_eq!(ss.to_string(), "{[1, 5), [8, 10)}");
    assert_eq!(ss.lower(), 1);
    assert_eq!(ss.upper(), 9);

    let fs = FloatSpanSet::parse("{[1, 2], [1.5, 4], (6, 7)}").expect("valid span set");
    assert_eq!(fs.to_string(), "{[1, 4], (6, 7)}");
    assert!(fs.contains_value(&3.0));
    assert!(!fs.contains_value(&5.0));
}

#[test]
fn timestamp_spans() {
    let period = TstzSpan::parse("[2020-01-01, 2020-01-02)").expect("valid period");
    assert_eq!(period.to_string(), "[2020-01-01 00:00:00+00, 2020-01-02 00:00:00+00)");
    assert_eq!(period.duration().to_string(), "1 day");
}

#[test]
fn integer_spans_at_the_type_bounds() {
    let span = ispan("[1, 2147483647]");
    assert_eq!(span.upper(), i32::MAX);
    assert!(span.upper_inc());
    assert!(span.contains_value(&i32::MAX));
    assert_eq!(span.to_string(), "[1, 2147483647]");
    assert_eq!(ispan(&span.to_string()), span);
    assert_eq!(ispan("[1, 2147483646]").to_string(), "[1, 2147483647)");

    let single = IntSpan::from_value(i32::MAX);
    assert_eq!(single.lower(), i32::MAX);
    assert_eq!(single.upper(), i32::MAX);
    assert!(single.contains_value(&i32::MAX));
    assert!(ispan("[0, 10)").left_value(&i32::MAX));

    let set = IntSet::parse("{1, 2147483647}").expect("valid set");
    assert_eq!(set.span(), span);

    let low = ispan("[-2147483648, -2147483647]");
    assert_eq!(low.lower(), i32::MIN);
    assert_eq!(low.to_string(), "[-2147483648, -2147483646)");

    let err = IntSpan::parse("(2147483647, 2147483647]").expect_err("no value after the greatest one");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);
}

#[test]
fn integer_arithmetic_out_of_range() {
    let err = ispan("[1, 10)").expand(i32::MAX).expect_err("upper bound overflows");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);
    let err = ispan("[-10, 10)").expand(i32::MAX).expect_err("lower bound overflows");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);
    let err = ispan("[1, 10)").shift_scale(Some(i32::MAX), None).expect_err("shift overflows");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);
    let err = ispan("[-2147483648, 0)").width().expect_err("width overflows");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);
    let err = ispan("[-2147483648, -2147483647)")
        .distance(&ispan("[2147483000, 2147483001)"))
        .expect_err("gap overflows");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);

    let err = IntSet::parse("{1, 5}").expect("valid set").shift_scale(Some(i32::MAX), None).expect_err("shift overflows");
    assert!(matches!(err, MeosError::OutOfRange(_)), "unexpected error {:?}", err);

    assert_eq!(ispan("[1, 2147483647]").width().expect("width"), i32::MAX);
    assert_eq!(ispan("[1, 10)").shift_scale(Some(5), None).expect("shift"), ispan("[6, 15)"));
}

#[test]
fn value_bins() {
    let bins = ispan("[1, 10)").bins(4, 0).expect("bins");
    assert_eq!(bins, vec![ispan("[1, 4)"), ispan("[4, 8)"), ispan("[8, 10)")]);
    let bins = fspan("[0.5, 2.5]").bins(1.0, 0.0).expect("bins");
    assert_eq!(bins, vec![fspan("[0.5, 1)"), fspan("[1, 2)"), fspan("[2, 2.5]")]);

    // the last bin runs past the greatest int
    let bins = ispan("[2147483600, 2147483646]").bins(100, 0).expect("bins");
    assert_eq!(bins, vec![ispan("[2147483600, 2147483646]")]);
    let bins = ispan("[2147483500, 2147483647]").bins(100, 0).expect("bins");
    assert_eq!(bins, vec![ispan("[2147483500, 2147483600)"), ispan("[2147483600, 2147483647]")]);

    let err = fspan("[1e17, 1.0000000000000064e17]").bins(1.0, 0.0).expect_err("step below the float resolution");
    assert!(matches!(err, MeosError::InvalidArgValue(_)), "unexpected error {:?}", err);
    for size in [0.0, -1.0] {
        let err = fspan("[1, 2]").bins(size, 0.0).expect_err("bin size must be positive");
        assert!(matches!(err, MeosError::InvalidArgValue(_)), "unexpected error {:?}", err);
    }
    assert!(matches!(ispan("[1, 10)").bins(0, 0), Err(MeosError::InvalidArgValue(_))));
}
