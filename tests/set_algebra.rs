use meos::MeosError;
use meos::set::{FloatSet, IntSet, TextSet, TstzSet};
use meos::span::SpanOps;

fn iset(text: &str) -> IntSet {
    IntSet::parse(text).expect("valid int set")
}

#[test]
fn sets_are_sorted_and_unique() {
    let set = iset("{3, 1, 2, 3}");
    assert_eq!(set.to_string(), "{1, 2, 3}");
    assert_eq!(set.num_values(), 3);
    assert_eq!(*set.start_value(), 1);
    assert_eq!(*set.end_value(), 3);
    assert_eq!(set.value_n(1), Some(&2));
}

#[test]
fn empty_and_malformed_sets_fail() {
    assert!(matches!(IntSet::make(vec![]), Err(MeosError::InvalidArg(_))));
    let err = IntSet::parse("{1, 2").expect_err("unterminated set");
    assert!(matches!(err, MeosError::TextInput { .. }), "unexpected error {:?}", err);
    let err = IntSet::parse("{1, x}").expect_err("not a number");
    assert!(matches!(err, MeosError::TextInput { .. }), "unexpected error {:?}", err);
}

#[test]
fn set_operations() {
    let a = iset("{1, 2, 3}");
    let b = iset("{3, 4}");
    assert_eq!(a.union(&b).to_string(), "{1, 2, 3, 4}");
    assert_eq!(a.intersection(&b).expect("common value").to_string(), "{3}");
    assert_eq!(a.minus(&b).expect("remaining values").to_string(), "{1, 2}");
    assert!(a.minus(&iset("{1, 2, 3, 4}")).is_none());
    assert!(a.intersection(&iset("{7}")).is_none());
    assert!(a.contains_value(&2));
    assert!(a.overlaps_set(&b));
    assert!(iset("{1, 2}").contained_in(&a));
}

#[test]
fn set_bounding_span() {
    let set = FloatSet::parse("{1.5, 3, 2}").expect("valid float set");
    assert_eq!(set.span().to_string(), "[1.5, 3]");
    assert!(set.overlaps(&meos::span::FloatSpan::parse("[2.5, 10]").expect("valid span")));
}

#[test]
fn text_sets_quote_their_values() {
    let set = TextSet::parse("{\"b\", \"a\", \"a\"}").expect("valid text set");
    assert_eq!(set.to_string(), "{\"a\", \"b\"}");
    assert_eq!(set.upper().to_string(), "{\"A\", \"B\"}");
    assert_eq!(set.textcat("!").to_string(), "{\"a!\", \"b!\"}");
}

#[test]
fn timestamp_sets() {
    let set = TstzSet::parse("{2020-01-02, 2020-01-01}").expect("valid timestamp set");
    assert_eq!(set.to_string(), "{2020-01-01 00:00:00+00, 2020-01-02 00:00:00+00}");
    assert_eq!(set.to_spanset().num_spans(), 2);
}
