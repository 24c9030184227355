use meos::rtree::RTree;
use meos::span::{FloatSpan, IntSpan, SpanOps, TstzSpan};
use meos::spatial::point::Point;
use meos::stbox::STBox;
use meos::tbox::TBox;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn sorted(mut ids: Vec<usize>) -> Vec<usize> {
    ids.sort_unstable();
    ids
}

#[test]
fn empty_tree_finds_nothing() {
    let tree: RTree<IntSpan> = RTree::new();
    assert!(tree.is_empty());
    let query = IntSpan::parse("[1, 10]").expect("span");
    assert!(tree.search(&query).is_empty());
}

#[test]
fn int_spans_before_and_after_splits() {
    let mut tree = RTree::new();
    for k in 0..5 {
        let span = IntSpan::make(k * 10, k * 10 + 5, true, true).expect("span");
        tree.insert(span, k as usize);
    }
    let query = IntSpan::parse("[12, 31]").expect("span");
    assert_eq!(sorted(tree.search(&query)), vec![1, 2, 3]);

    // past the node capacity the root splits
    for k in 5..40 {
        let span = IntSpan::make(k * 10, k * 10 + 5, true, true).expect("span");
        tree.insert(span, k as usize);
    }
    assert_eq!(tree.len(), 40);
    assert_eq!(sorted(tree.search(&query)), vec![1, 2, 3]);
    let query = IntSpan::parse("[0, 400)").expect("span");
    assert_eq!(tree.search(&query).len(), 40);
    let query = IntSpan::parse("[6, 9]").expect("span");
    assert!(tree.search(&query).is_empty());
}

#[test]
fn float_spans_match_a_linear_scan() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut spans = vec![];
    let mut tree = RTree::new();
    for id in 0..300 {
        let lower: f64 = rng.gen_range(0.0..1000.0);
        let width: f64 = rng.gen_range(0.5..20.0);
        let span = FloatSpan::make(lower, lower + width, true, false).expect("span");
        tree.insert(span, id);
        spans.push(span);
    }
    for _ in 0..50 {
        let lower: f64 = rng.gen_range(0.0..1000.0);
        let query = FloatSpan::make(lower, lower + 15.0, true, true).expect("span");
        let expected: Vec<usize> = spans
            .iter()
            .enumerate()
            .filter(|(_, s)| s.overlaps(&query))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(sorted(tree.search(&query)), expected);
    }
}

#[test]
fn tboxes_by_value_and_time() {
    let mut tree = RTree::new();
    for day in 1..=20 {
        let text = format!(
            "TBOXFLOAT XT([{}, {}],[2020-01-{:02}, 2020-01-{:02}])",
            day,
            day + 1,
            day,
            day + 1
        );
        tree.insert(TBox::parse(&text).expect("tbox"), day as usize);
    }
    let query = TBox::parse("TBOXFLOAT XT([5.5, 7.5],[2020-01-01, 2020-01-31])").expect("tbox");
    assert_eq!(sorted(tree.search(&query)), vec![5, 6, 7]);
    // value overlaps but time does not
    let query = TBox::parse("TBOXFLOAT XT([5.5, 7.5],[2020-02-01, 2020-02-02])").expect("tbox");
    assert!(tree.search(&query).is_empty());
    // a time-only query ignores the values
    let period = TstzSpan::parse("[2020-01-10 12:00:00+00, 2020-01-10 13:00:00+00]").expect("period");
    let query = TBox::from_tstzspan(period);
    assert_eq!(sorted(tree.search(&query)), vec![10]);
}

#[test]
fn stboxes_match_a_linear_scan() {
    let mut rng = SmallRng::seed_from_u64(11);
    let mut boxes = vec![];
    let mut tree = RTree::new();
    for id in 0..200 {
        let (x, y): (f64, f64) = (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        let bbox = STBox::from_point(&Point::new(x, y)).expand_space(rng.gen_range(0.1..3.0)).expect("expand");
        tree.insert(bbox, id);
        boxes.push(bbox);
    }
    for _ in 0..30 {
        let (x, y): (f64, f64) = (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        let query = STBox::from_point(&Point::new(x, y)).expand_space(10.0).expect("expand");
        let expected: Vec<usize> = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.overlaps(&query))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(sorted(tree.search(&query)), expected);
    }
}
