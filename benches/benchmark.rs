use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use meos::agg::{tcount_transfn, temporal_tagg_finalfn, tsum_transfn};
use meos::rtree::RTree;
use meos::span::FloatSpan;
use meos::temporal::{TFloat, TInt};

fn ramp_text(n: usize) -> String {
    let instants: Vec<String> = (0..n)
        .map(|k| format!("{}@2020-01-01 {:02}:{:02}:00+00", (k * 7) % 13, k / 60 % 24, k % 60))
        .collect();
    format!("[{}]", instants.join(", "))
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = ramp_text(1000);
    c.bench_function("parse tfloat 1k", |b| b.iter(|| TFloat::parse(black_box(&text))));

    let temp = TFloat::parse(&text).expect("valid temporal float");
    c.bench_function("output tfloat 1k", |b| b.iter(|| black_box(&temp).to_string()));
    c.bench_function("tgt tfloat 1k", |b| b.iter(|| black_box(&temp).tgt(&6.5)));
    let other = temp.shift_time(&meos::time::Interval::from_micros(30_000_000)).expect("shifted");
    c.bench_function("add tfloat 1k", |b| b.iter(|| black_box(&temp).add(&other)));

    let ints: Vec<TInt> = (0..200)
        .map(|k| TInt::parse(&format!("[1@2020-01-01 00:{:02}:00+00, 2@2020-01-01 02:{:02}:00+00]", k % 60, k % 60)))
        .collect::<meos::Result<_>>()
        .expect("valid temporal ints");
    c.bench_function("tcount 200", |b| {
        b.iter(|| {
            let mut state = None;
            for temp in &ints {
                state = tcount_transfn(state, temp).ok();
            }
            temporal_tagg_finalfn(state)
        })
    });
    c.bench_function("tsum 200", |b| {
        b.iter(|| {
            let mut state = None;
            for temp in &ints {
                state = tsum_transfn(state, temp).ok();
            }
            temporal_tagg_finalfn(state)
        })
    });

    let spans: Vec<FloatSpan> = (0..10_000)
        .map(|k| FloatSpan::make(k as f64, k as f64 + 5.0, true, true))
        .collect::<meos::Result<_>>()
        .expect("valid spans");
    c.bench_function("rtree insert 10k", |b| {
        b.iter(|| {
            let mut tree = RTree::new();
            for (id, span) in spans.iter().enumerate() {
                tree.insert(*span, id);
            }
            tree
        })
    });
    let mut tree = RTree::new();
    for (id, span) in spans.iter().enumerate() {
        tree.insert(*span, id);
    }
    let query = FloatSpan::make(5000.0, 5010.0, true, true).expect("valid span");
    c.bench_function("rtree search 10k", |b| b.iter(|| tree.search(black_box(&query))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
