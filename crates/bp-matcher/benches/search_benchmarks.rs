//! Search-loop benchmarks: literal scanning with and without the
//! prerequisite fast-forward, and a left-recursive grammar.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use bp_matcher::{MatchPool, SearchOptions, next_match};
use bp_parser::compile_pattern;
use bp_pattern::PatternSet;

fn haystack() -> Vec<u8> {
    let mut text = Vec::new();
    for i in 0..2_000 {
        if i % 97 == 0 {
            text.extend_from_slice(b"fn interesting_function() {\n");
        } else {
            text.extend_from_slice(b"let filler_line = some_value + another_value;\n");
        }
    }
    text
}

fn count_matches(set: &PatternSet, pat: bp_pattern::PatId, input: &[u8], opts: &SearchOptions) -> usize {
    let mut pool = MatchPool::new();
    let mut count = 0;
    let mut prev = None;
    loop {
        let m = next_match(set, &mut pool, pat, input, prev.as_ref(), None, opts);
        if let Some(p) = prev.take() {
            pool.recycle(p);
        }
        match m {
            Some(m) => {
                count += 1;
                prev = Some(m);
            }
            None => break,
        }
    }
    count
}

fn bench_literal_scan(c: &mut Criterion) {
    let input = haystack();
    let mut set = PatternSet::new();
    let pat = match compile_pattern(&mut set, b"\"interesting\" +\\I") {
        Ok(p) => p,
        Err(e) => panic!("{e}"),
    };
    let fast = SearchOptions::default();
    let slow = SearchOptions { prerequisite_scan: false, ..SearchOptions::default() };
    c.bench_function("literal_scan_with_prerequisite", |b| {
        b.iter(|| count_matches(&set, pat, black_box(&input), &fast));
    });
    c.bench_function("literal_scan_stepwise", |b| {
        b.iter(|| count_matches(&set, pat, black_box(&input), &slow));
    });
}

fn bench_left_recursion(c: &mut Criterion) {
    let mut input = b"start ".to_vec();
    for _ in 0..200 {
        input.extend_from_slice(b"ha");
    }
    let mut set = PatternSet::new();
    let pat = match compile_pattern(&mut set, b"laugh: (laugh \"ha\") / \"ha\"\nlaugh") {
        Ok(p) => p,
        Err(e) => panic!("{e}"),
    };
    let opts = SearchOptions::default();
    c.bench_function("left_recursive_growth", |b| {
        b.iter(|| count_matches(&set, pat, black_box(&input), &opts));
    });
}

criterion_group!(benches, bench_literal_scan, bench_left_recursion);
criterion_main!(benches);
