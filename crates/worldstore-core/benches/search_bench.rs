//! Worldstore Search Benchmarks
//!
//! Benchmarks for the search hot paths using Criterion.
//! Run with: cargo bench -p worldstore-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use worldstore_core::search::{reciprocal_rank_fusion, sanitize_fts5_query};
use worldstore_core::skolem::Skolemizer;

fn bench_rrf_fusion(c: &mut Criterion) {
    // Two overlapping rankings of 50 chunk ids each.
    let keyword_ranked: Vec<i64> = (0..50).collect();
    let vector_ranked: Vec<i64> = (25..75).collect();

    c.bench_function("rrf_50x50", |b| {
        b.iter(|| {
            black_box(reciprocal_rank_fusion(
                &keyword_ranked,
                &vector_ranked,
                60.0,
            ));
        })
    });
}

fn bench_sanitize_fts5(c: &mut Criterion) {
    c.bench_function("sanitize_fts5_query", |b| {
        b.iter(|| {
            black_box(sanitize_fts5_query(
                "hello world \"exact phrase\" OR special-chars!@#",
            ));
        })
    });
}

fn bench_skolemize_batch(c: &mut Criterion) {
    // 100 quads referencing 20 distinct blank labels.
    let labels: Vec<String> = (0..100).map(|i| format!("b{}", i % 20)).collect();

    c.bench_function("skolemize_100_labels", |b| {
        b.iter(|| {
            let mut skolemizer = Skolemizer::new();
            for label in &labels {
                black_box(skolemizer.resolve(label));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_rrf_fusion,
    bench_sanitize_fts5,
    bench_skolemize_batch,
);
criterion_main!(benches);
