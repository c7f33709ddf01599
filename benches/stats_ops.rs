//! Statistics and comparison throughput.
//!
//! Covers the reductions run after every sampled workload and the join
//! performed once per report.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use runtime_bench::compare::compare;
use runtime_bench::schema::{CategoryResult, WorkloadResult};
use runtime_bench::stats::Summary;

fn samples(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0.01..50.0)).collect()
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_from_samples");
    for n in [10usize, 100, 1_000, 10_000] {
        let data = samples(n, 7);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            b.iter(|| Summary::from_samples(black_box(data)))
        });
    }
    group.finish();
}

fn categories(count: usize, tests: usize, seed: u64) -> Vec<CategoryResult> {
    (0..count)
        .map(|c| CategoryResult {
            category: format!("category-{c}"),
            tests: (0..tests)
                .map(|t| {
                    WorkloadResult::from_samples(format!("c{c}-t{t}"), 0, samples(20, seed + (c * tests + t) as u64), None)
                })
                .collect(),
        })
        .collect()
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");
    for tests in [10usize, 100, 1_000] {
        let cand = categories(4, tests, 1);
        let base = categories(4, tests, 2);
        group.throughput(Throughput::Elements((4 * tests) as u64));
        group.bench_with_input(BenchmarkId::new("joined", tests), &(cand, base), |b, (cand, base)| {
            b.iter(|| compare(black_box(cand), Some(black_box(base.as_slice()))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_summary, bench_compare);
criterion_main!(benches);
