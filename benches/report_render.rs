//! Report assembly and rendering cost for growing result sets.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use runtime_bench::compare::compare;
use runtime_bench::report::{render_html, render_json, results_document, Report, ReportMeta};
use runtime_bench::schema::{CategoryResult, WorkloadResult};

fn categories(count: usize, tests: usize, scale: f64) -> Vec<CategoryResult> {
    (0..count)
        .map(|c| CategoryResult {
            category: format!("Category <{c}>"),
            tests: (0..tests)
                .map(|t| {
                    let base = (t + 1) as f64 * scale;
                    WorkloadResult::from_samples(format!("test & {t}"), 0, vec![base, base * 1.1, base * 0.9], None)
                })
                .collect(),
        })
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_render");
    for tests in [10usize, 100, 500] {
        let cand = categories(3, tests, 1.0);
        let base = categories(3, tests, 1.2);
        let cmp = compare(&cand, Some(base.as_slice()));
        let meta = ReportMeta::new("2026-01-01T00:00:00+00:00");

        group.bench_with_input(BenchmarkId::new("build", tests), &tests, |b, _| {
            b.iter(|| Report::build(black_box(&cand), Some(&cmp), meta.clone()))
        });

        let report = Report::build(&cand, Some(&cmp), meta.clone());
        group.bench_with_input(BenchmarkId::new("html", tests), &report, |b, report| {
            b.iter(|| render_html(black_box(report)))
        });

        let doc = results_document(&report, &cand, Some(&cmp), None);
        group.bench_with_input(BenchmarkId::new("json", tests), &doc, |b, doc| {
            b.iter(|| render_json(black_box(doc)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
