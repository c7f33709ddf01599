//! Built-in workload categories so the CLI has something to measure.
//!
//! Each module builds one [`Category`]; inputs come from the seeded
//! [`BenchConfig::rng`] so runs with the same seed see the same data.

pub mod basic_types;
pub mod collections;

use crate::harness::{BenchConfig, SamplerConfig};
use crate::orchestrator::Category;
use crate::CategorySelect;

/// Categories matching `select`, in the fixed order
/// Basic Types, Collections, Concurrency. Duplicates are ignored.
pub fn builtin_categories(cfg: &BenchConfig, select: &[CategorySelect]) -> Vec<Category> {
    let want = |c: CategorySelect| {
        select.is_empty() || select.contains(&CategorySelect::All) || select.contains(&c)
    };

    let mut out = Vec::new();
    if want(CategorySelect::BasicTypes) {
        out.push(basic_types::category(cfg));
    }
    if want(CategorySelect::Collections) {
        out.push(collections::category(cfg));
    }
    if want(CategorySelect::Concurrency) {
        out.push(concurrency::category(cfg));
    }
    out
}

/// Profile counts divided by `divisor` for heavier workloads, never below one
/// iteration.
pub(crate) fn scaled(cfg: &BenchConfig, name: &str, divisor: u64) -> SamplerConfig {
    let d = divisor.max(1);
    cfg.sampler(name)
        .with_counts((cfg.iters() / d).max(1), cfg.warmup_iters() / d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Profile;

    #[test]
    fn selection_keeps_fixed_order() {
        let cfg = BenchConfig::default();
        let names = |sel: &[CategorySelect]| -> Vec<String> {
            builtin_categories(&cfg, sel).into_iter().map(|c| c.name).collect()
        };
        assert_eq!(names(&[]), ["Basic Types", "Collections", "Concurrency"]);
        assert_eq!(
            names(&[CategorySelect::Concurrency, CategorySelect::BasicTypes]),
            ["Basic Types", "Concurrency"]
        );
        assert_eq!(names(&[CategorySelect::Collections, CategorySelect::All]).len(), 3);
    }

    #[test]
    fn scaled_counts_floor_at_one() {
        let cfg = BenchConfig {
            profile: Profile::Quick,
            seed: 1,
        };
        let s = scaled(&cfg, "heavy", 1_000);
        assert_eq!(s.iterations, 1);
        assert_eq!(s.warmup, 0);
        assert_eq!(scaled(&cfg, "x", 2).iterations, cfg.iters() / 2);
    }

    #[test]
    fn every_builtin_workload_runs_once() {
        let cfg = BenchConfig::default();
        for mut category in builtin_categories(&cfg, &[]) {
            assert!(!category.workloads.is_empty(), "{} is empty", category.name);
            for w in &mut category.workloads {
                w.call().unwrap_or_else(|e| panic!("{}: {e}", w.name()));
            }
        }
    }
}
