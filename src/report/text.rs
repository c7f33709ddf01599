use std::fmt::Write as _;

use crate::regression::Regression;
use crate::schema::CategoryResult;

/// Plain-text fallback used when no artifact is written.
pub fn render_summary_only(categories: &[CategoryResult]) -> String {
    let mut out = String::from("=== Benchmark Summary ===\n");
    for category in categories {
        let _ = writeln!(out, "\n{}:", category.category);
        if category.tests.is_empty() {
            out.push_str("  (no tests)\n");
        }
        for t in &category.tests {
            let _ = writeln!(out, "  {}: {:.3}ms (mean), {:.3}ms (median)", t.name, t.mean, t.median);
        }
    }
    out
}

pub fn render_regressions(regressions: &[Regression], threshold_percent: f64) -> String {
    let mut out = format!("=== REGRESSIONS (threshold {threshold_percent:.1}%)\n");
    for r in regressions {
        let _ = writeln!(
            out,
            "  - {} [{}]: {:.3}ms -> {:.3}ms (+{:.1}%)",
            r.name, r.category, r.baseline_mean, r.current_mean, r.percent_change
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::WorkloadResult;

    #[test]
    fn summary_lists_tests_grouped_in_order() {
        let mut a = CategoryResult::new("Basic Types");
        a.push(WorkloadResult::from_samples("add", 0, vec![1.0, 2.0, 3.0], None));
        a.push(WorkloadResult::from_samples("mul", 0, vec![0.5], None));
        let b = CategoryResult::new("Collections");
        let text = render_summary_only(&[a, b]);

        let expected = "=== Benchmark Summary ===\n\nBasic Types:\n  add: 2.000ms (mean), 2.000ms (median)\n  \
                        mul: 0.500ms (mean), 0.500ms (median)\n\nCollections:\n  (no tests)\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn regression_lines() {
        let r = Regression {
            category: "A".into(),
            name: "x".into(),
            baseline_mean: 1.0,
            current_mean: 2.0,
            percent_change: 100.0,
        };
        let text = render_regressions(&[r], 10.0);
        assert_eq!(text, "=== REGRESSIONS (threshold 10.0%)\n  - x [A]: 1.000ms -> 2.000ms (+100.0%)\n");
    }
}
