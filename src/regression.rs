//! Baseline files and regression gating for CI.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::report::{render_regressions, render_summary_only};
use crate::schema::{CategoryResult, ResultsDocument, WorkloadResult};

pub const DEFAULT_THRESHOLD_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    pub category: String,
    pub name: String,
    pub baseline_mean: f64,
    pub current_mean: f64,
    pub percent_change: f64,
}

/// Tests whose mean grew by more than `threshold_percent` over the baseline.
///
/// Baseline names are matched regardless of category (last write wins).
/// Tests with no samples, a non-positive mean, or no baseline counterpart
/// are skipped.
pub fn detect_regressions(
    current: &[CategoryResult],
    baseline: &[CategoryResult],
    threshold_percent: f64,
) -> Vec<Regression> {
    let usable = |t: &WorkloadResult| !t.is_empty() && t.mean > 0.0;

    let lookup: HashMap<&str, f64> = baseline
        .iter()
        .flat_map(|c| c.tests.iter())
        .filter(|t| usable(t))
        .map(|t| (t.name.as_str(), t.mean))
        .collect();

    let factor = 1.0 + threshold_percent / 100.0;
    let mut out = Vec::new();
    for category in current {
        for test in category.tests.iter().filter(|t| usable(t)) {
            let Some(&base) = lookup.get(test.name.as_str()) else {
                continue;
            };
            if test.mean > base * factor {
                out.push(Regression {
                    category: category.category.clone(),
                    name: test.name.clone(),
                    baseline_mean: base,
                    current_mean: test.mean,
                    percent_change: (test.mean - base) / base * 100.0,
                });
            }
        }
    }
    out
}

pub fn save_baseline(doc: &ResultsDocument, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(doc)?;
    json.push('\n');
    fs::write(path, json)?;
    tracing::info!(path = %path.display(), "saved baseline");
    Ok(())
}

/// `Ok(None)` when the file does not exist or holds no results. A file that
/// exists but does not parse is an error.
pub fn load_baseline(path: &Path) -> Result<Option<ResultsDocument>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let doc: ResultsDocument = serde_json::from_str(&raw)?;
    if doc.results.iter().all(|c| c.tests.is_empty()) {
        return Ok(None);
    }
    Ok(Some(doc))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CiOutcome {
    pub success: bool,
    pub baseline_saved: bool,
    pub regressions: Vec<Regression>,
    pub report: String,
}

/// Gate `current` against the baseline at `baseline_path`. Without a usable
/// baseline, `current` becomes the baseline and the gate passes.
pub fn run_ci(current: &ResultsDocument, baseline_path: &Path, threshold_percent: f64) -> Result<CiOutcome> {
    let summary = render_summary_only(&current.results);

    let Some(baseline) = load_baseline(baseline_path)? else {
        save_baseline(current, baseline_path)?;
        return Ok(CiOutcome {
            success: true,
            baseline_saved: true,
            regressions: Vec::new(),
            report: format!("No baseline found; saving current as baseline.\n{summary}"),
        });
    };

    let regressions = detect_regressions(&current.results, &baseline.results, threshold_percent);
    let mut report = summary;
    if !regressions.is_empty() {
        report.push('\n');
        report.push_str(&render_regressions(&regressions, threshold_percent));
        for r in &regressions {
            tracing::warn!(
                category = %r.category,
                test = %r.name,
                baseline_ms = r.baseline_mean,
                current_ms = r.current_mean,
                "performance regression"
            );
        }
    }

    Ok(CiOutcome {
        success: regressions.is_empty(),
        baseline_saved: false,
        regressions,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cat(name: &str, tests: &[(&str, f64)]) -> CategoryResult {
        CategoryResult {
            category: name.to_string(),
            tests: tests
                .iter()
                .map(|(n, m)| WorkloadResult::from_samples(*n, 0, vec![*m], None))
                .collect(),
        }
    }

    fn doc(results: Vec<CategoryResult>) -> ResultsDocument {
        ResultsDocument {
            timestamp: "2026-01-01T00:00:00Z".into(),
            results,
            comparison: None,
            process_runs: None,
            run: None,
        }
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let base = vec![cat("A", &[("x", 100.0)])];
        let at = vec![cat("A", &[("x", 110.0)])];
        let over = vec![cat("A", &[("x", 110.5)])];
        assert!(detect_regressions(&at, &base, 10.0).is_empty());
        let r = detect_regressions(&over, &base, 10.0);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].name, "x");
        assert!((r[0].percent_change - 10.5).abs() < 1e-9);
    }

    #[test]
    fn unmatched_and_empty_tests_are_skipped() {
        let base = vec![cat("A", &[("x", 1.0)]), CategoryResult::new("Empty")];
        let mut current = vec![cat("A", &[("new", 500.0)])];
        current[0].push(WorkloadResult::from_samples("x", 0, Vec::new(), None));
        assert!(detect_regressions(&current, &base, 0.0).is_empty());
    }

    #[test]
    fn missing_baseline_is_saved_and_passes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("baseline.json");
        let current = doc(vec![cat("A", &[("x", 5.0)])]);

        let out = run_ci(&current, &path, 10.0).unwrap();
        assert!(out.success);
        assert!(out.baseline_saved);
        assert!(out.report.starts_with("No baseline found"));
        assert_eq!(load_baseline(&path).unwrap(), Some(current));
    }

    #[test]
    fn regression_fails_the_gate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        save_baseline(&doc(vec![cat("A", &[("x", 5.0), ("y", 5.0)])]), &path).unwrap();

        let current = doc(vec![cat("A", &[("x", 50.0), ("y", 5.0)])]);
        let out = run_ci(&current, &path, 10.0).unwrap();
        assert!(!out.success);
        assert!(!out.baseline_saved);
        assert_eq!(out.regressions.len(), 1);
        assert!(out.report.contains("REGRESSIONS"));
        assert!(out.report.contains("  - x"));
    }

    #[test]
    fn corrupt_baseline_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        fs::write(&path, "not json").unwrap();
        assert!(load_baseline(&path).is_err());
    }
}
