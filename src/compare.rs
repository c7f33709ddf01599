//! Candidate vs baseline join by test name.

use std::collections::HashMap;

use crate::schema::{
    total_tests, CategoryResult, Comparison, ComparisonRecord, ComparisonSummary, FasterSide,
    WorkloadResult,
};

/// Join candidate results against an optional baseline.
///
/// Baseline names are looked up globally (category is ignored on the
/// baseline side); if a name repeats, the last occurrence wins. Every
/// candidate test yields exactly one record, in category-then-insertion
/// order. Tests without a baseline counterpart get `baseline: None`.
pub fn compare(candidate: &[CategoryResult], baseline: Option<&[CategoryResult]>) -> Comparison {
    let Some(baseline) = baseline else {
        return Comparison {
            summary: ComparisonSummary {
                candidate_tests: total_tests(candidate),
                baseline_tests: 0,
                compared: 0,
            },
            records: Vec::new(),
        };
    };

    let mut lookup: HashMap<&str, &WorkloadResult> = HashMap::new();
    for test in baseline.iter().flat_map(|c| c.tests.iter()) {
        lookup.insert(test.name.as_str(), test);
    }

    let mut records = Vec::with_capacity(total_tests(candidate));
    let mut compared = 0;
    for category in candidate {
        for test in &category.tests {
            let record = match lookup.get(test.name.as_str()) {
                Some(base) => {
                    compared += 1;
                    joined_record(&category.category, test, base)
                }
                None => candidate_only(&category.category, test),
            };
            records.push(record);
        }
    }

    Comparison {
        summary: ComparisonSummary {
            candidate_tests: total_tests(candidate),
            baseline_tests: total_tests(baseline),
            compared,
        },
        records,
    }
}

fn joined_record(category: &str, candidate: &WorkloadResult, base: &WorkloadResult) -> ComparisonRecord {
    let ratio = candidate.mean / base.mean;
    let percent_diff = (candidate.mean - base.mean) / base.mean * 100.0;
    let faster = faster_side(ratio);
    ComparisonRecord {
        name: candidate.name.clone(),
        category: category.to_string(),
        candidate: candidate.stat_summary(),
        baseline: Some(base.stat_summary()),
        ratio: Some(ratio),
        percent_diff: Some(percent_diff),
        faster_label: Some(faster),
        speedup_factor: Some(speedup_factor(ratio)),
    }
}

fn candidate_only(category: &str, candidate: &WorkloadResult) -> ComparisonRecord {
    ComparisonRecord {
        name: candidate.name.clone(),
        category: category.to_string(),
        candidate: candidate.stat_summary(),
        baseline: None,
        ratio: None,
        percent_diff: None,
        faster_label: None,
        speedup_factor: None,
    }
}

/// Strict `<`: an exact tie counts as the baseline being faster.
pub fn faster_side(ratio: f64) -> FasterSide {
    if ratio < 1.0 {
        FasterSide::Candidate
    } else {
        FasterSide::Baseline
    }
}

pub fn speedup_factor(ratio: f64) -> f64 {
    if ratio < 1.0 {
        1.0 / ratio
    } else {
        ratio
    }
}
