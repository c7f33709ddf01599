//! Report assembly.
//!
//! [`Report::build`] turns category results plus an optional comparison into
//! a structured, order-preserving report. The renderers in the submodules
//! are pure functions of that structure; the only time-dependent field is
//! [`ReportMeta::generated_at`], supplied by the caller.

mod html;
mod json;
mod text;

pub use html::render_html;
pub use json::{render_json, results_document};
pub use text::{render_regressions, render_summary_only};

use serde::{Deserialize, Serialize};

use crate::schema::{total_tests, CategoryResult, Comparison, FasterSide, ProcessPair, RunMeta};

/// Below this absolute percent difference a slower candidate is "similar".
pub const SIMILAR_THRESHOLD_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub title: String,
    /// Embedded verbatim; the only non-deterministic input.
    pub generated_at: String,
    pub candidate_label: String,
    pub baseline_label: String,
    pub run: Option<RunMeta>,
}

impl ReportMeta {
    pub fn new(generated_at: impl Into<String>) -> Self {
        Self {
            title: "Runtime Performance Report".to_string(),
            generated_at: generated_at.into(),
            candidate_label: "Candidate".to_string(),
            baseline_label: "Baseline".to_string(),
            run: None,
        }
    }

    pub fn with_labels(mut self, candidate: impl Into<String>, baseline: impl Into<String>) -> Self {
        self.candidate_label = candidate.into();
        self.baseline_label = baseline.into();
        self
    }

    pub fn with_run(mut self, run: RunMeta) -> Self {
        self.run = Some(run);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Faster,
    Similar,
    Slower,
}

impl Classification {
    /// Candidate wins → faster; otherwise similar inside the threshold.
    pub fn classify(faster: FasterSide, percent_diff: f64) -> Self {
        if faster == FasterSide::Candidate {
            Classification::Faster
        } else if percent_diff.abs() < SIMILAR_THRESHOLD_PERCENT {
            Classification::Similar
        } else {
            Classification::Slower
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Faster => "faster",
            Classification::Similar => "similar",
            Classification::Slower => "slower",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Classification::Faster => "Faster",
            Classification::Similar => "Similar",
            Classification::Slower => "Slower",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_categories: usize,
    pub total_tests: usize,
    pub compared_tests: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowComparison {
    pub classification: Classification,
    pub percent_diff: f64,
    pub baseline_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub name: String,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub comparison: Option<RowComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub data: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub id: String,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub category: String,
    pub rows: Vec<ReportRow>,
    pub chart: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub meta: ReportMeta,
    pub summary: ReportSummary,
    /// True when a comparison was supplied (even an empty one).
    pub has_comparison: bool,
    pub sections: Vec<ReportSection>,
    /// Process runs that did not succeed; listed after the sections.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_runs: Vec<FailedRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRun {
    pub workload_file: String,
    pub runtime_label: String,
    pub error: String,
}

impl Report {
    pub fn build(categories: &[CategoryResult], comparison: Option<&Comparison>, meta: ReportMeta) -> Self {
        let summary = ReportSummary {
            total_categories: categories.len(),
            total_tests: total_tests(categories),
            compared_tests: comparison.map_or(0, |c| c.summary.compared),
        };

        let sections = categories
            .iter()
            .enumerate()
            .map(|(idx, cat)| build_section(idx, cat, comparison, &meta))
            .collect();

        Self {
            meta,
            summary,
            has_comparison: comparison.is_some(),
            sections,
            failed_runs: Vec::new(),
        }
    }

    /// Attach every unsuccessful run in `pairs`, candidate side first.
    pub fn with_failed_runs(mut self, pairs: &[ProcessPair]) -> Self {
        self.failed_runs = pairs
            .iter()
            .flat_map(|p| p.candidate.iter().chain(&p.baseline))
            .filter(|r| !r.succeeded)
            .map(|r| FailedRun {
                workload_file: r.workload_file.clone(),
                runtime_label: r.runtime_label.clone(),
                error: r.error_message.clone().unwrap_or_else(|| "unknown error".to_string()),
            })
            .collect();
        self
    }
}

fn build_section(
    idx: usize,
    cat: &CategoryResult,
    comparison: Option<&Comparison>,
    meta: &ReportMeta,
) -> ReportSection {
    let lookup = |name: &str| comparison.and_then(|c| c.record_for(&cat.category, name));

    let rows: Vec<ReportRow> = cat
        .tests
        .iter()
        .map(|t| {
            let row_cmp = lookup(&t.name).and_then(|rec| {
                let base = rec.baseline?;
                let pd = rec.percent_diff?;
                let faster = rec.faster_label?;
                Some(RowComparison {
                    classification: Classification::classify(faster, pd),
                    percent_diff: pd,
                    baseline_mean: base.mean,
                })
            });
            ReportRow {
                name: t.name.clone(),
                mean: t.mean,
                median: t.median,
                min: t.min,
                max: t.max,
                stddev: t.stddev,
                comparison: row_cmp,
            }
        })
        .collect();

    let mut series = vec![ChartSeries {
        label: meta.candidate_label.clone(),
        data: cat.tests.iter().map(|t| Some(t.mean)).collect(),
    }];
    if comparison.is_some() {
        let base: Vec<Option<f64>> = cat
            .tests
            .iter()
            .map(|t| lookup(&t.name).and_then(|r| r.baseline).map(|b| b.mean))
            .collect();
        if base.iter().any(Option::is_some) {
            series.push(ChartSeries {
                label: meta.baseline_label.clone(),
                data: base,
            });
        }
    }

    ReportSection {
        category: cat.category.clone(),
        rows,
        chart: ChartData {
            id: chart_id(idx, &cat.category),
            labels: cat.tests.iter().map(|t| t.name.clone()).collect(),
            series,
        },
    }
}

/// Stable DOM id: index prefix keeps ids unique when slugs collide.
fn chart_id(idx: usize, category: &str) -> String {
    let mut slug = String::with_capacity(category.len());
    let mut dash = false;
    for ch in category.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    format!("chart-{idx}-{slug}")
}
