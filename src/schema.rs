use serde::{Deserialize, Serialize};

use crate::capabilities::MemoryDelta;
use crate::stats::Summary;

pub const SCHEMA_VERSION: u32 = 1;

/// Statistics for one timed workload. Durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadResult {
    pub name: String,
    pub iterations: u64,
    pub warmup: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub total: f64,
    #[serde(default)]
    pub samples: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_delta: Option<MemoryDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops_per_second: Option<f64>,
}

impl WorkloadResult {
    /// Build a result from raw samples. With no samples every statistic is
    /// zero and the memory delta is dropped.
    pub fn from_samples(
        name: impl Into<String>,
        warmup: u64,
        samples: Vec<f64>,
        memory_delta: Option<MemoryDelta>,
    ) -> Self {
        let s = Summary::from_samples(&samples);
        let memory_delta = if samples.is_empty() { None } else { memory_delta };
        Self {
            name: name.into(),
            iterations: samples.len() as u64,
            warmup,
            min: s.min,
            max: s.max,
            mean: s.mean,
            median: s.median,
            stddev: s.stddev,
            total: s.total,
            samples,
            memory_delta,
            ops_per_second: None,
        }
    }

    /// True when nothing was measured.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.iterations == 0
    }

    pub fn stat_summary(&self) -> StatSummary {
        StatSummary {
            mean: self.mean,
            median: self.median,
            min: self.min,
            max: self.max,
            stddev: self.stddev,
        }
    }
}

/// Ordered results of one workload category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category: String,
    #[serde(default)]
    pub tests: Vec<WorkloadResult>,
}

impl CategoryResult {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            tests: Vec::new(),
        }
    }

    pub fn push(&mut self, result: WorkloadResult) {
        self.tests.push(result);
    }
}

pub fn total_tests(categories: &[CategoryResult]) -> usize {
    categories.iter().map(|c| c.tests.len()).sum()
}

/// Outcome of one runtime process invocation.
///
/// `duration_ms` is `-1` whenever `succeeded` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRunResult {
    pub runtime_label: String,
    pub workload_file: String,
    pub duration_ms: f64,
    pub stdout: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_sha256: Option<String>,
}

impl ProcessRunResult {
    pub const FAILED_DURATION_MS: f64 = -1.0;

    pub fn failure(
        runtime_label: impl Into<String>,
        workload_file: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            runtime_label: runtime_label.into(),
            workload_file: workload_file.into(),
            duration_ms: Self::FAILED_DURATION_MS,
            stdout: String::new(),
            succeeded: false,
            error_message: Some(error_message.into()),
            workload_sha256: None,
        }
    }

    /// Duration usable as a timing sample.
    pub fn sample(&self) -> Option<f64> {
        (self.succeeded && self.duration_ms >= 0.0).then_some(self.duration_ms)
    }
}

/// Candidate and baseline runs of the same workload file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPair {
    pub workload_file: String,
    /// One entry per repetition, in execution order.
    pub candidate: Vec<ProcessRunResult>,
    pub baseline: Vec<ProcessRunResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FasterSide {
    Candidate,
    Baseline,
}

impl FasterSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            FasterSide::Candidate => "candidate",
            FasterSide::Baseline => "baseline",
        }
    }
}

/// Joined candidate/baseline statistics for one named test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRecord {
    pub name: String,
    pub category: String,
    pub candidate: StatSummary,
    pub baseline: Option<StatSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_diff: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faster_label: Option<FasterSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speedup_factor: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub candidate_tests: usize,
    pub baseline_tests: usize,
    pub compared: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub summary: ComparisonSummary,
    pub records: Vec<ComparisonRecord>,
}

impl Comparison {
    /// Joined record for `name` within `category`, if any.
    pub fn record_for(&self, category: &str, name: &str) -> Option<&ComparisonRecord> {
        self.records
            .iter()
            .filter(|r| r.category == category && r.name == name)
            .last()
    }
}

/// Host and tool metadata embedded in every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub os: String,
    pub arch: String,
    pub cpu_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_version: Option<String>,
}

impl RunMeta {
    pub fn capture(profile: &str) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            bench_version: env!("CARGO_PKG_VERSION").to_string(),
            profile: profile.to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: std::thread::available_parallelism().map_or(1, |n| n.get()),
            git_sha: git_sha_short(),
            candidate_version: None,
            baseline_version: None,
        }
    }
}

fn git_sha_short() -> Option<String> {
    // Best-effort: read from environment set by CI/build scripts.
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

/// Machine-readable mirror of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsDocument {
    pub timestamp: String,
    pub results: Vec<CategoryResult>,
    pub comparison: Option<Comparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_runs: Option<Vec<ProcessPair>>,
    #[serde(default, rename = "environment", skip_serializing_if = "Option::is_none")]
    pub run: Option<RunMeta>,
}
