//! Run sequencing: categories, optional process comparison, report, persistence.

use std::fmt;
use std::hint::black_box;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::compare::compare;
use crate::driver::{parse_reported_categories, process_categories, Driver, DriverConfig, ProcessComparisonSummary, RuntimeSpec};
use crate::error::{BenchError, BoxError, Result};
use crate::harness::{Profile, Sampler, SamplerConfig};
use crate::persist::{file_stamp, ArtifactSink, PersistedArtifacts};
use crate::report::{render_html, render_json, results_document, Report, ReportMeta};
use crate::schema::{total_tests, CategoryResult, Comparison, ProcessPair, RunMeta};

pub type WorkloadFn = Box<dyn FnMut() -> std::result::Result<(), BoxError>>;

/// A named, fallible workload with its sampling parameters.
pub struct Workload {
    pub config: SamplerConfig,
    /// Units of work per call; enables `opsPerSecond`.
    pub units_per_iteration: Option<u64>,
    body: WorkloadFn,
}

impl Workload {
    pub fn new(config: SamplerConfig, body: impl FnMut() -> std::result::Result<(), BoxError> + 'static) -> Self {
        Self {
            config,
            units_per_iteration: None,
            body: Box::new(body),
        }
    }

    pub fn infallible<T>(config: SamplerConfig, mut body: impl FnMut() -> T + 'static) -> Self {
        Self::new(config, move || {
            black_box(body());
            Ok(())
        })
    }

    pub fn with_units(mut self, units: u64) -> Self {
        self.units_per_iteration = Some(units);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn call(&mut self) -> std::result::Result<(), BoxError> {
        (self.body)()
    }
}

impl fmt::Debug for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workload")
            .field("config", &self.config)
            .field("units_per_iteration", &self.units_per_iteration)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Category {
    pub name: String,
    pub workloads: Vec<Workload>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workloads: Vec::new(),
        }
    }

    pub fn push(&mut self, workload: Workload) {
        self.workloads.push(workload);
    }
}

/// Runtimes and workload files for the cross-process half of a run.
#[derive(Debug, Clone)]
pub struct ProcessComparisonConfig {
    /// When absent, only the baseline runtime is executed and the in-process
    /// categories stand in for the candidate.
    pub candidate: Option<RuntimeSpec>,
    pub baseline: RuntimeSpec,
    pub driver: DriverConfig,
    pub workloads: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub profile: Profile,
    pub candidate_label: String,
    pub baseline_label: String,
    pub process: Option<ProcessComparisonConfig>,
    pub persist: bool,
    /// Fixed generation time; `None` uses the current local time.
    pub generated_at: Option<DateTime<Local>>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Quick,
            candidate_label: "Candidate".to_string(),
            baseline_label: "Baseline".to_string(),
            process: None,
            persist: true,
            generated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub success: bool,
    pub total_categories: usize,
    pub total_tests: usize,
    pub compared: usize,
    pub artifact: Option<PersistedArtifacts>,
    pub error: Option<String>,
    /// Categories measured before any failure (all of them on success).
    pub completed: Vec<CategoryResult>,
    pub comparison: Option<Comparison>,
    pub process_summary: Option<ProcessComparisonSummary>,
}

impl RunOutcome {
    fn failed(completed: Vec<CategoryResult>, error: &BenchError) -> Self {
        Self {
            success: false,
            total_categories: completed.len(),
            total_tests: total_tests(&completed),
            compared: 0,
            artifact: None,
            error: Some(error.to_string()),
            completed,
            comparison: None,
            process_summary: None,
        }
    }
}

struct ProcessOutcome {
    pairs: Vec<ProcessPair>,
    baseline: Vec<CategoryResult>,
    candidate_process: Option<CategoryResult>,
    candidate_version: Option<String>,
    baseline_version: Option<String>,
}

pub struct Orchestrator<S> {
    config: OrchestratorConfig,
    sampler: Sampler,
    sink: S,
    categories: Vec<Category>,
}

impl<S: ArtifactSink> Orchestrator<S> {
    pub fn new(config: OrchestratorConfig, sampler: Sampler, sink: S) -> Self {
        Self {
            config,
            sampler,
            sink,
            categories: Vec::new(),
        }
    }

    pub fn register(&mut self, category: Category) {
        self.categories.push(category);
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Measure every registered category in order. The first workload error
    /// stops the run and nothing is persisted; categories finished before
    /// it are still returned in `completed`.
    pub fn run(&mut self) -> RunOutcome {
        let mut completed = Vec::with_capacity(self.categories.len());
        for category in &mut self.categories {
            match measure_category(&self.sampler, category) {
                Ok(result) => completed.push(result),
                Err(err) => {
                    tracing::error!(error = %err, "benchmark run aborted");
                    return RunOutcome::failed(completed, &err);
                }
            }
        }

        let process = self.config.process.as_ref().and_then(run_process_comparison);

        let mut results = completed;
        let mut run_meta = RunMeta::capture(self.config.profile.as_str());

        let (comparison, pairs, process_summary) = match process {
            Some(p) => {
                if let Some(cat) = p.candidate_process {
                    results.push(cat);
                }
                let comparison = compare(&results, Some(p.baseline.as_slice()));
                let summary = p
                    .pairs
                    .iter()
                    .any(|pair| !pair.candidate.is_empty())
                    .then(|| ProcessComparisonSummary::from_pairs(&p.pairs));
                run_meta.candidate_version = p.candidate_version;
                run_meta.baseline_version = p.baseline_version;
                (Some(comparison), Some(p.pairs), summary)
            }
            None => (None, None, None),
        };

        self.finish(results, comparison, pairs, process_summary, run_meta)
    }

    fn finish(
        &mut self,
        results: Vec<CategoryResult>,
        comparison: Option<Comparison>,
        pairs: Option<Vec<ProcessPair>>,
        process_summary: Option<ProcessComparisonSummary>,
        run_meta: RunMeta,
    ) -> RunOutcome {
        let now = self.config.generated_at.unwrap_or_else(Local::now);
        let meta = ReportMeta::new(now.to_rfc3339())
            .with_labels(&self.config.candidate_label, &self.config.baseline_label)
            .with_run(run_meta);
        let report = Report::build(&results, comparison.as_ref(), meta)
            .with_failed_runs(pairs.as_deref().unwrap_or_default());

        let mut outcome = RunOutcome {
            success: true,
            total_categories: report.summary.total_categories,
            total_tests: report.summary.total_tests,
            compared: report.summary.compared_tests,
            artifact: None,
            error: None,
            completed: Vec::new(),
            comparison: None,
            process_summary,
        };

        if self.config.persist {
            match self.persist(&report, &results, comparison.as_ref(), pairs, &file_stamp(&now)) {
                Ok(artifact) => outcome.artifact = Some(artifact),
                Err(err) => {
                    tracing::error!(error = %err, "failed to persist artifacts");
                    outcome.success = false;
                    outcome.error = Some(err.to_string());
                }
            }
        }

        outcome.completed = results;
        outcome.comparison = comparison;
        outcome
    }

    fn persist(
        &mut self,
        report: &Report,
        results: &[CategoryResult],
        comparison: Option<&Comparison>,
        pairs: Option<Vec<ProcessPair>>,
        stamp: &str,
    ) -> Result<PersistedArtifacts> {
        let html = render_html(report);
        let json = render_json(&results_document(report, results, comparison, pairs))?;
        self.sink.persist(stamp, &html, &json)
    }
}

fn measure_category(sampler: &Sampler, category: &mut Category) -> Result<CategoryResult> {
    tracing::info!(category = %category.name, workloads = category.workloads.len(), "running category");
    let mut out = CategoryResult::new(category.name.clone());

    for workload in &mut category.workloads {
        let cfg = workload.config.clone();
        let units = workload.units_per_iteration;
        let mut result = sampler.try_run(&cfg, || workload.call()).map_err(|source| {
            tracing::error!(category = %category.name, test = %cfg.name, error = %source, "workload failed");
            BenchError::measurement(&category.name, &cfg.name, source)
        })?;
        if let Some(units) = units {
            result.ops_per_second = crate::harness::ops_per_second(units, result.iterations, result.total);
        }
        out.push(result);
    }

    tracing::info!(category = %out.category, tests = out.tests.len(), "category completed");
    Ok(out)
}

/// Run the configured runtimes over the workload files. A baseline runtime
/// that cannot be located disables the comparison rather than failing the run.
fn run_process_comparison(cfg: &ProcessComparisonConfig) -> Option<ProcessOutcome> {
    if cfg.workloads.is_empty() {
        tracing::warn!("baseline runtime configured without workload files; skipping comparison");
        return None;
    }

    let baseline = match cfg.baseline.locate() {
        Ok(located) => located,
        Err(err) => {
            tracing::warn!(runtime = %cfg.baseline.label, error = %err, "baseline runtime unavailable; skipping comparison");
            return None;
        }
    };
    let baseline_version = baseline.probe_version();
    let candidate_version = cfg
        .candidate
        .as_ref()
        .and_then(|c| c.locate().ok())
        .and_then(|c| c.probe_version());

    let candidate_spec = cfg.candidate.clone().unwrap_or_else(|| cfg.baseline.clone());
    let driver = match Driver::new(candidate_spec, cfg.baseline.clone(), cfg.driver.clone()) {
        Ok(d) => d,
        Err(err) => {
            tracing::warn!(error = %err, "invalid driver configuration; skipping comparison");
            return None;
        }
    };

    let pairs: Vec<ProcessPair> = if cfg.candidate.is_some() {
        driver.compare_all(&cfg.workloads)
    } else {
        cfg.workloads
            .iter()
            .map(|file| ProcessPair {
                workload_file: file.display().to_string(),
                candidate: Vec::new(),
                baseline: (0..driver.config.repeat)
                    .map(|_| driver.run_located(file, &baseline))
                    .collect(),
            })
            .collect()
    };

    let mut baseline_categories: Vec<CategoryResult> = pairs
        .iter()
        .filter_map(|pair| pair.baseline.iter().rev().find(|r| r.succeeded))
        .filter_map(|run| parse_reported_categories(&run.stdout))
        .flatten()
        .collect();

    let candidate_process = if cfg.candidate.is_some() {
        let (cand, base) = process_categories(&pairs);
        baseline_categories.push(base);
        Some(cand)
    } else {
        None
    };

    Some(ProcessOutcome {
        pairs,
        baseline: baseline_categories,
        candidate_process,
        candidate_version,
        baseline_version,
    })
}
