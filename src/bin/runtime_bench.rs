use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::Local;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use runtime_bench::benches::builtin_categories;
use runtime_bench::capabilities::Capabilities;
use runtime_bench::compare::compare;
use runtime_bench::driver::{discover_workloads, process_categories, Driver, DriverConfig, ProcessComparisonSummary, RuntimeSpec};
use runtime_bench::harness::{BenchConfig, Profile, Sampler};
use runtime_bench::logging::{init_logging, LogFormat};
use runtime_bench::orchestrator::{Orchestrator, OrchestratorConfig, ProcessComparisonConfig, RunOutcome};
use runtime_bench::persist::{file_stamp, ArtifactSink, FsArtifactSink, MemorySink};
use runtime_bench::regression::{run_ci, DEFAULT_THRESHOLD_PERCENT};
use runtime_bench::report::{render_html, render_json, render_summary_only, results_document, Report, ReportMeta};
use runtime_bench::schema::{ResultsDocument, RunMeta};
use runtime_bench::suite::Suite;
use runtime_bench::{BenchError, CategorySelect, Result};

const DEFAULT_RESULTS_DIR: &str = "results";
const DEFAULT_EXTENSIONS: &[&str] = &["js"];

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct RunArgs {
    /// Directory for report_<stamp>.html and results_<stamp>.json.
    #[arg(long, value_name = "DIR", env = "RUNTIME_BENCH_RESULTS_DIR", default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Built-in categories to run. Repeatable; defaults to all.
    #[arg(long, value_enum, action = clap::ArgAction::Append)]
    category: Vec<CategorySelect>,

    #[arg(long, env = "RUNTIME_BENCH_CANDIDATE_LABEL", default_value = "Candidate")]
    candidate_label: String,

    #[arg(long, env = "RUNTIME_BENCH_BASELINE_LABEL", default_value = "Baseline")]
    baseline_label: String,

    /// Runtime executable to compare against (name on PATH or a path).
    #[arg(long, value_name = "CMD", env = "RUNTIME_BENCH_BASELINE_RUNTIME")]
    baseline_runtime: Option<String>,

    /// Also time whole-process runs of the workload files under this runtime.
    #[arg(long, value_name = "CMD", env = "RUNTIME_BENCH_CANDIDATE_RUNTIME")]
    candidate_runtime: Option<String>,

    #[command(flatten)]
    workloads: WorkloadArgs,

    #[command(flatten)]
    process: ProcessArgs,

    /// Print the console summary instead of writing artifacts.
    #[arg(long, default_value_t = false)]
    no_persist: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            results_dir: std::env::var_os("RUNTIME_BENCH_RESULTS_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR), PathBuf::from),
            category: Vec::new(),
            candidate_label: "Candidate".to_string(),
            baseline_label: "Baseline".to_string(),
            baseline_runtime: std::env::var("RUNTIME_BENCH_BASELINE_RUNTIME").ok(),
            candidate_runtime: std::env::var("RUNTIME_BENCH_CANDIDATE_RUNTIME").ok(),
            workloads: WorkloadArgs::default(),
            process: ProcessArgs::default(),
            no_persist: false,
        }
    }
}

#[derive(ClapArgs, Debug, Clone, Default)]
struct WorkloadArgs {
    /// Workload file to hand to the runtimes. Repeatable.
    #[arg(long, value_name = "FILE", action = clap::ArgAction::Append)]
    workload: Vec<PathBuf>,

    /// Suite file: a name line followed by one workload path per line.
    #[arg(long, value_name = "FILE")]
    suite: Option<PathBuf>,

    /// Directory searched recursively for workload files.
    #[arg(long, value_name = "DIR")]
    workload_dir: Option<PathBuf>,

    /// File extensions picked up by --workload-dir (default: js).
    #[arg(long = "extension", value_name = "EXT", action = clap::ArgAction::Append)]
    extensions: Vec<String>,
}

impl WorkloadArgs {
    fn resolve(&self) -> Result<Vec<PathBuf>> {
        let mut files = self.workload.clone();
        if let Some(path) = &self.suite {
            let suite = Suite::load(path)?;
            tracing::info!(suite = %suite.name, files = suite.files.len(), "using suite");
            files.extend(suite.files);
        }
        if let Some(dir) = &self.workload_dir {
            let exts: Vec<&str> = if self.extensions.is_empty() {
                DEFAULT_EXTENSIONS.to_vec()
            } else {
                self.extensions.iter().map(String::as_str).collect()
            };
            files.extend(discover_workloads(dir, &exts)?);
        }
        Ok(files)
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct ProcessArgs {
    /// Runs per runtime per workload file.
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Kill a runtime process after this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

impl Default for ProcessArgs {
    fn default() -> Self {
        Self {
            repeat: 1,
            timeout_secs: None,
        }
    }
}

impl ProcessArgs {
    fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            repeat: self.repeat,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the built-in categories, optionally compare against a baseline
    /// runtime, and write the HTML + JSON report (default).
    Run(RunArgs),

    /// Run workload files under two runtimes and compare wall-clock times.
    Compare {
        #[arg(long, value_name = "CMD", env = "RUNTIME_BENCH_CANDIDATE_RUNTIME")]
        candidate_runtime: String,

        #[arg(long, value_name = "CMD", env = "RUNTIME_BENCH_BASELINE_RUNTIME")]
        baseline_runtime: String,

        #[arg(long, default_value = "Candidate")]
        candidate_label: String,

        #[arg(long, default_value = "Baseline")]
        baseline_label: String,

        #[command(flatten)]
        workloads: WorkloadArgs,

        #[command(flatten)]
        process: ProcessArgs,

        /// Directory for report_<stamp>.html and results_<stamp>.json.
        #[arg(long, value_name = "DIR", env = "RUNTIME_BENCH_RESULTS_DIR", default_value = DEFAULT_RESULTS_DIR)]
        results_dir: PathBuf,
    },

    /// Gate the built-in categories against a saved baseline.
    Ci {
        #[arg(long, value_name = "FILE", env = "RUNTIME_BENCH_BASELINE")]
        baseline: PathBuf,

        /// Allowed slowdown in percent before a test counts as regressed.
        #[arg(long, default_value_t = DEFAULT_THRESHOLD_PERCENT)]
        threshold: f64,

        /// Also write the text report here.
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        #[arg(long, value_enum, action = clap::ArgAction::Append)]
        category: Vec<CategorySelect>,
    },

    /// Print the console summary of a saved results JSON file.
    Summary {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

#[derive(Parser, Debug)]
#[command(name = "runtime-bench")]
#[command(about = "Workload timing and cross-runtime comparison reports")]
#[command(version)]
struct Args {
    #[arg(long, value_enum, env = "RUNTIME_BENCH_PROFILE", default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    /// Seed for generated workload inputs.
    #[arg(long, env = "RUNTIME_BENCH_SEED", default_value_t = 0, global = true)]
    seed: u64,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, value_enum, env = "RUNTIME_BENCH_LOG_FORMAT", default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Option<Command>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.log_format);

    let cfg = BenchConfig {
        profile: args.profile.into(),
        seed: args.seed,
    };
    let cmd = args.cmd.unwrap_or_else(|| Command::Run(RunArgs::default()));

    let result = match cmd {
        Command::Run(run) => cmd_run(&cfg, run),
        Command::Compare {
            candidate_runtime,
            baseline_runtime,
            candidate_label,
            baseline_label,
            workloads,
            process,
            results_dir,
        } => cmd_compare(
            &cfg,
            RuntimeSpec::new(candidate_label, candidate_runtime),
            RuntimeSpec::new(baseline_label, baseline_runtime),
            &workloads,
            &process,
            &results_dir,
        ),
        Command::Ci {
            baseline,
            threshold,
            report,
            category,
        } => cmd_ci(&cfg, &baseline, threshold, report.as_deref(), &category),
        Command::Summary { path } => cmd_summary(&path),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "runtime-bench failed");
            eprintln!("error: {err}");
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}

fn exit_status(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn sampler() -> Sampler {
    Sampler::new(Capabilities::probe())
}

fn cmd_run(cfg: &BenchConfig, args: RunArgs) -> Result<ExitCode> {
    let process = match &args.baseline_runtime {
        Some(baseline) => Some(ProcessComparisonConfig {
            candidate: args
                .candidate_runtime
                .as_ref()
                .map(|c| RuntimeSpec::new(&args.candidate_label, c)),
            baseline: RuntimeSpec::new(&args.baseline_label, baseline),
            driver: args.process.driver_config(),
            workloads: args.workloads.resolve()?,
        }),
        None => None,
    };

    let config = OrchestratorConfig {
        profile: cfg.profile,
        candidate_label: args.candidate_label.clone(),
        baseline_label: args.baseline_label.clone(),
        process,
        persist: !args.no_persist,
        generated_at: None,
    };

    println!("=== Runtime Performance Suite ===\n");
    let mut orch = Orchestrator::new(config, sampler(), FsArtifactSink::new(&args.results_dir));
    for category in builtin_categories(cfg, &args.category) {
        println!("Registered {} ({} workloads)", category.name, category.workloads.len());
        orch.register(category);
    }
    println!();

    let outcome = orch.run();
    print_outcome(&outcome, &args.candidate_label, &args.baseline_label);
    Ok(exit_status(outcome.success))
}

fn print_outcome(outcome: &RunOutcome, candidate_label: &str, baseline_label: &str) {
    if let Some(artifact) = &outcome.artifact {
        println!("Report saved: {}", artifact.report.display());
        println!("JSON results saved: {}\n", artifact.results.display());
    } else {
        println!("{}", render_summary_only(&outcome.completed));
    }

    if let Some(summary) = &outcome.process_summary {
        println!("{}", summary.render_text(candidate_label, baseline_label));
    }

    if let Some(err) = &outcome.error {
        eprintln!("error: {err}");
        println!("=== Benchmark Suite Failed ===");
    } else {
        println!("=== Benchmark Suite Complete ===");
    }
    println!("Total categories: {}", outcome.total_categories);
    println!("Total tests: {}", outcome.total_tests);
    if outcome.comparison.is_some() {
        println!("Compared tests: {}", outcome.compared);
    }
}

fn cmd_compare(
    cfg: &BenchConfig,
    candidate: RuntimeSpec,
    baseline: RuntimeSpec,
    workloads: &WorkloadArgs,
    process: &ProcessArgs,
    results_dir: &Path,
) -> Result<ExitCode> {
    let files = workloads.resolve()?;
    if files.is_empty() {
        return Err(BenchError::config(
            "workload",
            "give --workload, --suite, or --workload-dir with at least one file",
        ));
    }

    let driver = Driver::new(candidate, baseline, process.driver_config())?;
    let (cand_rt, base_rt) = driver.preflight()?;
    println!("{}: {}", cand_rt.label, cand_rt.path.display());
    println!("{}: {}\n", base_rt.label, base_rt.path.display());

    let pairs = driver.compare_all(&files);
    let summary = ProcessComparisonSummary::from_pairs(&pairs);
    println!("{}", summary.render_text(&cand_rt.label, &base_rt.label));

    let (cand, base) = process_categories(&pairs);
    let results = vec![cand];
    let comparison = compare(&results, Some(std::slice::from_ref(&base)));
    let mut run = RunMeta::capture(cfg.profile.as_str());
    run.candidate_version = cand_rt.probe_version();
    run.baseline_version = base_rt.probe_version();

    let now = Local::now();
    let mut meta = ReportMeta::new(now.to_rfc3339())
        .with_labels(&cand_rt.label, &base_rt.label)
        .with_run(run);
    meta.title = "Process Comparison Report".to_string();
    let report = Report::build(&results, Some(&comparison), meta).with_failed_runs(&pairs);

    let html = render_html(&report);
    let json = render_json(&results_document(&report, &results, Some(&comparison), Some(pairs)))?;
    let artifact = FsArtifactSink::new(results_dir).persist(&file_stamp(&now), &html, &json)?;
    println!("Report saved: {}", artifact.report.display());
    println!("JSON results saved: {}", artifact.results.display());

    Ok(exit_status(summary.failed == 0))
}

fn cmd_ci(
    cfg: &BenchConfig,
    baseline: &Path,
    threshold: f64,
    report: Option<&Path>,
    categories: &[CategorySelect],
) -> Result<ExitCode> {
    if !(threshold.is_finite() && threshold >= 0.0) {
        return Err(BenchError::config("threshold", "must be a non-negative number"));
    }

    let config = OrchestratorConfig {
        profile: cfg.profile,
        persist: false,
        ..OrchestratorConfig::default()
    };
    let mut orch = Orchestrator::new(config, sampler(), MemorySink::default());
    for category in builtin_categories(cfg, categories) {
        orch.register(category);
    }
    let outcome = orch.run();
    if !outcome.success {
        println!("{}", render_summary_only(&outcome.completed));
        eprintln!("error: {}", outcome.error.as_deref().unwrap_or("benchmark run failed"));
        return Ok(ExitCode::FAILURE);
    }

    let current = ResultsDocument {
        timestamp: Local::now().to_rfc3339(),
        results: outcome.completed,
        comparison: None,
        process_runs: None,
        run: Some(RunMeta::capture(cfg.profile.as_str())),
    };
    let ci = run_ci(&current, baseline, threshold)?;
    print!("{}", ci.report);
    if let Some(path) = report {
        fs::write(path, &ci.report)?;
    }
    Ok(exit_status(ci.success))
}

fn cmd_summary(path: &Path) -> Result<ExitCode> {
    let raw = fs::read_to_string(path)?;
    let doc: ResultsDocument = serde_json::from_str(&raw)?;

    println!("Results from {}", doc.timestamp);
    print!("{}", render_summary_only(&doc.results));
    if let Some(cmp) = &doc.comparison {
        println!("\nCompared tests: {}", cmp.summary.compared);
    }
    if let Some(pairs) = &doc.process_runs {
        println!("\n{}", ProcessComparisonSummary::from_pairs(pairs).render_text("Candidate", "Baseline"));
    }
    Ok(ExitCode::SUCCESS)
}
