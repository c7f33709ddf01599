//! Cross-process driver: run one workload file under a candidate and a
//! baseline runtime and time each process from spawn to exit.
//!
//! Runs are strictly sequential (candidate, then baseline) so the two
//! processes never compete for CPU. A failed run is recorded, never raised:
//! the batch always continues with the next file.

use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{BenchError, Result};
use crate::schema::{CategoryResult, ProcessPair, ProcessRunResult, ResultsDocument, WorkloadResult};

/// Category name under which whole-process timings are reported.
pub const PROCESS_CATEGORY: &str = "Process Runs";

const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long output readers may lag behind the deadline before their pipes
/// are abandoned.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// A runtime to locate: a label for reports plus the places to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSpec {
    pub label: String,
    /// Executable name or path, e.g. `node` or `./build/rt`.
    pub command: String,
    /// Locations checked before `command` itself, in order.
    pub search_paths: Vec<PathBuf>,
}

impl RuntimeSpec {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            search_paths: Vec::new(),
        }
    }

    pub fn with_search_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_paths.extend(paths);
        self
    }

    /// Ordered candidate locations: explicit search paths, then `command`
    /// (as given if it contains a path separator, otherwise through `PATH`).
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut out = self.search_paths.clone();
        let cmd = Path::new(&self.command);
        if cmd.components().count() > 1 || cmd.is_absolute() {
            out.push(cmd.to_path_buf());
        } else if let Some(path_var) = std::env::var_os("PATH") {
            out.extend(std::env::split_paths(&path_var).map(|dir| dir.join(&self.command)));
        }
        out
    }

    /// First candidate that exists as a file.
    pub fn locate(&self) -> Result<LocatedRuntime> {
        let searched = self.candidates();
        match searched.iter().find(|p| p.is_file()) {
            Some(path) => Ok(LocatedRuntime {
                label: self.label.clone(),
                path: std::fs::canonicalize(path).unwrap_or_else(|_| path.clone()),
            }),
            None => Err(BenchError::RuntimeNotFound {
                label: self.label.clone(),
                searched,
            }),
        }
    }
}

/// A runtime whose executable was found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedRuntime {
    pub label: String,
    pub path: PathBuf,
}

impl LocatedRuntime {
    /// `<runtime> --version`, first non-empty line. Best effort, and
    /// bounded by [`VERSION_PROBE_TIMEOUT`].
    pub fn probe_version(&self) -> Option<String> {
        let mut cmd = Command::new(&self.path);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        own_process_group(&mut cmd);

        let start = Instant::now();
        let mut child = cmd.spawn().ok()?;
        let stdout_rx = drain(child.stdout.take());
        let (status, timed_out) = wait_with_deadline(&mut child, Some(VERSION_PROBE_TIMEOUT), start).ok()?;
        let stdout = collect(&stdout_rx, Some(start + VERSION_PROBE_TIMEOUT));
        if timed_out || !status.success() {
            return None;
        }
        stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Runs per runtime per workload file.
    pub repeat: u32,
    /// Kill a process that runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            repeat: 1,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Driver {
    pub candidate: RuntimeSpec,
    pub baseline: RuntimeSpec,
    pub config: DriverConfig,
}

impl Driver {
    pub fn new(candidate: RuntimeSpec, baseline: RuntimeSpec, config: DriverConfig) -> Result<Self> {
        if config.repeat == 0 {
            return Err(BenchError::config("repeat", "must be at least 1"));
        }
        Ok(Self {
            candidate,
            baseline,
            config,
        })
    }

    /// Locate both runtimes up front so a missing executable is reported
    /// before any workload runs.
    pub fn preflight(&self) -> Result<(LocatedRuntime, LocatedRuntime)> {
        Ok((self.candidate.locate()?, self.baseline.locate()?))
    }

    /// Run `workload_file` once under `runtime`.
    ///
    /// A runtime that cannot be located produces a failed result without
    /// spawning anything.
    pub fn run_under_runtime(&self, workload_file: &Path, runtime: &RuntimeSpec) -> ProcessRunResult {
        match runtime.locate() {
            Ok(located) => self.run_located(workload_file, &located),
            Err(err) => {
                tracing::warn!(
                    runtime = %runtime.label,
                    file = %workload_file.display(),
                    error = %err,
                    "runtime not found"
                );
                ProcessRunResult::failure(&runtime.label, display_path(workload_file), err.to_string())
            }
        }
    }

    /// Run `workload_file` under an already located runtime.
    pub fn run_located(&self, workload_file: &Path, runtime: &LocatedRuntime) -> ProcessRunResult {
        let file = display_path(workload_file);
        let sha = fingerprint(workload_file);

        let mut result = match spawn_and_wait(runtime, workload_file, self.config.timeout) {
            Ok(run) => run.into_result(&runtime.label, &file),
            Err(err) => ProcessRunResult::failure(&runtime.label, &file, err.to_string()),
        };
        result.workload_sha256 = sha;

        if result.succeeded {
            tracing::info!(
                runtime = %runtime.label,
                file = %file,
                duration_ms = result.duration_ms,
                "process run finished"
            );
        } else {
            tracing::warn!(
                runtime = %runtime.label,
                file = %file,
                error = result.error_message.as_deref().unwrap_or("unknown"),
                "process run failed"
            );
        }
        result
    }

    /// Candidate runs first, then baseline runs; never concurrently.
    pub fn compare_workload(&self, workload_file: &Path) -> ProcessPair {
        let candidate = (0..self.config.repeat)
            .map(|_| self.run_under_runtime(workload_file, &self.candidate))
            .collect();
        let baseline = (0..self.config.repeat)
            .map(|_| self.run_under_runtime(workload_file, &self.baseline))
            .collect();
        ProcessPair {
            workload_file: display_path(workload_file),
            candidate,
            baseline,
        }
    }

    pub fn compare_all(&self, files: &[PathBuf]) -> Vec<ProcessPair> {
        files
            .iter()
            .map(|f| {
                tracing::info!(file = %f.display(), "comparing workload");
                self.compare_workload(f)
            })
            .collect()
    }
}

struct FinishedRun {
    status: ExitStatus,
    elapsed: Duration,
    stdout: String,
    stderr: String,
    timed_out: bool,
}

impl FinishedRun {
    fn into_result(self, label: &str, file: &str) -> ProcessRunResult {
        let error = if self.timed_out {
            Some(format!("timed out after {:.0} ms; process killed", self.elapsed.as_secs_f64() * 1000.0))
        } else if !self.status.success() {
            let mut msg = match self.status.code() {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            };
            let tail = stderr_tail(&self.stderr, 5);
            if !tail.is_empty() {
                let _ = write!(msg, ": {tail}");
            }
            Some(msg)
        } else {
            None
        };

        match error {
            None => ProcessRunResult {
                runtime_label: label.to_string(),
                workload_file: file.to_string(),
                duration_ms: self.elapsed.as_secs_f64() * 1000.0,
                stdout: self.stdout.trim().to_string(),
                succeeded: true,
                error_message: None,
                workload_sha256: None,
            },
            Some(msg) => {
                let mut r = ProcessRunResult::failure(label, file, msg);
                r.stdout = self.stdout.trim().to_string();
                r
            }
        }
    }
}

fn spawn_and_wait(
    runtime: &LocatedRuntime,
    workload_file: &Path,
    timeout: Option<Duration>,
) -> Result<FinishedRun> {
    // The child runs from the workload's directory with an absolute path.
    let target = std::fs::canonicalize(workload_file).unwrap_or_else(|_| workload_file.to_path_buf());
    let mut cmd = Command::new(&runtime.path);
    cmd.arg(&target)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if target.is_absolute() {
        if let Some(dir) = target.parent() {
            cmd.current_dir(dir);
        }
    }
    own_process_group(&mut cmd);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| BenchError::Spawn {
        runtime: runtime.label.clone(),
        file: workload_file.to_path_buf(),
        source,
    })?;

    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    let (status, timed_out) = wait_with_deadline(&mut child, timeout, start)?;
    let elapsed = start.elapsed();

    let deadline = timeout.map(|limit| start + limit);
    Ok(FinishedRun {
        status,
        elapsed,
        stdout: collect(&stdout_rx, deadline),
        stderr: collect(&stderr_rx, deadline),
        timed_out,
    })
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Option<Duration>,
    start: Instant,
) -> Result<(ExitStatus, bool)> {
    let Some(limit) = timeout else {
        return Ok((child.wait()?, false));
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if start.elapsed() >= limit {
            kill_tree(child);
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Lead a fresh process group, so a kill reaches anything the runtime forks.
#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    // A negative pid signals the whole group the child leads.
    let group = format!("-{}", child.id());
    let _ = Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    // The process may exit between the check and the kill.
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Output captured so far. Past the deadline (plus a short grace) a pipe
/// still held open by a stray descendant is abandoned.
fn collect(rx: &mpsc::Receiver<String>, deadline: Option<Instant>) -> String {
    match deadline {
        Some(at) => {
            let wait = at.saturating_duration_since(Instant::now()) + DRAIN_GRACE;
            rx.recv_timeout(wait).unwrap_or_default()
        }
        None => rx.recv().unwrap_or_default(),
    }
}

fn stderr_tail(stderr: &str, lines: usize) -> String {
    let all: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join(" | ")
}

fn display_path(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Hex SHA-256 of the workload file contents, if readable.
pub fn fingerprint(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    Some(format!("{:x}", Sha256::digest(&bytes)))
}

/// Workload files under `dir` with one of `extensions`, sorted by path.
pub fn discover_workloads(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BenchError::config(
            "workload-dir",
            format!("{} is not a directory", dir.display()),
        ));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        })
        .collect();
    files.sort();
    Ok(files)
}

impl ProcessPair {
    /// Short test name derived from the workload file name.
    pub fn test_name(&self) -> String {
        Path::new(&self.workload_file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.workload_file.clone())
    }

    /// Reduce each side's successful durations into a result; a side with
    /// no successful run yields `None`.
    pub fn to_workload_results(&self) -> (Option<WorkloadResult>, Option<WorkloadResult>) {
        (
            reduce_runs(&self.test_name(), &self.candidate),
            reduce_runs(&self.test_name(), &self.baseline),
        )
    }

    pub fn all_succeeded(&self) -> bool {
        self.candidate.iter().chain(&self.baseline).all(|r| r.succeeded)
    }
}

fn reduce_runs(name: &str, runs: &[ProcessRunResult]) -> Option<WorkloadResult> {
    let samples: Vec<f64> = runs.iter().filter_map(ProcessRunResult::sample).collect();
    if samples.is_empty() {
        return None;
    }
    Some(WorkloadResult::from_samples(name, 0, samples, None))
}

/// Per-side categories of whole-process timings, one test per file that
/// had at least one successful run on that side.
pub fn process_categories(pairs: &[ProcessPair]) -> (CategoryResult, CategoryResult) {
    let mut cand = CategoryResult::new(PROCESS_CATEGORY);
    let mut base = CategoryResult::new(PROCESS_CATEGORY);
    for pair in pairs {
        let (c, b) = pair.to_workload_results();
        if let Some(c) = c {
            cand.push(c);
        }
        if let Some(b) = b {
            base.push(b);
        }
    }
    (cand, base)
}

/// Categories a runtime printed on stdout, either as a full results
/// document or as a bare list. The whole output is tried first, then each
/// line from the last.
pub fn parse_reported_categories(stdout: &str) -> Option<Vec<CategoryResult>> {
    fn parse(text: &str) -> Option<Vec<CategoryResult>> {
        if let Ok(doc) = serde_json::from_str::<ResultsDocument>(text) {
            return Some(doc.results);
        }
        serde_json::from_str::<Vec<CategoryResult>>(text).ok()
    }

    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse(trimmed).or_else(|| {
        trimmed
            .lines()
            .rev()
            .map(str::trim)
            .filter(|l| l.starts_with('{') || l.starts_with('['))
            .find_map(parse)
    })
}

/// Batch-level view of a process comparison.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessComparisonSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub candidate_wins: usize,
    pub baseline_wins: usize,
    pub average_candidate_ms: f64,
    pub average_baseline_ms: f64,
    /// `baseline_total / candidate_total`; above 1 means the candidate is faster.
    pub overall_speedup: f64,
    pub failures: Vec<String>,
}

impl ProcessComparisonSummary {
    pub fn from_pairs(pairs: &[ProcessPair]) -> Self {
        let mut successful = 0;
        let mut candidate_wins = 0;
        let mut baseline_wins = 0;
        let mut cand_total = 0.0;
        let mut base_total = 0.0;
        let mut failures = Vec::new();

        for pair in pairs {
            match pair.to_workload_results() {
                (Some(c), Some(b)) => {
                    successful += 1;
                    cand_total += c.mean;
                    base_total += b.mean;
                    if b.mean / c.mean > 1.0 {
                        candidate_wins += 1;
                    } else {
                        baseline_wins += 1;
                    }
                }
                _ => {
                    let reason = pair
                        .candidate
                        .iter()
                        .chain(&pair.baseline)
                        .find_map(|r| r.error_message.as_deref())
                        .unwrap_or("execution failed");
                    failures.push(format!("{}: {reason}", pair.workload_file));
                }
            }
        }

        let avg = |total: f64| if successful == 0 { 0.0 } else { total / successful as f64 };
        Self {
            total: pairs.len(),
            successful,
            failed: pairs.len() - successful,
            candidate_wins,
            baseline_wins,
            average_candidate_ms: avg(cand_total),
            average_baseline_ms: avg(base_total),
            overall_speedup: if cand_total > 0.0 { base_total / cand_total } else { 0.0 },
            failures,
        }
    }

    pub fn render_text(&self, candidate_label: &str, baseline_label: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Process comparison");
        let _ = writeln!(out, "  Total workloads: {}", self.total);
        let _ = writeln!(out, "  Successful: {}", self.successful);
        let _ = writeln!(out, "  Failed: {}", self.failed);
        if self.successful > 0 {
            let _ = writeln!(out, "  {candidate_label} wins: {}", self.candidate_wins);
            let _ = writeln!(out, "  {baseline_label} wins: {}", self.baseline_wins);
            let _ = writeln!(out, "  Average {candidate_label} time: {:.2} ms", self.average_candidate_ms);
            let _ = writeln!(out, "  Average {baseline_label} time: {:.2} ms", self.average_baseline_ms);
            let _ = writeln!(out, "  Overall speedup: {:.2}x", self.overall_speedup);
        }
        for f in &self.failures {
            let _ = writeln!(out, "  FAILED {f}");
        }
        out
    }
}
