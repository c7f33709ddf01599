use std::convert::Infallible;
use std::hint::black_box;

use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::capabilities::{Capabilities, MemorySnapshot};
use crate::clock::Clock;
use crate::schema::WorkloadResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
}

impl BenchConfig {
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }

    pub fn warmup_iters(&self) -> u64 {
        match self.profile {
            Profile::Quick => 3,
            Profile::Full => 10,
        }
    }

    pub fn iters(&self) -> u64 {
        match self.profile {
            Profile::Quick => 20,
            Profile::Full => 100,
        }
    }

    /// Sampler settings for a workload named `name` at this profile's counts.
    pub fn sampler(&self, name: impl Into<String>) -> SamplerConfig {
        SamplerConfig::new(name, self.iters(), self.warmup_iters())
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Quick,
            seed: 0,
        }
    }
}

/// Per-workload sampling parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerConfig {
    pub name: String,
    pub iterations: u64,
    pub warmup: u64,
}

impl SamplerConfig {
    pub fn new(name: impl Into<String>, iterations: u64, warmup: u64) -> Self {
        Self {
            name: name.into(),
            iterations,
            warmup,
        }
    }

    /// Same name, different counts.
    pub fn with_counts(mut self, iterations: u64, warmup: u64) -> Self {
        self.iterations = iterations;
        self.warmup = warmup;
        self
    }
}

/// Times workloads. Holds no per-run state: every call starts from the
/// `SamplerConfig` it is given and returns a fresh `WorkloadResult`.
#[derive(Clone, Copy, Debug)]
pub struct Sampler {
    clock: Clock,
    caps: Capabilities,
}

impl Sampler {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            clock: Clock::from_capabilities(&caps),
            caps,
        }
    }

    pub fn with_clock(clock: Clock, caps: Capabilities) -> Self {
        Self { clock, caps }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Run `workload` `warmup` times untimed, then `iterations` times timed.
    pub fn run<T>(&self, cfg: &SamplerConfig, mut workload: impl FnMut() -> T) -> WorkloadResult {
        match self.try_run(cfg, || Ok::<T, Infallible>(workload())) {
            Ok(r) => r,
            Err(never) => match never {},
        }
    }

    /// Like [`Sampler::run`], but stops at the first workload error and
    /// returns it unchanged. No partial result is produced.
    pub fn try_run<T, E>(
        &self,
        cfg: &SamplerConfig,
        mut workload: impl FnMut() -> Result<T, E>,
    ) -> Result<WorkloadResult, E> {
        for _ in 0..cfg.warmup {
            black_box(workload()?);
        }

        let before = self.snapshot();
        let mut samples = Vec::with_capacity(usize::try_from(cfg.iterations).unwrap_or(0));
        for _ in 0..cfg.iterations {
            let start = self.clock.now();
            let out = workload();
            let end = self.clock.now();
            black_box(out?);
            samples.push(end - start);
        }
        let after = self.snapshot();

        let delta = match (before, after) {
            (Some(b), Some(a)) => Some(b.delta_to(&a)),
            _ => None,
        };

        let result = WorkloadResult::from_samples(cfg.name.clone(), cfg.warmup, samples, delta);
        tracing::trace!(
            workload = %cfg.name,
            iterations = result.iterations,
            mean_ms = result.mean,
            "sampled workload"
        );
        Ok(result)
    }

    /// Run a workload that performs `units_per_iteration` units of work per
    /// call and additionally report throughput.
    pub fn run_with_work<T>(
        &self,
        cfg: &SamplerConfig,
        units_per_iteration: u64,
        mut workload: impl FnMut(u64) -> T,
    ) -> WorkloadResult {
        let mut result = self.run(cfg, || workload(units_per_iteration));
        result.ops_per_second = ops_per_second(units_per_iteration, result.iterations, result.total);
        result
    }

    fn snapshot(&self) -> Option<MemorySnapshot> {
        self.caps.memory_snapshot()
    }
}

/// `units * iterations / (total_ms / 1000)`; `None` when no time elapsed.
pub fn ops_per_second(units_per_iteration: u64, iterations: u64, total_ms: f64) -> Option<f64> {
    if total_ms <= 0.0 {
        return None;
    }
    let units = units_per_iteration as f64 * iterations as f64;
    Some(units / (total_ms / 1000.0))
}
