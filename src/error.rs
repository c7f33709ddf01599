//! Error types for the measurement and comparison pipeline.
//!
//! Degenerate inputs (zero iterations, a comparison with no baseline) are not
//! errors; they produce zeroed or empty results. Only genuine execution
//! failures surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by a workload callable.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Primary error type for `runtime-bench` operations.
#[derive(Error, Debug)]
pub enum BenchError {
    /// A workload returned an error while being sampled.
    #[error("workload '{test}' in category '{category}' failed: {source}")]
    Measurement {
        category: String,
        test: String,
        #[source]
        source: BoxError,
    },

    /// None of the candidate locations for a runtime executable exist.
    #[error("runtime '{label}' not found (searched: {searched:?})")]
    RuntimeNotFound {
        label: String,
        searched: Vec<PathBuf>,
    },

    /// The runtime process could not be started.
    #[error("failed to spawn {runtime} for {file}: {source}")]
    Spawn {
        runtime: String,
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A suite file line could not be interpreted.
    #[error("suite file {path}: {reason}")]
    SuiteParse { path: PathBuf, reason: String },

    /// A suite file listed no workload files.
    #[error("suite '{name}' lists no workload files")]
    EmptySuite { name: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {field}: {reason}")]
    Config { field: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    pub fn measurement(
        category: impl Into<String>,
        test: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Measurement {
            category: category.into(),
            test: test.into(),
            source: source.into(),
        }
    }

    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code used by the CLI for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::SuiteParse { .. } | Self::EmptySuite { .. } => 2,
            _ => 1,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BenchError>;
