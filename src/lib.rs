//! Workload timing, summary statistics, and candidate-vs-baseline runtime
//! comparison, rendered into HTML and JSON reports.

use clap::ValueEnum;

pub mod benches;
pub mod capabilities;
pub mod clock;
pub mod compare;
pub mod driver;
pub mod error;
pub mod harness;
pub mod logging;
pub mod orchestrator;
pub mod persist;
pub mod regression;
pub mod report;
pub mod schema;
pub mod stats;
pub mod suite;

pub use error::{BenchError, Result};

/// Built-in workload category to run.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum CategorySelect {
    /// Every built-in category.
    #[default]
    All,
    /// Arithmetic, string, and boolean primitives.
    BasicTypes,
    /// Vec, map, set, and JSON operations.
    Collections,
    /// Sequential vs rayon-parallel task execution.
    Concurrency,
}
