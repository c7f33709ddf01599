//! Where report artifacts go.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::Result;

pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// File-name stamp for artifacts, e.g. `2026-10-19_14-03-07`.
pub fn file_stamp(at: &DateTime<Local>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

pub fn report_file_name(stamp: &str) -> String {
    format!("report_{stamp}.html")
}

pub fn results_file_name(stamp: &str) -> String {
    format!("results_{stamp}.json")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedArtifacts {
    pub report: PathBuf,
    pub results: PathBuf,
}

/// Destination for one run's HTML report and JSON results. Either both are
/// stored or neither is.
pub trait ArtifactSink {
    fn persist(&mut self, stamp: &str, html: &str, json: &str) -> Result<PersistedArtifacts>;
}

#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    results_dir: PathBuf,
}

impl FsArtifactSink {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &std::path::Path {
        &self.results_dir
    }
}

impl ArtifactSink for FsArtifactSink {
    fn persist(&mut self, stamp: &str, html: &str, json: &str) -> Result<PersistedArtifacts> {
        fs::create_dir_all(&self.results_dir)?;
        let report = self.results_dir.join(report_file_name(stamp));
        let results = self.results_dir.join(results_file_name(stamp));

        fs::write(&report, html)?;
        if let Err(e) = fs::write(&results, json) {
            let _ = fs::remove_file(&report);
            return Err(e.into());
        }

        tracing::info!(report = %report.display(), results = %results.display(), "artifacts written");
        Ok(PersistedArtifacts { report, results })
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub stored: Vec<StoredArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub stamp: String,
    pub html: String,
    pub json: String,
}

impl ArtifactSink for MemorySink {
    fn persist(&mut self, stamp: &str, html: &str, json: &str) -> Result<PersistedArtifacts> {
        self.stored.push(StoredArtifact {
            stamp: stamp.to_string(),
            html: html.to_string(),
            json: json.to_string(),
        });
        Ok(PersistedArtifacts {
            report: PathBuf::from(report_file_name(stamp)),
            results: PathBuf::from(results_file_name(stamp)),
        })
    }
}

impl<S: ArtifactSink + ?Sized> ArtifactSink for &mut S {
    fn persist(&mut self, stamp: &str, html: &str, json: &str) -> Result<PersistedArtifacts> {
        (**self).persist(stamp, html, json)
    }
}
