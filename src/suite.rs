//! Suite files: a named list of workload files.
//!
//! ```text
//! # comment
//! quick-suite
//! basic_types.js
//! /abs/path/collections.js
//! ```
//!
//! The first non-blank, non-comment line is the suite name. Relative file
//! paths resolve against the suite file's directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub name: String,
    pub files: Vec<PathBuf>,
}

impl Suite {
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let Some(name) = lines.next() else {
            return Err(BenchError::EmptySuite {
                name: String::new(),
            });
        };

        let files: Vec<PathBuf> = lines
            .map(|l| {
                let p = Path::new(l);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    base_dir.join(p)
                }
            })
            .collect();

        if files.is_empty() {
            return Err(BenchError::EmptySuite {
                name: name.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            files,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| BenchError::SuiteParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let suite = Self::parse(&text, base)?;
        tracing::debug!(suite = %suite.name, files = suite.files.len(), "loaded suite");
        Ok(suite)
    }
}
