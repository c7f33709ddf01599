use crate::error::Result;
use crate::schema::{CategoryResult, Comparison, ProcessPair, ResultsDocument};

use super::Report;

/// Assemble the JSON mirror of `report`. The comparison is `null` when no
/// baseline was supplied.
pub fn results_document(
    report: &Report,
    categories: &[CategoryResult],
    comparison: Option<&Comparison>,
    process_runs: Option<Vec<ProcessPair>>,
) -> ResultsDocument {
    ResultsDocument {
        timestamp: report.meta.generated_at.clone(),
        results: categories.to_vec(),
        comparison: comparison.cloned(),
        process_runs,
        run: report.meta.run.clone(),
    }
}

pub fn render_json(doc: &ResultsDocument) -> Result<String> {
    let mut out = serde_json::to_string_pretty(doc)?;
    out.push('\n');
    Ok(out)
}
