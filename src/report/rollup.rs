//! Second reporting pass over a results directory on disk

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::{write_navigation_page, RollupTotals, TestsuiteDirReporter};
use crate::models::{TestSummary, SUMMARY_FILE_NAME};

/// Module names per tested directory, both sorted
pub type TestedDirs = BTreeMap<String, Vec<String>>;

/// Find every module summary below `results_dir`.
///
/// A summary counts only where its own `tested_dir` and `name` say it
/// should be, which leaves out the run summary in the root and anything a
/// test copied into its working directory.
pub fn scan_results(results_dir: &Path) -> Result<TestedDirs> {
    let mut found: TestedDirs = BTreeMap::new();
    let mut pending = vec![results_dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if dir == results_dir || entry.file_name() != SUMMARY_FILE_NAME {
                continue;
            }
            let summary = match TestSummary::read(&path) {
                Ok(summary) => summary,
                Err(err) => {
                    warn!(summary = %path.display(), error = %format!("{err:#}"), "skipping summary");
                    continue;
                }
            };
            if summary.name.is_empty() {
                continue;
            }
            let expected = results_dir
                .join(&summary.tested_dir)
                .join(&summary.name)
                .join(SUMMARY_FILE_NAME);
            if expected.components().eq(path.components()) {
                found.entry(summary.tested_dir).or_default().push(summary.name);
            } else {
                debug!(summary = %path.display(), "summary outside its module directory");
            }
        }
    }
    for names in found.values_mut() {
        names.sort();
        names.dedup();
    }
    Ok(found)
}

/// Rebuild the testsuite pages and the navigation page of a results
/// directory from the summaries it holds
pub fn rollup_results(results_dir: &Path) -> Result<RollupTotals> {
    let dirs = scan_results(results_dir)?;
    debug!(testsuites = dirs.len(), "rolling up results");
    let totals = TestsuiteDirReporter::default().report_for_dirs(results_dir, &dirs)?;
    write_navigation_page(results_dir)?;
    Ok(totals)
}
