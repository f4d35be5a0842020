use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;

use crate::report::{format_percentage, percent, rollup_results};

/// Rebuild the testsuite pages of an existing results tree
pub fn execute(results_dir: &Path) -> Result<()> {
    if !results_dir.is_dir() {
        bail!("Results directory not found: {}", results_dir.display());
    }
    let totals = rollup_results(results_dir)?;

    println!("{}", "Roll-up".bold().blue());
    println!(
        "  Testsuites: {} ({} successful)",
        totals.testsuites, totals.testsuites_successes
    );
    println!(
        "  Test files: {} ({} successful)",
        totals.files,
        format_percentage(percent(totals.files_successes, totals.files))
    );
    println!("  Tests:      {}", totals.tests.total);
    Ok(())
}
