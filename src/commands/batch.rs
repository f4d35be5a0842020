use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{active_gisdbase, RunConfig};
use crate::orchestrator::{LocationTarget, Orchestrator, RunSummary};
use crate::report::format_percentage;

/// Options of a batch run, as given on the command line
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub location: String,
    pub location_type: String,
    pub grassdata: Option<PathBuf>,
    pub output: PathBuf,
    pub min_success: f64,
    pub config: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub start_dir: PathBuf,
}

/// Run every test below the start directory in one location.
/// Returns whether the run meets the success gate.
pub fn execute(options: BatchOptions) -> Result<bool> {
    let config = RunConfig::load(options.config.as_deref(), &options.start_dir)?;
    let db_root = match options.grassdata {
        Some(path) => path,
        None => active_gisdbase().context("No --grassdata given and no active session")?,
    };
    let target = LocationTarget {
        db_root,
        location: options.location,
        location_type: options.location_type,
    };

    let orchestrator = Orchestrator::new(&options.start_dir, config);
    let summary = orchestrator.run_in_location(&target, &options.output, &options.exclude)?;
    let passed = summary.passes(options.min_success);
    print_gate(&summary, options.min_success, passed);
    Ok(passed)
}

fn print_gate(summary: &RunSummary, min_success: f64, passed: bool) {
    let verdict = if passed {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!(
        "{verdict} {} of {} test files succeeded, {} required (results in {})",
        format_percentage(summary.pass_percent()),
        summary.files_total,
        format_percentage(Some(min_success)),
        summary.results_dir.display(),
    );
}

/// Parse a `--min-success` value in the 0 to 100 range
pub fn parse_min_success(value: &str) -> Result<f64, String> {
    let percent: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=100.0).contains(&percent) {
        Ok(percent)
    } else {
        Err(format!("{percent} is not between 0 and 100"))
    }
}
