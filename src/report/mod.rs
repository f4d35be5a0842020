//! Result aggregation and reports
//!
//! Reporters follow one lifecycle: `start(results_dir)`, then for every
//! module `start_file_test` strictly followed by `end_file_test`, then
//! `finish()`. Calls for different modules never interleave, so reporters
//! keep plain counters.
//!
//! Per-file work goes through [`FileReporter`]. Run-level work (opening
//! and closing pages, writing the run summary) is the optional
//! [`RunHooks`] interface; a reporter exposes it through
//! [`FileReporter::run_hooks`].
//!
//! The roll-up pages ([`TestsuiteDirReporter`]) are a second, independent
//! pass that only reads summaries persisted by the executor.

mod counting;
mod html;
mod keyvalue;
mod multi;
mod rollup;
mod text;


use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::executor::{STDERR_FILE, STDOUT_FILE};
use crate::models::{ExecutionResult, TestModule, TestSummary};

pub use counting::{percent, CountingReporter, TestCounts};
pub use html::{
    color_error_line, html_file_preview, percent_to_html, returncode_to_html_text,
    success_to_html_percent, write_navigation_page, HtmlReporter, RollupTotals,
    TestsuiteDirReporter, FILE_PAGE, NAVIGATION_PAGE, STDERR_PAGE, STDOUT_PAGE, TESTFILES_PAGE,
    TESTSUITES_PAGE, TOP_LEVEL_TESTSUITE_PAGE, UNKNOWN_NUMBER_HTML,
};
pub use keyvalue::KeyValueReporter;
pub use multi::MultiReporter;
pub use rollup::{rollup_results, scan_results, TestedDirs};
pub use text::TextReporter;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("file counts do not add up: {total} total, {passed} passed, {failed} failed")]
    FileCountMismatch { total: u64, passed: u64, failed: u64 },

    #[error("reporter {0} has no start/finish hooks")]
    MissingRunHooks(String),

    #[error("reporter lifecycle violated: {0}")]
    Lifecycle(String),
}

/// Everything known about one module after execution
#[derive(Debug, Clone, Copy)]
pub struct FileOutcome<'a> {
    pub module: &'a TestModule,
    pub results_subdir: &'a Path,
    pub execution: &'a ExecutionResult,
    pub summary: &'a TestSummary,
}

impl<'a> FileOutcome<'a> {
    pub fn returncode(&self) -> i32 {
        self.execution.returncode
    }

    pub fn timed_out(&self) -> Option<Duration> {
        self.execution.timed_out
    }

    pub fn stdout_path(&self) -> PathBuf {
        self.results_subdir.join(STDOUT_FILE)
    }

    pub fn stderr_path(&self) -> PathBuf {
        self.results_subdir.join(STDERR_FILE)
    }

    /// Redacted stderr as written to disk, or the captured text when the
    /// file is gone
    pub fn stderr_text(&self) -> String {
        std::fs::read_to_string(self.stderr_path())
            .unwrap_or_else(|_| self.execution.stderr.clone())
    }
}

/// Per-file part of the reporter lifecycle
pub trait FileReporter {
    /// Short name used in log and error messages
    fn name(&self) -> &str;

    fn start_file_test(&mut self, module: &TestModule) -> Result<()>;

    fn end_file_test(&mut self, outcome: &FileOutcome<'_>) -> Result<()>;

    /// Run-level hooks, if the reporter has any
    fn run_hooks(&mut self) -> Option<&mut dyn RunHooks> {
        None
    }

    /// File counters, if the reporter keeps them
    fn counts(&self) -> Option<&CountingReporter> {
        None
    }
}

/// Run-level part of the reporter lifecycle
pub trait RunHooks {
    fn start(&mut self, results_dir: &Path) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// Percentage for text output, `unknown percentage` when undefined
pub fn format_percentage(percent: Option<f64>) -> String {
    match percent {
        Some(p) => format!("{p:.1}%"),
        None => "unknown percentage".to_string(),
    }
}

/// Elapsed time as `H:MM:SS.ss`
pub fn format_elapsed(duration: Duration) -> String {
    let total = duration.as_secs_f64();
    let hours = (total / 3600.0).floor() as u64;
    let minutes = ((total - hours as f64 * 3600.0) / 60.0).floor() as u64;
    let seconds = total - hours as f64 * 3600.0 - minutes as f64 * 60.0;
    format!("{hours}:{minutes:02}:{seconds:05.2}")
}
