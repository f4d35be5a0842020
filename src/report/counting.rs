//! File and test counters shared by all reporters

use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::error;

use super::{FileOutcome, FileReporter, ReportError, RunHooks};
use crate::models::{TestModule, TestSummary};

/// File-level counters of one run.
///
/// Every other reporter embeds one of these and drives it from its own
/// lifecycle methods.
#[derive(Debug, Clone, Default)]
pub struct CountingReporter {
    files_total: u64,
    files_pass: u64,
    files_fail: u64,
    started_at: Option<DateTime<Local>>,
    run_start: Option<Instant>,
    run_time: Option<Duration>,
    file_start: Option<Instant>,
    file_time: Option<Duration>,
    finished: bool,
}

impl CountingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters and start the run clock
    pub fn start(&mut self) {
        *self = Self {
            started_at: Some(Local::now()),
            run_start: Some(Instant::now()),
            ..Self::default()
        };
    }

    pub fn start_file(&mut self, module: &TestModule) -> Result<(), ReportError> {
        if self.file_start.is_some() {
            return Err(ReportError::Lifecycle(format!(
                "start of {} before the previous file ended",
                module.name()
            )));
        }
        self.file_start = Some(Instant::now());
        self.files_total += 1;
        Ok(())
    }

    /// Count a finished file and return how long it took
    pub fn end_file(&mut self, returncode: i32) -> Result<Duration, ReportError> {
        let started = self
            .file_start
            .take()
            .ok_or_else(|| ReportError::Lifecycle("end of a file that never started".into()))?;
        let elapsed = started.elapsed();
        self.file_time = Some(elapsed);
        if returncode == 0 {
            self.files_pass += 1;
        } else {
            self.files_fail += 1;
        }
        Ok(elapsed)
    }

    /// Stop the run clock and check the file counts
    pub fn finish(&mut self) -> Result<(), ReportError> {
        self.run_time = self.run_start.map(|start| start.elapsed());
        self.finished = true;
        if self.files_total != self.files_pass + self.files_fail {
            return Err(ReportError::FileCountMismatch {
                total: self.files_total,
                passed: self.files_pass,
                failed: self.files_fail,
            });
        }
        Ok(())
    }

    pub fn files_total(&self) -> u64 {
        self.files_total
    }

    pub fn files_pass(&self) -> u64 {
        self.files_pass
    }

    pub fn files_fail(&self) -> u64 {
        self.files_fail
    }

    /// `None` when no file ran
    pub fn file_pass_percent(&self) -> Option<f64> {
        percent(self.files_pass, self.files_total)
    }

    pub fn file_fail_percent(&self) -> Option<f64> {
        percent(self.files_fail, self.files_total)
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// Wall time of the whole run, known after `finish`
    pub fn run_time(&self) -> Duration {
        self.run_time.unwrap_or_default()
    }

    /// Duration of the last finished file
    pub fn file_time(&self) -> Option<Duration> {
        self.file_time
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FileReporter for CountingReporter {
    fn name(&self) -> &str {
        "counting"
    }

    fn start_file_test(&mut self, module: &TestModule) -> Result<()> {
        Ok(self.start_file(module)?)
    }

    fn end_file_test(&mut self, outcome: &FileOutcome<'_>) -> Result<()> {
        self.end_file(outcome.returncode())?;
        Ok(())
    }

    fn run_hooks(&mut self) -> Option<&mut dyn RunHooks> {
        Some(self)
    }

    fn counts(&self) -> Option<&CountingReporter> {
        Some(self)
    }
}

impl RunHooks for CountingReporter {
    fn start(&mut self, _results_dir: &Path) -> Result<()> {
        CountingReporter::start(self);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(CountingReporter::finish(self)?)
    }
}

/// `100 * part / whole`, `None` for an empty whole
pub fn percent(part: u64, whole: u64) -> Option<f64> {
    (whole > 0).then(|| 100.0 * part as f64 / whole as f64)
}

/// Test-level counts summed over files.
///
/// A file contributes only when its summary knows the total; files that
/// never reported their tests stay out of every count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestCounts {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
    pub expected_failures: u64,
    pub unexpected_successes: u64,
}

impl TestCounts {
    /// Add one file. Returns whether it contributed.
    pub fn add(&mut self, summary: &TestSummary) -> bool {
        let Some(total) = summary.total else {
            return false;
        };
        self.total += total;
        self.successes += summary.successes.unwrap_or(0);
        self.failures += summary.failures.unwrap_or(0);
        self.errors += summary.errors.unwrap_or(0);
        self.skipped += summary.skipped.unwrap_or(0);
        self.expected_failures += summary.expected_failures.unwrap_or(0);
        self.unexpected_successes += summary.unexpected_successes.unwrap_or(0);
        true
    }

    pub fn merge(&mut self, other: &TestCounts) {
        self.total += other.total;
        self.successes += other.successes;
        self.failures += other.failures;
        self.errors += other.errors;
        self.skipped += other.skipped;
        self.expected_failures += other.expected_failures;
        self.unexpected_successes += other.unexpected_successes;
    }

    /// Failed plus errored tests
    pub fn bad(&self) -> u64 {
        self.failures + self.errors
    }

    pub fn is_consistent(&self) -> bool {
        self.total
            == self.successes
                + self.failures
                + self.errors
                + self.skipped
                + self.expected_failures
                + self.unexpected_successes
    }

    /// Log a mismatch loudly. The counts are left as they are.
    pub fn check(&self, context: &str) -> bool {
        let ok = self.is_consistent();
        if !ok {
            error!(
                context,
                total = self.total,
                successes = self.successes,
                failures = self.failures,
                errors = self.errors,
                skipped = self.skipped,
                expected_failures = self.expected_failures,
                unexpected_successes = self.unexpected_successes,
                "test counts do not add up to the total"
            );
        }
        ok
    }
}
