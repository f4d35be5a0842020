use anyhow::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

use super::{ResultCounts, RunTimes, TestResult};
use crate::models::{SummaryStatus, TestSummary, SUMMARY_FILE_NAME};

/// Writes the module summary the batch executor merges.
///
/// The file lands in the output directory (the working directory of the
/// test process unless set otherwise), which under the executor is the
/// module's results subdirectory.
pub struct KeyValueTestResult {
    counts: ResultCounts,
    name: String,
    output_dir: PathBuf,
    tested_modules: BTreeSet<String>,
    test_file_authors: Vec<String>,
    supplementary_files: Vec<String>,
}

impl KeyValueTestResult {
    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            counts: ResultCounts::new(),
            name: name.into(),
            output_dir: output_dir.into(),
            tested_modules: BTreeSet::new(),
            test_file_authors: Vec::new(),
            supplementary_files: Vec::new(),
        }
    }

    pub fn with_tested_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tested_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_file_authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Files the test wrote next to its summary, relative to the output
    /// directory
    pub fn add_supplementary_file(&mut self, file: impl Into<String>) {
        self.supplementary_files.push(file.into());
    }

    pub fn summary(&self) -> TestSummary {
        let counts = &self.counts;
        let mut summary = TestSummary::new(&self.name, "");
        summary.status = Some(if counts.was_successful() {
            SummaryStatus::Succeeded
        } else {
            SummaryStatus::Failed
        });
        summary.total = Some(counts.total());
        summary.successes = Some(counts.successes);
        summary.failures = Some(counts.failures.len() as u64);
        summary.errors = Some(counts.errors.len() as u64);
        summary.skipped = Some(counts.skipped.len() as u64);
        summary.expected_failures = Some(counts.expected_failures.len() as u64);
        summary.unexpected_successes = Some(counts.unexpected_successes.len() as u64);
        summary.tested_modules = self.tested_modules.clone();
        summary.test_file_authors = self.test_file_authors.clone();
        summary.supplementary_files = self.supplementary_files.clone();
        if let Some(taken) = counts.times.time_taken {
            summary
                .extra
                .insert("time".to_string(), format!("{}", taken.as_secs_f64()));
        }
        summary
    }
}

impl TestResult for KeyValueTestResult {
    fn stop_test_run(&mut self) -> Result<()> {
        let path = self.output_dir.join(SUMMARY_FILE_NAME);
        debug!(summary = %path.display(), "writing test summary");
        self.summary().write(&path)
    }

    fn start_test(&mut self, test: &str) -> Result<()> {
        self.counts.start_test(test)
    }

    fn stop_test(&mut self, test: &str) -> Result<()> {
        self.counts.stop_test(test)
    }

    fn add_success(&mut self, _test: &str) -> Result<()> {
        self.counts.successes += 1;
        Ok(())
    }

    fn add_failure(&mut self, test: &str, message: &str) -> Result<()> {
        self.counts
            .failures
            .push((test.to_string(), message.to_string()));
        Ok(())
    }

    fn add_error(&mut self, test: &str, message: &str) -> Result<()> {
        self.counts
            .errors
            .push((test.to_string(), message.to_string()));
        Ok(())
    }

    fn add_skip(&mut self, test: &str, reason: &str) -> Result<()> {
        self.counts
            .skipped
            .push((test.to_string(), reason.to_string()));
        Ok(())
    }

    fn add_expected_failure(&mut self, test: &str, message: &str) -> Result<()> {
        self.counts
            .expected_failures
            .push((test.to_string(), message.to_string()));
        Ok(())
    }

    fn add_unexpected_success(&mut self, test: &str) -> Result<()> {
        self.counts.unexpected_successes.push(test.to_string());
        Ok(())
    }

    fn set_times(&mut self, times: RunTimes) {
        self.counts.times = times;
    }

    fn counts(&self) -> Option<&ResultCounts> {
        Some(&self.counts)
    }
}
