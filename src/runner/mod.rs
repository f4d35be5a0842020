//! In-process test runner
//!
//! Used when a single test file runs on its own instead of under the batch
//! orchestrator. Results go through the [`TestResult`] state machine:
//!
//! ```text
//! start_test_run
//!   { start_test -> success | failure | error | skip
//!                   | expected_failure | unexpected_success -> stop_test }*
//! stop_test_run
//! ```
//!
//! Timing is injected with [`TestResult::set_times`] rather than measured by
//! the results. [`MultiTestResult`] fans the calls out to several results,
//! the same way the batch reporters compose, so a standalone run prints
//! human-readable text and leaves the key-value summary the batch run
//! merges.

mod keyvalue;
mod multi;
mod program;
mod text;

#[cfg(test)]
mod tests;

use anyhow::Result;
use chrono::{DateTime, Local};
use std::time::Duration;
use thiserror::Error;

pub use keyvalue::KeyValueTestResult;
pub use multi::MultiTestResult;
pub use program::{TestFn, TestProgram};
pub use text::TextTestResult;

/// Returned (through `anyhow`) by a test that decides to skip itself
#[derive(Debug, Error)]
#[error("skipped: {0}")]
pub struct SkipTest(pub String);

/// Callbacks of one test run.
///
/// Every outcome method is called between the `start_test` and `stop_test`
/// of the same test.
pub trait TestResult {
    fn start_test_run(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_test_run(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_test(&mut self, test: &str) -> Result<()>;

    fn stop_test(&mut self, test: &str) -> Result<()>;

    fn add_success(&mut self, test: &str) -> Result<()>;

    fn add_failure(&mut self, test: &str, message: &str) -> Result<()>;

    fn add_error(&mut self, test: &str, message: &str) -> Result<()>;

    fn add_skip(&mut self, test: &str, reason: &str) -> Result<()>;

    fn add_expected_failure(&mut self, test: &str, message: &str) -> Result<()>;

    fn add_unexpected_success(&mut self, test: &str) -> Result<()>;

    /// Timing of the whole run, measured by the caller
    fn set_times(&mut self, times: RunTimes);

    /// Counters, if the result keeps them
    fn counts(&self) -> Option<&ResultCounts> {
        None
    }
}

/// Timing of one test run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTimes {
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
    pub time_taken: Option<Duration>,
}

/// Outcome bookkeeping shared by the concrete results
#[derive(Debug, Clone, Default)]
pub struct ResultCounts {
    pub tests_run: u64,
    pub successes: u64,
    pub failures: Vec<(String, String)>,
    pub errors: Vec<(String, String)>,
    pub skipped: Vec<(String, String)>,
    pub expected_failures: Vec<(String, String)>,
    pub unexpected_successes: Vec<String>,
    pub times: RunTimes,
    current: Option<String>,
}

impl ResultCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_test(&mut self, test: &str) -> Result<()> {
        if let Some(current) = &self.current {
            anyhow::bail!("test {test} started while {current} is still running");
        }
        self.current = Some(test.to_string());
        self.tests_run += 1;
        Ok(())
    }

    pub fn stop_test(&mut self, test: &str) -> Result<()> {
        match self.current.take() {
            Some(current) if current == test => Ok(()),
            Some(current) => anyhow::bail!("test {test} stopped while {current} is running"),
            None => anyhow::bail!("test {test} stopped without being started"),
        }
    }

    pub fn total(&self) -> u64 {
        self.successes
            + self.failures.len() as u64
            + self.errors.len() as u64
            + self.skipped.len() as u64
            + self.expected_failures.len() as u64
            + self.unexpected_successes.len() as u64
    }

    /// No failures, errors or unexpected successes
    pub fn was_successful(&self) -> bool {
        self.failures.is_empty() && self.errors.is_empty() && self.unexpected_successes.is_empty()
    }
}
