use anyhow::Result;

use super::{ResultCounts, RunTimes, TestResult};

/// Forwards every call to each result in order
#[derive(Default)]
pub struct MultiTestResult {
    results: Vec<Box<dyn TestResult>>,
}

impl MultiTestResult {
    pub fn new(results: Vec<Box<dyn TestResult>>) -> Self {
        Self { results }
    }

    pub fn push(&mut self, result: Box<dyn TestResult>) {
        self.results.push(result);
    }

    fn each(&mut self, mut call: impl FnMut(&mut dyn TestResult) -> Result<()>) -> Result<()> {
        for result in &mut self.results {
            call(result.as_mut())?;
        }
        Ok(())
    }
}

impl TestResult for MultiTestResult {
    fn start_test_run(&mut self) -> Result<()> {
        self.each(|r| r.start_test_run())
    }

    fn stop_test_run(&mut self) -> Result<()> {
        self.each(|r| r.stop_test_run())
    }

    fn start_test(&mut self, test: &str) -> Result<()> {
        self.each(|r| r.start_test(test))
    }

    fn stop_test(&mut self, test: &str) -> Result<()> {
        self.each(|r| r.stop_test(test))
    }

    fn add_success(&mut self, test: &str) -> Result<()> {
        self.each(|r| r.add_success(test))
    }

    fn add_failure(&mut self, test: &str, message: &str) -> Result<()> {
        self.each(|r| r.add_failure(test, message))
    }

    fn add_error(&mut self, test: &str, message: &str) -> Result<()> {
        self.each(|r| r.add_error(test, message))
    }

    fn add_skip(&mut self, test: &str, reason: &str) -> Result<()> {
        self.each(|r| r.add_skip(test, reason))
    }

    fn add_expected_failure(&mut self, test: &str, message: &str) -> Result<()> {
        self.each(|r| r.add_expected_failure(test, message))
    }

    fn add_unexpected_success(&mut self, test: &str) -> Result<()> {
        self.each(|r| r.add_unexpected_success(test))
    }

    fn set_times(&mut self, times: RunTimes) {
        for result in &mut self.results {
            result.set_times(times);
        }
    }

    /// Counters of the first result that keeps them
    fn counts(&self) -> Option<&ResultCounts> {
        self.results.iter().find_map(|r| r.counts())
    }
}
