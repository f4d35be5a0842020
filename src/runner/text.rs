use anyhow::{Context, Result};
use std::io::Write;

use super::{ResultCounts, RunTimes, TestResult};

const SEPARATOR_HEAVY: usize = 70;

/// Human-readable result: one character (or one line when verbose) per
/// test, then the failure details and a closing verdict
pub struct TextTestResult<W: Write> {
    counts: ResultCounts,
    stream: W,
    verbose: bool,
}

impl<W: Write> TextTestResult<W> {
    pub fn new(stream: W, verbose: bool) -> Self {
        Self {
            counts: ResultCounts::new(),
            stream,
            verbose,
        }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }

    fn progress(&mut self, short: &str, long: &str) -> Result<()> {
        let text = if self.verbose { long } else { short };
        if self.verbose {
            writeln!(self.stream, "{text}")
        } else {
            write!(self.stream, "{text}")
        }
        .and_then(|_| self.stream.flush())
        .context("Failed to write test progress")
    }

    fn print_errors(&mut self, flavour: &str, errors: &[(String, String)]) -> std::io::Result<()> {
        for (test, message) in errors {
            writeln!(self.stream, "{}", "=".repeat(SEPARATOR_HEAVY))?;
            writeln!(self.stream, "{flavour}: {test}")?;
            writeln!(self.stream, "{}", "-".repeat(SEPARATOR_HEAVY))?;
            writeln!(self.stream, "{message}")?;
        }
        Ok(())
    }

    fn write_summary(&mut self) -> std::io::Result<()> {
        if !self.verbose {
            writeln!(self.stream)?;
        }
        let errors = self.counts.errors.clone();
        let failures = self.counts.failures.clone();
        self.print_errors("ERROR", &errors)?;
        self.print_errors("FAIL", &failures)?;
        writeln!(self.stream, "{}", "-".repeat(SEPARATOR_HEAVY))?;

        let run = self.counts.tests_run;
        let noun = if run == 1 { "test" } else { "tests" };
        let taken = self
            .counts
            .times
            .time_taken
            .map(|t| format!(" in {:.3}s", t.as_secs_f64()))
            .unwrap_or_default();
        writeln!(self.stream, "Ran {run} {noun}{taken}")?;
        writeln!(self.stream)?;
        writeln!(self.stream, "{}", self.verdict())
    }

    fn verdict(&self) -> String {
        let counts = &self.counts;
        let mut infos = Vec::new();
        if !counts.failures.is_empty() {
            infos.push(format!("failures={}", counts.failures.len()));
        }
        if !counts.errors.is_empty() {
            infos.push(format!("errors={}", counts.errors.len()));
        }
        if !counts.skipped.is_empty() {
            infos.push(format!("skipped={}", counts.skipped.len()));
        }
        if !counts.expected_failures.is_empty() {
            infos.push(format!("expected failures={}", counts.expected_failures.len()));
        }
        if !counts.unexpected_successes.is_empty() {
            infos.push(format!(
                "unexpected successes={}",
                counts.unexpected_successes.len()
            ));
        }
        let head = if counts.was_successful() { "OK" } else { "FAILED" };
        if infos.is_empty() {
            head.to_string()
        } else {
            format!("{head} ({})", infos.join(", "))
        }
    }
}

impl<W: Write> TestResult for TextTestResult<W> {
    fn stop_test_run(&mut self) -> Result<()> {
        self.write_summary()
            .and_then(|_| self.stream.flush())
            .context("Failed to write test summary")
    }

    fn start_test(&mut self, test: &str) -> Result<()> {
        self.counts.start_test(test)?;
        if self.verbose {
            write!(self.stream, "{test} ... ").context("Failed to write test progress")?;
        }
        Ok(())
    }

    fn stop_test(&mut self, test: &str) -> Result<()> {
        self.counts.stop_test(test)
    }

    fn add_success(&mut self, _test: &str) -> Result<()> {
        self.counts.successes += 1;
        self.progress(".", "ok")
    }

    fn add_failure(&mut self, test: &str, message: &str) -> Result<()> {
        self.counts
            .failures
            .push((test.to_string(), message.to_string()));
        self.progress("F", "FAIL")
    }

    fn add_error(&mut self, test: &str, message: &str) -> Result<()> {
        self.counts
            .errors
            .push((test.to_string(), message.to_string()));
        self.progress("E", "ERROR")
    }

    fn add_skip(&mut self, test: &str, reason: &str) -> Result<()> {
        self.counts
            .skipped
            .push((test.to_string(), reason.to_string()));
        let long = format!("skipped {reason:?}");
        self.progress("s", &long)
    }

    fn add_expected_failure(&mut self, test: &str, message: &str) -> Result<()> {
        self.counts
            .expected_failures
            .push((test.to_string(), message.to_string()));
        self.progress("x", "expected failure")
    }

    fn add_unexpected_success(&mut self, test: &str) -> Result<()> {
        self.counts.unexpected_successes.push(test.to_string());
        self.progress("u", "unexpected success")
    }

    fn set_times(&mut self, times: RunTimes) {
        self.counts.times = times;
    }

    fn counts(&self) -> Option<&ResultCounts> {
        Some(&self.counts)
    }
}
