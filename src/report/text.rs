//! Plain-text progress and summary

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use super::{
    format_elapsed, format_percentage, CountingReporter, FileOutcome, FileReporter, RunHooks,
};
use crate::models::{format_secs, TestModule};

/// Width of the rule framing a failed file's stderr
const RULE_WIDTH: usize = 72;

/// Streams one line per started file, the stderr of failed files and a
/// closing sentence to a text sink.
pub struct TextReporter<W: Write> {
    counts: CountingReporter,
    stream: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            counts: CountingReporter::new(),
            stream,
        }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }

    fn write_failure(&mut self, outcome: &FileOutcome<'_>) -> std::io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.stream, "{rule}")?;
        let stderr = outcome.stderr_text();
        self.stream.write_all(stderr.as_bytes())?;
        if !stderr.is_empty() && !stderr.ends_with('\n') {
            writeln!(self.stream)?;
        }
        writeln!(self.stream, "{rule}")?;

        write!(self.stream, "FAILED {}", outcome.module.file_path().display())?;
        if let Some(timeout) = outcome.timed_out() {
            write!(self.stream, " - Timeout >{}s", format_secs(timeout))?;
        }
        let failed = outcome.summary.bad_count();
        match failed {
            0 => {}
            1 => write!(self.stream, " (1 test failed)")?,
            n => write!(self.stream, " ({n} tests failed)")?,
        }
        writeln!(self.stream)
    }
}

impl<W: Write> FileReporter for TextReporter<W> {
    fn name(&self) -> &str {
        "text"
    }

    fn start_file_test(&mut self, module: &TestModule) -> Result<()> {
        self.counts.start_file(module)?;
        writeln!(self.stream, "Running {}...", module.file_path().display())
            .and_then(|_| self.stream.flush())
            .context("Failed to write progress")
    }

    fn end_file_test(&mut self, outcome: &FileOutcome<'_>) -> Result<()> {
        self.counts.end_file(outcome.returncode())?;
        if outcome.returncode() != 0 {
            self.write_failure(outcome)
                .context("Failed to write failure report")?;
        }
        Ok(())
    }

    fn run_hooks(&mut self) -> Option<&mut dyn RunHooks> {
        Some(self)
    }

    fn counts(&self) -> Option<&CountingReporter> {
        Some(&self.counts)
    }
}

impl<W: Write> RunHooks for TextReporter<W> {
    fn start(&mut self, _results_dir: &Path) -> Result<()> {
        self.counts.start();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.counts.finish()?;
        write!(
            self.stream,
            "\nExecuted {} test files in {}.\nFrom them {} files ({}) were successful and {} files ({}) failed.\n",
            self.counts.files_total(),
            format_elapsed(self.counts.run_time()),
            self.counts.files_pass(),
            format_percentage(self.counts.file_pass_percent()),
            self.counts.files_fail(),
            format_percentage(self.counts.file_fail_percent()),
        )
        .and_then(|_| self.stream.flush())
        .context("Failed to write run summary")
    }
}
