//! Full execution cycle of one test module

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::capture::run_captured;
use super::child::{write_session_rc, ChildConfig};
use super::decode::decode_output;
use super::redact::{NoopRedactor, Redactor};
use crate::fs::copy_dir_recursive;
use crate::models::{
    format_secs, ExecutionResult, TestModule, TestSummary, SUMMARY_FILE_NAME,
    TIMEOUT_RETURNCODE,
};
use crate::sandbox::Sandbox;

/// Captured standard output inside a module results directory
pub const STDOUT_FILE: &str = "stdout.txt";

/// Captured standard error inside a module results directory
pub const STDERR_FILE: &str = "stderr.txt";

/// Test data directory inside a testsuite, copied next to the results
pub const TEST_DATA_DIR: &str = "data";

/// Where the executor runs a module and what it runs against
#[derive(Debug, Clone)]
pub struct ExecutionTarget<'a> {
    pub db_root: &'a Path,
    pub location: &'a str,
    pub results_dir: &'a Path,
}

/// Outcome of one module handed to the executor
#[derive(Debug, Clone)]
pub struct ModuleRun {
    pub execution: ExecutionResult,
    pub summary: TestSummary,
    pub results_subdir: PathBuf,
}

pub struct TestExecutor {
    python: PathBuf,
    timeout: Option<Duration>,
    redactor: Box<dyn Redactor>,
}

impl TestExecutor {
    pub fn new(python: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            python: python.into(),
            timeout,
            redactor: Box::new(NoopRedactor),
        }
    }

    pub fn with_redactor(mut self, redactor: Box<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    /// Run `module` inside `sandbox` and persist its outputs and summary.
    ///
    /// The session file is removed before this returns, on every path; the
    /// sandbox is removed by its owner dropping it.
    pub fn execute(
        &self,
        module: &TestModule,
        sandbox: &Sandbox,
        target: &ExecutionTarget<'_>,
    ) -> Result<ModuleRun> {
        let results_subdir = prepare_results_subdir(module, target.results_dir)?;
        let data_error = copy_test_data(module, &results_subdir).err();

        let mut execution = match write_session_rc(target.db_root, target.location, sandbox.id()) {
            Ok(rc_file) => {
                let config = ChildConfig::for_module(module, &self.python, &results_subdir)
                    .with_session(rc_file.path())
                    .with_timeout(self.timeout);
                self.run(&config)
            }
            Err(err) => ExecutionResult::not_started(format!("{err:#}")),
        };
        if let Some(err) = data_error {
            warn!(module = module.name(), error = %format!("{err:#}"), "test data not copied");
            append_line(&mut execution.stderr, &format!("Test data not copied: {err:#}"));
        }

        info!(module = module.name(), result = %execution.summary(), "executed");
        self.finalize(module, results_subdir, execution)
    }

    /// Persist the outputs of a module that could not be executed
    pub fn record_unexecuted(
        &self,
        module: &TestModule,
        results_dir: &Path,
        reason: &str,
    ) -> Result<ModuleRun> {
        let results_subdir = prepare_results_subdir(module, results_dir)?;
        let execution = ExecutionResult::not_started(reason);
        self.finalize(module, results_subdir, execution)
    }

    /// Spawn the child and decode what it printed. Never fails: a child that
    /// cannot be started becomes a failing result.
    pub fn run(&self, config: &ChildConfig) -> ExecutionResult {
        let raw = match run_captured(config) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "cannot start test process");
                return ExecutionResult::not_started(format!("{err:#}"));
            }
        };

        let stdout = decode_output(&raw.stdout);
        let mut stderr = decode_output(&raw.stderr);
        if let Some(timeout) = raw.timed_out {
            append_line(&mut stderr, &timeout_message(timeout));
        }
        ExecutionResult::new(
            stdout,
            stderr,
            raw.returncode,
            raw.timed_out,
            raw.wall_duration,
        )
    }

    fn finalize(
        &self,
        module: &TestModule,
        results_subdir: PathBuf,
        execution: ExecutionResult,
    ) -> Result<ModuleRun> {
        let stdout_path = results_subdir.join(STDOUT_FILE);
        let stderr_path = results_subdir.join(STDERR_FILE);
        fs::write(&stdout_path, &execution.stdout)
            .with_context(|| format!("Failed to write {}", stdout_path.display()))?;
        fs::write(&stderr_path, &execution.stderr)
            .with_context(|| format!("Failed to write {}", stderr_path.display()))?;

        let summary_path = results_subdir.join(SUMMARY_FILE_NAME);
        let existing = if summary_path.is_file() {
            match TestSummary::read(&summary_path) {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(module = module.name(), error = %format!("{err:#}"), "ignoring unreadable summary written by test");
                    None
                }
            }
        } else {
            None
        };
        let summary = TestSummary::merge_execution(existing, module, &execution);
        summary.write(&summary_path)?;
        debug!(summary = %summary_path.display(), "wrote summary");

        let mut to_redact = vec![stdout_path, stderr_path];
        to_redact.extend(
            summary
                .supplementary_files
                .iter()
                .map(|file| results_subdir.join(file))
                .filter(|path| path.is_file()),
        );
        for path in to_redact {
            if let Err(err) = self.redactor.redact_file(&path) {
                warn!(file = %path.display(), error = %format!("{err:#}"), "cannot redact output");
            }
        }

        Ok(ModuleRun {
            execution,
            summary,
            results_subdir,
        })
    }
}

/// Timeout diagnostic added to stderr of a killed module
pub fn timeout_message(timeout: Duration) -> String {
    format!(
        "Test process killed: timeout of {} s exceeded (return code {TIMEOUT_RETURNCODE})",
        format_secs(timeout)
    )
}

fn append_line(text: &mut String, line: &str) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(line);
    text.push('\n');
}

/// Create the module results directory and remove a summary left over
/// from an earlier run.
fn prepare_results_subdir(module: &TestModule, results_dir: &Path) -> Result<PathBuf> {
    let subdir = module.results_subdir(results_dir);
    fs::create_dir_all(&subdir)
        .with_context(|| format!("Failed to create results directory: {}", subdir.display()))?;

    let stale = subdir.join(SUMMARY_FILE_NAME);
    if stale.exists() {
        fs::remove_file(&stale)
            .with_context(|| format!("Failed to remove stale summary: {}", stale.display()))?;
    }
    Ok(subdir)
}

/// Copy the testsuite's data directory, if any, next to the results
fn copy_test_data(module: &TestModule, subdir: &Path) -> Result<()> {
    let data = module.file_dir().join(TEST_DATA_DIR);
    if data.is_dir() {
        copy_dir_recursive(&data, &subdir.join(TEST_DATA_DIR))?;
    }
    Ok(())
}
