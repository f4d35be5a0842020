//! Core orchestrator for a batch run in one location
//!
//! The orchestrator is the heart of `gridtest batch`. It:
//! - Refuses results directories that would pollute the search space
//! - Locks, optionally wipes and prepares the results directory
//! - Discovers the test modules below the start directory
//! - Runs every module in its own sandbox, one at a time
//! - Feeds each outcome to the composed reporters
//! - Builds the roll-up pages and the navigation page at the end

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::state::{RunState, RunSummary};
use super::RunError;
use crate::config::{resolve_python, RunConfig};
use crate::discovery::{discover, DiscoveryOptions, LocationFilter};
use crate::executor::{ExecutionTarget, ModuleRun, PathRedactor, TestExecutor};
use crate::fs::{clear_dir_except, ResultsLock, RESULTS_LOCK_FILE};
use crate::models::TestModule;
use crate::report::{
    write_navigation_page, FileOutcome, FileReporter, HtmlReporter, KeyValueReporter,
    MultiReporter, RunHooks, TestsuiteDirReporter, TextReporter,
};
use crate::sandbox::SandboxProvisioner;

/// Installation root whose absolute paths are stripped from reports
const GISBASE_VAR: &str = "GISBASE";

/// Target of one batch run
#[derive(Debug, Clone)]
pub struct LocationTarget {
    /// Database root holding the location
    pub db_root: PathBuf,
    pub location: String,
    /// Tag of the location, e.g. `nc`; matched against module applicability
    pub location_type: String,
}

/// Runs every discovered module of a source tree against one location
pub struct Orchestrator {
    start_dir: PathBuf,
    config: RunConfig,
}

impl Orchestrator {
    pub fn new(start_dir: impl Into<PathBuf>, config: RunConfig) -> Self {
        Self {
            start_dir: start_dir.into(),
            config,
        }
    }

    /// Run all modules below the start directory and write the full report
    /// tree to `results_dir`.
    ///
    /// Nothing is written anywhere when `results_dir` is the start directory.
    pub fn run_in_location(
        &self,
        target: &LocationTarget,
        results_dir: &Path,
        exclude: &[String],
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let start_dir = fs::canonicalize(&self.start_dir).with_context(|| {
            format!("Failed to resolve start directory: {}", self.start_dir.display())
        })?;
        let results_dir = resolve_results_dir(results_dir)?;
        self.check_results_dir(&start_dir, &results_dir)?;

        fs::create_dir_all(&results_dir).with_context(|| {
            format!("Failed to create results directory: {}", results_dir.display())
        })?;
        let _lock = ResultsLock::try_acquire(&results_dir)?
            .ok_or_else(|| RunError::ResultsDirBusy(results_dir.clone()))?;
        if self.config.clean_outputs {
            debug!(results = %results_dir.display(), "clearing previous results");
            clear_dir_except(&results_dir, &[RESULTS_LOCK_FILE])?;
        }

        let options = DiscoveryOptions::from_config(&self.config, exclude);
        let filter = LocationFilter::new(&target.location_type);
        let modules = discover(&start_dir, &options, &filter)?;
        info!(
            modules = modules.len(),
            location = %target.location,
            "starting batch run"
        );
        let mut state = RunState::new(&modules);

        let reporters: Vec<Box<dyn FileReporter>> = vec![
            Box::new(TextReporter::new(io::stdout())),
            Box::new(HtmlReporter::new()),
            Box::new(KeyValueReporter::new(vec![
                ("location".to_string(), target.location.clone()),
                ("location_type".to_string(), target.location_type.clone()),
            ])),
        ];
        let mut reporter = MultiReporter::new(reporters, true)?;
        let executor = self.executor(&start_dir, &target.db_root, &results_dir)?;
        let provisioner = SandboxProvisioner::new(&target.db_root, &target.location)
            .with_cleanup(self.config.clean_before, self.config.clean_after);
        let exec_target = ExecutionTarget {
            db_root: &target.db_root,
            location: &target.location,
            results_dir: &results_dir,
        };

        RunHooks::start(&mut reporter, &results_dir)?;
        for module in &modules {
            reporter.start_file_test(module)?;
            let run = run_module(&executor, &provisioner, module, &exec_target)?;
            reporter.end_file_test(&FileOutcome {
                module,
                results_subdir: &run.results_subdir,
                execution: &run.execution,
                summary: &run.summary,
            })?;
            state.record(&run);
        }
        RunHooks::finish(&mut reporter)?;

        let rollup = TestsuiteDirReporter::default()
            .report_for_dirs(&results_dir, state.tested_dirs())?;
        write_navigation_page(&results_dir)?;

        let summary = state.into_summary(results_dir, rollup, started.elapsed());
        info!(
            files = summary.files_total,
            passed = summary.files_pass,
            failed = summary.files_fail,
            timed_out = summary.files_timed_out,
            "batch run finished"
        );
        Ok(summary)
    }

    fn check_results_dir(&self, start_dir: &Path, results_dir: &Path) -> Result<(), RunError> {
        if results_dir == start_dir {
            return Err(RunError::ResultsDirIsStartDir(results_dir.to_path_buf()));
        }
        if self.config.clean_outputs && start_dir.starts_with(results_dir) {
            return Err(RunError::UnsafeClean {
                results_dir: results_dir.to_path_buf(),
                start_dir: start_dir.to_path_buf(),
            });
        }
        Ok(())
    }

    fn executor(
        &self,
        start_dir: &Path,
        db_root: &Path,
        results_dir: &Path,
    ) -> Result<TestExecutor> {
        let mut redacted = vec![
            start_dir.to_path_buf(),
            db_root.to_path_buf(),
            results_dir.to_path_buf(),
        ];
        if let Some(gisbase) = env::var_os(GISBASE_VAR).filter(|v| !v.is_empty()) {
            redacted.push(PathBuf::from(gisbase));
        }
        let python = resolve_python(self.config.python.as_ref());
        debug!(python = %python.display(), "python interpreter");
        Ok(TestExecutor::new(python, self.config.timeout)
            .with_redactor(Box::new(PathRedactor::new(redacted)?)))
    }
}

/// Sandbox, execute and clean up one module.
///
/// A sandbox that cannot be provisioned, or an execution that cannot be
/// recorded, fails this module only.
fn run_module(
    executor: &TestExecutor,
    provisioner: &SandboxProvisioner,
    module: &TestModule,
    target: &ExecutionTarget<'_>,
) -> Result<ModuleRun> {
    match provisioner.create(module) {
        Ok(sandbox) => {
            debug!(module = module.name(), sandbox = sandbox.id(), "sandbox ready");
            let run = executor.execute(module, &sandbox, target);
            drop(sandbox);
            match run {
                Ok(run) => Ok(run),
                Err(err) => {
                    warn!(module = module.name(), error = %format!("{err:#}"), "execution failed");
                    executor.record_unexecuted(module, target.results_dir, &format!("{err:#}"))
                }
            }
        }
        Err(err) => {
            warn!(module = module.name(), error = %err, "cannot provision sandbox");
            executor.record_unexecuted(module, target.results_dir, &err.to_string())
        }
    }
}

/// Absolute form of a results directory that may not exist yet, with the
/// existing part of it canonicalized
fn resolve_results_dir(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .context("Failed to get current directory")?
            .join(path)
    };
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if existing.exists() {
            let mut resolved = fs::canonicalize(existing)
                .with_context(|| format!("Failed to resolve {}", existing.display()))?;
            for part in missing.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }
}
