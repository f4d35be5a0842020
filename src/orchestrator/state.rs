//! Running state of one batch run and the summary handed back to callers

use std::path::PathBuf;
use std::time::Duration;

use crate::executor::ModuleRun;
use crate::models::TestModule;
use crate::report::{percent, RollupTotals, TestCounts, TestedDirs};

/// Everything the orchestrator learns while it walks the module list.
///
/// Owned by a single run and threaded through it by reference; nothing
/// here outlives the run.
#[derive(Debug, Default)]
pub struct RunState {
    tested_dirs: TestedDirs,
    returncodes: Vec<i32>,
    timed_out: u64,
    tests: TestCounts,
}

impl RunState {
    pub fn new(modules: &[TestModule]) -> Self {
        let mut tested_dirs = TestedDirs::new();
        for module in modules {
            tested_dirs
                .entry(module.tested_dir().to_string())
                .or_default()
                .push(module.name().to_string());
        }
        for names in tested_dirs.values_mut() {
            names.sort();
            names.dedup();
        }
        Self {
            tested_dirs,
            ..Self::default()
        }
    }

    /// Modules per tested directory, as fed to the roll-up pass
    pub fn tested_dirs(&self) -> &TestedDirs {
        &self.tested_dirs
    }

    pub fn record(&mut self, run: &ModuleRun) {
        self.returncodes.push(run.execution.returncode);
        if run.execution.timed_out.is_some() {
            self.timed_out += 1;
        }
        self.tests.add(&run.summary);
    }

    pub fn into_summary(
        self,
        results_dir: PathBuf,
        rollup: RollupTotals,
        duration: Duration,
    ) -> RunSummary {
        let files_pass = self.returncodes.iter().filter(|&&rc| rc == 0).count() as u64;
        RunSummary {
            results_dir,
            files_total: self.returncodes.len() as u64,
            files_pass,
            files_fail: self.returncodes.len() as u64 - files_pass,
            files_timed_out: self.timed_out,
            tests: self.tests,
            rollup,
            duration,
        }
    }
}

/// Aggregate outcome of a batch run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub results_dir: PathBuf,
    pub files_total: u64,
    pub files_pass: u64,
    pub files_fail: u64,
    pub files_timed_out: u64,
    pub tests: TestCounts,
    pub rollup: RollupTotals,
    pub duration: Duration,
}

impl RunSummary {
    /// File-level pass percentage, `None` when nothing ran
    pub fn pass_percent(&self) -> Option<f64> {
        percent(self.files_pass, self.files_total)
    }

    /// Whether at least one file ran and at least `min_success` percent of
    /// the files passed
    pub fn passes(&self, min_success: f64) -> bool {
        self.pass_percent().is_some_and(|p| p >= min_success)
    }
}
