//! Fan-out of the reporter lifecycle to several reporters

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::{CountingReporter, FileOutcome, FileReporter, ReportError, RunHooks};
use crate::models::TestModule;

/// Content of the `.gitignore` placed in a results directory
const GITIGNORE_CONTENT: &str = "*\n";

/// Calls every reporter in order.
///
/// Which reporters have run hooks is decided once, when the composition is
/// built. In forgiving mode reporters without hooks only receive the
/// per-file calls; otherwise such a reporter is rejected up front.
pub struct MultiReporter {
    reporters: Vec<Box<dyn FileReporter>>,
    with_hooks: Vec<usize>,
}

impl MultiReporter {
    pub fn new(mut reporters: Vec<Box<dyn FileReporter>>, forgiving: bool) -> Result<Self> {
        let mut with_hooks = Vec::with_capacity(reporters.len());
        for (index, reporter) in reporters.iter_mut().enumerate() {
            if reporter.run_hooks().is_some() {
                with_hooks.push(index);
            } else if forgiving {
                debug!(reporter = reporter.name(), "reporter has no run hooks");
            } else {
                return Err(ReportError::MissingRunHooks(reporter.name().to_string()).into());
            }
        }
        Ok(Self {
            reporters,
            with_hooks,
        })
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    fn each_hook(&mut self, mut call: impl FnMut(&mut dyn RunHooks) -> Result<()>) -> Result<()> {
        for &index in &self.with_hooks {
            let reporter = &mut self.reporters[index];
            let name = reporter.name().to_string();
            if let Some(hooks) = reporter.run_hooks() {
                call(hooks).with_context(|| format!("Reporter {name} failed"))?;
            }
        }
        Ok(())
    }
}

impl FileReporter for MultiReporter {
    fn name(&self) -> &str {
        "multi"
    }

    fn start_file_test(&mut self, module: &TestModule) -> Result<()> {
        for reporter in &mut self.reporters {
            let name = reporter.name().to_string();
            reporter
                .start_file_test(module)
                .with_context(|| format!("Reporter {name} failed"))?;
        }
        Ok(())
    }

    fn end_file_test(&mut self, outcome: &FileOutcome<'_>) -> Result<()> {
        for reporter in &mut self.reporters {
            let name = reporter.name().to_string();
            reporter
                .end_file_test(outcome)
                .with_context(|| format!("Reporter {name} failed"))?;
        }
        Ok(())
    }

    fn run_hooks(&mut self) -> Option<&mut dyn RunHooks> {
        Some(self)
    }

    /// Counters of the first reporter that keeps them
    fn counts(&self) -> Option<&CountingReporter> {
        self.reporters.iter().find_map(|r| r.counts())
    }
}

impl RunHooks for MultiReporter {
    /// Create the results directory, mark it ignored for version control
    /// and start every reporter with hooks.
    fn start(&mut self, results_dir: &Path) -> Result<()> {
        fs::create_dir_all(results_dir).with_context(|| {
            format!("Failed to create results directory: {}", results_dir.display())
        })?;
        let gitignore = results_dir.join(".gitignore");
        fs::write(&gitignore, GITIGNORE_CONTENT)
            .with_context(|| format!("Failed to write {}", gitignore.display()))?;
        self.each_hook(|hooks| hooks.start(results_dir))
    }

    fn finish(&mut self) -> Result<()> {
        self.each_hook(|hooks| hooks.finish())
    }
}
