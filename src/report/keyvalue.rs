//! Run-level key=value summary

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{CountingReporter, FileOutcome, FileReporter, RunHooks, TestCounts};
use crate::fs::locked_write;
use crate::keyvalue::{join_list, to_text};
use crate::models::{TestModule, SUMMARY_FILE_NAME};

/// Writes `test_keyvalue_result.txt` into the results root at the end of
/// the run.
pub struct KeyValueReporter {
    counts: CountingReporter,
    tests: TestCounts,
    results_dir: Option<PathBuf>,
    names: Vec<String>,
    tested_dirs: Vec<String>,
    returncodes: Vec<i32>,
    tested_modules: BTreeSet<String>,
    test_file_authors: BTreeSet<String>,
    /// Extra pairs appended to the summary, e.g. the location
    info: Vec<(String, String)>,
}

impl KeyValueReporter {
    pub fn new(info: Vec<(String, String)>) -> Self {
        Self {
            counts: CountingReporter::new(),
            tests: TestCounts::default(),
            results_dir: None,
            names: Vec::new(),
            tested_dirs: Vec::new(),
            returncodes: Vec::new(),
            tested_modules: BTreeSet::new(),
            test_file_authors: BTreeSet::new(),
            info,
        }
    }

    /// Summary pairs in output order
    pub fn pairs(&self) -> Vec<(String, String)> {
        let status = if self.counts.files_fail() > 0 {
            "failed"
        } else {
            "succeeded"
        };
        let timestamp = self
            .counts
            .started_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let mut pairs: Vec<(String, String)> = vec![
            ("files_total".into(), self.counts.files_total().to_string()),
            ("files_successes".into(), self.counts.files_pass().to_string()),
            ("files_failures".into(), self.counts.files_fail().to_string()),
            ("names".into(), join_list(&self.names)),
            ("tested_dirs".into(), join_list(&self.tested_dirs)),
            (
                "files_returncodes".into(),
                join_list(self.returncodes.iter().map(|rc| rc.to_string())),
            ),
            ("time".into(), format!("{}", self.counts.run_time().as_secs_f64())),
            ("status".into(), status.into()),
            ("total".into(), self.tests.total.to_string()),
            ("successes".into(), self.tests.successes.to_string()),
            ("failures".into(), self.tests.failures.to_string()),
            ("errors".into(), self.tests.errors.to_string()),
            ("skipped".into(), self.tests.skipped.to_string()),
            (
                "expected_failures".into(),
                self.tests.expected_failures.to_string(),
            ),
            (
                "unexpected_successes".into(),
                self.tests.unexpected_successes.to_string(),
            ),
            (
                "test_file_authors".into(),
                join_list(&self.test_file_authors),
            ),
            ("tested_modules".into(), join_list(&self.tested_modules)),
            ("timestamp".into(), timestamp),
        ];
        for (key, value) in &self.info {
            match pairs.iter_mut().find(|(k, _)| k == key) {
                Some(pair) => pair.1 = value.clone(),
                None => pairs.push((key.clone(), value.clone())),
            }
        }
        pairs
    }
}

impl FileReporter for KeyValueReporter {
    fn name(&self) -> &str {
        "keyvalue"
    }

    fn start_file_test(&mut self, module: &TestModule) -> Result<()> {
        Ok(self.counts.start_file(module)?)
    }

    fn end_file_test(&mut self, outcome: &FileOutcome<'_>) -> Result<()> {
        self.counts.end_file(outcome.returncode())?;
        self.tests.add(outcome.summary);
        self.returncodes.push(outcome.returncode());
        self.names.push(outcome.module.name().to_string());
        self.tested_dirs.push(outcome.module.tested_dir().to_string());
        self.tested_modules
            .extend(outcome.summary.tested_modules.iter().cloned());
        self.test_file_authors.extend(
            outcome
                .summary
                .test_file_authors
                .iter()
                .filter(|a| !a.is_empty())
                .cloned(),
        );
        Ok(())
    }

    fn run_hooks(&mut self) -> Option<&mut dyn RunHooks> {
        Some(self)
    }

    fn counts(&self) -> Option<&CountingReporter> {
        Some(&self.counts)
    }
}

impl RunHooks for KeyValueReporter {
    fn start(&mut self, results_dir: &Path) -> Result<()> {
        let info = std::mem::take(&mut self.info);
        *self = Self::new(info);
        self.counts.start();
        self.results_dir = Some(results_dir.to_path_buf());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.counts.finish()?;
        self.tests.check("run summary");
        let results_dir = self
            .results_dir
            .as_deref()
            .context("key-value reporter finished before start")?;
        let path = results_dir.join(SUMMARY_FILE_NAME);
        locked_write(&path, &to_text(&self.pairs()))
    }
}
