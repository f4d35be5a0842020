//! Persisted per-module summary (`test_keyvalue_result.txt`)
//!
//! The executor writes one summary per executed module. A test process may
//! already have written a richer one into its working directory (which is
//! the module's results subdirectory); the executor then merges its own
//! authoritative fields into it instead of replacing it. The roll-up pass
//! reads these files back without re-running anything.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use super::{ExecutionResult, TestModule};
use crate::fs::{locked_read, locked_write};
use crate::keyvalue::{join_list, to_text, KeyValue, KeyValueError};

/// File name of a summary inside a module results directory
/// (and of the run-level summary in the results root).
pub const SUMMARY_FILE_NAME: &str = "test_keyvalue_result.txt";

/// Schema version written as `summary_version`
pub const SUMMARY_VERSION: u32 = 1;

const KNOWN_KEYS: &[&str] = &[
    "summary_version",
    "name",
    "tested_dir",
    "status",
    "returncode",
    "timed_out",
    "total",
    "successes",
    "failures",
    "errors",
    "skipped",
    "expected_failures",
    "unexpected_successes",
    "test_file_authors",
    "tested_modules",
    "supplementary_files",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryStatus {
    Succeeded,
    Failed,
    /// Status string written by a test process that we do not interpret
    Other(String),
}

impl SummaryStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "succeeded" | "passed" => SummaryStatus::Succeeded,
            "failed" => SummaryStatus::Failed,
            other => SummaryStatus::Other(other.to_string()),
        }
    }

    pub fn from_returncode(returncode: i32) -> Self {
        if returncode == 0 {
            SummaryStatus::Succeeded
        } else {
            SummaryStatus::Failed
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryStatus::Succeeded => write!(f, "succeeded"),
            SummaryStatus::Failed => write!(f, "failed"),
            SummaryStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Typed view of a module summary.
///
/// Test counts are optional: a test process that never wrote its own summary
/// (shell scripts, crashes, timeouts) leaves them unknown.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestSummary {
    pub version: u32,
    pub name: String,
    pub tested_dir: String,
    pub status: Option<SummaryStatus>,
    pub returncode: Option<i32>,
    /// Timeout in seconds when the module was killed
    pub timed_out: Option<f64>,
    pub total: Option<u64>,
    pub successes: Option<u64>,
    pub failures: Option<u64>,
    pub errors: Option<u64>,
    pub skipped: Option<u64>,
    pub expected_failures: Option<u64>,
    pub unexpected_successes: Option<u64>,
    pub test_file_authors: Vec<String>,
    pub tested_modules: BTreeSet<String>,
    pub supplementary_files: Vec<String>,
    /// Keys we do not know, kept verbatim through a merge
    pub extra: BTreeMap<String, String>,
}

impl TestSummary {
    pub fn new(name: impl Into<String>, tested_dir: impl Into<String>) -> Self {
        Self {
            version: SUMMARY_VERSION,
            name: name.into(),
            tested_dir: tested_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_keyvalue(kv: &KeyValue) -> Result<Self, KeyValueError> {
        let mut extra = BTreeMap::new();
        for (key, value) in kv.iter() {
            if !KNOWN_KEYS.contains(&key) {
                extra.insert(key.to_string(), value.to_string());
            }
        }
        let version = kv
            .get_u64("summary_version")?
            .map(|v| {
                u32::try_from(v).map_err(|_| KeyValueError::BadValue {
                    key: "summary_version".to_string(),
                    value: v.to_string(),
                    expected: "a 32-bit version number",
                })
            })
            .transpose()?
            .unwrap_or(SUMMARY_VERSION);

        Ok(Self {
            version,
            name: kv.get("name").unwrap_or_default().to_string(),
            tested_dir: kv.get("tested_dir").unwrap_or_default().to_string(),
            status: kv.get("status").map(SummaryStatus::parse),
            returncode: kv.get_i32("returncode")?,
            timed_out: kv.get_f64("timed_out")?,
            total: kv.get_u64("total")?,
            successes: kv.get_u64("successes")?,
            failures: kv.get_u64("failures")?,
            errors: kv.get_u64("errors")?,
            skipped: kv.get_u64("skipped")?,
            expected_failures: kv.get_u64("expected_failures")?,
            unexpected_successes: kv.get_u64("unexpected_successes")?,
            test_file_authors: kv.get_list("test_file_authors"),
            tested_modules: kv.get_list("tested_modules").into_iter().collect(),
            supplementary_files: kv.get_list("supplementary_files"),
            extra,
        })
    }

    pub fn parse(text: &str) -> Result<Self, KeyValueError> {
        Self::from_keyvalue(&KeyValue::parse(text)?)
    }

    /// Render known keys in a fixed order, followed by preserved unknown keys
    pub fn to_text(&self) -> String {
        let mut pairs: Vec<(String, String)> = vec![
            ("summary_version".into(), self.version.to_string()),
            ("name".into(), self.name.clone()),
            ("tested_dir".into(), self.tested_dir.clone()),
        ];
        if let Some(status) = &self.status {
            pairs.push(("status".into(), status.to_string()));
        }
        if let Some(rc) = self.returncode {
            pairs.push(("returncode".into(), rc.to_string()));
        }
        if let Some(timeout) = self.timed_out {
            pairs.push(("timed_out".into(), format!("{timeout}")));
        }
        let counts = [
            ("total", self.total),
            ("successes", self.successes),
            ("failures", self.failures),
            ("errors", self.errors),
            ("skipped", self.skipped),
            ("expected_failures", self.expected_failures),
            ("unexpected_successes", self.unexpected_successes),
        ];
        for (key, value) in counts {
            if let Some(value) = value {
                pairs.push((key.into(), value.to_string()));
            }
        }
        pairs.push((
            "test_file_authors".into(),
            join_list(&self.test_file_authors),
        ));
        pairs.push(("tested_modules".into(), join_list(&self.tested_modules)));
        pairs.push((
            "supplementary_files".into(),
            join_list(&self.supplementary_files),
        ));
        for (key, value) in &self.extra {
            pairs.push((key.clone(), value.clone()));
        }
        to_text(&pairs)
    }

    /// Read a summary file
    pub fn read(path: &Path) -> Result<Self> {
        let text = locked_read(path)
            .with_context(|| format!("Failed to read summary: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Malformed summary: {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        locked_write(path, &self.to_text())
            .with_context(|| format!("Failed to write summary: {}", path.display()))
    }

    /// Merge the executor's authoritative fields into a summary the test
    /// process may have written itself.
    ///
    /// Name, tested directory, return code and timeout always come from the
    /// executor. A status already present is kept; otherwise it is derived
    /// from the return code.
    pub fn merge_execution(
        existing: Option<TestSummary>,
        module: &TestModule,
        execution: &ExecutionResult,
    ) -> Self {
        let mut summary = existing.unwrap_or_default();
        summary.version = SUMMARY_VERSION;
        summary.name = module.name().to_string();
        summary.tested_dir = module.tested_dir().to_string();
        summary.returncode = Some(execution.returncode);
        summary.timed_out = execution.timed_out.map(|t| t.as_secs_f64());
        if execution.timed_out.is_some() || summary.status.is_none() {
            summary.status = Some(SummaryStatus::from_returncode(execution.returncode));
        }
        summary
    }

    /// Returncode for display and file-level pass/fail; a missing code
    /// counts as a failure.
    pub fn effective_returncode(&self) -> i32 {
        self.returncode.unwrap_or(1)
    }

    /// Failed plus errored tests
    pub fn bad_count(&self) -> u64 {
        self.failures.unwrap_or(0) + self.errors.unwrap_or(0)
    }

    /// `(total, successes, failures, errors)` when the total is known
    pub fn counts(&self) -> Option<(u64, u64, u64, u64)> {
        self.total.map(|total| {
            (
                total,
                self.successes.unwrap_or(0),
                self.failures.unwrap_or(0),
                self.errors.unwrap_or(0),
            )
        })
    }

    /// Whether the per-outcome counts add up to the total.
    ///
    /// Unknown totals are trivially consistent.
    pub fn counts_consistent(&self) -> bool {
        match self.total {
            None => true,
            Some(total) => {
                total
                    == self.successes.unwrap_or(0)
                        + self.failures.unwrap_or(0)
                        + self.errors.unwrap_or(0)
                        + self.skipped.unwrap_or(0)
                        + self.expected_failures.unwrap_or(0)
                        + self.unexpected_successes.unwrap_or(0)
            }
        }
    }
}
