//! Roll-up pages per tested directory, built from persisted summaries

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::files::FILE_PAGE;
use super::format::{
    number_or_unknown, returncode_to_html_text, success_to_html_percent, success_to_html_text,
    table_row,
};
use super::{TESTSUITES_PAGE, TOP_LEVEL_TESTSUITE_PAGE};
use crate::models::{TestSummary, SUMMARY_FILE_NAME};
use crate::report::{TestCounts, TestedDirs};
use crate::utils::{html_escape, to_web_path};

const TESTSUITES_TABLE_HEAD: &str = "<table><thead><tr>\
    <th>Testsuite</th><th>Status</th>\
    <th>Test files</th><th>Successful</th><th>Percent successful</th>\
    <th>Tests</th><th>Successful</th><th>Failed</th><th>Percent successful</th>\
    </tr></thead><tbody>";

const FILES_TABLE_HEAD: &str = "<h3>Test files results</h3><table><thead><tr>\
    <th>Test file</th><th>Status</th>\
    <th>Tests</th><th>Successful</th><th>Failed</th><th>Percent successful</th>\
    </tr></thead><tbody>";

/// Totals over all tested directories of one roll-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupTotals {
    pub testsuites: u64,
    pub testsuites_successes: u64,
    pub files: u64,
    pub files_successes: u64,
    pub tests: TestCounts,
}

impl RollupTotals {
    fn merge(&mut self, dir: &RollupTotals) {
        self.testsuites += dir.testsuites;
        self.testsuites_successes += dir.testsuites_successes;
        self.files += dir.files;
        self.files_successes += dir.files_successes;
        self.tests.merge(&dir.tests);
    }
}

/// Builds `testsuites.html` plus one page per tested directory.
///
/// Reads nothing but the summaries below the results root and holds no
/// state between calls, so running it twice over the same tree writes the
/// same bytes.
#[derive(Debug, Clone)]
pub struct TestsuiteDirReporter {
    main_page_name: String,
    testsuite_page_name: String,
    top_level_testsuite_page_name: Option<String>,
}

impl Default for TestsuiteDirReporter {
    fn default() -> Self {
        Self::new(
            TESTSUITES_PAGE,
            FILE_PAGE,
            Some(TOP_LEVEL_TESTSUITE_PAGE.to_string()),
        )
    }
}

impl TestsuiteDirReporter {
    /// `top_level_testsuite_page_name` names the page of the results root
    /// itself, which would otherwise collide with other root pages.
    pub fn new(
        main_page_name: impl Into<String>,
        testsuite_page_name: impl Into<String>,
        top_level_testsuite_page_name: Option<String>,
    ) -> Self {
        Self {
            main_page_name: main_page_name.into(),
            testsuite_page_name: testsuite_page_name.into(),
            top_level_testsuite_page_name,
        }
    }

    /// Page of `directory`, relative to the results root
    fn page_for(&self, directory: &str) -> String {
        match (&self.top_level_testsuite_page_name, directory) {
            (Some(top), ".") | (Some(top), "") => top.clone(),
            _ => format!("{}/{}", to_web_path(directory), self.testsuite_page_name),
        }
    }

    /// Write the page of every directory in `dirs` and the overview page
    pub fn report_for_dirs(&self, root: &Path, dirs: &TestedDirs) -> Result<RollupTotals> {
        let mut totals = RollupTotals::default();
        let mut rows = String::new();
        for (directory, files) in dirs {
            let (row, dir_totals) = self.report_for_dir(root, directory, files)?;
            rows.push_str(&row);
            totals.merge(&dir_totals);
        }
        totals.tests.check("testsuites roll-up");

        let tests = totals.tests;
        let footer = table_row([
            "Summary".to_string(),
            success_to_html_percent(Some(totals.testsuites), totals.testsuites_successes),
            totals.files.to_string(),
            totals.files_successes.to_string(),
            success_to_html_percent(Some(totals.files), totals.files_successes),
            tests.total.to_string(),
            tests.successes.to_string(),
            tests.bad().to_string(),
            success_to_html_percent(Some(tests.total), tests.successes),
        ]);
        let page = format!(
            "<html><body><h1>Testsuites results</h1>{TESTSUITES_TABLE_HEAD}{rows}</tbody><tfoot>{footer}</tfoot></table></body></html>"
        );
        let path = root.join(&self.main_page_name);
        fs::write(&path, page).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(page = %path.display(), testsuites = totals.testsuites, "wrote testsuites roll-up");
        Ok(totals)
    }

    /// Write the page of one directory and return its overview row
    pub fn report_for_dir(
        &self,
        root: &Path,
        directory: &str,
        test_files: &[String],
    ) -> Result<(String, RollupTotals)> {
        let mut dir_tests = TestCounts::default();
        let mut authors = BTreeSet::new();
        let mut file_total = 0u64;
        let mut file_successes = 0u64;
        let mut rows = String::new();

        for name in test_files {
            let summary = read_summary(&root.join(directory).join(name));
            authors.extend(
                summary
                    .test_file_authors
                    .iter()
                    .filter(|a| !a.is_empty())
                    .cloned(),
            );
            dir_tests.add(&summary);

            file_total += 1;
            let returncode = summary.effective_returncode();
            if returncode == 0 {
                file_successes += 1;
            }

            let (total, successes, bad) = match summary.total {
                Some(total) => (
                    total.to_string(),
                    summary.successes.unwrap_or(0).to_string(),
                    summary.bad_count().to_string(),
                ),
                None => (
                    number_or_unknown(None),
                    number_or_unknown(None),
                    number_or_unknown(None),
                ),
            };
            let name = html_escape(name);
            rows.push_str(&table_row([
                format!(r#"<a href="{name}/{FILE_PAGE}">{name}</a>"#),
                returncode_to_html_text(returncode, None),
                total,
                successes,
                bad,
                success_to_html_percent(summary.total, summary.successes.unwrap_or(0)),
            ]));
        }

        let dir_pass = success_to_html_percent(Some(dir_tests.total), dir_tests.successes);
        let file_pass = success_to_html_percent(Some(file_total), file_successes);
        let footer = table_row([
            "Summary".to_string(),
            file_pass.clone(),
            dir_tests.total.to_string(),
            dir_tests.successes.to_string(),
            dir_tests.bad().to_string(),
            dir_pass.clone(),
        ]);

        let page_rel = self.page_for(directory);
        // the page sits in the directory of its files, or in the root for "."
        let page_path = root.join(&page_rel);
        let page = format!(
            "<html><body><h1>{} testsuite results</h1>{FILES_TABLE_HEAD}{rows}</tbody><tfoot>{footer}</tfoot></table>{}</body></html>",
            html_escape(directory),
            authors_table(&authors),
        );
        if let Some(parent) = page_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&page_path, page)
            .with_context(|| format!("Failed to write {}", page_path.display()))?;

        let row = table_row([
            format!(
                r#"<a href="{}">{}</a>"#,
                html_escape(&page_rel),
                html_escape(&to_web_path(directory))
            ),
            success_to_html_text(file_total, file_successes),
            file_total.to_string(),
            file_successes.to_string(),
            file_pass,
            dir_tests.total.to_string(),
            dir_tests.successes.to_string(),
            dir_tests.bad().to_string(),
            dir_pass,
        ]);
        let totals = RollupTotals {
            testsuites: 1,
            testsuites_successes: u64::from(file_successes == file_total),
            files: file_total,
            files_successes: file_successes,
            tests: dir_tests,
        };
        Ok((row, totals))
    }
}

/// Summary of one module results directory. A missing or unreadable
/// summary is shown as a failed file with unknown counts.
fn read_summary(module_dir: &Path) -> TestSummary {
    let path: PathBuf = module_dir.join(SUMMARY_FILE_NAME);
    match TestSummary::read(&path) {
        Ok(summary) => summary,
        Err(err) => {
            warn!(summary = %path.display(), error = %format!("{err:#}"), "no usable summary");
            TestSummary::default()
        }
    }
}

fn authors_table(authors: &BTreeSet<String>) -> String {
    if authors.is_empty() {
        return r#"<h3>Test authors</h3><span style="font-size: 60%">Test file authors were not obtained.</span>"#
            .to_string();
    }
    let names: Vec<String> = authors.iter().map(|a| html_escape(a)).collect();
    format!(
        "<h3>Test authors</h3><table><tbody>{}</tbody></table>",
        table_row(["Test authors:", names.join(", ").as_str()])
    )
}
