//! Per-file pages and the running test file index

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use super::format::{
    html_file_preview, number_or_unknown, percent_to_html,
    returncode_to_html_text, returncode_to_success_html_par, success_to_html_percent,
    table_row, wrap_stdstream_to_html,
};
use super::TESTFILES_PAGE;
use crate::models::{TestModule, TestSummary};
use crate::report::{
    format_elapsed, format_percentage, CountingReporter, FileOutcome, FileReporter, RunHooks,
    TestCounts,
};
use crate::utils::{html_escape, to_web_path};

/// Page inside each module results directory
pub const FILE_PAGE: &str = "index.html";

pub const STDOUT_PAGE: &str = "stdout.html";

pub const STDERR_PAGE: &str = "stderr.html";

/// Writes one page per executed file and a master table of all files.
///
/// The master table is written as files finish, so a run that dies half
/// way still leaves the rows of the files it got through.
pub struct HtmlReporter {
    counts: CountingReporter,
    tests: TestCounts,
    main_page_name: String,
    main_index: Option<BufWriter<File>>,
}

impl HtmlReporter {
    pub fn new() -> Self {
        Self::with_main_page(TESTFILES_PAGE)
    }

    pub fn with_main_page(name: impl Into<String>) -> Self {
        Self {
            counts: CountingReporter::new(),
            tests: TestCounts::default(),
            main_page_name: name.into(),
            main_index: None,
        }
    }

    fn index(&mut self) -> Result<&mut BufWriter<File>> {
        self.main_index
            .as_mut()
            .context("HTML reporter used before start")
    }

    fn write_file_page(
        &self,
        outcome: &FileOutcome<'_>,
        duration: Duration,
        cells: &FileCells,
    ) -> Result<()> {
        let module = outcome.module;
        let summary = outcome.summary;
        let status = returncode_to_html_text(outcome.returncode(), outcome.timed_out());

        let mut page = String::new();
        let _ = write!(
            page,
            r#"<!DOCTYPE html><html><head><meta charset="utf-8"></head><body><h1>{name}</h1><h2>{dir} &ndash; {name}</h2>{par}"#,
            name = html_escape(module.name()),
            dir = html_escape(module.tested_dir()),
            par = returncode_to_success_html_par(outcome.returncode()),
        );
        page.push_str("<table><tbody>");
        let rows = [
            ("Test", html_escape(module.name())),
            ("Testsuite", html_escape(module.tested_dir())),
            (
                "Test file",
                html_escape(&to_web_path(&module.file_path().display().to_string())),
            ),
            ("Status", status),
            ("Return code", outcome.returncode().to_string()),
            ("Number of tests", cells.total.clone()),
            ("Successful tests", cells.successes.clone()),
            ("Failed tests", cells.bad.clone()),
            ("Percent successful", cells.percent.clone()),
            ("Test duration", format_elapsed(duration)),
        ];
        for (label, value) in rows {
            page.push_str(&table_row([label, value.as_str()]));
        }
        if !summary.tested_modules.is_empty() {
            let modules: Vec<String> = summary
                .tested_modules
                .iter()
                .map(|m| html_escape(m))
                .collect();
            page.push_str(&table_row(["Tested modules", modules.join(", ").as_str()]));
        }
        page.push_str("</tbody></table>");

        page.push_str("<h3>Supplementary files</h3><ul>");
        let _ = write!(
            page,
            r#"<li><a href="{STDOUT_PAGE}">standard output (stdout)</a></li><li><a href="{STDERR_PAGE}">standard error output (stderr)</a></li>"#
        );
        for file in &summary.supplementary_files {
            let file = html_escape(file);
            let _ = write!(page, r#"<li><a href="{file}">{file}</a></li>"#);
        }
        page.push_str("</ul>");

        if outcome.returncode() != 0 {
            page.push_str("<h3>Standard error output (stderr)</h3>");
            page.push_str(&html_file_preview(&outcome.stderr_path()));
        }
        page.push_str("</body></html>");

        let path = outcome.results_subdir.join(FILE_PAGE);
        fs::write(&path, page).with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Count cells of one file row
struct FileCells {
    total: String,
    successes: String,
    bad: String,
    percent: String,
}

impl FileCells {
    fn new(summary: &TestSummary) -> Self {
        match summary.total {
            Some(total) => {
                let successes = summary.successes.unwrap_or(0);
                Self {
                    total: total.to_string(),
                    successes: successes.to_string(),
                    bad: summary.bad_count().to_string(),
                    percent: success_to_html_percent(Some(total), successes),
                }
            }
            None => Self {
                total: number_or_unknown(None),
                successes: number_or_unknown(None),
                bad: summary.bad_count().to_string(),
                percent: number_or_unknown(None),
            },
        }
    }
}

fn stream_page(source: &Path, target: &Path, module: &TestModule, stream: &str) -> Result<()> {
    let text = match fs::read(source) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    };
    let html = wrap_stdstream_to_html(&text, &format!("{} {stream}", module.name()));
    fs::write(target, html).with_context(|| format!("Failed to write {}", target.display()))
}

impl FileReporter for HtmlReporter {
    fn name(&self) -> &str {
        "html"
    }

    fn start_file_test(&mut self, module: &TestModule) -> Result<()> {
        self.counts.start_file(module)?;
        self.index()?
            .flush()
            .context("Failed to flush test file index")
    }

    fn end_file_test(&mut self, outcome: &FileOutcome<'_>) -> Result<()> {
        let duration = self.counts.end_file(outcome.returncode())?;
        self.tests.add(outcome.summary);

        let module = outcome.module;
        let cells = FileCells::new(outcome.summary);
        let dir = html_escape(&to_web_path(module.tested_dir()));
        let name = html_escape(module.name());
        let row = table_row([
            dir.clone(),
            format!(r#"<a href="{dir}/{name}/{FILE_PAGE}">{name}</a>"#),
            returncode_to_html_text(outcome.returncode(), outcome.timed_out()),
            cells.total.clone(),
            cells.successes.clone(),
            cells.bad.clone(),
            cells.percent.clone(),
        ]);
        self.index()?
            .write_all(row.as_bytes())
            .context("Failed to write test file index")?;

        let subdir = outcome.results_subdir;
        stream_page(&outcome.stdout_path(), &subdir.join(STDOUT_PAGE), module, "stdout")?;
        stream_page(&outcome.stderr_path(), &subdir.join(STDERR_PAGE), module, "stderr")?;
        self.write_file_page(outcome, duration, &cells)
    }

    fn run_hooks(&mut self) -> Option<&mut dyn RunHooks> {
        Some(self)
    }

    fn counts(&self) -> Option<&CountingReporter> {
        Some(&self.counts)
    }
}

impl RunHooks for HtmlReporter {
    fn start(&mut self, results_dir: &Path) -> Result<()> {
        self.counts.start();
        self.tests = TestCounts::default();

        let path = results_dir.join(&self.main_page_name);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut index = BufWriter::new(file);
        let started = self
            .counts
            .started_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        write!(
            index,
            "<html><body><h1>Test results</h1>{started}<table><thead><tr>\
             <th>Tested directory</th><th>Test file</th><th>Status</th>\
             <th>Tests</th><th>Successful</th><th>Failed</th><th>Percent successful</th>\
             </tr></thead><tbody>"
        )
        .context("Failed to write test file index")?;
        self.main_index = Some(index);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.counts.finish()?;
        self.tests.check("test file index");

        let tests = self.tests;
        let total = (tests.total > 0).then_some(tests.total);
        let footer = table_row([
            "Summary".to_string(),
            format!("{} test files", self.counts.files_total()),
            percent_to_html(self.counts.file_pass_percent()),
            tests.total.to_string(),
            tests.successes.to_string(),
            tests.bad().to_string(),
            success_to_html_percent(total, tests.successes),
        ]);
        let sentence = format!(
            "Executed {} test files in {}. From them, {} files ({}) were successful and {} files ({}) failed.",
            self.counts.files_total(),
            format_elapsed(self.counts.run_time()),
            self.counts.files_pass(),
            format_percentage(self.counts.file_pass_percent()),
            self.counts.files_fail(),
            format_percentage(self.counts.file_fail_percent()),
        );

        let mut index = self
            .main_index
            .take()
            .context("HTML reporter finished before start")?;
        write!(
            index,
            "</tbody><tfoot>{footer}</tfoot></table><p>{sentence}</p></body></html>"
        )
        .and_then(|_| index.flush())
        .context("Failed to finish test file index")
    }
}
