//! HTML reports
//!
//! - `files`: the test file index and one page per executed module
//! - `testsuites`: roll-up pages per tested directory
//! - `navigation`: the entry page of a results directory

mod files;
mod format;
mod navigation;
mod testsuites;

pub use files::{HtmlReporter, FILE_PAGE, STDERR_PAGE, STDOUT_PAGE};
pub use format::{
    color_error_line, html_file_preview, percent_to_html, returncode_to_html_text,
    success_to_html_percent, UNKNOWN_NUMBER_HTML,
};
pub use navigation::write_navigation_page;
pub use testsuites::{RollupTotals, TestsuiteDirReporter};

/// Index of all executed test files
pub const TESTFILES_PAGE: &str = "testfiles.html";

/// Overview of all tested directories
pub const TESTSUITES_PAGE: &str = "testsuites.html";

/// Entry page of a results directory
pub const NAVIGATION_PAGE: &str = "index.html";

/// Page of the tests found directly in the start directory
pub const TOP_LEVEL_TESTSUITE_PAGE: &str = "testsuite_index.html";
