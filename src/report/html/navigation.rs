use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::{NAVIGATION_PAGE, TESTFILES_PAGE, TESTSUITES_PAGE};

/// Write the entry page linking the testsuite and test file overviews
pub fn write_navigation_page(results_dir: &Path) -> Result<()> {
    let page = format!(
        "<html><body><h1>Test results</h1><ul>\
         <li><a href=\"{TESTSUITES_PAGE}\">Results by testsuites</a> (testsuite directories)</li>\
         <li><a href=\"{TESTFILES_PAGE}\">Results by test files</a></li>\
         </ul></body></html>"
    );
    let path = results_dir.join(NAVIGATION_PAGE);
    fs::write(&path, page).with_context(|| format!("Failed to write {}", path.display()))
}
