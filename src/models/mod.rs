//! Core data types shared by discovery, execution and reporting

mod execution;
mod module;
mod summary;

pub use execution::{format_secs, ExecutionResult, SIGNAL_RETURNCODE_BASE, TIMEOUT_RETURNCODE};
pub use module::{FileType, TestModule};
pub use summary::{SummaryStatus, TestSummary, SUMMARY_FILE_NAME, SUMMARY_VERSION};
