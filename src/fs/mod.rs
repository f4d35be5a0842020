//! Filesystem helpers shared by the executor, reporters and orchestrator

pub mod locking;
pub mod tree;

pub use locking::{locked_read, locked_write, ResultsLock, RESULTS_LOCK_FILE};
pub use tree::{clear_dir_except, copy_dir_recursive, remove_dir_best_effort};
