//! Sequencing of a batch run
//!
//! Discovery, then for every module sandbox, execute and report, strictly
//! one module at a time, then the roll-up pass. All mutable bookkeeping of
//! a run lives in one [`RunState`].

pub mod core;
pub mod state;


use std::path::PathBuf;
use thiserror::Error;

pub use core::{LocationTarget, Orchestrator};
pub use state::{RunState, RunSummary};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("results directory {0} is the directory searched for tests; choose another output directory")]
    ResultsDirIsStartDir(PathBuf),

    #[error("results directory {0} is in use by another run")]
    ResultsDirBusy(PathBuf),

    #[error("refusing to clear results directory {results_dir}: it contains the start directory {start_dir}")]
    UnsafeClean {
        results_dir: PathBuf,
        start_dir: PathBuf,
    },
}
