//! End-to-end tests for gridtest
//!
//! Each test builds a throwaway database with one location and a source
//! tree of shell/Python test files, then drives a whole batch run.

pub mod batch;
pub mod fixtures;
pub mod rollup;

pub use fixtures::*;
