use anyhow::Result;
use chrono::Local;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use super::{KeyValueTestResult, MultiTestResult, RunTimes, SkipTest, TestResult, TextTestResult};

/// Body of one test. `Err` is a failure; a panic is an error.
pub type TestFn = Box<dyn Fn() -> Result<()>>;

struct TestCase {
    id: String,
    func: TestFn,
    expect_failure: bool,
}

/// A named list of tests run in-process, in registration order
pub struct TestProgram {
    name: String,
    tests: Vec<TestCase>,
    tested_modules: Vec<String>,
    authors: Vec<String>,
    verbose: bool,
}

impl TestProgram {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            tested_modules: Vec::new(),
            authors: Vec::new(),
            verbose: false,
        }
    }

    pub fn test(mut self, id: impl Into<String>, func: impl Fn() -> Result<()> + 'static) -> Self {
        self.tests.push(TestCase {
            id: id.into(),
            func: Box::new(func),
            expect_failure: false,
        });
        self
    }

    /// Register a test that is known to fail
    pub fn expected_failure(
        mut self,
        id: impl Into<String>,
        func: impl Fn() -> Result<()> + 'static,
    ) -> Self {
        self.tests.push(TestCase {
            id: id.into(),
            func: Box::new(func),
            expect_failure: true,
        });
        self
    }

    /// Tools exercised by these tests, recorded in the summary
    pub fn tested_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tested_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Run every test into `result`. Returns whether the run was successful.
    pub fn run(&self, result: &mut dyn TestResult) -> Result<bool> {
        let start_time = Local::now();
        let started = Instant::now();
        result.start_test_run()?;
        for case in &self.tests {
            result.start_test(&case.id)?;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (case.func)()));
            match outcome {
                Ok(Ok(())) if case.expect_failure => result.add_unexpected_success(&case.id)?,
                Ok(Ok(())) => result.add_success(&case.id)?,
                Ok(Err(err)) => match err.downcast_ref::<SkipTest>() {
                    Some(SkipTest(reason)) => result.add_skip(&case.id, reason)?,
                    None if case.expect_failure => {
                        result.add_expected_failure(&case.id, &format!("{err:#}"))?
                    }
                    None => result.add_failure(&case.id, &format!("{err:#}"))?,
                },
                Err(payload) if case.expect_failure => {
                    result.add_expected_failure(&case.id, &panic_message(payload.as_ref()))?
                }
                Err(payload) => result.add_error(&case.id, &panic_message(payload.as_ref()))?,
            }
            result.stop_test(&case.id)?;
        }
        result.set_times(RunTimes {
            start_time: Some(start_time),
            end_time: Some(Local::now()),
            time_taken: Some(started.elapsed()),
        });
        result.stop_test_run()?;
        Ok(result.counts().map_or(true, |c| c.was_successful()))
    }

    /// Run with text output on stderr and the key-value summary in
    /// `output_dir`; returns the process exit status
    pub fn run_main(&self, output_dir: &Path) -> Result<i32> {
        let keyvalue = KeyValueTestResult::new(&self.name, output_dir)
            .with_tested_modules(self.tested_modules.iter().cloned())
            .with_authors(self.authors.iter().cloned());
        let results: Vec<Box<dyn TestResult>> = vec![
            Box::new(TextTestResult::new(io::stderr(), self.verbose)),
            Box::new(keyvalue),
        ];
        let mut result = MultiTestResult::new(results);
        let ok = self.run(&mut result)?;
        debug!(program = %self.name, ok, "test program finished");
        Ok(if ok { 0 } else { 1 })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
