//! Tests for the in-process runner

use anyhow::{bail, ensure};
use std::fs;
use tempfile::TempDir;

use super::*;
use crate::models::{SummaryStatus, TestSummary, SUMMARY_FILE_NAME};

fn mixed_program() -> TestProgram {
    TestProgram::new("test_mixed")
        .test("test_ok", || Ok(()))
        .test("test_assert", || {
            let cells = [1, 2];
            ensure!(cells.len() == 3, "expected 3 cells, got {}", cells.len());
            Ok(())
        })
        .test("test_panics", || panic!("index out of range"))
        .test("test_skip", || Err(SkipTest("no data".into()).into()))
        .expected_failure("test_known_bug", || bail!("still broken"))
}

#[test]
fn test_outcomes_are_classified() {
    let mut text = TextTestResult::new(Vec::new(), false);
    let ok = mixed_program().run(&mut text).unwrap();
    assert!(!ok);

    let counts = text.counts().unwrap();
    assert_eq!(counts.tests_run, 5);
    assert_eq!(counts.successes, 1);
    assert_eq!(counts.failures.len(), 1);
    assert_eq!(counts.errors.len(), 1);
    assert_eq!(counts.skipped, vec![("test_skip".to_string(), "no data".to_string())]);
    assert_eq!(counts.expected_failures.len(), 1);
    assert_eq!(counts.total(), 5);
    assert!(counts.errors[0].1.contains("index out of range"));
    assert!(counts.times.time_taken.is_some());

    let out = String::from_utf8(text.into_inner()).unwrap();
    assert!(out.starts_with(".FEsx\n"));
    assert!(out.contains("FAIL: test_assert\n"));
    assert!(out.contains("ERROR: test_panics\n"));
    assert!(out.contains("Ran 5 tests in "));
    assert!(out.ends_with("FAILED (failures=1, errors=1, skipped=1, expected failures=1)\n"));
}

#[test]
fn test_verbose_text_and_unexpected_success() {
    let program = TestProgram::new("test_v")
        .verbose(true)
        .test("test_a", || Ok(()))
        .expected_failure("test_fixed", || Ok(()));
    let mut text = TextTestResult::new(Vec::new(), true);
    assert!(!program.run(&mut text).unwrap());
    let out = String::from_utf8(text.into_inner()).unwrap();
    assert!(out.contains("test_a ... ok\n"));
    assert!(out.contains("test_fixed ... unexpected success\n"));
    assert!(out.ends_with("FAILED (unexpected successes=1)\n"));
}

#[test]
fn test_all_passing_run_is_ok() {
    let program = TestProgram::new("test_fine")
        .test("test_a", || Ok(()))
        .test("test_b", || Ok(()));
    let mut text = TextTestResult::new(Vec::new(), false);
    assert!(program.run(&mut text).unwrap());
    let out = String::from_utf8(text.into_inner()).unwrap();
    assert!(out.contains("Ran 2 tests"));
    assert!(out.ends_with("\nOK\n"));
}

#[test]
fn test_state_machine_violations() {
    let mut counts = ResultCounts::new();
    assert!(counts.stop_test("test_a").is_err());
    counts.start_test("test_a").unwrap();
    assert!(counts.start_test("test_b").is_err());
    assert!(counts.stop_test("test_b").is_err());
}

#[test]
fn test_multi_result_writes_summary_for_the_executor() {
    let dir = TempDir::new().unwrap();
    let keyvalue = KeyValueTestResult::new("test_mixed", dir.path())
        .with_tested_modules(["r.slope", "r.aspect"])
        .with_authors(["alice"]);
    let results: Vec<Box<dyn TestResult>> = vec![
        Box::new(TextTestResult::new(Vec::new(), false)),
        Box::new(keyvalue),
    ];
    let mut multi = MultiTestResult::new(results);
    assert!(!mixed_program().run(&mut multi).unwrap());
    assert_eq!(multi.counts().unwrap().tests_run, 5);

    let summary = TestSummary::read(&dir.path().join(SUMMARY_FILE_NAME)).unwrap();
    assert_eq!(summary.name, "test_mixed");
    assert_eq!(summary.status, Some(SummaryStatus::Failed));
    assert_eq!(summary.total, Some(5));
    assert_eq!(summary.successes, Some(1));
    assert_eq!(summary.failures, Some(1));
    assert_eq!(summary.errors, Some(1));
    assert_eq!(summary.skipped, Some(1));
    assert_eq!(summary.expected_failures, Some(1));
    assert!(summary.counts_consistent());
    assert!(summary.tested_modules.contains("r.aspect"));
    assert_eq!(summary.test_file_authors, vec!["alice".to_string()]);
    assert!(summary.extra.contains_key("time"));
}

#[test]
fn test_run_main_exit_status() {
    let dir = TempDir::new().unwrap();
    let passing = TestProgram::new("test_pass").test("test_a", || Ok(()));
    assert_eq!(passing.run_main(dir.path()).unwrap(), 0);
    let text = fs::read_to_string(dir.path().join(SUMMARY_FILE_NAME)).unwrap();
    assert!(text.contains("status=succeeded\n"));

    let failing = TestProgram::new("test_fail").test("test_a", || bail!("nope"));
    assert_eq!(failing.run_main(dir.path()).unwrap(), 1);
}
