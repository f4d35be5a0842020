//! Whole batch runs against a throwaway location

use gridtest::commands::batch::{self, BatchOptions};
use gridtest::config::{RunConfig, GISRC_VAR};
use gridtest::executor::{timeout_message, STDERR_FILE, STDOUT_FILE};
use gridtest::models::{SummaryStatus, SUMMARY_FILE_NAME, TIMEOUT_RETURNCODE};
use gridtest::orchestrator::{Orchestrator, RunError};
use gridtest::report::{format_percentage, NAVIGATION_PAGE, TESTFILES_PAGE, TESTSUITES_PAGE};
use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;

use super::fixtures::{list_dir, TestTree, LOCATION};

#[test]
fn test_mixed_run_and_success_gate() {
    let tree = TestTree::new();
    tree.add_test("raster/r.slope", "test_slope.sh", "echo slope ok\n")
        .add_test("vector/v.buffer", "test_buffer.sh", "test -n \"$GISRC\"\n")
        .add_test(
            "vector/v.buffer",
            "test_broken.py",
            "import sys\nprint('broken', file=sys.stderr)\nsys.exit(1)\n",
        );

    let summary = tree.run(RunConfig::default());

    assert_eq!(summary.files_total, 3);
    assert_eq!(summary.files_pass, 2);
    assert_eq!(summary.files_fail, 1);
    assert_eq!(summary.files_total, summary.files_pass + summary.files_fail);
    assert!(!summary.passes(100.0));
    assert!(summary.passes(60.0));

    let broken = tree.module_summary("vector/v.buffer", "test_broken");
    assert_ne!(broken.returncode, Some(0));
    assert_eq!(broken.status, Some(SummaryStatus::Failed));
    let ok = tree.module_summary("raster/r.slope", "test_slope");
    assert_eq!(ok.returncode, Some(0));

    let index = fs::read_to_string(tree.results().join(TESTFILES_PAGE)).unwrap();
    assert!(index.contains("test_broken"));
    assert_eq!(tree.mapsets(), vec!["PERMANENT".to_string()]);
}

#[test]
fn test_timeout_is_a_distinct_failure() {
    let tree = TestTree::new();
    tree.add_test("general/g.region", "test_slow.sh", "sleep 5\n");
    let config = RunConfig {
        timeout: Some(Duration::from_secs(1)),
        ..RunConfig::default()
    };

    let summary = tree.run(config);

    assert_eq!(summary.files_fail, 1);
    assert_eq!(summary.files_timed_out, 1);
    assert!(summary.duration < Duration::from_secs(5));
    let slow = tree.module_summary("general/g.region", "test_slow");
    assert_eq!(slow.returncode, Some(TIMEOUT_RETURNCODE));
    let timed_out = slow.timed_out.unwrap();
    assert!((timed_out - 1.0).abs() < 0.5);

    let stderr =
        fs::read_to_string(tree.module_dir("general/g.region", "test_slow").join(STDERR_FILE))
            .unwrap();
    assert!(stderr.contains(&timeout_message(Duration::from_secs(1))));
}

#[test]
fn test_results_in_start_dir_are_refused() {
    let tree = TestTree::new();
    tree.add_test("raster/r.slope", "test_slope.sh", "true\n");
    let before = list_dir(tree.src.path());

    let err = Orchestrator::new(tree.src.path(), RunConfig::default())
        .run_in_location(&tree.target(), tree.src.path(), &[])
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RunError>(),
        Some(RunError::ResultsDirIsStartDir(_))
    ));
    assert_eq!(list_dir(tree.src.path()), before);
    assert_eq!(tree.mapsets(), vec!["PERMANENT".to_string()]);
}

#[test]
fn test_empty_tree_fails_the_gate() {
    let tree = TestTree::new();
    fs::create_dir_all(tree.src.path().join("raster/r.slope")).unwrap();

    let summary = tree.run(RunConfig::default());

    assert_eq!(summary.files_total, 0);
    assert_eq!(summary.pass_percent(), None);
    assert_eq!(format_percentage(summary.pass_percent()), "unknown percentage");
    assert!(!summary.passes(0.0));
    let run = fs::read_to_string(tree.results().join(SUMMARY_FILE_NAME)).unwrap();
    assert!(run.contains("files_total=0\n"));
}

#[test]
fn test_counts_written_by_the_test_survive_the_merge() {
    let tree = TestTree::new();
    tree.add_test(
        "raster/r.mapcalc",
        "test_counts.sh",
        "printf 'total=4\\nsuccesses=3\\nfailures=1\\nerrors=0\\ntest_file_authors=alice\\ncustom_key=kept\\n' > test_keyvalue_result.txt\nexit 1\n",
    );

    let summary = tree.run(RunConfig::default());

    assert_eq!(summary.tests.total, 4);
    assert_eq!(summary.tests.successes, 3);
    let counts = tree.module_summary("raster/r.mapcalc", "test_counts");
    assert_eq!(counts.total, Some(4));
    assert_eq!(counts.failures, Some(1));
    assert_eq!(counts.returncode, Some(1));
    assert_eq!(counts.test_file_authors, vec!["alice".to_string()]);
    assert_eq!(counts.extra.get("custom_key").map(String::as_str), Some("kept"));
}

#[test]
fn test_data_dir_is_the_tests_working_data() {
    let tree = TestTree::new();
    tree.add_data("raster/r.in.ascii", "input.asc", "ncols 2\n")
        .add_test("raster/r.in.ascii", "test_import.sh", "test -f data/input.asc\n");

    let summary = tree.run(RunConfig::default());

    assert_eq!(summary.files_pass, 1);
    assert!(tree
        .module_dir("raster/r.in.ascii", "test_import")
        .join("data/input.asc")
        .is_file());
}

#[test]
fn test_unreadable_test_data_fails_no_other_module() {
    let tree = TestTree::new();
    tree.add_test("raster/r.a", "test_a.sh", "echo a\n")
        .add_test("raster/r.b", "test_b.sh", "echo b\n");
    let data = tree.src.path().join("raster/r.a/testsuite/data");
    fs::create_dir_all(&data).unwrap();
    std::os::unix::fs::symlink(tree.src.path().join("missing"), data.join("dangling")).unwrap();

    let summary = tree.run(RunConfig::default());

    assert_eq!(summary.files_total, 2);
    for (dir, name) in [("raster/r.a", "test_a"), ("raster/r.b", "test_b")] {
        assert!(tree.module_dir(dir, name).join(SUMMARY_FILE_NAME).is_file());
    }
    let stderr =
        fs::read_to_string(tree.module_dir("raster/r.a", "test_a").join(STDERR_FILE)).unwrap();
    assert!(stderr.contains("Test data not copied: "));
    assert!(tree.results().join(TESTSUITES_PAGE).is_file());
    assert!(tree.results().join(NAVIGATION_PAGE).is_file());
}

#[test]
fn test_background_process_keeps_the_output() {
    let tree = TestTree::new();
    tree.add_test("general/g.proj", "test_bg.sh", "echo important-line\nsleep 20 &\nexit 0\n");

    let summary = tree.run(RunConfig::default());

    assert_eq!(summary.files_pass, 1);
    assert!(summary.duration < Duration::from_secs(10));
    let stdout =
        fs::read_to_string(tree.module_dir("general/g.proj", "test_bg").join(STDOUT_FILE))
            .unwrap();
    assert_eq!(stdout, "important-line\n");
}

#[test]
#[serial]
fn test_batch_command_uses_the_active_session() {
    let tree = TestTree::new();
    tree.add_test("raster/r.slope", "test_slope.sh", "true\n");
    let rc = tree.out.path().join("rc");
    fs::write(
        &rc,
        format!("GISDBASE: {}\nLOCATION_NAME: {LOCATION}\n", tree.db.path().display()),
    )
    .unwrap();

    let previous = env::var_os(GISRC_VAR);
    env::set_var(GISRC_VAR, &rc);
    let passed = batch::execute(BatchOptions {
        location: LOCATION.into(),
        location_type: "nc".into(),
        grassdata: None,
        output: tree.results(),
        min_success: 100.0,
        config: None,
        exclude: Vec::new(),
        start_dir: tree.src.path().to_path_buf(),
    });
    match previous {
        Some(value) => env::set_var(GISRC_VAR, value),
        None => env::remove_var(GISRC_VAR),
    }

    assert!(passed.unwrap());
    assert!(tree.results().join(SUMMARY_FILE_NAME).is_file());
}

#[test]
fn test_config_file_excludes_tests() {
    let tree = TestTree::new();
    tree.add_test("raster/r.slope", "test_slope.sh", "true\n")
        .add_test("raster/r.slope", "test_flaky.sh", "exit 1\n");
    fs::write(
        tree.src.path().join(".gridtest.cfg"),
        "# local overrides\nexclude=raster/r.slope/testsuite/test_flaky.sh\n",
    )
    .unwrap();

    let config = RunConfig::load(None, tree.src.path()).unwrap();
    let summary = tree.run(config);

    assert_eq!(summary.files_total, 1);
    assert!(summary.passes(100.0));
}
