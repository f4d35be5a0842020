//! The roll-up pass over a finished results tree

use gridtest::commands::rollup;
use gridtest::config::RunConfig;
use gridtest::report::{rollup_results, scan_results, NAVIGATION_PAGE, TESTSUITES_PAGE};
use std::fs;
use std::path::PathBuf;

use super::fixtures::TestTree;

fn populated_tree() -> TestTree {
    let tree = TestTree::new();
    tree.add_test("raster/r.slope", "test_slope.sh", "true\n")
        .add_test("raster/r.slope", "test_aspect.sh", "exit 2\n")
        .add_test("vector/v.clean", "test_clean.sh", "true\n");
    tree
}

fn pages(tree: &TestTree) -> Vec<(PathBuf, Vec<u8>)> {
    [
        TESTSUITES_PAGE,
        NAVIGATION_PAGE,
        "raster/r.slope/index.html",
        "vector/v.clean/index.html",
    ]
    .iter()
    .map(|page| {
        let path = tree.results().join(page);
        let bytes = fs::read(&path).unwrap();
        (path, bytes)
    })
    .collect()
}

#[test]
fn test_rollup_matches_the_live_run() {
    let tree = populated_tree();
    let summary = tree.run(RunConfig::default());

    assert_eq!(summary.rollup.testsuites, 2);
    assert_eq!(summary.rollup.testsuites_successes, 1);
    assert_eq!(summary.rollup.files, summary.files_total);
    assert_eq!(summary.rollup.files_successes, summary.files_pass);

    let dirs = scan_results(&tree.results()).unwrap();
    assert_eq!(
        dirs.keys().cloned().collect::<Vec<_>>(),
        vec!["raster/r.slope".to_string(), "vector/v.clean".to_string()]
    );
    assert_eq!(rollup_results(&tree.results()).unwrap(), summary.rollup);
}

#[test]
fn test_rollup_twice_is_byte_identical() {
    let tree = populated_tree();
    tree.run(RunConfig::default());
    let after_run = pages(&tree);

    rollup::execute(&tree.results()).unwrap();
    let first = pages(&tree);
    rollup::execute(&tree.results()).unwrap();
    let second = pages(&tree);

    assert_eq!(first, second);
    assert_eq!(after_run, first);
}

#[test]
fn test_rollup_of_missing_dir_fails() {
    let tree = TestTree::new();
    assert!(rollup::execute(&tree.results()).is_err());
}
