//! Tests for test module discovery

use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempDir;

use super::*;
use crate::config::RunConfig;
use crate::models::FileType;

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "#!/bin/sh\n").unwrap();
}

fn options() -> DiscoveryOptions {
    DiscoveryOptions::from_config(&RunConfig::default(), &[])
}

fn names(modules: &[crate::models::TestModule]) -> Vec<String> {
    modules
        .iter()
        .map(|m| format!("{}:{}", m.tested_dir(), m.name()))
        .collect()
}

struct FailingProbe;

impl LocationProbe for FailingProbe {
    fn probe(&self, _path: &Path) -> io::Result<Applicability> {
        Err(io::Error::new(io::ErrorKind::InvalidData, "syntax error"))
    }
}

#[test]
fn test_discovers_sorted_modules_with_types() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(root, "raster/r.slope/testsuite/test_b.sh");
    touch(root, "raster/r.slope/testsuite/test_a.py");
    touch(root, "raster/r.buffer/testsuite/test_buffer.py");
    touch(root, "vector/v.clean/testsuite/test_clean.py");
    touch(root, "vector/v.clean/main.c");

    let modules = discover(root, &options(), &LocationFilter::new("nc")).unwrap();

    assert_eq!(
        names(&modules),
        vec![
            "raster/r.buffer:test_buffer",
            "raster/r.slope:test_a",
            "raster/r.slope:test_b",
            "vector/v.clean:test_clean",
        ]
    );
    assert_eq!(modules[1].file_type(), FileType::Python);
    assert_eq!(modules[2].file_type(), FileType::Shell);
    assert_eq!(
        modules[1].file_path(),
        Path::new("raster/r.slope/testsuite/test_a.py")
    );
    assert!(modules[1].abs_file_path().is_absolute());
    assert!(modules[1].file_dir().ends_with("raster/r.slope/testsuite"));
}

#[test]
fn test_testsuite_is_never_a_tested_directory() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(root, "lib/testsuite/test_top.py");
    // a nested testsuite inside a testsuite must not be picked up
    touch(root, "lib/testsuite/testsuite/test_nested.py");
    touch(root, "lib/testsuite/data/testsuite/test_data.py");

    let modules = discover(root, &options(), &LocationFilter::new("nc")).unwrap();

    assert_eq!(names(&modules), vec!["lib:test_top"]);
    assert!(modules.iter().all(|m| !m.tested_dir().contains("testsuite")));
}

#[test]
fn test_start_dir_itself_can_be_tested_directory() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "testsuite/test_here.sh");

    let modules = discover(temp.path(), &options(), &LocationFilter::new("nc")).unwrap();

    assert_eq!(names(&modules), vec![".:test_here"]);
    assert_eq!(modules[0].file_path(), Path::new("testsuite/test_here.sh"));
}

#[test]
fn test_skip_dirs_are_pruned() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(root, ".git/hooks/testsuite/test_hook.py");
    touch(root, "dist.x86_64/module/testsuite/test_built.py");
    touch(root, "general/g.region/testsuite/test_region.py");

    let modules = discover(root, &options(), &LocationFilter::new("nc")).unwrap();

    assert_eq!(names(&modules), vec!["general/g.region:test_region"]);
}

#[test]
fn test_init_files_and_non_matching_names_skipped() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(root, "m/testsuite/__init__.py");
    touch(root, "m/testsuite/README.txt");
    touch(root, "m/testsuite/test_ok.py");
    fs::create_dir_all(root.join("m/testsuite/data.py")).unwrap();

    let modules = discover(root, &options(), &LocationFilter::new("nc")).unwrap();

    assert_eq!(names(&modules), vec!["m:test_ok"]);
}

#[test]
fn test_untyped_executables_with_custom_regex() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(root, "m/testsuite/test_binary");
    touch(root, "m/testsuite/test_script.pl");
    touch(root, "m/testsuite/helper.pl");

    let mut opts = options();
    opts.file_regex = Some("^test".to_string());
    let modules = discover(root, &opts, &LocationFilter::new("nc")).unwrap();

    assert_eq!(names(&modules), vec!["m:test_binary", "m:test_script.pl"]);
    assert!(modules.iter().all(|m| m.file_type() == FileType::Untyped));
}

#[test]
fn test_glob_and_regex_both_apply() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(root, "m/testsuite/test_a.py");
    touch(root, "m/testsuite/check_b.py");
    touch(root, "m/testsuite/test_c.sh");

    let mut opts = options();
    opts.file_glob = Some("test_*".to_string());
    let modules = discover(root, &opts, &LocationFilter::new("nc")).unwrap();

    assert_eq!(names(&modules), vec!["m:test_a", "m:test_c"]);
}

#[test]
fn test_exclude_relative_to_start_and_tested_dir() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(root, "raster/r.slope/testsuite/test_slow.py");
    touch(root, "raster/r.slope/testsuite/test_fast.py");
    touch(root, "vector/v.buffer/testsuite/test_buffer.py");
    touch(root, "vector/v.buffer/testsuite/test_flaky.sh");

    let mut opts = options();
    opts.exclude = vec![
        "raster/*/testsuite/test_slow.py".to_string(),
        "testsuite/test_flaky.sh".to_string(),
    ];
    let modules = discover(root, &opts, &LocationFilter::new("nc")).unwrap();

    assert_eq!(
        names(&modules),
        vec!["raster/r.slope:test_fast", "vector/v.buffer:test_buffer"]
    );
}

#[test]
fn test_lenient_probe_failure_keeps_module() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "m/testsuite/test_broken.py");

    let discoverer = TestModuleDiscoverer::with_probe(&options(), Box::new(FailingProbe)).unwrap();
    let modules = discoverer
        .discover(temp.path(), &LocationFilter::new("nc"))
        .unwrap();

    assert_eq!(names(&modules), vec!["m:test_broken"]);
}

#[test]
fn test_strict_probe_failure_names_module_and_dir() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "m/testsuite/test_broken.py");

    let mut opts = options();
    opts.policy = ProbePolicy::Strict;
    let discoverer = TestModuleDiscoverer::with_probe(&opts, Box::new(FailingProbe)).unwrap();
    let err = discoverer
        .discover(temp.path(), &LocationFilter::new("nc"))
        .unwrap_err();

    let discovery_err = err.downcast_ref::<DiscoveryError>().unwrap();
    assert!(matches!(discovery_err, DiscoveryError::ProbeFailed { module, .. } if module == "test_broken"));
    assert!(err.to_string().contains("testsuite"));
}

#[test]
fn test_all_locations_skips_probe() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "m/testsuite/test_broken.py");

    let mut opts = options();
    opts.policy = ProbePolicy::Strict;
    let discoverer = TestModuleDiscoverer::with_probe(&opts, Box::new(FailingProbe)).unwrap();
    let modules = discoverer
        .discover(temp.path(), &LocationFilter::new(ALL_LOCATIONS))
        .unwrap();

    assert_eq!(modules.len(), 1);
}

#[test]
fn test_location_filter_accepts() {
    let filter = LocationFilter::new("nc");
    assert!(filter.accepts(&Applicability::Universal));
    assert!(filter.accepts(&Applicability::Locations(vec!["nc".to_string()])));
    assert!(filter.accepts(&Applicability::Locations(vec![
        UNIVERSAL_LOCATION.to_string()
    ])));
    assert!(!filter.accepts(&Applicability::Locations(vec!["xy".to_string()])));
}

#[test]
fn test_invalid_glob_is_reported() {
    let mut opts = options();
    opts.exclude = vec!["[unclosed".to_string()];
    let err = TestModuleDiscoverer::new(&opts).err().unwrap();
    assert!(err.to_string().contains("[unclosed"));
}

#[test]
fn test_empty_tree_finds_nothing() {
    let temp = TempDir::new().unwrap();
    let modules = discover(temp.path(), &options(), &LocationFilter::new("nc")).unwrap();
    assert!(modules.is_empty());
}
