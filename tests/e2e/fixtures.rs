//! Throwaway locations and source trees

use gridtest::config::RunConfig;
use gridtest::models::{TestSummary, SUMMARY_FILE_NAME};
use gridtest::orchestrator::{LocationTarget, Orchestrator, RunSummary};
use gridtest::sandbox::{DEFAULT_REGION_FILE, PERMANENT_MAPSET};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const LOCATION: &str = "nc_spm";

/// A database with one location, a source tree and a scratch area for
/// results. Everything is removed on drop.
pub struct TestTree {
    pub src: TempDir,
    pub db: TempDir,
    pub out: TempDir,
}

impl TestTree {
    pub fn new() -> Self {
        let db = TempDir::new().unwrap();
        let permanent = db.path().join(LOCATION).join(PERMANENT_MAPSET);
        fs::create_dir_all(&permanent).unwrap();
        fs::write(
            permanent.join(DEFAULT_REGION_FILE),
            "proj: 99\nnorth: 228500\nsouth: 215000\n",
        )
        .unwrap();
        Self {
            src: TempDir::new().unwrap(),
            db,
            out: TempDir::new().unwrap(),
        }
    }

    /// Add `file` to the testsuite of `tested_dir`
    pub fn add_test(&self, tested_dir: &str, file: &str, content: &str) -> &Self {
        let suite = self.src.path().join(tested_dir).join("testsuite");
        fs::create_dir_all(&suite).unwrap();
        fs::write(suite.join(file), content).unwrap();
        self
    }

    pub fn add_data(&self, tested_dir: &str, file: &str, content: &str) -> &Self {
        let data = self.src.path().join(tested_dir).join("testsuite").join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join(file), content).unwrap();
        self
    }

    pub fn target(&self) -> LocationTarget {
        LocationTarget {
            db_root: self.db.path().to_path_buf(),
            location: LOCATION.into(),
            location_type: "nc".into(),
        }
    }

    pub fn results(&self) -> PathBuf {
        self.out.path().join("testreport")
    }

    pub fn run(&self, config: RunConfig) -> RunSummary {
        Orchestrator::new(self.src.path(), config)
            .run_in_location(&self.target(), &self.results(), &[])
            .unwrap()
    }

    pub fn module_summary(&self, tested_dir: &str, name: &str) -> TestSummary {
        TestSummary::read(&self.module_dir(tested_dir, name).join(SUMMARY_FILE_NAME)).unwrap()
    }

    pub fn module_dir(&self, tested_dir: &str, name: &str) -> PathBuf {
        self.results().join(tested_dir).join(name)
    }

    /// Mapsets left in the location
    pub fn mapsets(&self) -> Vec<String> {
        list_dir(&self.db.path().join(LOCATION))
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
