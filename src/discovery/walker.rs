//! Sorted directory walk producing test module descriptors

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::filters::FileFilter;
use super::probe::{FileReadProbe, LocationProbe};
use super::{DiscoveryError, DiscoveryOptions, LocationFilter, ProbePolicy};
use crate::models::{FileType, TestModule};

/// Module names never treated as tests
const IGNORED_PYTHON_STEMS: &[&str] = &["__init__"];

pub struct TestModuleDiscoverer {
    filter: FileFilter,
    testsuite_dir: String,
    policy: ProbePolicy,
    probe: Box<dyn LocationProbe>,
}

impl TestModuleDiscoverer {
    pub fn new(options: &DiscoveryOptions) -> Result<Self> {
        Self::with_probe(options, Box::new(FileReadProbe))
    }

    pub fn with_probe(options: &DiscoveryOptions, probe: Box<dyn LocationProbe>) -> Result<Self> {
        Ok(Self {
            filter: FileFilter::new(options)?,
            testsuite_dir: options.testsuite_dir.clone(),
            policy: options.policy,
            probe,
        })
    }

    /// Walk `start_dir` and return the modules in walk order.
    ///
    /// Tested directories come out parent before child, siblings sorted by
    /// name, files within a testsuite sorted by name.
    pub fn discover(&self, start_dir: &Path, location: &LocationFilter) -> Result<Vec<TestModule>> {
        let start_dir = fs::canonicalize(start_dir).with_context(|| {
            format!("Failed to resolve start directory: {}", start_dir.display())
        })?;
        let mut modules = Vec::new();
        self.visit(&start_dir, &start_dir, location, &mut modules)?;
        debug!(count = modules.len(), "discovery finished");
        Ok(modules)
    }

    fn visit(
        &self,
        start_dir: &Path,
        dir: &Path,
        location: &LocationFilter,
        modules: &mut Vec<TestModule>,
    ) -> Result<()> {
        let subdirs = match self.sorted_subdirs(dir) {
            Ok(subdirs) => subdirs,
            Err(err) => return self.tolerate(err),
        };

        let mut recurse = Vec::with_capacity(subdirs.len());
        let mut has_testsuite = false;
        for (name, path) in subdirs {
            if name == self.testsuite_dir {
                has_testsuite = true;
            } else if self.filter.skips_dir(&name) {
                debug!(dir = %path.display(), "pruned");
            } else {
                recurse.push(path);
            }
        }

        if has_testsuite {
            let tested_dir = relative_name(start_dir, dir);
            self.scan_testsuite(dir, &tested_dir, location, modules)?;
        }

        for path in recurse {
            self.visit(start_dir, &path, location, modules)?;
        }
        Ok(())
    }

    fn scan_testsuite(
        &self,
        tested: &Path,
        tested_dir: &str,
        location: &LocationFilter,
        modules: &mut Vec<TestModule>,
    ) -> Result<()> {
        let suite = tested.join(&self.testsuite_dir);
        let entries = match sorted_entries(&suite) {
            Ok(entries) => entries,
            Err(source) => {
                return self.tolerate(DiscoveryError::UnreadableDir {
                    path: suite,
                    source,
                })
            }
        };

        for (file_name, path) in entries {
            if !path.is_file() || !self.filter.accepts_name(&file_name) {
                continue;
            }
            let suite_relative = format!("{}/{}", self.testsuite_dir, file_name);
            let start_relative = if tested_dir == "." {
                suite_relative.clone()
            } else {
                format!("{tested_dir}/{suite_relative}")
            };
            if self.filter.excludes(&[start_relative.as_str(), suite_relative.as_str()]) {
                debug!(file = %start_relative, "excluded");
                continue;
            }

            let file_type = FileType::from_extension(path.extension().and_then(|e| e.to_str()));
            let name = match file_type {
                FileType::Untyped => file_name.clone(),
                _ => path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| file_name.clone()),
            };
            if file_type == FileType::Python && IGNORED_PYTHON_STEMS.contains(&name.as_str()) {
                continue;
            }

            if !self.applicable(&name, &suite, &path, location)? {
                debug!(module = %name, "not applicable to location");
                continue;
            }

            modules.push(TestModule::new(
                name,
                file_type,
                tested_dir,
                suite.clone(),
                PathBuf::from(&start_relative),
                path,
            ));
        }
        Ok(())
    }

    fn applicable(
        &self,
        name: &str,
        suite: &Path,
        path: &Path,
        location: &LocationFilter,
    ) -> Result<bool> {
        if location.includes_all() {
            return Ok(true);
        }
        match self.probe.probe(path) {
            Ok(applicability) => Ok(location.accepts(&applicability)),
            Err(source) => match self.policy {
                ProbePolicy::Lenient => {
                    warn!(
                        module = name,
                        dir = %suite.display(),
                        error = %source,
                        "cannot load test module, including it anyway"
                    );
                    Ok(true)
                }
                ProbePolicy::Strict => Err(DiscoveryError::ProbeFailed {
                    module: name.to_string(),
                    dir: suite.to_path_buf(),
                    source,
                }
                .into()),
            },
        }
    }

    fn sorted_subdirs(&self, dir: &Path) -> Result<Vec<(String, PathBuf)>, DiscoveryError> {
        let entries = sorted_entries(dir).map_err(|source| DiscoveryError::UnreadableDir {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(entries
            .into_iter()
            .filter(|(_, path)| {
                fs::symlink_metadata(path)
                    .map(|m| m.file_type().is_dir())
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Unreadable directories are skipped in lenient mode
    fn tolerate(&self, err: DiscoveryError) -> Result<()> {
        match self.policy {
            ProbePolicy::Lenient => {
                warn!(error = %err, "skipping during discovery");
                Ok(())
            }
            ProbePolicy::Strict => Err(err.into()),
        }
    }
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// `dir` relative to `start_dir` with forward slashes, `.` for the start itself
fn relative_name(start_dir: &Path, dir: &Path) -> String {
    match dir.strip_prefix(start_dir) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => dir.display().to_string(),
    }
}
