//! Name and path filters applied to candidate test files

use glob::Pattern;
use regex::Regex;

use super::{DiscoveryError, DiscoveryOptions};

fn compile_glob(pattern: &str) -> Result<Pattern, DiscoveryError> {
    Pattern::new(pattern).map_err(|e| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Compiled filters for one discovery pass
#[derive(Debug)]
pub struct FileFilter {
    skip_dirs: Vec<Pattern>,
    file_glob: Option<Pattern>,
    file_regex: Option<Regex>,
    exclude: Vec<Pattern>,
}

impl FileFilter {
    pub fn new(options: &DiscoveryOptions) -> Result<Self, DiscoveryError> {
        let skip_dirs = options
            .skip_dirs
            .iter()
            .map(|p| compile_glob(p))
            .collect::<Result<_, _>>()?;
        let file_glob = options.file_glob.as_deref().map(compile_glob).transpose()?;
        let file_regex = options
            .file_regex
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|e| DiscoveryError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        let exclude = options
            .exclude
            .iter()
            .map(|p| compile_glob(p))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            skip_dirs,
            file_glob,
            file_regex,
            exclude,
        })
    }

    /// Whether a directory basename is pruned
    pub fn skips_dir(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|p| p.matches(name))
    }

    /// Whether a file name passes the glob and the regex (both when both set)
    pub fn accepts_name(&self, name: &str) -> bool {
        let glob_ok = self.file_glob.as_ref().map_or(true, |p| p.matches(name));
        let regex_ok = self.file_regex.as_ref().map_or(true, |r| r.is_match(name));
        glob_ok && regex_ok
    }

    /// Whether any exclude glob matches one of the given relative paths
    pub fn excludes(&self, relative_paths: &[&str]) -> bool {
        self.exclude
            .iter()
            .any(|p| relative_paths.iter().any(|path| p.matches(path)))
    }
}
