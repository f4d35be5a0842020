//! Removal of host-specific paths from captured output

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Rewrites text written by a test so reports do not depend on the host
pub trait Redactor {
    fn redact(&self, text: &str) -> String;

    /// Redact a text file in place. Files that are not UTF-8 are left alone.
    fn redact_file(&self, path: &Path) -> Result<()> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let Ok(text) = String::from_utf8(bytes) else {
            return Ok(());
        };
        let redacted = self.redact(&text);
        if redacted != text {
            fs::write(path, redacted)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

/// Leaves text untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRedactor;

impl Redactor for NoopRedactor {
    fn redact(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Strips a set of absolute directory prefixes, leaving relative paths
#[derive(Debug, Clone)]
pub struct PathRedactor {
    patterns: Vec<Regex>,
}

impl PathRedactor {
    /// Longer paths are stripped first so a nested directory is not left
    /// half-redacted by its parent.
    pub fn new<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut prefixes: Vec<String> = paths
            .into_iter()
            .map(|p| p.into().display().to_string())
            .map(|p| p.trim_end_matches(['/', '\\']).to_string())
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();

        let patterns = prefixes
            .iter()
            .map(|prefix| {
                Regex::new(&format!(r"{}[\\/]?", regex::escape(prefix)))
                    .with_context(|| format!("Failed to build redaction pattern for {prefix}"))
            })
            .collect::<Result<_>>()?;
        Ok(Self { patterns })
    }
}

impl Redactor for PathRedactor {
    fn redact(&self, text: &str) -> String {
        let mut text = text.to_string();
        for pattern in &self.patterns {
            text = pattern.replace_all(&text, "").into_owned();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_prefixes_longest_first() {
        let redactor = PathRedactor::new(["/home/ci/src", "/home/ci/src/dist/grass"]).unwrap();
        let text = "File \"/home/ci/src/raster/r.slope/testsuite/test_a.py\", line 3\n\
                    loaded /home/ci/src/dist/grass/lib/libgis.so\n";
        assert_eq!(
            redactor.redact(text),
            "File \"raster/r.slope/testsuite/test_a.py\", line 3\nloaded lib/libgis.so\n"
        );
    }

    #[test]
    fn test_special_characters_are_literal() {
        let redactor = PathRedactor::new(["/tmp/a+b (1)/"]).unwrap();
        assert_eq!(redactor.redact("see /tmp/a+b (1)/x.txt"), "see x.txt");
        assert_eq!(redactor.redact("/tmp/aab (1)/x.txt"), "/tmp/aab (1)/x.txt");
    }

    #[test]
    fn test_empty_paths_ignored() {
        let redactor = PathRedactor::new([""]).unwrap();
        assert_eq!(redactor.redact("/usr/bin"), "/usr/bin");
    }

    #[test]
    fn test_noop() {
        assert_eq!(NoopRedactor.redact("/abs/path"), "/abs/path");
    }

    #[test]
    fn test_redact_file_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("stderr.txt");
        fs::write(&file, format!("error in {}/data.csv\n", temp.path().display())).unwrap();

        PathRedactor::new([temp.path()]).unwrap().redact_file(&file).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "error in data.csv\n");
    }
}
