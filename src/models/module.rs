use std::fmt;
use std::path::{Path, PathBuf};

/// How a discovered test file is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// `.py` file run under the Python interpreter
    Python,
    /// `.sh` file run under a strict POSIX shell
    Shell,
    /// Anything else, executed directly
    Untyped,
}

impl FileType {
    /// Classify by extension. `None` extension is untyped.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some("py") => FileType::Python,
            Some("sh") => FileType::Shell,
            _ => FileType::Untyped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Python => "py",
            FileType::Shell => "sh",
            FileType::Untyped => "",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Python => write!(f, "python"),
            FileType::Shell => write!(f, "shell"),
            FileType::Untyped => write!(f, "executable"),
        }
    }
}

/// Descriptor of one discovered test file.
///
/// Built once by discovery and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestModule {
    name: String,
    file_type: FileType,
    tested_dir: String,
    file_dir: PathBuf,
    file_path: PathBuf,
    abs_file_path: PathBuf,
}

impl TestModule {
    /// `tested_dir` is relative to the discovery start directory (`.` for the
    /// start directory itself); `file_path` is relative to the start directory
    /// and `abs_file_path` absolute.
    pub fn new(
        name: impl Into<String>,
        file_type: FileType,
        tested_dir: impl Into<String>,
        file_dir: impl Into<PathBuf>,
        file_path: impl Into<PathBuf>,
        abs_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            file_type,
            tested_dir: tested_dir.into(),
            file_dir: file_dir.into(),
            file_path: file_path.into(),
            abs_file_path: abs_file_path.into(),
        }
    }

    /// File stem, e.g. `test_slope` for `test_slope.py`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn tested_dir(&self) -> &str {
        &self.tested_dir
    }

    /// Absolute path of the testsuite directory holding the file
    pub fn file_dir(&self) -> &Path {
        &self.file_dir
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn abs_file_path(&self) -> &Path {
        &self.abs_file_path
    }

    /// Results subdirectory of this module below a results root
    pub fn results_subdir(&self, results_dir: &Path) -> PathBuf {
        results_dir.join(&self.tested_dir).join(&self.name)
    }
}
