use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::keyvalue::{KeyValue, KeyValueError};

/// Name of the configuration file looked up in the start directory
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".gridtest.cfg";

/// Subdirectory holding the test files of a tested directory
pub const DEFAULT_TESTSUITE_DIR: &str = "testsuite";

/// Test files picked up when no pattern is configured
pub const DEFAULT_FILE_REGEX: &str = r"\.(py|sh)$";

/// Directory basenames never descended into
pub const DEFAULT_SKIP_DIRS: &[&str] = &[".git", ".svn", "target", "dist.*", "bin.*", "OBJ.*"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: KeyValueError,
    },

    #[error("timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(f64),

    #[error("invalid file regex <{pattern}>: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no active session: {0}")]
    NoSession(String),
}

/// Settings of one batch run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Per-module wall-clock limit; `None` waits forever
    pub timeout: Option<Duration>,
    /// Globs of test files to leave out
    pub exclude: Vec<String>,
    /// Interpreter for `.py` modules; resolved from the environment if unset
    pub python: Option<PathBuf>,
    pub file_regex: Option<String>,
    pub file_glob: Option<String>,
    pub skip_dirs: Vec<String>,
    pub testsuite_dir: String,
    /// Remove a stale sandbox with the same id before creating it
    pub clean_before: bool,
    /// Remove the sandbox after execution
    pub clean_after: bool,
    /// Wipe the results directory before the run
    pub clean_outputs: bool,
    /// Abort discovery on a module whose probe fails instead of keeping it
    pub strict_discovery: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            exclude: Vec::new(),
            python: None,
            file_regex: Some(DEFAULT_FILE_REGEX.to_string()),
            file_glob: None,
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            testsuite_dir: DEFAULT_TESTSUITE_DIR.to_string(),
            clean_before: true,
            clean_after: true,
            clean_outputs: true,
            strict_discovery: false,
        }
    }
}

impl RunConfig {
    /// Load from an explicit file, or from `.gridtest.cfg` in `start_dir`
    /// when present, or fall back to defaults.
    pub fn load(explicit: Option<&Path>, start_dir: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = start_dir.join(DEFAULT_CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate)
                } else {
                    debug!("no configuration file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let kv = KeyValue::parse_config(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration");
        Self::from_keyvalue(&kv).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Overlay the keys present in `kv` on the defaults
    pub fn from_keyvalue(kv: &KeyValue) -> Result<Self, ConfigError> {
        let parse_err = |source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        };
        let mut config = Self::default();

        if let Some(secs) = kv.get_f64("timeout").map_err(parse_err)? {
            config.timeout = Some(timeout_from_secs(secs)?);
        }
        if let Some(exclude) = kv.get("exclude") {
            config.exclude = exclude.split_whitespace().map(str::to_string).collect();
        }
        if let Some(python) = kv.get("python").filter(|p| !p.is_empty()) {
            config.python = Some(PathBuf::from(python));
        }
        if let Some(pattern) = kv.get("file_regex") {
            config.file_regex = (!pattern.is_empty()).then(|| pattern.to_string());
        }
        if let Some(pattern) = kv.get("file_glob") {
            config.file_glob = (!pattern.is_empty()).then(|| pattern.to_string());
        }
        if let Some(skip) = kv.get("skip_dirs") {
            config.skip_dirs = skip.split_whitespace().map(str::to_string).collect();
        }
        if let Some(dir) = kv.get("testsuite_dir").filter(|d| !d.is_empty()) {
            config.testsuite_dir = dir.to_string();
        }
        if let Some(value) = kv.get_bool("clean_sandbox").map_err(parse_err)? {
            config.clean_before = value;
            config.clean_after = value;
        }
        if let Some(value) = kv.get_bool("clean_outputs").map_err(parse_err)? {
            config.clean_outputs = value;
        }
        if let Some(value) = kv.get_bool("strict_discovery").map_err(parse_err)? {
            config.strict_discovery = value;
        }

        const KNOWN: &[&str] = &[
            "timeout",
            "exclude",
            "python",
            "file_regex",
            "file_glob",
            "skip_dirs",
            "testsuite_dir",
            "clean_sandbox",
            "clean_outputs",
            "strict_discovery",
        ];
        for (key, _) in kv.iter() {
            if !KNOWN.contains(&key) {
                warn!(key, "ignoring unknown configuration key");
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(pattern) = &self.file_regex {
            regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn timeout_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_finite() && secs > 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(ConfigError::InvalidTimeout(secs))
    }
}
