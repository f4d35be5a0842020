//! Test file discovery
//!
//! Walks a source tree in sorted order. Every directory owning a
//! `testsuite` subdirectory is a tested directory; the files inside that
//! subdirectory that pass the name filters become [`TestModule`]s. The
//! testsuite directory itself is never treated as a tested directory.
//!
//! # Location applicability
//!
//! Tests could in principle be limited to particular locations. The filter
//! is permissive: a module is applicable everywhere as long as its file can
//! be loaded. Only the load can fail, and what happens then is fixed per
//! discoverer by [`ProbePolicy`].

mod filters;
mod probe;
mod walker;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use filters::FileFilter;
pub use probe::{Applicability, FileReadProbe, LocationProbe};
pub use walker::TestModuleDiscoverer;

/// Location tag value meaning "run everything regardless of location"
pub const ALL_LOCATIONS: &str = "all";

/// Tag value marking a test as applicable in any location
pub const UNIVERSAL_LOCATION: &str = "universal";

/// What to do with a module whose applicability probe fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePolicy {
    /// Keep the module so a broken test shows up as a failure
    #[default]
    Lenient,
    /// Abort discovery with the load error
    Strict,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot read directory {path}: {source}")]
    UnreadableDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot load test module {module} in {dir}: {source}")]
    ProbeFailed {
        module: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern <{pattern}>: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Which location the run targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationFilter {
    pub location_tag: String,
    pub all_locations_value: String,
    pub universal_location_value: String,
}

impl LocationFilter {
    pub fn new(location_tag: impl Into<String>) -> Self {
        Self {
            location_tag: location_tag.into(),
            all_locations_value: ALL_LOCATIONS.to_string(),
            universal_location_value: UNIVERSAL_LOCATION.to_string(),
        }
    }

    /// Everything is included without probing
    pub fn includes_all(&self) -> bool {
        self.location_tag == self.all_locations_value
    }

    pub fn accepts(&self, applicability: &Applicability) -> bool {
        match applicability {
            Applicability::Universal => true,
            Applicability::Locations(tags) => tags
                .iter()
                .any(|t| *t == self.location_tag || *t == self.universal_location_value),
        }
    }
}

/// Knobs of one discovery pass
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub skip_dirs: Vec<String>,
    pub testsuite_dir: String,
    pub file_glob: Option<String>,
    pub file_regex: Option<String>,
    pub exclude: Vec<String>,
    pub policy: ProbePolicy,
}

impl DiscoveryOptions {
    pub fn from_config(config: &crate::config::RunConfig, exclude: &[String]) -> Self {
        let mut all_exclude = config.exclude.clone();
        all_exclude.extend(exclude.iter().cloned());
        Self {
            skip_dirs: config.skip_dirs.clone(),
            testsuite_dir: config.testsuite_dir.clone(),
            file_glob: config.file_glob.clone(),
            file_regex: config.file_regex.clone(),
            exclude: all_exclude,
            policy: if config.strict_discovery {
                ProbePolicy::Strict
            } else {
                ProbePolicy::Lenient
            },
        }
    }
}

/// Convenience wrapper: build a discoverer with the file probe and run it
pub fn discover(
    start_dir: &Path,
    options: &DiscoveryOptions,
    location: &LocationFilter,
) -> anyhow::Result<Vec<crate::models::TestModule>> {
    TestModuleDiscoverer::new(options)?.discover(start_dir, location)
}
