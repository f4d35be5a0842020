//! Location applicability probe

use std::fs;
use std::path::Path;

/// Where a test module may run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicability {
    Universal,
    Locations(Vec<String>),
}

/// Loads a test module far enough to tell where it applies
pub trait LocationProbe {
    fn probe(&self, path: &Path) -> std::io::Result<Applicability>;
}

/// Probe that only checks the file can be read; every readable module is
/// universal.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileReadProbe;

impl LocationProbe for FileReadProbe {
    fn probe(&self, path: &Path) -> std::io::Result<Applicability> {
        fs::File::open(path)?;
        Ok(Applicability::Universal)
    }
}
