//! Creation and removal of per-module sandboxes

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::naming::sandbox_id;
use crate::fs::remove_dir_best_effort;
use crate::models::TestModule;

/// Mapset holding the location's canonical settings
pub const PERMANENT_MAPSET: &str = "PERMANENT";

/// Default region descriptor inside the permanent mapset
pub const DEFAULT_REGION_FILE: &str = "DEFAULT_WIND";

/// Current region descriptor inside a sandbox
pub const REGION_FILE: &str = "WIND";

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("location does not exist: {0}")]
    MissingLocation(PathBuf),

    #[error("cannot remove stale sandbox {path}: {source}")]
    RemoveStale {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create sandbox {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot copy default region {from} into sandbox: {source}")]
    CopyRegion {
        from: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Create the sandbox for one module execution and return `(id, path)`.
///
/// The sandbox lives at `<db_root>/<location>/<id>` and starts with a copy
/// of the location's default region as its current region.
pub fn create_sandbox(
    db_root: &Path,
    location: &str,
    module: &TestModule,
    clean_before: bool,
) -> Result<(String, PathBuf), SandboxError> {
    let location_dir = db_root.join(location);
    if !location_dir.is_dir() {
        return Err(SandboxError::MissingLocation(location_dir));
    }

    let id = sandbox_id(module.tested_dir(), module.name(), std::process::id());
    let path = location_dir.join(&id);

    if path.exists() {
        if clean_before {
            debug!(sandbox = %path.display(), "removing stale sandbox");
            fs::remove_dir_all(&path).map_err(|source| SandboxError::RemoveStale {
                path: path.clone(),
                source,
            })?;
        } else {
            warn!(sandbox = %path.display(), "reusing existing sandbox");
        }
    }

    fs::create_dir_all(&path).map_err(|source| SandboxError::Create {
        path: path.clone(),
        source,
    })?;

    let default_region = location_dir.join(PERMANENT_MAPSET).join(DEFAULT_REGION_FILE);
    if let Err(source) = fs::copy(&default_region, path.join(REGION_FILE)) {
        remove_dir_best_effort(&path);
        return Err(SandboxError::CopyRegion {
            from: default_region,
            source,
        });
    }

    info!(sandbox = %id, "created sandbox");
    Ok((id, path))
}

/// Remove a sandbox.
///
/// Retried once; a sandbox that still cannot be removed is left behind
/// with a warning and never fails the caller.
pub fn destroy_sandbox(path: &Path) {
    if remove_dir_best_effort(path) {
        debug!(sandbox = %path.display(), "removed sandbox");
    }
}

/// Hands out sandboxes inside one location
#[derive(Debug, Clone)]
pub struct SandboxProvisioner {
    db_root: PathBuf,
    location: String,
    clean_before: bool,
    clean_after: bool,
}

impl SandboxProvisioner {
    pub fn new(db_root: impl Into<PathBuf>, location: impl Into<String>) -> Self {
        Self {
            db_root: db_root.into(),
            location: location.into(),
            clean_before: true,
            clean_after: true,
        }
    }

    pub fn with_cleanup(mut self, clean_before: bool, clean_after: bool) -> Self {
        self.clean_before = clean_before;
        self.clean_after = clean_after;
        self
    }

    pub fn create(&self, module: &TestModule) -> Result<Sandbox, SandboxError> {
        let (id, path) = create_sandbox(&self.db_root, &self.location, module, self.clean_before)?;
        Ok(Sandbox {
            id,
            path,
            remove_on_drop: self.clean_after,
        })
    }
}

/// A live sandbox, destroyed when dropped unless cleanup is disabled
#[derive(Debug)]
pub struct Sandbox {
    id: String,
    path: PathBuf,
    remove_on_drop: bool,
}

impl Sandbox {
    /// Sandbox name, used as the mapset of the child session
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.remove_on_drop {
            destroy_sandbox(&self.path);
        } else {
            debug!(sandbox = %self.path.display(), "keeping sandbox");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileType;
    use tempfile::TempDir;

    fn location(db: &Path) {
        let permanent = db.join("nc").join(PERMANENT_MAPSET);
        fs::create_dir_all(&permanent).unwrap();
        fs::write(permanent.join(DEFAULT_REGION_FILE), "north: 10\nsouth: 0\n").unwrap();
    }

    fn module() -> TestModule {
        TestModule::new(
            "test_slope",
            FileType::Shell,
            "raster/r.slope",
            "/src/raster/r.slope/testsuite",
            "raster/r.slope/testsuite/test_slope.sh",
            "/src/raster/r.slope/testsuite/test_slope.sh",
        )
    }

    #[test]
    fn test_create_copies_default_region() {
        let db = TempDir::new().unwrap();
        location(db.path());

        let (id, path) = create_sandbox(db.path(), "nc", &module(), true).unwrap();

        assert!(id.starts_with("test_raster_r_slope_test_slope_"));
        assert!(id.ends_with(&std::process::id().to_string()));
        assert_eq!(path, db.path().join("nc").join(&id));
        assert_eq!(
            fs::read_to_string(path.join(REGION_FILE)).unwrap(),
            "north: 10\nsouth: 0\n"
        );
        destroy_sandbox(&path);
        assert!(!path.exists());
    }

    #[test]
    fn test_clean_before_removes_stale_content() {
        let db = TempDir::new().unwrap();
        location(db.path());
        let (_, path) = create_sandbox(db.path(), "nc", &module(), true).unwrap();
        fs::write(path.join("leftover"), "x").unwrap();

        let (_, again) = create_sandbox(db.path(), "nc", &module(), true).unwrap();
        assert_eq!(again, path);
        assert!(!again.join("leftover").exists());
    }

    #[test]
    fn test_missing_location_is_an_error() {
        let db = TempDir::new().unwrap();
        let err = create_sandbox(db.path(), "nowhere", &module(), true).unwrap_err();
        assert!(matches!(err, SandboxError::MissingLocation(_)));
    }

    #[test]
    fn test_missing_default_region_leaves_nothing_behind() {
        let db = TempDir::new().unwrap();
        fs::create_dir_all(db.path().join("nc")).unwrap();

        let err = create_sandbox(db.path(), "nc", &module(), true).unwrap_err();
        assert!(matches!(err, SandboxError::CopyRegion { .. }));
        let entries = fs::read_dir(db.path().join("nc")).unwrap().count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn test_guard_removes_sandbox_on_drop() {
        let db = TempDir::new().unwrap();
        location(db.path());
        let provisioner = SandboxProvisioner::new(db.path(), "nc");

        let sandbox = provisioner.create(&module()).unwrap();
        let path = sandbox.path().to_path_buf();
        assert!(path.is_dir());
        drop(sandbox);
        assert!(!path.exists());
    }

    #[test]
    fn test_guard_keeps_sandbox_when_cleanup_disabled() {
        let db = TempDir::new().unwrap();
        location(db.path());
        let provisioner = SandboxProvisioner::new(db.path(), "nc").with_cleanup(true, false);

        let sandbox = provisioner.create(&module()).unwrap();
        let path = sandbox.path().to_path_buf();
        drop(sandbox);
        assert!(path.is_dir());
    }

    #[test]
    fn test_destroy_missing_sandbox_is_quiet() {
        let db = TempDir::new().unwrap();
        destroy_sandbox(&db.path().join("gone"));
    }
}
