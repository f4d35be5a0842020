//! Directory copy and removal helpers

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Pause before the second removal attempt
const REMOVE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Copy `src` into `dst` recursively, creating `dst` as needed.
///
/// Symlinks are followed.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("Failed to create directory: {}", dst.display()))?;

    let entries =
        fs::read_dir(src).with_context(|| format!("Failed to read directory: {}", src.display()))?;
    for entry in entries {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Recursively delete `path`, retrying once after a short pause.
///
/// Returns whether the directory is gone. A remaining failure is logged,
/// never propagated.
pub fn remove_dir_best_effort(path: &Path) -> bool {
    remove_dir_with_retry(path, |p| fs::remove_dir_all(p))
}

/// [`remove_dir_best_effort`] with the removal step supplied by the caller
pub fn remove_dir_with_retry<F>(path: &Path, mut remove: F) -> bool
where
    F: FnMut(&Path) -> io::Result<()>,
{
    if !path.exists() {
        return true;
    }
    match remove(path) {
        Ok(()) => return true,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "removal failed, retrying");
        }
    }
    thread::sleep(REMOVE_RETRY_DELAY);
    match remove(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "leaving directory behind");
            false
        }
    }
}

/// Delete everything inside `dir` except the entries named in `keep`
pub fn clear_dir_except(dir: &Path, keep: &[&str]) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if keep.iter().any(|k| entry.file_name() == *k) {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_recursive_copies_nested_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("data");
        fs::create_dir_all(src.join("elevation")).unwrap();
        fs::write(src.join("points.csv"), "1,2\n").unwrap();
        fs::write(src.join("elevation/header"), "rows: 10\n").unwrap();

        let dst = temp.path().join("out/data");
        copy_dir_recursive(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("points.csv")).unwrap(), "1,2\n");
        assert_eq!(
            fs::read_to_string(dst.join("elevation/header")).unwrap(),
            "rows: 10\n"
        );
    }

    #[test]
    fn test_remove_dir_best_effort() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sandbox");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/WIND"), "north: 1\n").unwrap();

        assert!(remove_dir_best_effort(&dir));
        assert!(!dir.exists());
        assert!(remove_dir_best_effort(&dir));
    }

    #[test]
    fn test_removal_is_retried_once() {
        let temp = TempDir::new().unwrap();
        let mut attempts = 0;
        let removed = remove_dir_with_retry(temp.path(), |_| {
            attempts += 1;
            if attempts == 1 {
                Err(io::Error::new(io::ErrorKind::Other, "busy"))
            } else {
                Ok(())
            }
        });
        assert!(removed);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_persistent_removal_failure_is_swallowed() {
        let temp = TempDir::new().unwrap();
        let mut attempts = 0;
        let removed = remove_dir_with_retry(temp.path(), |_| {
            attempts += 1;
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        });
        assert!(!removed);
        assert_eq!(attempts, 2);
        assert!(temp.path().exists());
    }

    #[test]
    fn test_clear_dir_except_keeps_named_entries() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".gridtest.lock"), "").unwrap();
        fs::write(temp.path().join("index.html"), "<html>").unwrap();
        fs::create_dir_all(temp.path().join("raster/r.slope")).unwrap();

        clear_dir_except(temp.path(), &[".gridtest.lock"]).unwrap();

        let left: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(left, vec![".gridtest.lock"]);
    }
}
