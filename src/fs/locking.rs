//! File locking for the results tree
//!
//! A batch run holds an exclusive `fs2` advisory lock on a marker file in
//! the results directory so two runs cannot write into the same tree.
//! Summary files are written and read under per-file locks; a roll-up
//! started by hand may read while a run is still writing.
//!
//! Advisory locks are cooperative - all participants must use these functions
//! for the locking to be effective.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Marker file holding the run lock inside a results directory
pub const RESULTS_LOCK_FILE: &str = ".gridtest.lock";

/// Read file contents with a shared (read) lock.
pub fn locked_read(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    file.lock_shared()
        .with_context(|| format!("Failed to acquire shared lock: {}", path.display()))?;
    let mut content = String::new();
    BufReader::new(&file)
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(content)
}

/// Write file contents with an exclusive (write) lock.
///
/// The sequence is: open → lock → truncate → write → flush, so a reader
/// never sees the file empty between truncation and write.
pub fn locked_write(path: &Path, content: &str) -> Result<()> {
    #[allow(clippy::suspicious_open_options)]
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open file for writing: {}", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to acquire exclusive lock: {}", path.display()))?;
    file.set_len(0)
        .with_context(|| format!("Failed to truncate file: {}", path.display()))?;
    let mut writer = BufWriter::new(&file);
    writer
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush file: {}", path.display()))?;
    Ok(())
}

/// Exclusive lock on a results directory, released on drop
#[derive(Debug)]
pub struct ResultsLock {
    file: File,
    path: PathBuf,
}

impl ResultsLock {
    /// Try to take the lock without blocking.
    ///
    /// `Ok(None)` means another process holds it.
    pub fn try_acquire(results_dir: &Path) -> Result<Option<Self>> {
        let path = results_dir.join(RESULTS_LOCK_FILE);
        #[allow(clippy::suspicious_open_options)]
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(lock = %path.display(), "acquired results lock");
                Ok(Some(Self { file, path }))
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to acquire lock: {}", path.display())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ResultsLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_locked_write_and_read() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("test_keyvalue_result.txt");

        locked_write(&path, "name=test_a\n").unwrap();
        let content = locked_read(&path).unwrap();
        assert_eq!(content, "name=test_a\n");
    }

    #[test]
    fn test_locked_write_overwrites_longer_content() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("summary.txt");

        locked_write(&path, "status=failed\nreturncode=1\n").unwrap();
        locked_write(&path, "status=ok\n").unwrap();
        assert_eq!(locked_read(&path).unwrap(), "status=ok\n");
    }

    #[test]
    fn test_concurrent_write_safety() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("concurrent.txt");

        locked_write(&path, "initial").unwrap();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let path = path.clone();
                thread::spawn(move || {
                    locked_write(&path, &format!("writer={i}\n")).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let final_content = locked_read(&path).unwrap();
        assert!(final_content.starts_with("writer="));
        assert_eq!(final_content.lines().count(), 1);
    }

    #[test]
    fn test_results_lock_is_exclusive() {
        let temp = tempfile::tempdir().unwrap();

        let first = ResultsLock::try_acquire(temp.path()).unwrap();
        assert!(first.is_some());
        let second = ResultsLock::try_acquire(temp.path()).unwrap();
        assert!(second.is_none());

        drop(first);
        let third = ResultsLock::try_acquire(temp.path()).unwrap();
        assert!(third.is_some());
        assert!(third.unwrap().path().ends_with(RESULTS_LOCK_FILE));
    }
}
