// src/lock.rs

//! Exclusive lock on the release folder
//!
//! Only one installer run may modify a release folder at a time. The lock is
//! an advisory `flock(LOCK_EX)` on `.octofarm-installer.lock` inside the
//! release folder, held for the duration of the run and released on drop.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the lock file inside the release folder
pub const LOCK_FILE: &str = ".octofarm-installer.lock";

/// Held lock on a release folder
pub struct RunLock {
    /// Kept open to maintain the lock
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock without blocking
    ///
    /// Fails with `LockHeld` when another run holds it.
    pub fn acquire(release_folder: &Path) -> Result<Self> {
        fs::create_dir_all(release_folder).map_err(|e| {
            Error::IoError(format!(
                "Failed to create release folder {}: {}",
                release_folder.display(),
                e
            ))
        })?;

        let path = release_folder.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                Error::IoError(format!("Failed to open lock file {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                info!("Acquired installer lock at {}", path.display());
                Ok(Self { file, path })
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
            {
                debug!("Installer lock already held at {}", path.display());
                Err(Error::LockHeld(path))
            }
            Err(e) => Err(Error::IoError(format!(
                "Failed to acquire installer lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!("Released installer lock at {}", self.path.display());
    }
}
