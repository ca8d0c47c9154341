//! Advisory lock serializing engine cache population.
//!
//! Two builds sharing a cache root would otherwise purge and repopulate the
//! same directory concurrently. The lock is only taken on the cache-miss
//! path, so cache hits stay lock free. It is released when the guard drops;
//! the lock file itself is left in place.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use thiserror::Error;

/// Failure to create or lock the lock file.
#[derive(Error, Debug)]
#[error("Failed to lock {path}")]
pub struct LockError {
    /// Lock file path
    pub path: PathBuf,
    /// Underlying error
    pub source: io::Error,
}

/// Exclusive advisory lock held for the lifetime of the value.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
    // Closing the descriptor releases the lock.
    _file: File,
}

impl CacheLock {
    /// Block until the lock at `path` is acquired, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let wrap = |source| LockError {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(wrap)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(wrap)?;

        tracing::debug!(lock = %path.display(), "waiting for engine cache lock");
        FileExt::lock_exclusive(&file).map_err(wrap)?;

        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
