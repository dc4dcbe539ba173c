//! Cross-process mutual exclusion through a marker file.
//!
//! The lock is a single `.lock` file in the store folder. Holding it means
//! having created it; releasing it means deleting it. Readers and writers
//! take the same lock.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::LockConfig;
use crate::error::{MetaStoreError, StoreResult};
use crate::fs::FileSystem;

/// Name of the marker file inside the store folder.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Serializes store operations across threads and processes.
#[derive(Debug)]
pub struct LockCoordinator {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    path: PathBuf,
    retry_interval: Duration,
    timeout: Duration,
}

impl LockCoordinator {
    pub fn new(fs: Arc<dyn FileSystem>, root: &Path, config: &LockConfig) -> Self {
        Self {
            fs,
            root: root.to_path_buf(),
            path: root.join(LOCK_FILE_NAME),
            retry_interval: config.retry_interval(),
            timeout: config.timeout(),
        }
    }

    /// Block until the marker file is created by this caller.
    ///
    /// Retries every `retry_interval` while another holder exists, and
    /// fails with [`MetaStoreError::LockTimeout`] once `timeout` has passed.
    pub fn acquire(&self) -> StoreResult<LockGuard<'_>> {
        let started = Instant::now();
        loop {
            match self.fs.create_new(&self.path) {
                Ok(()) => {
                    debug!(path = %self.path.display(), "lock acquired");
                    return Ok(LockGuard { coordinator: self });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                // Some platforms report a held marker as a permission fault.
                // Only treat it as contention if the folder itself is usable.
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    if !self.fs.is_writable(&self.root) {
                        return Err(MetaStoreError::io(&self.path, e));
                    }
                }
                Err(e) => return Err(MetaStoreError::io(&self.path, e)),
            }

            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(MetaStoreError::LockTimeout {
                    path: self.path.clone(),
                    waited,
                });
            }
            thread::sleep(self.retry_interval.min(self.timeout - waited));
        }
    }

    /// Delete the marker file. Failures are logged, not returned.
    pub fn release(&self) {
        match self.fs.delete(&self.path) {
            Ok(true) => debug!(path = %self.path.display(), "lock released"),
            Ok(false) => warn!(path = %self.path.display(), "lock file already gone on release"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to release lock"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any holder (this process or another) currently has the lock.
    pub fn is_held(&self) -> bool {
        self.fs.path_exists(&self.path)
    }
}

/// Releases the lock when dropped.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    coordinator: &'a LockCoordinator,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.release();
    }
}
