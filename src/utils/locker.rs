//! File-based locking so two agents never share one source's backup tree

use anyhow::{Context, Result};
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Exclusive advisory lock held for the lifetime of the agent process
pub struct InstanceLock {
    // The lock is released when the file descriptor is closed
    _lock: RwLock<File>,
    lock_path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock at `lock_path`.
    /// Returns error if another agent already holds it.
    pub fn acquire(lock_path: &Path, source_id: &str) -> Result<Self> {
        debug!("Attempting to acquire lock: {:?}", lock_path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create lock directory")?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .context(format!("Failed to open lock file: {:?}", lock_path))?;

        let mut lock = RwLock::new(file);
        {
            let guard = lock.try_write().context(format!(
                "Another agent is already backing up '{}' (lock held)",
                source_id
            ))?;
            // Keep the OS lock; it goes away with the descriptor
            std::mem::forget(guard);
        }

        info!("Acquired instance lock for source: {}", source_id);

        Ok(Self {
            _lock: lock,
            lock_path: lock_path.to_path_buf(),
        })
    }

    /// Get the lock file path
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        info!("Released instance lock: {:?}", self.lock_path);

        // Try to remove the lock file (best effort)
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            debug!("Failed to remove lock file: {}", e);
        }
    }
}
