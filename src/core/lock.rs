//! core::lock
//!
//! Exclusive lock for the record store.
//!
//! # Architecture
//!
//! Several pollen processes may run at once (one generating, another
//! listing or deleting). Every read-modify-write of the records file happens
//! while holding an OS-level exclusive lock on a sibling lock file, so one
//! process never overwrites another's save.
//!
//! The same lock marks a `FileAllocator` session directory as in use
//! while its owner is alive.
//!
//! # Storage
//!
//! - `<records file>.lock` - Lock file with OS-level exclusive lock
//! - `<cache>/session-<uuid>.lock` - Held by a live session directory
//!
//! # Invariants
//!
//! - Lock is held for the whole read-modify-write of the records file
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```
//! use pollen::core::lock::StoreLock;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let records = dir.path().join("images.json");
//!
//! let lock = StoreLock::acquire(&records).unwrap();
//! assert!(lock.is_held());
//! // Lock automatically released when dropped
//! drop(lock);
//! ```

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("record store is locked by another pollen process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on a records file.
///
/// Released when dropped, even if the holder panics.
#[derive(Debug)]
pub struct StoreLock {
    /// Path to the lock file.
    path: PathBuf,
    /// The open file handle with the lock held.
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl StoreLock {
    /// Path of the lock file guarding `records`.
    pub fn lock_path_for(records: &Path) -> PathBuf {
        let mut name = records
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("records"));
        name.push(".lock");
        records.with_file_name(name)
    }

    /// Attempt to acquire the lock guarding `records`.
    ///
    /// Uses OS-level file locking via `fs2`, which works across processes.
    /// Creates the parent directory if needed.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(records: &Path) -> Result<Self, LockError> {
        let path = Self::lock_path_for(records);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "store lock acquired");
                Ok(Self {
                    path,
                    file: Some(file),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    ///
    /// Called automatically on drop.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Best-effort release on drop
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
