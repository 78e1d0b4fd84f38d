//! session::allocator
//!
//! Platform capability for turning payloads into displayable handles.
//!
//! # Design
//!
//! The resource lifecycle manager never creates or frees handles itself; it
//! calls a [`HandleAllocator`] supplied by the execution environment. Two
//! environments ship with the crate:
//!
//! - [`MemoryAllocator`]: payloads live in an in-process table and handles
//!   are `blob:pollen/<uuid>` URIs. Supports a byte capacity so exhaustion
//!   can be exercised.
//! - [`FileAllocator`]: payloads are written to a per-session cache
//!   directory and handles are `file://` URIs a viewer can open. Releasing
//!   a handle deletes its file; directories left by dead processes are
//!   reclaimed by the next allocator.
//!
//! Test doubles live in [`crate::session::mock`].

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use crate::core::lock::{LockError, StoreLock};
use crate::core::record::Payload;

/// Errors allocating a handle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AllocError {
    /// The platform has no room for another payload.
    #[error("resource capacity exhausted: {requested} bytes requested, {available} available")]
    Exhausted {
        /// Size of the payload that did not fit.
        requested: usize,
        /// Bytes still free.
        available: usize,
    },

    /// The platform failed to store the payload.
    #[error("failed to allocate handle: {0}")]
    Io(String),
}

/// Errors releasing a handle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReleaseError {
    /// The handle was not issued by this allocator or was already released.
    #[error("unknown handle: {0}")]
    UnknownHandle(String),

    /// The platform failed to free the payload.
    #[error("failed to release handle {uri}: {message}")]
    Io {
        /// The handle's URI.
        uri: String,
        /// Underlying error.
        message: String,
    },
}

/// Opaque, environment-resolvable reference to a payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    uri: String,
}

impl ResourceHandle {
    /// Wrap a URI issued by an allocator.
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// The URI the environment resolves.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// The allocate/release capability the environment provides.
///
/// Implementations must be thread-safe (Send + Sync). The manager calls
/// `release` exactly once for every handle `allocate` returned.
pub trait HandleAllocator: Send + Sync {
    /// Create a handle for a payload.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the platform cannot hold the payload.
    fn allocate(&self, payload: &Payload) -> Result<ResourceHandle, AllocError>;

    /// Free a handle.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError`] if the handle is unknown or cannot be freed.
    fn release(&self, handle: &ResourceHandle) -> Result<(), ReleaseError>;

    /// Resolve a live handle back to its payload.
    ///
    /// Returns `None` for unknown or released handles.
    fn resolve(&self, handle: &ResourceHandle) -> Option<Payload>;
}

impl<T: HandleAllocator + ?Sized> HandleAllocator for Box<T> {
    fn allocate(&self, payload: &Payload) -> Result<ResourceHandle, AllocError> {
        (**self).allocate(payload)
    }

    fn release(&self, handle: &ResourceHandle) -> Result<(), ReleaseError> {
        (**self).release(handle)
    }

    fn resolve(&self, handle: &ResourceHandle) -> Option<Payload> {
        (**self).resolve(handle)
    }
}

/// Prefix of URIs issued by [`MemoryAllocator`].
pub const BLOB_URI_PREFIX: &str = "blob:pollen/";

/// In-process payload table.
///
/// # Example
///
/// ```
/// use pollen::core::record::Payload;
/// use pollen::session::{HandleAllocator, MemoryAllocator};
///
/// let allocator = MemoryAllocator::new();
/// let handle = allocator.allocate(&Payload::jpeg(vec![1u8, 2, 3])).unwrap();
/// assert!(handle.uri().starts_with("blob:pollen/"));
/// assert_eq!(allocator.resolve(&handle).unwrap().bytes(), &[1, 2, 3]);
///
/// allocator.release(&handle).unwrap();
/// assert!(allocator.resolve(&handle).is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryAllocator {
    inner: Mutex<MemoryInner>,
    capacity: Option<usize>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    blobs: HashMap<String, Payload>,
    used: usize,
}

impl MemoryAllocator {
    /// Allocator without a capacity limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that refuses payloads once `bytes` are held.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            inner: Mutex::default(),
            capacity: Some(bytes),
        }
    }

    /// Number of live blobs.
    pub fn live(&self) -> usize {
        self.lock().blobs.len()
    }

    /// Bytes currently held.
    pub fn used_bytes(&self) -> usize {
        self.lock().used
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned table is still structurally valid.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HandleAllocator for MemoryAllocator {
    fn allocate(&self, payload: &Payload) -> Result<ResourceHandle, AllocError> {
        let mut inner = self.lock();
        if let Some(capacity) = self.capacity {
            let available = capacity.saturating_sub(inner.used);
            if payload.len() > available {
                return Err(AllocError::Exhausted {
                    requested: payload.len(),
                    available,
                });
            }
        }
        let uri = format!("{}{}", BLOB_URI_PREFIX, Uuid::new_v4());
        inner.used += payload.len();
        inner.blobs.insert(uri.clone(), payload.clone());
        Ok(ResourceHandle::new(uri))
    }

    fn release(&self, handle: &ResourceHandle) -> Result<(), ReleaseError> {
        let mut inner = self.lock();
        match inner.blobs.remove(handle.uri()) {
            Some(payload) => {
                inner.used -= payload.len();
                Ok(())
            }
            None => Err(ReleaseError::UnknownHandle(handle.uri().to_string())),
        }
    }

    fn resolve(&self, handle: &ResourceHandle) -> Option<Payload> {
        self.lock().blobs.get(handle.uri()).cloned()
    }
}

/// Prefix of the per-session directories under the cache directory.
pub const SESSION_DIR_PREFIX: &str = "session-";

/// Payloads written to a cache directory.
///
/// Each allocator owns a fresh `session-<uuid>` subdirectory of the cache
/// directory and holds an exclusive lock on its sibling
/// `session-<uuid>.lock` for as long as it lives. Dropping the allocator
/// removes the subdirectory if it is empty.
///
/// A process that dies without dropping its allocator leaves its directory
/// behind, but the OS releases the lock. Creating an allocator reclaims
/// every session directory whose lock can be taken.
#[derive(Debug)]
pub struct FileAllocator {
    dir: PathBuf,
    files: Mutex<HashMap<String, FileEntry>>,
    session_lock: StoreLock,
}

#[derive(Debug, Clone)]
struct FileEntry {
    path: PathBuf,
    content_type: String,
}

impl FileAllocator {
    /// Create an allocator under `cache_dir`.
    ///
    /// Orphaned session directories left by dead processes are removed
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Io`] if the session directory cannot be created
    /// or locked.
    pub fn new(cache_dir: &Path) -> Result<Self, AllocError> {
        let dir = cache_dir.join(format!("{}{}", SESSION_DIR_PREFIX, Uuid::new_v4().simple()));

        // The lock exists before the directory, so a sweeper never sees a
        // live directory unlocked.
        let session_lock = StoreLock::acquire(&dir).map_err(|e| {
            AllocError::Io(format!("cannot lock {}: {}", dir.display(), e))
        })?;
        if let Err(e) = fs::create_dir_all(&dir) {
            let _ = fs::remove_file(session_lock.path());
            return Err(AllocError::Io(format!("cannot create {}: {}", dir.display(), e)));
        }

        let reclaimed = reclaim_orphans(cache_dir, &dir);
        if reclaimed > 0 {
            tracing::debug!(
                count = reclaimed,
                cache = %cache_dir.display(),
                "reclaimed orphaned session directories"
            );
        }

        Ok(Self {
            dir,
            files: Mutex::new(HashMap::new()),
            session_lock,
        })
    }

    /// The session directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file behind a live handle.
    pub fn path_of(&self, handle: &ResourceHandle) -> Option<PathBuf> {
        self.lock().get(handle.uri()).map(|e| e.path.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, FileEntry>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn uri_for(path: &Path) -> String {
        match reqwest::Url::from_file_path(path) {
            Ok(url) => url.to_string(),
            Err(()) => format!("file://{}", path.display()),
        }
    }
}

/// Create `path`, which must not exist, and fill it with `write`.
///
/// A file this call created is removed again if `write` fails, so a short
/// write never leaves an untracked file behind.
fn create_file_with(
    path: &Path,
    write: impl FnOnce(&mut fs::File) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    if let Err(e) = write(&mut file) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

/// Remove session directories under `cache_dir` whose owner is gone.
///
/// A directory is orphaned when its lock file can be locked. Returns the
/// number of directories removed.
fn reclaim_orphans(cache_dir: &Path, own: &Path) -> usize {
    let Ok(entries) = fs::read_dir(cache_dir) else {
        return 0;
    };

    let mut reclaimed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_session = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(SESSION_DIR_PREFIX));
        if !is_session || path == own || !path.is_dir() {
            continue;
        }

        let lock = match StoreLock::acquire(&path) {
            Ok(lock) => lock,
            Err(LockError::AlreadyLocked) => continue,
            Err(e) => {
                tracing::debug!(dir = %path.display(), error = %e, "cannot check session directory");
                continue;
            }
        };
        match fs::remove_dir_all(&path) {
            Ok(()) => reclaimed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(dir = %path.display(), error = %e, "cannot remove orphaned session directory");
                continue;
            }
        }
        let _ = fs::remove_file(lock.path());
    }
    reclaimed
}

impl HandleAllocator for FileAllocator {
    fn allocate(&self, payload: &Payload) -> Result<ResourceHandle, AllocError> {
        let path = self
            .dir
            .join(format!("{}.{}", Uuid::new_v4().simple(), payload.extension()));
        create_file_with(&path, |file| file.write_all(payload.bytes()))
            .map_err(|e| AllocError::Io(format!("cannot write {}: {}", path.display(), e)))?;

        let uri = Self::uri_for(&path);
        self.lock().insert(
            uri.clone(),
            FileEntry {
                path,
                content_type: payload.content_type().to_string(),
            },
        );
        Ok(ResourceHandle::new(uri))
    }

    fn release(&self, handle: &ResourceHandle) -> Result<(), ReleaseError> {
        let entry = self
            .lock()
            .remove(handle.uri())
            .ok_or_else(|| ReleaseError::UnknownHandle(handle.uri().to_string()))?;
        match fs::remove_file(&entry.path) {
            Ok(()) => Ok(()),
            // Someone else cleaned the cache; the handle is gone either way.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReleaseError::Io {
                uri: handle.uri().to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn resolve(&self, handle: &ResourceHandle) -> Option<Payload> {
        let entry = self.lock().get(handle.uri()).cloned()?;
        let bytes = fs::read(&entry.path).ok()?;
        Some(Payload::new(bytes, entry.content_type))
    }
}

impl Drop for FileAllocator {
    fn drop(&mut self) {
        // Only succeeds when every handle was released. Otherwise the
        // directory stays until the next allocator reclaims it.
        if fs::remove_dir(&self.dir).is_ok() {
            let _ = fs::remove_file(self.session_lock.path());
        }
    }
}
