//! session::handles
//!
//! Keyed registry of live resource handles.
//!
//! # Invariants
//!
//! - At most one live handle per [`ResourceKey`].
//! - Replacing a key releases the old handle before allocating the new one.
//! - A failed allocation leaves the key unmapped.
//! - `release_all` always empties the map, even when individual releases
//!   fail.
//!
//! Every handle the session hands out is created through
//! [`ResourceLifecycleManager::create_or_replace`] and freed through
//! [`ResourceLifecycleManager::release`] or
//! [`ResourceLifecycleManager::release_all`]. Dropping the manager runs
//! `release_all`.
//!
//! # Example
//!
//! ```
//! use pollen::core::record::Payload;
//! use pollen::core::types::ResourceKey;
//! use pollen::session::{MemoryAllocator, ResourceLifecycleManager};
//!
//! let mut manager = ResourceLifecycleManager::new(MemoryAllocator::new());
//! let first = manager
//!     .create_or_replace(ResourceKey::Current, &Payload::jpeg(vec![1u8]))
//!     .unwrap();
//! let second = manager
//!     .create_or_replace(ResourceKey::Current, &Payload::jpeg(vec![2u8]))
//!     .unwrap();
//!
//! assert_ne!(first, second);
//! assert_eq!(manager.len(), 1);
//! assert_eq!(manager.allocator().live(), 1);
//! ```

use std::collections::HashMap;

use crate::core::record::Payload;
use crate::core::types::ResourceKey;

use super::allocator::{AllocError, HandleAllocator, ReleaseError, ResourceHandle};

/// A release that failed during teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
    /// Key whose handle could not be released.
    pub key: ResourceKey,
    /// The handle that was dropped from the map.
    pub handle: ResourceHandle,
    /// What the platform reported.
    pub error: ReleaseError,
}

/// Outcome of [`ResourceLifecycleManager::release_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Handles released successfully.
    pub released: usize,
    /// Handles whose release failed. They are unmapped regardless.
    pub failures: Vec<ReleaseFailure>,
}

impl ReleaseReport {
    /// True if every release succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the key to handle mapping for one session.
#[derive(Debug)]
pub struct ResourceLifecycleManager<A: HandleAllocator> {
    allocator: A,
    handles: HashMap<ResourceKey, ResourceHandle>,
}

impl<A: HandleAllocator> ResourceLifecycleManager<A> {
    /// Create an empty manager over an allocator.
    pub fn new(allocator: A) -> Self {
        Self {
            allocator,
            handles: HashMap::new(),
        }
    }

    /// Access the allocator.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Make `payload` the live resource for `key`.
    ///
    /// Any handle already mapped to `key` is released first. If that
    /// release fails the failure is logged and the old handle is forgotten.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the platform refuses the payload. The key
    /// is then unmapped.
    pub fn create_or_replace(
        &mut self,
        key: ResourceKey,
        payload: &Payload,
    ) -> Result<ResourceHandle, AllocError> {
        self.release(&key);

        let handle = self.allocator.allocate(payload).map_err(|e| {
            tracing::warn!(key = %key, error = %e, "handle allocation failed");
            e
        })?;
        tracing::debug!(key = %key, handle = %handle, bytes = payload.len(), "handle created");
        self.handles.insert(key, handle.clone());
        Ok(handle)
    }

    /// Release the handle for `key`, if any.
    ///
    /// Idempotent. Returns true if a handle was mapped.
    pub fn release(&mut self, key: &ResourceKey) -> bool {
        let Some(handle) = self.handles.remove(key) else {
            return false;
        };
        match self.allocator.release(&handle) {
            Ok(()) => tracing::debug!(key = %key, handle = %handle, "handle released"),
            Err(e) => tracing::warn!(key = %key, error = %e, "handle release failed"),
        }
        true
    }

    /// Release every handle and empty the map.
    ///
    /// Individual failures are collected in the report and never stop the
    /// remaining releases.
    pub fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        for (key, handle) in self.handles.drain() {
            match self.allocator.release(&handle) {
                Ok(()) => report.released += 1,
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "handle release failed");
                    report.failures.push(ReleaseFailure { key, handle, error });
                }
            }
        }
        if report.released > 0 || !report.failures.is_empty() {
            tracing::debug!(
                released = report.released,
                failed = report.failures.len(),
                "released all handles"
            );
        }
        report
    }

    /// The live handle for `key`.
    pub fn handle(&self, key: &ResourceKey) -> Option<&ResourceHandle> {
        self.handles.get(key)
    }

    /// Resolve the live handle for `key` back to its payload.
    pub fn resolve(&self, key: &ResourceKey) -> Option<Payload> {
        self.handles
            .get(key)
            .and_then(|handle| self.allocator.resolve(handle))
    }

    /// True if `key` has a live handle.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.handles.contains_key(key)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True if no handle is live.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Keys with a live handle, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.handles.keys()
    }
}

impl<A: HandleAllocator> Drop for ResourceLifecycleManager<A> {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.release_all();
        }
    }
}
