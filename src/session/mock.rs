//! session::mock
//!
//! Recording allocator for lifecycle tests.
//!
//! # Design
//!
//! [`SpyAllocator`] behaves like an in-memory allocator but records every
//! allocate and release call, and can be told to fail the next call. Clones
//! share state, so a test keeps one clone and hands the other to the
//! manager under test.
//!
//! # Example
//!
//! ```
//! use pollen::core::record::Payload;
//! use pollen::core::types::ResourceKey;
//! use pollen::session::mock::SpyAllocator;
//! use pollen::session::ResourceLifecycleManager;
//!
//! let spy = SpyAllocator::new();
//! let mut manager = ResourceLifecycleManager::new(spy.clone());
//! manager.create_or_replace(ResourceKey::Current, &Payload::jpeg(vec![1u8])).unwrap();
//! manager.create_or_replace(ResourceKey::Current, &Payload::jpeg(vec![2u8])).unwrap();
//!
//! assert_eq!(spy.allocate_count(), 2);
//! assert_eq!(spy.release_count(), 1);
//! assert_eq!(spy.live().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::record::Payload;

use super::allocator::{AllocError, HandleAllocator, ReleaseError, ResourceHandle};

/// Recording allocator.
#[derive(Debug, Clone, Default)]
pub struct SpyAllocator {
    inner: Arc<Mutex<SpyInner>>,
}

#[derive(Debug, Default)]
struct SpyInner {
    next_id: u64,
    live: HashMap<ResourceHandle, Payload>,
    /// Handles in allocation order, for stable `live()` output.
    order: Vec<ResourceHandle>,
    fail_on: Option<FailOn>,
    operations: Vec<SpyOperation>,
}

/// Which call should fail next.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail the next allocate with this error.
    NextAllocate(AllocError),
    /// Fail the next release. The handle is still dropped from the live set.
    NextRelease,
}

/// Recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpyOperation {
    Allocate { handle: ResourceHandle },
    AllocateFailed { error: AllocError },
    Release { handle: ResourceHandle },
    ReleaseFailed { handle: ResourceHandle },
}

impl SpyAllocator {
    /// Create an empty spy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next matching call fail.
    pub fn fail_on(&self, fail_on: FailOn) {
        self.lock().fail_on = Some(fail_on);
    }

    /// Clear any pending failure.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Every recorded call, in order.
    pub fn operations(&self) -> Vec<SpyOperation> {
        self.lock().operations.clone()
    }

    /// Handles allocated and not yet released, in allocation order.
    pub fn live(&self) -> Vec<ResourceHandle> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter(|h| inner.live.contains_key(*h))
            .cloned()
            .collect()
    }

    /// Number of successful allocations.
    pub fn allocate_count(&self) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| matches!(op, SpyOperation::Allocate { .. }))
            .count()
    }

    /// Number of release calls, failed ones included.
    pub fn release_count(&self) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    SpyOperation::Release { .. } | SpyOperation::ReleaseFailed { .. }
                )
            })
            .count()
    }

    /// How many times `handle` was passed to release.
    pub fn releases_of(&self, handle: &ResourceHandle) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| match op {
                SpyOperation::Release { handle: h } | SpyOperation::ReleaseFailed { handle: h } => {
                    h == handle
                }
                _ => false,
            })
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, SpyInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HandleAllocator for SpyAllocator {
    fn allocate(&self, payload: &Payload) -> Result<ResourceHandle, AllocError> {
        let mut inner = self.lock();
        if let Some(FailOn::NextAllocate(error)) = inner.fail_on.clone() {
            inner.fail_on = None;
            inner
                .operations
                .push(SpyOperation::AllocateFailed { error: error.clone() });
            return Err(error);
        }

        inner.next_id += 1;
        let handle = ResourceHandle::new(format!("spy://{}", inner.next_id));
        inner.live.insert(handle.clone(), payload.clone());
        inner.order.push(handle.clone());
        inner.operations.push(SpyOperation::Allocate {
            handle: handle.clone(),
        });
        Ok(handle)
    }

    fn release(&self, handle: &ResourceHandle) -> Result<(), ReleaseError> {
        let mut inner = self.lock();
        let known = inner.live.remove(handle).is_some();

        if matches!(inner.fail_on, Some(FailOn::NextRelease)) {
            inner.fail_on = None;
            inner.operations.push(SpyOperation::ReleaseFailed {
                handle: handle.clone(),
            });
            return Err(ReleaseError::Io {
                uri: handle.uri().to_string(),
                message: "injected failure".into(),
            });
        }

        inner.operations.push(SpyOperation::Release {
            handle: handle.clone(),
        });
        if known {
            Ok(())
        } else {
            Err(ReleaseError::UnknownHandle(handle.uri().to_string()))
        }
    }

    fn resolve(&self, handle: &ResourceHandle) -> Option<Payload> {
        self.lock().live.get(handle).cloned()
    }
}
