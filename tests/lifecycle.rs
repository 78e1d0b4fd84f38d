//! Resource lifecycle tests against a recording allocator.
//!
//! Every handle the manager creates must be released exactly once, and a
//! key never maps to more than one live handle.

use std::collections::HashMap;

use proptest::prelude::*;

use pollen::core::record::Payload;
use pollen::core::types::{RecordId, ResourceKey};
use pollen::session::mock::{FailOn, SpyAllocator, SpyOperation};
use pollen::session::{AllocError, ResourceLifecycleManager};

fn payload(byte: u8) -> Payload {
    Payload::jpeg(vec![byte; 4])
}

#[test]
fn replace_releases_previous_handle() {
    let spy = SpyAllocator::new();
    let mut manager = ResourceLifecycleManager::new(spy.clone());

    let p1 = manager
        .create_or_replace(ResourceKey::Current, &payload(1))
        .expect("allocate p1");
    let p2 = manager
        .create_or_replace(ResourceKey::Current, &payload(2))
        .expect("allocate p2");

    assert_eq!(spy.live(), vec![p2.clone()]);
    assert_eq!(spy.releases_of(&p1), 1);
    assert_eq!(manager.handle(&ResourceKey::Current), Some(&p2));
    assert_eq!(manager.resolve(&ResourceKey::Current), Some(payload(2)));
}

#[test]
fn release_without_handle_is_noop() {
    let spy = SpyAllocator::new();
    let mut manager = ResourceLifecycleManager::new(spy.clone());

    assert!(!manager.release(&ResourceKey::Current));
    assert!(!manager.release(&ResourceKey::Record(RecordId::new())));
    assert!(spy.operations().is_empty());
}

#[test]
fn failed_allocation_leaves_key_unmapped() {
    let spy = SpyAllocator::new();
    let mut manager = ResourceLifecycleManager::new(spy.clone());
    let old = manager
        .create_or_replace(ResourceKey::Current, &payload(1))
        .expect("allocate");

    spy.fail_on(FailOn::NextAllocate(AllocError::Io("no space".into())));
    let err = manager
        .create_or_replace(ResourceKey::Current, &payload(2))
        .unwrap_err();

    assert_eq!(err, AllocError::Io("no space".into()));
    assert!(!manager.contains(&ResourceKey::Current));
    assert_eq!(spy.releases_of(&old), 1);
    assert!(spy.live().is_empty());
}

#[test]
fn drop_releases_everything() {
    let spy = SpyAllocator::new();
    {
        let mut manager = ResourceLifecycleManager::new(spy.clone());
        for i in 0..3 {
            manager
                .create_or_replace(ResourceKey::Record(RecordId::new()), &payload(i))
                .expect("allocate");
        }
        manager
            .create_or_replace(ResourceKey::Current, &payload(9))
            .expect("allocate");
        assert_eq!(spy.live().len(), 4);
    }
    assert!(spy.live().is_empty());
    assert_eq!(spy.release_count(), 4);
}

#[test]
fn release_failure_is_reported_and_forgotten() {
    let spy = SpyAllocator::new();
    let mut manager = ResourceLifecycleManager::new(spy.clone());
    let handle = manager
        .create_or_replace(ResourceKey::Current, &payload(1))
        .expect("allocate");

    spy.fail_on(FailOn::NextRelease);
    let report = manager.release_all();

    assert_eq!(report.released, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].handle, handle);
    assert!(manager.is_empty());

    // Nothing left to release a second time.
    assert!(manager.release_all().is_clean());
    assert!(spy
        .operations()
        .contains(&SpyOperation::ReleaseFailed { handle }));
}

// =============================================================================
// Random operation sequences
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Create { key: usize, byte: u8 },
    Release { key: usize },
    FailNextAllocate,
    ReleaseAll,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..4, any::<u8>()).prop_map(|(key, byte)| Op::Create { key, byte }),
        2 => (0usize..4).prop_map(|key| Op::Release { key }),
        1 => Just(Op::FailNextAllocate),
        1 => Just(Op::ReleaseAll),
    ]
}

proptest! {
    #[test]
    fn handles_are_never_leaked_or_double_released(ops in prop::collection::vec(op(), 0..40)) {
        let keys: Vec<ResourceKey> = std::iter::once(ResourceKey::Current)
            .chain((0..3).map(|_| ResourceKey::Record(RecordId::new())))
            .collect();
        let spy = SpyAllocator::new();
        let mut manager = ResourceLifecycleManager::new(spy.clone());
        let mut expected: HashMap<ResourceKey, Payload> = HashMap::new();

        for op in ops {
            match op {
                Op::Create { key, byte } => {
                    let key = keys[key].clone();
                    match manager.create_or_replace(key.clone(), &payload(byte)) {
                        Ok(_) => { expected.insert(key, payload(byte)); }
                        Err(_) => { expected.remove(&key); }
                    }
                }
                Op::Release { key } => {
                    let key = &keys[key];
                    prop_assert_eq!(manager.release(key), expected.remove(key).is_some());
                }
                Op::FailNextAllocate => {
                    spy.fail_on(FailOn::NextAllocate(AllocError::Io("injected".into())));
                }
                Op::ReleaseAll => {
                    manager.release_all();
                    expected.clear();
                }
            }

            // One live handle per mapped key, nothing else.
            prop_assert_eq!(spy.live().len(), manager.len());
            prop_assert_eq!(manager.len(), expected.len());
            for (key, bytes) in &expected {
                let resolved = manager.resolve(key);
                prop_assert_eq!(resolved.as_ref(), Some(bytes));
            }
        }

        drop(manager);
        prop_assert!(spy.live().is_empty());
        for operation in spy.operations() {
            if let SpyOperation::Allocate { handle } = operation {
                prop_assert_eq!(spy.releases_of(&handle), 1);
            }
        }
    }
}
