//! store
//!
//! Durable storage for saved images.
//!
//! # Architecture
//!
//! The session talks to a `RecordStore`; it never touches files itself.
//! What the store keeps is the [`PersistedRecord`] shape: parameters,
//! metadata, and the payload bytes. Display handles are never stored; the
//! session re-creates them after loading.
//!
//! # Modules
//!
//! - `traits`: Core `RecordStore` trait and error/report types
//! - `file_store`: JSON array file with atomic writes and a store lock
//!
//! [`PersistedRecord`]: crate::core::record::PersistedRecord

mod file_store;
mod traits;

pub use file_store::FileRecordStore;
pub use traits::{LoadedRecords, RecordStore, SkippedRecord, StoreError};
