//! store::traits
//!
//! Record store trait definition.
//!
//! # Design
//!
//! The `RecordStore` trait is a small durable collection of
//! [`PersistedRecord`]s keyed by [`RecordId`]. It is synchronous: the
//! records file is local and small, and every call is a short
//! read-modify-write.
//!
//! Loading is tolerant. An entry that does not parse is reported in
//! [`LoadedRecords::skipped`] and the rest still load. Only a file that is
//! unreadable as a whole is an error.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::lock::LockError;
use crate::core::record::PersistedRecord;
use crate::core::types::RecordId;

/// Errors from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The records file could not be read.
    #[error("failed to read records file '{path}': {message}")]
    ReadError { path: PathBuf, message: String },

    /// The records file could not be written.
    #[error("failed to write records file '{path}': {message}")]
    WriteError { path: PathBuf, message: String },

    /// The records file exists but is not a JSON array.
    #[error("records file '{path}' is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// Another process holds the store lock.
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// An entry that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position of the entry in the store.
    pub index: usize,
    /// The entry's id, if one could be read.
    pub id: Option<String>,
    /// Why it was skipped.
    pub reason: String,
}

impl std::fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "entry {} ({}): {}", self.index, id, self.reason),
            None => write!(f, "entry {}: {}", self.index, self.reason),
        }
    }
}

/// Result of [`RecordStore::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    /// Entries that parsed, in store order.
    pub records: Vec<PersistedRecord>,
    /// Entries that did not.
    pub skipped: Vec<SkippedRecord>,
}

/// Durable storage for saved images.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait RecordStore: Send + Sync {
    /// Load every saved record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when the store as a whole is unreadable.
    /// Individual bad entries are reported in [`LoadedRecords::skipped`].
    fn load(&self) -> Result<LoadedRecords, StoreError>;

    /// Insert a record, replacing any entry with the same id.
    fn save(&self, record: &PersistedRecord) -> Result<(), StoreError>;

    /// Remove the entry with `id`.
    ///
    /// Returns whether an entry was removed. Removing an unknown id is not
    /// an error.
    fn delete(&self, id: &RecordId) -> Result<bool, StoreError>;
}
