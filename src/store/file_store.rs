//! store::file_store
//!
//! JSON-file record storage.
//!
//! # Format
//!
//! The records file is a JSON array with one object per saved image, in save
//! order. Entries are parsed one at a time, so one damaged entry never hides
//! the others. Writes keep entries this version cannot parse exactly as they
//! were.
//!
//! # Safety
//!
//! - Every read-modify-write holds the [`StoreLock`]
//! - All writes are atomic (write to temp file, then rename)
//! - A file whose top level is not an array is never overwritten
//!
//! # Example
//!
//! ```ignore
//! use pollen::store::{FileRecordStore, RecordStore};
//!
//! let store = FileRecordStore::new(config.records_path()?);
//! let loaded = store.load()?;
//! println!("{} saved images", loaded.records.len());
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::traits::{LoadedRecords, RecordStore, SkippedRecord, StoreError};
use crate::core::lock::StoreLock;
use crate::core::record::PersistedRecord;
use crate::core::types::RecordId;

/// JSON-file record store.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    /// Path to the records file
    path: PathBuf,
}

impl FileRecordStore {
    /// Create a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the records file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw entries.
    fn read_entries(&self) -> Result<Vec<Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| StoreError::ReadError {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(other) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                message: format!("expected a JSON array, found {}", json_kind(&other)),
            }),
            Err(e) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Write the raw entries atomically.
    fn write_entries(&self, entries: &[Value]) -> Result<(), StoreError> {
        let write_error = |message: String| StoreError::WriteError {
            path: self.path.clone(),
            message,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| write_error(format!("cannot create directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| write_error(format!("cannot serialize records: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| write_error(format!("cannot create temp file: {}", e)))?;
            file.write_all(content.as_bytes())
                .map_err(|e| write_error(format!("cannot write records: {}", e)))?;
            file.sync_all()
                .map_err(|e| write_error(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| write_error(format!("cannot rename temp file: {}", e)))?;
        Ok(())
    }
}

/// The `id` field of a raw entry, if it is a string.
fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl RecordStore for FileRecordStore {
    fn load(&self) -> Result<LoadedRecords, StoreError> {
        let _lock = StoreLock::acquire(&self.path)?;
        let entries = self.read_entries()?;

        let mut loaded = LoadedRecords::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let id = entry_id(&entry).map(str::to_string);
            match serde_json::from_value::<PersistedRecord>(entry) {
                Ok(record) => loaded.records.push(record),
                Err(e) => {
                    tracing::warn!(index, id = ?id, error = %e, "skipping unreadable record");
                    loaded.skipped.push(SkippedRecord {
                        index,
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            loaded = loaded.records.len(),
            skipped = loaded.skipped.len(),
            "records loaded"
        );
        Ok(loaded)
    }

    fn save(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        let _lock = StoreLock::acquire(&self.path)?;
        let mut entries = self.read_entries()?;

        let value = serde_json::to_value(record).map_err(|e| StoreError::WriteError {
            path: self.path.clone(),
            message: format!("cannot serialize record: {}", e),
        })?;
        let id = record.id.to_string();

        match entries.iter().position(|e| entry_id(e) == Some(id.as_str())) {
            Some(index) => entries[index] = value,
            None => entries.push(value),
        }

        self.write_entries(&entries)?;
        tracing::debug!(id = %record.id, "record saved");
        Ok(())
    }

    fn delete(&self, id: &RecordId) -> Result<bool, StoreError> {
        let _lock = StoreLock::acquire(&self.path)?;
        let mut entries = self.read_entries()?;

        let id = id.to_string();
        let before = entries.len();
        entries.retain(|e| entry_id(e) != Some(id.as_str()));
        if entries.len() == before {
            return Ok(false);
        }

        self.write_entries(&entries)?;
        tracing::debug!(id = %id, "record deleted");
        Ok(true)
    }
}
