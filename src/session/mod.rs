//! session
//!
//! Generation orchestration and resource lifecycle.
//!
//! # Architecture
//!
//! A [`Session`] owns everything with a lifetime: the handle registry, the
//! request tokens, the list of saved images, and the most recent result.
//! Nothing here is global; closing or dropping the session releases every
//! handle it created.
//!
//! ```text
//! generate(params)
//!   -> issue token for Current
//!   -> generator.generate().await          (suspends)
//!   -> token still latest?  no  -> Superseded, nothing touched
//!   -> create_or_replace(Current, payload) -> handle
//!   -> codec::decode(payload)              -> metadata?
//!   -> GeneratedImageRecord { params, metadata }
//! ```
//!
//! # Concurrency
//!
//! The session is single-threaded and cooperative. Several `generate`
//! futures may be in flight at once on the same session (e.g. under
//! `tokio::join!`); interior state lives in `RefCell`s whose borrows never
//! span an `.await`.
//!
//! # Modules
//!
//! - [`allocator`]: The platform capability and its implementations
//! - [`handles`]: `ResourceLifecycleManager`
//! - [`tokens`]: Per-key request tokens
//! - [`mock`]: Recording allocator for tests

pub mod allocator;
pub mod handles;
pub mod mock;
pub mod tokens;

pub use allocator::{
    AllocError, FileAllocator, HandleAllocator, MemoryAllocator, ReleaseError, ResourceHandle,
};
pub use handles::{ReleaseFailure, ReleaseReport, ResourceLifecycleManager};
pub use tokens::{RequestToken, RequestTokens};

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::codec;
use crate::core::format::{transcode, ExportFormat, TranscodeError};
use crate::core::params::GenerationParams;
use crate::core::record::{GeneratedImageRecord, Payload, PersistedRecord};
use crate::core::types::{RecordId, ResourceKey};
use crate::generator::{GenerationRequest, GeneratorError, ImageGenerator};
use crate::store::{RecordStore, SkippedRecord, StoreError};

/// Longest prompt prefix used in export filenames, in characters.
pub const EXPORT_NAME_CHARS: usize = 30;

/// Export filename stem used when the prompt yields nothing.
pub const FALLBACK_EXPORT_STEM: &str = "generated_image";

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("generation failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no generated image to save")]
    NothingToSave,

    #[error("no saved image with id {0}")]
    UnknownRecord(RecordId),

    #[error("image bytes for {0} are no longer available")]
    PayloadUnavailable(ResourceKey),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("failed to export image to '{path}': {source}")]
    Export {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A generated image with its live display handle.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    /// What was generated.
    pub record: GeneratedImageRecord,
    /// Where the environment can display it.
    pub handle: ResourceHandle,
}

/// Outcome of [`Session::generate`].
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutcome {
    /// The result is now the current image.
    Installed(GeneratedImage),
    /// A newer request was issued while this one was in flight. The
    /// result, success or failure, was dropped.
    Superseded {
        /// The stale request's token.
        token: RequestToken,
    },
}

/// What happened while restoring saved images.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Records restored with a fresh handle.
    pub loaded: usize,
    /// Records that could not be restored.
    pub skipped: Vec<SkippedRecord>,
    /// Set when the store could not be read at all. The session then
    /// starts with no saved images.
    pub store_error: Option<StoreError>,
}

impl LoadReport {
    /// True if nothing was skipped and the store was readable.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.store_error.is_none()
    }
}

/// One user session.
pub struct Session {
    manager: RefCell<ResourceLifecycleManager<Box<dyn HandleAllocator>>>,
    tokens: RefCell<RequestTokens>,
    generator: Box<dyn ImageGenerator>,
    store: Box<dyn RecordStore>,
    current: RefCell<Option<GeneratedImageRecord>>,
    /// Newest first.
    saved: RefCell<Vec<GeneratedImageRecord>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("generator", &self.generator.name())
            .field("handles", &self.manager.borrow().len())
            .field("saved", &self.saved.borrow().len())
            .field("has_current", &self.current.borrow().is_some())
            .finish()
    }
}

impl Session {
    /// Open a session and restore saved images.
    ///
    /// Every restored record gets a fresh handle through the manager.
    /// Entries that fail to parse, fail their digest check, or cannot get a
    /// handle are skipped and reported; the rest load.
    pub fn open(
        allocator: impl HandleAllocator + 'static,
        generator: impl ImageGenerator + 'static,
        store: impl RecordStore + 'static,
    ) -> (Self, LoadReport) {
        let session = Self {
            manager: RefCell::new(ResourceLifecycleManager::new(Box::new(allocator))),
            tokens: RefCell::new(RequestTokens::new()),
            generator: Box::new(generator),
            store: Box::new(store),
            current: RefCell::new(None),
            saved: RefCell::new(Vec::new()),
        };
        let report = session.restore();
        (session, report)
    }

    fn restore(&self) -> LoadReport {
        let mut report = LoadReport::default();
        let loaded = match self.store.load() {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(error = %e, "record store unreadable; starting with no saved images");
                report.store_error = Some(e);
                return report;
            }
        };
        report.skipped = loaded.skipped;

        let mut manager = self.manager.borrow_mut();
        let mut saved = Vec::with_capacity(loaded.records.len());
        let mut seen = HashSet::new();

        for (index, persisted) in loaded.records.into_iter().enumerate() {
            let id = persisted.id.clone();
            let skip = |reason: String| SkippedRecord {
                index,
                id: Some(id.to_string()),
                reason,
            };

            if !seen.insert(id.clone()) {
                report.skipped.push(skip("duplicate id".to_string()));
                continue;
            }

            let (record, payload) = match persisted.into_parts() {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "skipping saved image");
                    report.skipped.push(skip(e.to_string()));
                    continue;
                }
            };

            if let Err(e) = manager.create_or_replace(ResourceKey::Record(id.clone()), &payload) {
                report.skipped.push(skip(e.to_string()));
                continue;
            }
            saved.push(record);
        }

        saved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        report.loaded = saved.len();
        *self.saved.borrow_mut() = saved;
        report
    }

    /// Generate an image and make it the current one.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Generator`] if the remote call fails
    /// - [`SessionError::Alloc`] if no handle could be created; the current
    ///   image is then cleared
    ///
    /// A superseded request returns `Ok(Superseded)` whatever its result.
    pub async fn generate(&self, params: GenerationParams) -> Result<GenerateOutcome, SessionError> {
        let key = ResourceKey::Current;
        let token = self.tokens.borrow_mut().issue(&key);
        tracing::debug!(token = %token, prompt = %params.prompt, "generation started");

        let request = GenerationRequest::new(params);
        let result = self.generator.generate(&request).await;

        if !self.tokens.borrow().is_latest(&key, token) {
            tracing::debug!(token = %token, ok = result.is_ok(), "dropping superseded completion");
            return Ok(GenerateOutcome::Superseded { token });
        }

        let payload = result?;
        let handle = match self.manager.borrow_mut().create_or_replace(key, &payload) {
            Ok(handle) => handle,
            Err(e) => {
                self.current.borrow_mut().take();
                return Err(e.into());
            }
        };

        let metadata = codec::decode(payload.bytes());
        let record = GeneratedImageRecord::new(request.params, metadata);
        *self.current.borrow_mut() = Some(record.clone());
        tracing::debug!(token = %token, id = %record.id, bytes = payload.len(), "generation installed");

        Ok(GenerateOutcome::Installed(GeneratedImage { record, handle }))
    }

    /// The current image, if any.
    pub fn current(&self) -> Option<GeneratedImageRecord> {
        self.current.borrow().clone()
    }

    /// Saved images, newest first.
    pub fn saved(&self) -> Vec<GeneratedImageRecord> {
        self.saved.borrow().clone()
    }

    /// Look up a saved image.
    pub fn find(&self, id: &RecordId) -> Option<GeneratedImageRecord> {
        self.saved.borrow().iter().find(|r| &r.id == id).cloned()
    }

    /// Look up a saved image by id or unique id prefix.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<GeneratedImageRecord> {
        if let Ok(id) = RecordId::parse(prefix) {
            return self.find(&id);
        }
        let prefix = prefix.trim().to_ascii_lowercase().replace('-', "");
        if prefix.is_empty() {
            return None;
        }
        let saved = self.saved.borrow();
        let mut matches = saved
            .iter()
            .filter(|r| r.id.as_uuid().simple().to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(record), None) => Some(record.clone()),
            _ => None,
        }
    }

    /// The live handle for `key`.
    pub fn handle(&self, key: &ResourceKey) -> Option<ResourceHandle> {
        self.manager.borrow().handle(key).cloned()
    }

    /// Resolve the handle for `key` back to its bytes.
    pub fn payload(&self, key: &ResourceKey) -> Option<Payload> {
        self.manager.borrow().resolve(key)
    }

    /// Persist the current image.
    ///
    /// Saving the same image twice is a no-op that returns the same id.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NothingToSave`] without a current image
    /// - [`SessionError::Alloc`] or [`SessionError::Store`] on failure; the
    ///   saved list is then unchanged
    pub fn save_current(&self) -> Result<RecordId, SessionError> {
        let record = self.current().ok_or(SessionError::NothingToSave)?;
        if self.find(&record.id).is_some() {
            return Ok(record.id);
        }

        let payload = self
            .payload(&ResourceKey::Current)
            .ok_or(SessionError::PayloadUnavailable(ResourceKey::Current))?;

        let key = ResourceKey::Record(record.id.clone());
        self.manager.borrow_mut().create_or_replace(key.clone(), &payload)?;

        if let Err(e) = self.store.save(&PersistedRecord::from_parts(&record, &payload)) {
            self.manager.borrow_mut().release(&key);
            return Err(e.into());
        }

        tracing::debug!(id = %record.id, "image saved");
        let id = record.id.clone();
        self.saved.borrow_mut().insert(0, record);
        Ok(id)
    }

    /// Delete a saved image and release its handle.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnknownRecord`] if no saved image has `id`
    /// - [`SessionError::Store`] if the store cannot be updated; nothing is
    ///   changed then
    pub fn delete(&self, id: &RecordId) -> Result<(), SessionError> {
        if self.find(id).is_none() {
            return Err(SessionError::UnknownRecord(id.clone()));
        }

        if !self.store.delete(id)? {
            tracing::debug!(id = %id, "record already absent from store");
        }
        self.manager
            .borrow_mut()
            .release(&ResourceKey::Record(id.clone()));
        self.saved.borrow_mut().retain(|r| &r.id != id);
        tracing::debug!(id = %id, "image deleted");
        Ok(())
    }

    /// Write the image for `key` into `dir`.
    ///
    /// The file is named after the prompt (see [`export_stem`]). Without a
    /// `format` the bytes are written as generated, with an extension from
    /// the content type; otherwise they are converted to `format` first.
    /// Existing files are never overwritten; a numeric suffix is added
    /// instead.
    pub fn export(
        &self,
        key: &ResourceKey,
        dir: &Path,
        format: Option<ExportFormat>,
    ) -> Result<PathBuf, SessionError> {
        let record = match key {
            ResourceKey::Current => self.current(),
            ResourceKey::Record(id) => self.find(id),
        };
        let record = record.ok_or_else(|| match key {
            ResourceKey::Current => SessionError::NothingToSave,
            ResourceKey::Record(id) => SessionError::UnknownRecord(id.clone()),
        })?;
        let payload = self
            .payload(key)
            .ok_or_else(|| SessionError::PayloadUnavailable(key.clone()))?;
        let payload = match format {
            Some(format) => transcode(&payload, format)?,
            None => payload,
        };

        let stem = export_stem(&record.params.prompt);
        let path = unused_path(dir, &stem, payload.extension());
        std::fs::create_dir_all(dir)
            .and_then(|()| std::fs::write(&path, payload.bytes()))
            .map_err(|source| SessionError::Export {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "image exported");
        Ok(path)
    }

    /// Number of live handles.
    pub fn live_handles(&self) -> usize {
        self.manager.borrow().len()
    }

    /// End the session, releasing every handle.
    pub fn close(self) -> ReleaseReport {
        self.manager.borrow_mut().release_all()
    }
}

/// Filename stem for an exported image.
///
/// The first 30 characters of the prompt with every character that is not
/// an ASCII letter or digit replaced by `_`, or `generated_image` for an
/// empty prompt.
///
/// ```
/// use pollen::session::export_stem;
///
/// assert_eq!(export_stem("A cat, in space!"), "A_cat__in_space_");
/// assert_eq!(export_stem(""), "generated_image");
/// ```
pub fn export_stem(prompt: &str) -> String {
    let stem: String = prompt
        .chars()
        .take(EXPORT_NAME_CHARS)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        FALLBACK_EXPORT_STEM.to_string()
    } else {
        stem
    }
}

fn unused_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let first = dir.join(format!("{}.{}", stem, extension));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, extension)))
        .find(|p| !p.exists())
        .unwrap_or(first)
}
