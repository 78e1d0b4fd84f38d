//! core::record
//!
//! Payload and record shapes.
//!
//! # Types
//!
//! - [`Payload`] - Immutable image bytes plus content type
//! - [`GeneratedImageRecord`] - What a generation produced, minus the bytes
//! - [`PersistedRecord`] - What the record store keeps for a saved image
//!
//! # Persistence rule
//!
//! The display handle of an image is never persisted. A persisted record
//! carries the payload itself (base64) and a digest; the handle is
//! re-derived at load time by handing the decoded bytes back to the
//! resource lifecycle manager.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::codec::EmbeddedMetadata;
use super::params::GenerationParams;
use super::types::{PayloadDigest, RecordId, UtcTimestamp};

/// Content type assumed when the generator does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Errors turning a persisted record back into bytes.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("payload digest mismatch for record {id}")]
    DigestMismatch {
        /// The record whose bytes did not match.
        id: RecordId,
    },
}

/// Immutable bytes of one generated image.
///
/// Cloning is cheap; the bytes are shared and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Arc<[u8]>,
    content_type: String,
}

impl Payload {
    /// Wrap bytes with a content type.
    pub fn new(bytes: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Wrap bytes as the default content type.
    pub fn jpeg(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(bytes, DEFAULT_CONTENT_TYPE)
    }

    /// Borrow the bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The MIME type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if there are no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension for the content type.
    pub fn extension(&self) -> &'static str {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        match mime {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpeg",
        }
    }
}

/// A generated image as the session tracks it.
///
/// Does not carry the payload or the handle; both are looked up by
/// [`RecordId`] through the resource lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImageRecord {
    /// Stable identifier.
    pub id: RecordId,
    /// The exact parameters used to produce the image.
    pub params: GenerationParams,
    /// Metadata embedded by the model, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EmbeddedMetadata>,
    /// When the image was generated.
    pub created_at: UtcTimestamp,
}

impl GeneratedImageRecord {
    /// Create a record for a fresh generation.
    pub fn new(params: GenerationParams, metadata: Option<EmbeddedMetadata>) -> Self {
        Self {
            id: RecordId::new(),
            params,
            metadata,
            created_at: UtcTimestamp::now(),
        }
    }
}

/// Durable form of a saved image.
///
/// One entry per saved image in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedRecord {
    /// Stable identifier.
    pub id: RecordId,
    /// The exact parameters used to produce the image.
    pub params: GenerationParams,
    /// Metadata embedded by the model, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EmbeddedMetadata>,
    /// When the image was generated.
    pub created_at: UtcTimestamp,
    /// MIME type of the payload.
    pub content_type: String,
    /// Payload bytes, standard base64.
    pub payload: String,
    /// SHA-256 of the payload bytes.
    pub sha256: PayloadDigest,
}

impl PersistedRecord {
    /// Build the durable form of a record and its payload.
    pub fn from_parts(record: &GeneratedImageRecord, payload: &Payload) -> Self {
        Self {
            id: record.id.clone(),
            params: record.params.clone(),
            metadata: record.metadata.clone(),
            created_at: record.created_at.clone(),
            content_type: payload.content_type().to_string(),
            payload: BASE64_STANDARD.encode(payload.bytes()),
            sha256: PayloadDigest::compute(payload.bytes()),
        }
    }

    /// Split into the in-memory record and its payload.
    ///
    /// # Errors
    ///
    /// - [`RecordError::InvalidBase64`] if the payload text does not decode
    /// - [`RecordError::DigestMismatch`] if the decoded bytes do not match
    ///   the stored digest
    pub fn into_parts(self) -> Result<(GeneratedImageRecord, Payload), RecordError> {
        let bytes = BASE64_STANDARD.decode(self.payload.as_bytes())?;
        if !self.sha256.matches(&bytes) {
            return Err(RecordError::DigestMismatch { id: self.id });
        }
        let record = GeneratedImageRecord {
            id: self.id,
            params: self.params,
            metadata: self.metadata,
            created_at: self.created_at,
        };
        Ok((record, Payload::new(bytes, self.content_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::GenerationFlag;

    fn sample() -> (GeneratedImageRecord, Payload) {
        let params = GenerationParams::new("harbor at night")
            .with_seed(11)
            .with_flag(GenerationFlag::NoLogo);
        let metadata: EmbeddedMetadata =
            serde_json::from_str(r#"{"seed":11,"model":"flux"}"#).unwrap();
        let record = GeneratedImageRecord::new(params, Some(metadata));
        let payload = Payload::new(vec![0xFFu8, 0xD8, 0x00, 0x06, 0xFF, 0xD9], "image/jpeg");
        (record, payload)
    }

    #[test]
    fn persisted_round_trip() {
        let (record, payload) = sample();
        let persisted = PersistedRecord::from_parts(&record, &payload);
        let json = serde_json::to_string(&persisted).unwrap();
        let loaded: PersistedRecord = serde_json::from_str(&json).unwrap();
        let (back, bytes) = loaded.into_parts().unwrap();
        assert_eq!(back, record);
        assert_eq!(bytes, payload);
    }

    #[test]
    fn persisted_shape_has_no_handle() {
        let (record, payload) = sample();
        let value = serde_json::to_value(PersistedRecord::from_parts(&record, &payload)).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert!(!keys.iter().any(|k| k.contains("url") || k.contains("handle")));
        assert!(keys.contains(&"payload".to_string()));
    }

    #[test]
    fn bad_base64_rejected() {
        let (record, payload) = sample();
        let mut persisted = PersistedRecord::from_parts(&record, &payload);
        persisted.payload = "%%%not base64%%%".into();
        assert!(matches!(
            persisted.into_parts(),
            Err(RecordError::InvalidBase64(_))
        ));
    }

    #[test]
    fn digest_mismatch_rejected() {
        let (record, payload) = sample();
        let mut persisted = PersistedRecord::from_parts(&record, &payload);
        persisted.payload = BASE64_STANDARD.encode(b"other bytes");
        assert!(matches!(
            persisted.into_parts(),
            Err(RecordError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn record_without_metadata_omits_field() {
        let record = GeneratedImageRecord::new(GenerationParams::new("x"), None);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn extension_from_content_type() {
        assert_eq!(Payload::new(Vec::<u8>::new(), "image/png").extension(), "png");
        assert_eq!(
            Payload::new(Vec::<u8>::new(), "image/webp; charset=binary").extension(),
            "webp"
        );
        assert_eq!(Payload::new(Vec::<u8>::new(), "application/octet-stream").extension(), "jpeg");
        assert_eq!(Payload::jpeg(vec![1u8]).extension(), "jpeg");
    }
}
