//! core::codec
//!
//! Decoder for the metadata block the generator embeds in image payloads.
//!
//! # Format
//!
//! The generator appends a text record somewhere inside the image bytes.
//! There is no length prefix and no alignment guarantee:
//!
//! ```text
//! ...image bytes... | flux\0\0ASCII\0\0\0 | {"seed":42,...} | 0x06 or 0x00 | ...
//!                     start marker (14 B)   JSON object       terminator
//! ```
//!
//! Decoding scans for the first start marker, then for the first byte equal
//! to either terminator. The bytes strictly between the two are strict UTF-8
//! JSON text that must parse to an object.
//!
//! # Failure policy
//!
//! Metadata is an enrichment. [`decode`] never fails: every problem maps to
//! `None` and is reported on the `tracing` debug/warn path. Callers that need
//! to know *why* a payload has no metadata use [`try_decode`].
//!
//! # Example
//!
//! ```
//! use pollen::core::codec::{decode, START_MARKER};
//!
//! let mut payload = vec![0xFF, 0xFE];
//! payload.extend_from_slice(&START_MARKER);
//! payload.extend_from_slice(br#"{"seed":42}"#);
//! payload.push(0x06);
//! payload.extend_from_slice(b"trailing image data");
//!
//! let metadata = decode(&payload).unwrap();
//! assert_eq!(metadata.get("seed"), Some(&serde_json::json!(42)));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Byte sequence that opens the metadata block: `flux\0\0ASCII\0\0\0`.
pub const START_MARKER: [u8; 14] = [
    0x66, 0x6c, 0x75, 0x78, 0x00, 0x00, 0x41, 0x53, 0x43, 0x49, 0x49, 0x00, 0x00, 0x00,
];

/// Bytes that close the metadata text: ACK or NUL, whichever comes first.
pub const TERMINATORS: [u8; 2] = [0x06, 0x00];

/// Reasons a payload yields no metadata.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload does not contain the start marker.
    #[error("metadata start marker not found")]
    MarkerNotFound,

    /// The marker was found but no terminator follows it.
    #[error("no terminator after metadata marker at offset {marker_at}")]
    TerminatorNotFound {
        /// Offset of the start marker in the payload.
        marker_at: usize,
    },

    /// The metadata region is not valid UTF-8.
    #[error("metadata region is not valid UTF-8 (byte {valid_up_to} of region)")]
    InvalidUtf8 {
        /// Length of the valid prefix of the region.
        valid_up_to: usize,
    },

    /// The metadata text is not valid JSON.
    #[error("metadata is not valid JSON: {message}")]
    InvalidJson {
        /// Parser message.
        message: String,
        /// The text that failed to parse.
        raw: String,
    },

    /// The metadata text is JSON, but not an object.
    #[error("metadata is JSON but not an object")]
    NotAnObject {
        /// The text that parsed to a non-object value.
        raw: String,
    },
}

/// Structured metadata decoded from a payload.
///
/// A JSON object with string keys. Serializes transparently as that object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddedMetadata(Map<String, Value>);

impl EmbeddedMetadata {
    /// Wrap an existing JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the underlying object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Locate the metadata text region.
///
/// Returns the byte range strictly between the end of the first start
/// marker and the first terminator that follows it.
pub fn locate(payload: &[u8]) -> Result<std::ops::Range<usize>, DecodeError> {
    let marker_at = find_subslice(payload, &START_MARKER).ok_or(DecodeError::MarkerNotFound)?;
    let start = marker_at + START_MARKER.len();

    let len = payload[start..]
        .iter()
        .position(|b| TERMINATORS.contains(b))
        .ok_or(DecodeError::TerminatorNotFound { marker_at })?;

    Ok(start..start + len)
}

/// Decode embedded metadata, reporting why it is missing.
///
/// # Errors
///
/// Returns the first [`DecodeError`] hit while scanning, decoding, or
/// parsing. Never panics, whatever the input.
pub fn try_decode(payload: &[u8]) -> Result<EmbeddedMetadata, DecodeError> {
    let region = locate(payload)?;

    let text = std::str::from_utf8(&payload[region]).map_err(|e| DecodeError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(EmbeddedMetadata(map)),
        Ok(_) => Err(DecodeError::NotAnObject {
            raw: text.to_string(),
        }),
        Err(e) => Err(DecodeError::InvalidJson {
            message: e.to_string(),
            raw: text.to_string(),
        }),
    }
}

/// Decode embedded metadata.
///
/// Returns `None` whenever the payload carries no usable metadata block.
/// The reason is logged for diagnostics and never surfaced as an error.
pub fn decode(payload: &[u8]) -> Option<EmbeddedMetadata> {
    match try_decode(payload) {
        Ok(metadata) => {
            tracing::debug!(fields = metadata.len(), "decoded embedded metadata");
            Some(metadata)
        }
        Err(DecodeError::MarkerNotFound) => {
            tracing::debug!("payload carries no metadata marker");
            None
        }
        Err(DecodeError::InvalidJson { message, raw }) => {
            tracing::warn!(error = %message, "embedded metadata is not valid JSON");
            tracing::debug!(raw = %raw, "unparsed metadata text");
            None
        }
        Err(DecodeError::NotAnObject { raw }) => {
            tracing::warn!("embedded metadata is not a JSON object");
            tracing::debug!(raw = %raw, "unparsed metadata text");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "embedded metadata unreadable");
            None
        }
    }
}
