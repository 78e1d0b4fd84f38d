//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RecordId`] - Stable identifier of a generated image record
//! - [`ResourceKey`] - Key under which at most one resource handle is live
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`PayloadDigest`] - SHA-256 digest of a payload for integrity checks
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use pollen::core::types::{RecordId, ResourceKey};
//!
//! let id = RecordId::new();
//! let key = ResourceKey::Record(id.clone());
//! assert_ne!(key, ResourceKey::Current);
//!
//! // Parsing validates the textual form
//! assert!(RecordId::parse(&id.to_string()).is_ok());
//! assert!(RecordId::parse("not-an-id").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    #[error("invalid payload digest: {0}")]
    InvalidDigest(String),
}

/// Identifier of a generated image record.
///
/// Assigned by the session when a generation completes and kept for the
/// lifetime of the record, including after it is persisted. The textual
/// form is a hyphenated UUID.
///
/// # Example
///
/// ```
/// use pollen::core::types::RecordId;
///
/// let id = RecordId::parse("6f1c1a52-0d2b-4a43-9c55-0a2f4f3c9e10").unwrap();
/// assert_eq!(id.short(), "6f1c1a52");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh random record id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a record id from its textual form.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRecordId` if the input is not a UUID.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| TypeError::InvalidRecordId(format!("'{}': {}", s, e)))
    }

    /// First eight characters, used for compact listings.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0.to_string()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key under which at most one resource handle may be live.
///
/// `Current` is the sentinel for "the currently displayed result"; every
/// saved record gets its own `Record` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// The most recent generation result.
    Current,
    /// A saved record.
    Record(RecordId),
}

impl ResourceKey {
    /// Get the record id for record keys.
    pub fn record_id(&self) -> Option<&RecordId> {
        match self {
            ResourceKey::Current => None,
            ResourceKey::Record(id) => Some(id),
        }
    }
}

impl From<RecordId> for ResourceKey {
    fn from(id: RecordId) -> Self {
        ResourceKey::Record(id)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKey::Current => write!(f, "current"),
            ResourceKey::Record(id) => write!(f, "record:{}", id),
        }
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use pollen::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// SHA-256 digest of payload bytes, hex encoded.
///
/// Stored next to every persisted payload so that truncated or edited
/// entries are detected at load time.
///
/// # Example
///
/// ```
/// use pollen::core::types::PayloadDigest;
///
/// let a = PayloadDigest::compute(b"image bytes");
/// let b = PayloadDigest::compute(b"image bytes");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayloadDigest(String);

impl PayloadDigest {
    /// Compute the digest of a byte slice.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Parse a digest from 64 lowercase hex characters.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != 64 {
            return Err(TypeError::InvalidDigest(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }
        if !s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(TypeError::InvalidDigest(
                "digest must be lowercase hex".into(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// Check whether `bytes` hash to this digest.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        Self::compute(bytes) == *self
    }

    /// Get the digest as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PayloadDigest {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PayloadDigest> for String {
    fn from(digest: PayloadDigest) -> Self {
        digest.0
    }
}

impl std::fmt::Display for PayloadDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
