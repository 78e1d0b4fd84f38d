//! secrets::traits
//!
//! Secret storage trait definition.
//!
//! # Design
//!
//! The `SecretStore` trait defines a simple key-value interface for secrets.
//! Keys are namespaced (e.g., "pollinations.token") so further services can
//! share the store.
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include secrets in error messages
//! - Be thread-safe (Send + Sync)
//!
//! # Example
//!
//! ```ignore
//! use pollen::secrets::{SecretStore, SecretError, TOKEN_KEY};
//!
//! fn require_token(store: &dyn SecretStore) -> Result<String, SecretError> {
//!     store
//!         .get(TOKEN_KEY)?
//!         .ok_or_else(|| SecretError::NotFound(TOKEN_KEY.into()))
//! }
//! ```

use thiserror::Error;

/// Errors from secret storage operations.
///
/// Messages never include secret values.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Secret not found for the given key.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// Failed to read from secret storage.
    #[error("failed to read secret: {0}")]
    ReadError(String),

    /// Failed to write to secret storage.
    #[error("failed to write secret: {0}")]
    WriteError(String),

    /// Provider not available or not configured.
    #[error("secret provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// Trait for secret storage providers.
pub trait SecretStore: Send + Sync {
    /// Get a secret by key.
    ///
    /// Returns `Ok(None)` if the secret does not exist. The returned value
    /// is the raw secret; do not log or print it.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Set a secret, overwriting any existing value.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Delete a secret.
    ///
    /// Returns whether a value was removed. Deleting a missing key is not
    /// an error.
    fn delete(&self, key: &str) -> Result<bool, SecretError>;

    /// Check if a secret exists.
    fn exists(&self, key: &str) -> Result<bool, SecretError> {
        Ok(self.get(key)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_never_needs_the_value() {
        let err = SecretError::NotFound("pollinations.token".into());
        assert!(err.to_string().contains("pollinations.token"));
        assert!(err.to_string().contains("not found"));

        assert!(SecretError::ReadError("disk".into()).to_string().contains("read"));
        assert!(SecretError::WriteError("disk".into()).to_string().contains("write"));
        assert!(SecretError::ProviderNotAvailable("x".into())
            .to_string()
            .contains("provider"));
    }
}
