//! secrets
//!
//! Storage for the image service API token.
//!
//! # Architecture
//!
//! Secrets are stored through the `SecretStore` trait. The only provider is
//! [`FileSecretStore`], a TOML file at `~/.pollen/secrets.toml`.
//!
//! # Token Resolution
//!
//! [`resolve_token`] picks the token used for requests:
//! 1. `$POLLINATIONS_API_TOKEN` if set and non-empty
//! 2. The stored secret [`TOKEN_KEY`]
//! 3. No token (anonymous requests)
//!
//! # Security
//!
//! - Secrets are **never** logged or included in error messages
//! - File store uses 0600 permissions on Unix (owner read/write only)
//! - All writes are atomic (temp file + rename)
//!
//! # Example
//!
//! ```ignore
//! use pollen::secrets::{create_store, resolve_token, TOKEN_KEY};
//!
//! let store = create_store("file")?;
//! store.set(TOKEN_KEY, "sk_xxxx...")?;
//!
//! let token = resolve_token(store.as_ref())?;
//! ```

mod file_store;
mod traits;

pub use file_store::FileSecretStore;
pub use traits::{SecretError, SecretStore};

use crate::generator::pollinations::TOKEN_ENV_VAR;

/// Secret key of the image service token.
pub const TOKEN_KEY: &str = "pollinations.token";

/// The default secret store provider name.
pub const DEFAULT_PROVIDER: &str = "file";

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `$POLLINATIONS_API_TOKEN`
    Environment,
    /// The secret store
    Store,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Environment => write!(f, "${}", TOKEN_ENV_VAR),
            TokenSource::Store => write!(f, "secret store"),
        }
    }
}

/// Create a secret store based on the provider name.
///
/// # Errors
///
/// - Unknown provider name
/// - Initialization errors from the store
pub fn create_store(provider: &str) -> Result<Box<dyn SecretStore>, SecretError> {
    match provider {
        "file" => Ok(Box::new(FileSecretStore::new()?)),
        other => Err(SecretError::ProviderNotAvailable(format!(
            "unknown secret provider: '{}' (valid: file)",
            other
        ))),
    }
}

/// Resolve the API token from the environment or the store.
///
/// Returns `None` when neither has a token.
pub fn resolve_token(
    store: &dyn SecretStore,
) -> Result<Option<(String, TokenSource)>, SecretError> {
    resolve_token_with(std::env::var(TOKEN_ENV_VAR).ok(), store)
}

/// [`resolve_token`] with the environment value passed in.
pub fn resolve_token_with(
    env_value: Option<String>,
    store: &dyn SecretStore,
) -> Result<Option<(String, TokenSource)>, SecretError> {
    if let Some(token) = env_value.filter(|t| !t.trim().is_empty()) {
        return Ok(Some((token.trim().to_string(), TokenSource::Environment)));
    }
    Ok(store
        .get(TOKEN_KEY)?
        .filter(|t| !t.trim().is_empty())
        .map(|t| (t, TokenSource::Store)))
}
