//! secrets::file_store
//!
//! File-based secret storage.
//!
//! # Security
//!
//! - Secrets are stored in `~/.pollen/secrets.toml`
//! - File permissions are set to 0600 on Unix before any content is written
//! - All writes are atomic (write to temp file, then rename)
//! - Secrets are NEVER logged, printed, or included in error messages

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::traits::{SecretError, SecretStore};
use crate::core::paths::PollenPaths;

/// TOML file of `key = "value"` pairs.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    /// Path to the secrets file
    path: PathBuf,
}

impl FileSecretStore {
    /// Store at `~/.pollen/secrets.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, SecretError> {
        let paths = PollenPaths::from_home()
            .ok_or_else(|| SecretError::ReadError("cannot determine home directory".into()))?;
        Ok(Self {
            path: paths.secrets_path(),
        })
    }

    /// Store at a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the secrets file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_secrets(&self) -> Result<BTreeMap<String, String>, SecretError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read secrets file: {}", e)))?;

        // toml messages quote the offending line, which may hold a secret
        toml::from_str(&content).map_err(|_| {
            SecretError::ReadError(format!(
                "cannot parse secrets file {}",
                self.path.display()
            ))
        })
    }

    fn write_secrets(&self, secrets: &BTreeMap<String, String>) -> Result<(), SecretError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(secrets)
            .map_err(|_| SecretError::WriteError("cannot serialize secrets".into()))?;

        let temp_path = self.path.with_extension("toml.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;

            #[cfg(unix)]
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| SecretError::WriteError(format!("cannot set permissions: {}", e)))?;

            file.write_all(content.as_bytes())
                .map_err(|e| SecretError::WriteError(format!("cannot write secrets: {}", e)))?;
            file.sync_all()
                .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| SecretError::WriteError(format!("cannot rename temp file: {}", e)))?;

        Ok(())
    }

    /// True if the file is missing or readable by its owner only.
    #[cfg(unix)]
    pub fn verify_permissions(&self) -> Result<bool, SecretError> {
        if !self.path.exists() {
            return Ok(true);
        }
        let metadata = fs::metadata(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read file metadata: {}", e)))?;
        Ok(metadata.permissions().mode() & 0o777 == 0o600)
    }

    /// Always true off Unix.
    #[cfg(not(unix))]
    pub fn verify_permissions(&self) -> Result<bool, SecretError> {
        Ok(true)
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.read_secrets()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.read_secrets()?;
        secrets.insert(key.to_string(), value.to_string());
        self.write_secrets(&secrets)?;
        tracing::debug!(key, "secret stored");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, SecretError> {
        let mut secrets = self.read_secrets()?;
        if secrets.remove(key).is_none() {
            return Ok(false);
        }
        self.write_secrets(&secrets)?;
        tracing::debug!(key, "secret deleted");
        Ok(true)
    }
}
