//! core::paths
//!
//! Centralized path routing for pollen storage locations.
//!
//! # Storage Layout
//!
//! All pollen data lives under one root, `~/.pollen/` by default:
//! - `config.toml` - Global configuration (canonical write location)
//! - `secrets.toml` - API token storage (0600)
//! - `images.json` - Saved image records
//! - `images.json.lock` - Exclusive lock for the record store
//! - `cache/` - Per-session directories holding displayable image files
//!
//! The records file and cache directory can be moved through the
//! `[storage]` config section; everything else stays under the root.
//!
//! # Example
//!
//! ```
//! use pollen::core::paths::PollenPaths;
//! use std::path::PathBuf;
//!
//! let paths = PollenPaths::new(PathBuf::from("/home/me/.pollen"));
//!
//! assert_eq!(
//!     paths.records_path(),
//!     PathBuf::from("/home/me/.pollen/images.json")
//! );
//! ```

use std::path::{Path, PathBuf};

/// Name of the storage root under the home directory.
pub const ROOT_DIR_NAME: &str = ".pollen";

/// Centralized path routing for pollen storage.
///
/// No code outside this module should compute `*.join(".pollen")` paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollenPaths {
    root: PathBuf,
}

impl PollenPaths {
    /// Route paths under an explicit root.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Route paths under `~/.pollen`.
    ///
    /// Returns `None` if the home directory cannot be determined.
    pub fn from_home() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(ROOT_DIR_NAME)))
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Global config file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Secret store file.
    pub fn secrets_path(&self) -> PathBuf {
        self.root.join("secrets.toml")
    }

    /// Default records file.
    pub fn records_path(&self) -> PathBuf {
        self.root.join("images.json")
    }

    /// Default cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Ensure the root directory exists.
    pub fn ensure_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}

/// Expand a leading `~/` to the home directory.
///
/// Paths without the prefix, and all paths when the home directory is
/// unknown, are returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_root() {
        let paths = PollenPaths::new(PathBuf::from("/data/pollen"));
        assert_eq!(paths.root(), Path::new("/data/pollen"));
        assert_eq!(paths.config_path(), PathBuf::from("/data/pollen/config.toml"));
        assert_eq!(paths.secrets_path(), PathBuf::from("/data/pollen/secrets.toml"));
        assert_eq!(paths.records_path(), PathBuf::from("/data/pollen/images.json"));
        assert_eq!(paths.cache_dir(), PathBuf::from("/data/pollen/cache"));
    }

    #[test]
    fn from_home_uses_dot_pollen() {
        if let Some(paths) = PollenPaths::from_home() {
            assert!(paths.root().ends_with(ROOT_DIR_NAME));
        }
    }

    #[test]
    fn ensure_root_creates_directory() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let paths = PollenPaths::new(temp.path().join("nested/root"));
        paths.ensure_root().expect("ensure root");
        assert!(paths.root().is_dir());
    }

    #[test]
    fn tilde_expansion() {
        assert_eq!(expand_tilde(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde(Path::new("rel/path")), PathBuf::from("rel/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/x.json")), home.join("x.json"));
        }
    }

    #[test]
    fn tilde_only_at_start() {
        assert_eq!(expand_tilde(Path::new("a/~/b")), PathBuf::from("a/~/b"));
        assert_eq!(expand_tilde(Path::new("~user/b")), PathBuf::from("~user/b"));
    }
}
