//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. The `--config` path if given
//! 2. `$POLLEN_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/pollen/config.toml`
//! 4. `~/.pollen/config.toml` (canonical write location)
//!
//! An explicit `--config` path that does not exist yet is not an error: the
//! defaults are used and the path becomes the write target.
//!
//! # Example
//!
//! ```no_run
//! use pollen::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//!
//! println!("Model: {}", config.model());
//! println!("Records: {}", config.records_path().unwrap().display());
//! ```

pub mod schema;

pub use schema::{GeneratorConfig, PollenConfig, SecretsConfig, StorageConfig};

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::params::{GenerationFlag, Model, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::core::paths::{expand_tilde, PollenPaths};
use crate::generator::pollinations::{DEFAULT_API_BASE, DEFAULT_TIMEOUT};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "POLLEN_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Loaded configuration.
///
/// Accessor methods apply defaults for anything left unset.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: PollenConfig,
    /// Path the config was loaded from
    loaded_from: Option<PathBuf>,
    /// Path writes go to
    write_path: Option<PathBuf>,
}

impl Config {
    /// Every settable key, in listing order.
    pub const KEYS: &'static [&'static str] = &[
        "interactive",
        "generator.api_base",
        "generator.model",
        "generator.width",
        "generator.height",
        "generator.flags",
        "generator.timeout_secs",
        "storage.records",
        "storage.cache_dir",
        "secrets.provider",
    ];

    /// Wrap an already-parsed config.
    pub fn from_global(global: PollenConfig) -> Self {
        Self {
            global,
            loaded_from: None,
            write_path: None,
        }
    }

    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated. Missing config files are not an error.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        if let Some(path) = explicit {
            let global = if path.exists() {
                Self::read_config(path)?
            } else {
                PollenConfig::default()
            };
            global.validate()?;
            let loaded_from = path.exists().then(|| path.to_path_buf());
            return Ok(ConfigLoadResult {
                config: Config {
                    global,
                    loaded_from,
                    write_path: Some(path.to_path_buf()),
                },
                warnings,
            });
        }

        let (global, loaded_from) = Self::load_global(&mut warnings)?;
        global.validate()?;

        Ok(ConfigLoadResult {
            config: Config {
                global,
                write_path: loaded_from.clone(),
                loaded_from,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global(
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(PollenConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $POLLEN_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
            warnings.push(ConfigWarning {
                message: format!("${} points to a missing file; ignoring it", CONFIG_ENV_VAR),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/pollen/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("pollen/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.pollen/config.toml
        if let Some(paths) = PollenPaths::from_home() {
            let path = paths.config_path();
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // No config found, use defaults
        Ok((PollenConfig::default(), None))
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<PollenConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.pollen/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        PollenPaths::from_home()
            .map(|p| p.config_path())
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Where [`Config::save`] writes.
    ///
    /// The loaded file, the explicit `--config` path, or the canonical path.
    pub fn write_target(&self) -> Result<PathBuf, ConfigError> {
        match &self.write_path {
            Some(path) => Ok(path.clone()),
            None => Self::global_config_path(),
        }
    }

    /// Validate and write this config to its write target.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        self.global.validate()?;
        let path = self.write_target()?;
        Self::write_config_atomic(&path, &self.global)?;
        Ok(path)
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed. Writes to a temp file, then
    /// renames it over the target.
    pub fn write_config_atomic(path: &Path, config: &PollenConfig) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    fn generator(&self) -> Option<&GeneratorConfig> {
        self.global.generator.as_ref()
    }

    fn storage(&self) -> Option<&StorageConfig> {
        self.global.storage.as_ref()
    }

    /// Check if interactive mode is enabled by default.
    ///
    /// Defaults to `true` if not configured.
    pub fn interactive(&self) -> bool {
        self.global.interactive.unwrap_or(true)
    }

    /// Base URL of the image service.
    pub fn api_base(&self) -> &str {
        self.generator()
            .and_then(|g| g.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE)
    }

    /// Default model.
    pub fn model(&self) -> Model {
        self.generator().and_then(|g| g.model).unwrap_or_default()
    }

    /// Default width.
    pub fn width(&self) -> u32 {
        self.generator().and_then(|g| g.width).unwrap_or(DEFAULT_WIDTH)
    }

    /// Default height.
    pub fn height(&self) -> u32 {
        self.generator().and_then(|g| g.height).unwrap_or(DEFAULT_HEIGHT)
    }

    /// Flags set on every generation by default.
    pub fn default_flags(&self) -> BTreeSet<GenerationFlag> {
        self.generator()
            .and_then(|g| g.flags.as_ref())
            .map(|flags| flags.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.generator()
            .and_then(|g| g.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Records file, with `~` expanded.
    pub fn records_path(&self) -> Result<PathBuf, ConfigError> {
        match self.storage().and_then(|s| s.records.as_deref()) {
            Some(path) => Ok(expand_tilde(path)),
            None => PollenPaths::from_home()
                .map(|p| p.records_path())
                .ok_or(ConfigError::NoHomeDir),
        }
    }

    /// Cache directory, with `~` expanded.
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match self.storage().and_then(|s| s.cache_dir.as_deref()) {
            Some(path) => Ok(expand_tilde(path)),
            None => PollenPaths::from_home()
                .map(|p| p.cache_dir())
                .ok_or(ConfigError::NoHomeDir),
        }
    }

    /// Get the secrets provider.
    ///
    /// Defaults to "file" if not configured.
    pub fn secrets_provider(&self) -> &str {
        self.global
            .secrets
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or("file")
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    // =========================================================================
    // Key access for `pollen config`
    // =========================================================================

    /// The explicitly configured value of `key`, if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] for keys not in [`Config::KEYS`].
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let g = self.generator();
        let s = self.storage();
        let value = match key {
            "interactive" => self.global.interactive.map(|v| v.to_string()),
            "generator.api_base" => g.and_then(|g| g.api_base.clone()),
            "generator.model" => g.and_then(|g| g.model).map(|m| m.to_string()),
            "generator.width" => g.and_then(|g| g.width).map(|v| v.to_string()),
            "generator.height" => g.and_then(|g| g.height).map(|v| v.to_string()),
            "generator.flags" => g.and_then(|g| g.flags.as_ref()).map(|flags| {
                flags
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            }),
            "generator.timeout_secs" => g.and_then(|g| g.timeout_secs).map(|v| v.to_string()),
            "storage.records" => s
                .and_then(|s| s.records.as_ref())
                .map(|p| p.display().to_string()),
            "storage.cache_dir" => s
                .and_then(|s| s.cache_dir.as_ref())
                .map(|p| p.display().to_string()),
            "secrets.provider" => self.global.secrets.as_ref().and_then(|s| s.provider.clone()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// The effective value of `key`, defaults applied.
    pub fn effective(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "interactive" => self.interactive().to_string(),
            "generator.api_base" => self.api_base().to_string(),
            "generator.model" => self.model().to_string(),
            "generator.width" => self.width().to_string(),
            "generator.height" => self.height().to_string(),
            "generator.flags" => self
                .default_flags()
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(","),
            "generator.timeout_secs" => self.timeout().as_secs().to_string(),
            "storage.records" => self.records_path()?.display().to_string(),
            "storage.cache_dir" => self.cache_dir()?.display().to_string(),
            "secrets.provider" => self.secrets_provider().to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set `key` from its textual form.
    ///
    /// The value is parsed and the resulting config validated; on error the
    /// config is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.global.clone();
        let invalid = |what: &str| ConfigError::InvalidValue(format!("{} for {}: '{}'", what, key, value));

        match key {
            "interactive" => {
                next.interactive = Some(value.parse().map_err(|_| invalid("expected true or false"))?)
            }
            "generator.api_base" => generator_mut(&mut next).api_base = Some(value.to_string()),
            "generator.model" => {
                generator_mut(&mut next).model =
                    Some(value.parse().map_err(|_| invalid("unknown model"))?)
            }
            "generator.width" => {
                generator_mut(&mut next).width =
                    Some(value.parse().map_err(|_| invalid("expected a number"))?)
            }
            "generator.height" => {
                generator_mut(&mut next).height =
                    Some(value.parse().map_err(|_| invalid("expected a number"))?)
            }
            "generator.flags" => {
                let flags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse::<GenerationFlag>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| invalid("unknown flag"))?;
                generator_mut(&mut next).flags = Some(flags);
            }
            "generator.timeout_secs" => {
                generator_mut(&mut next).timeout_secs =
                    Some(value.parse().map_err(|_| invalid("expected a number"))?)
            }
            "storage.records" => storage_mut(&mut next).records = Some(PathBuf::from(value)),
            "storage.cache_dir" => storage_mut(&mut next).cache_dir = Some(PathBuf::from(value)),
            "secrets.provider" => {
                next.secrets
                    .get_or_insert_with(SecretsConfig::default)
                    .provider = Some(value.to_string())
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        next.validate()?;
        self.global = next;
        Ok(())
    }
}

fn generator_mut(config: &mut PollenConfig) -> &mut GeneratorConfig {
    config.generator.get_or_insert_with(GeneratorConfig::default)
}

fn storage_mut(config: &mut PollenConfig) -> &mut StorageConfig {
    config.storage.get_or_insert_with(StorageConfig::default)
}
