//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., the API base must be an absolute URL and image
//! dimensions must be positive).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::params::{GenerationFlag, Model};

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// interactive = true
///
/// [generator]
/// api_base = "https://image.pollinations.ai"
/// model = "flux"
/// width = 576
/// height = 1024
/// flags = ["nologo"]
/// timeout_secs = 120
///
/// [storage]
/// records = "~/.pollen/images.json"
/// cache_dir = "~/.pollen/cache"
///
/// [secrets]
/// provider = "file"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PollenConfig {
    /// Default interactive mode
    pub interactive: Option<bool>,

    /// Generation defaults
    pub generator: Option<GeneratorConfig>,

    /// Where records and cached images live
    pub storage: Option<StorageConfig>,

    /// Secret storage settings
    pub secrets: Option<SecretsConfig>,
}

impl PollenConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(generator) = &self.generator {
            generator.validate()?;
        }
        if let Some(storage) = &self.storage {
            storage.validate()?;
        }
        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }
        Ok(())
    }
}

/// Generation defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Base URL of the image service
    pub api_base: Option<String>,

    /// Default model
    pub model: Option<Model>,

    /// Default width in pixels
    pub width: Option<u32>,

    /// Default height in pixels
    pub height: Option<u32>,

    /// Flags set on every generation unless overridden
    pub flags: Option<Vec<GenerationFlag>>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl GeneratorConfig {
    /// Validate the generator section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(api_base) = &self.api_base {
            let url = reqwest::Url::parse(api_base).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid generator.api_base '{}': {}", api_base, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidValue(format!(
                    "generator.api_base must be http or https, got '{}'",
                    url.scheme()
                )));
            }
        }
        if self.width == Some(0) {
            return Err(ConfigError::InvalidValue(
                "generator.width must be positive".to_string(),
            ));
        }
        if self.height == Some(0) {
            return Err(ConfigError::InvalidValue(
                "generator.height must be positive".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "generator.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Records file (JSON array)
    pub records: Option<PathBuf>,

    /// Directory for per-session image files
    pub cache_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Validate the storage section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.records.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "storage.records cannot be empty".to_string(),
            ));
        }
        if self.cache_dir.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "storage.cache_dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider to use
    pub provider: Option<String>,
}

impl SecretsConfig {
    /// Valid secret providers.
    pub const VALID_PROVIDERS: &'static [&'static str] = &["file"];

    /// Validate the secrets configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            if !Self::VALID_PROVIDERS.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be one of: {}",
                    provider,
                    Self::VALID_PROVIDERS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pollen_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = PollenConfig::default();
            assert!(config.generator.is_none());
            assert!(config.storage.is_none());
            assert!(config.interactive.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn parses_documented_example() {
            let toml = r#"
                interactive = true

                [generator]
                api_base = "https://image.pollinations.ai"
                model = "turbo"
                width = 576
                height = 1024
                flags = ["nologo", "private"]
                timeout_secs = 120

                [storage]
                records = "~/.pollen/images.json"

                [secrets]
                provider = "file"
            "#;
            let config: PollenConfig = toml::from_str(toml).unwrap();
            let generator = config.generator.as_ref().unwrap();
            assert_eq!(generator.model, Some(Model::Turbo));
            assert_eq!(
                generator.flags,
                Some(vec![GenerationFlag::NoLogo, GenerationFlag::Private])
            );
            assert!(config.validate().is_ok());
        }

        #[test]
        fn roundtrip() {
            let config = PollenConfig {
                interactive: Some(false),
                generator: Some(GeneratorConfig {
                    api_base: Some("http://localhost:9000".into()),
                    model: Some(Model::GptImage),
                    width: Some(1024),
                    height: Some(768),
                    flags: Some(vec![GenerationFlag::Safe]),
                    timeout_secs: Some(30),
                }),
                storage: Some(StorageConfig {
                    records: Some(PathBuf::from("/tmp/images.json")),
                    cache_dir: None,
                }),
                secrets: Some(SecretsConfig {
                    provider: Some("file".to_string()),
                }),
            };

            let toml = toml::to_string_pretty(&config).unwrap();
            let parsed: PollenConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config, parsed);
        }

        #[test]
        fn reject_unknown_fields() {
            let result: Result<PollenConfig, _> = toml::from_str("default_size = \"big\"");
            assert!(result.is_err());

            let result: Result<PollenConfig, _> = toml::from_str("[generator]\nretries = 3");
            assert!(result.is_err());
        }

        #[test]
        fn reject_unknown_model() {
            let result: Result<PollenConfig, _> = toml::from_str("[generator]\nmodel = \"dalle\"");
            assert!(result.is_err());
        }
    }

    mod generator_config {
        use super::*;

        #[test]
        fn invalid_api_base() {
            let config = GeneratorConfig {
                api_base: Some("not a url".into()),
                ..Default::default()
            };
            assert!(config.validate().is_err());

            let config = GeneratorConfig {
                api_base: Some("ftp://example.com".into()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn zero_dimensions_rejected() {
            let config = GeneratorConfig {
                width: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());

            let config = GeneratorConfig {
                height: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn zero_timeout_rejected() {
            let config = GeneratorConfig {
                timeout_secs: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }

    mod secrets_config {
        use super::*;

        #[test]
        fn valid_file_provider() {
            let config = SecretsConfig {
                provider: Some("file".to_string()),
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn invalid_provider() {
            let config = SecretsConfig {
                provider: Some("keychain".to_string()),
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn empty_storage_path_rejected() {
        let config = StorageConfig {
            records: Some(PathBuf::new()),
            cache_dir: None,
        };
        assert!(config.validate().is_err());
    }
}
