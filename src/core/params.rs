//! core::params
//!
//! Typed request parameters for a generation.
//!
//! # Design
//!
//! The parameter set is forwarded opaquely by the core. It is validated by
//! the caller (the CLI) through [`GenerationParams::validate`], never by the
//! session or the generator.
//!
//! Boolean options are modelled as a set of [`GenerationFlag`]s. A flag is
//! sent on the wire only when it is set; "not set" is expressed by omission,
//! never by `false`:
//!
//! | flag      | wire key  | included iff |
//! |-----------|-----------|--------------|
//! | `NoLogo`  | `nologo`  | set          |
//! | `Private` | `private` | set          |
//! | `Enhance` | `enhance` | set          |
//! | `Safe`    | `safe`    | set          |
//!
//! # Example
//!
//! ```
//! use pollen::core::params::{GenerationFlag, GenerationParams, Model};
//!
//! let params = GenerationParams::new("a lighthouse at dusk")
//!     .with_model(Model::Turbo)
//!     .with_seed(42)
//!     .with_flag(GenerationFlag::NoLogo);
//!
//! let pairs = params.query_pairs();
//! assert!(pairs.contains(&("nologo", "true".to_string())));
//! assert!(!pairs.iter().any(|(k, _)| *k == "safe"));
//! ```

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exclusive upper bound for generated seeds.
pub const SEED_UPPER_BOUND: i64 = 1_000_000_000;

/// Default width when neither a size nor a preset is given.
pub const DEFAULT_WIDTH: u32 = 576;

/// Default height when neither a size nor a preset is given.
pub const DEFAULT_HEIGHT: u32 = 1024;

/// Errors from parameter validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("prompt is required")]
    EmptyPrompt,

    #[error("{field} must be a positive integer")]
    NonPositiveDimension {
        /// `width` or `height`
        field: &'static str,
    },

    #[error("unknown model '{0}' (valid: flux, turbo, gptimage)")]
    UnknownModel(String),

    #[error("unknown flag '{0}' (valid: nologo, private, enhance, safe)")]
    UnknownFlag(String),
}

/// Remote model used for a generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// Flux (default)
    #[default]
    Flux,
    /// Turbo
    Turbo,
    /// GPT Image
    #[value(name = "gptimage")]
    GptImage,
}

impl Model {
    /// All models, in display order.
    pub const ALL: [Model; 3] = [Model::Flux, Model::Turbo, Model::GptImage];

    /// Wire name of the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Flux => "flux",
            Model::Turbo => "turbo",
            Model::GptImage => "gptimage",
        }
    }

    /// Human label of the model.
    pub fn label(&self) -> &'static str {
        match self {
            Model::Flux => "Flux",
            Model::Turbo => "Turbo",
            Model::GptImage => "GPT Image",
        }
    }
}

impl std::str::FromStr for Model {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParamsError::UnknownModel(s.to_string()))
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional boolean request flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationFlag {
    /// Remove the provider watermark.
    NoLogo,
    /// Keep the image out of the public feed.
    Private,
    /// Let the provider rewrite the prompt.
    Enhance,
    /// Apply the provider's safety filter.
    Safe,
}

impl GenerationFlag {
    /// All flags, in wire order.
    pub const ALL: [GenerationFlag; 4] = [
        GenerationFlag::NoLogo,
        GenerationFlag::Private,
        GenerationFlag::Enhance,
        GenerationFlag::Safe,
    ];

    /// Query-string key for the flag.
    pub fn wire_key(&self) -> &'static str {
        match self {
            GenerationFlag::NoLogo => "nologo",
            GenerationFlag::Private => "private",
            GenerationFlag::Enhance => "enhance",
            GenerationFlag::Safe => "safe",
        }
    }
}

impl std::str::FromStr for GenerationFlag {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GenerationFlag::ALL
            .into_iter()
            .find(|f| f.wire_key() == s)
            .ok_or_else(|| ParamsError::UnknownFlag(s.to_string()))
    }
}

impl std::fmt::Display for GenerationFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_key())
    }
}

/// Named image sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DimensionPreset {
    /// 512x512
    Square,
    /// 1024x1024
    Hd,
    /// 768x1024
    #[value(name = "portrait3-4")]
    Portrait3x4,
    /// 576x1024
    #[value(name = "portrait9-16")]
    Portrait9x16,
    /// 1024x768
    #[value(name = "landscape4-3")]
    Landscape4x3,
    /// 1024x576
    #[value(name = "landscape16-9")]
    Landscape16x9,
}

impl DimensionPreset {
    /// All presets, in display order.
    pub const ALL: [DimensionPreset; 6] = [
        DimensionPreset::Square,
        DimensionPreset::Hd,
        DimensionPreset::Portrait3x4,
        DimensionPreset::Portrait9x16,
        DimensionPreset::Landscape4x3,
        DimensionPreset::Landscape16x9,
    ];

    /// Width and height of the preset.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            DimensionPreset::Square => (512, 512),
            DimensionPreset::Hd => (1024, 1024),
            DimensionPreset::Portrait3x4 => (768, 1024),
            DimensionPreset::Portrait9x16 => (576, 1024),
            DimensionPreset::Landscape4x3 => (1024, 768),
            DimensionPreset::Landscape16x9 => (1024, 576),
        }
    }

    /// Find the preset matching a size, if any.
    pub fn matching(width: u32, height: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.dimensions() == (width, height))
    }
}

/// Resolve user seed input to a concrete seed.
///
/// Any integer, negative ones included, is kept as given. Absent, blank, or
/// non-integer input is replaced by a fresh pseudo-random integer in
/// `[0, 10^9)`.
///
/// # Example
///
/// ```
/// use pollen::core::params::{resolve_seed, SEED_UPPER_BOUND};
///
/// assert_eq!(resolve_seed(Some("1234")), 1234);
/// assert_eq!(resolve_seed(Some("-5")), -5);
/// assert!(resolve_seed(Some("abc")) < SEED_UPPER_BOUND);
/// assert!(resolve_seed(None) < SEED_UPPER_BOUND);
/// ```
pub fn resolve_seed(input: Option<&str>) -> i64 {
    match input.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
        Some(seed) => seed,
        None => random_seed(),
    }
}

/// Draw a fresh seed in `[0, 10^9)`.
pub fn random_seed() -> i64 {
    rand::rng().random_range(0..SEED_UPPER_BOUND)
}

/// The exact parameter set used to produce an image.
///
/// Persisted verbatim with every saved record so the generation can be
/// repeated or imported later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Text prompt.
    pub prompt: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Seed sent to the model.
    pub seed: i64,
    /// Model name.
    #[serde(default)]
    pub model: Model,
    /// Set flags; absent flags are not set.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<GenerationFlag>,
}

impl GenerationParams {
    /// Parameters with defaults for everything but the prompt.
    ///
    /// The seed is drawn randomly.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: random_seed(),
            model: Model::default(),
            flags: BTreeSet::new(),
        }
    }

    /// Set the image size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the size from a preset.
    pub fn with_preset(self, preset: DimensionPreset) -> Self {
        let (width, height) = preset.dimensions();
        self.with_size(width, height)
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Set a flag.
    pub fn with_flag(mut self, flag: GenerationFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    /// Check whether a flag is set.
    pub fn has_flag(&self, flag: GenerationFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// - [`ParamsError::EmptyPrompt`] if the prompt is blank
    /// - [`ParamsError::NonPositiveDimension`] if width or height is zero
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.prompt.trim().is_empty() {
            return Err(ParamsError::EmptyPrompt);
        }
        if self.width == 0 {
            return Err(ParamsError::NonPositiveDimension { field: "width" });
        }
        if self.height == 0 {
            return Err(ParamsError::NonPositiveDimension { field: "height" });
        }
        Ok(())
    }

    /// Query parameters for the outbound request.
    ///
    /// Always contains `width`, `height`, `model`, and `seed`. Each flag
    /// appears as `<key>=true` only when set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("width", self.width.to_string()),
            ("height", self.height.to_string()),
            ("model", self.model.as_str().to_string()),
            ("seed", self.seed.to_string()),
        ];
        for flag in GenerationFlag::ALL {
            if self.has_flag(flag) {
                pairs.push((flag.wire_key(), "true".to_string()));
            }
        }
        pairs
    }
}
