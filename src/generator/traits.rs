//! generator::traits
//!
//! Image generator trait definition.
//!
//! # Design
//!
//! The `ImageGenerator` trait is async because generation is a network
//! round trip. One call produces one payload; implementations never retry.
//! A failed generation leaves no trace in the session.
//!
//! # Example
//!
//! ```ignore
//! use pollen::core::params::GenerationParams;
//! use pollen::generator::{GenerationRequest, ImageGenerator};
//!
//! async fn fetch(generator: &dyn ImageGenerator) -> Result<(), GeneratorError> {
//!     let request = GenerationRequest::new(GenerationParams::new("a red fox"));
//!     let payload = generator.generate(&request).await?;
//!     println!("received {} bytes of {}", payload.len(), payload.content_type());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::params::GenerationParams;
use crate::core::record::Payload;

/// Errors from image generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    /// The service rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Too many requests.
    #[error("rate limited")]
    RateLimited,

    /// The service returned an error status.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the service
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service answered with something that is not an image.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Parameters sent to the model. Must already be validated.
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Wrap validated parameters.
    pub fn new(params: GenerationParams) -> Self {
        Self { params }
    }
}

impl From<GenerationParams> for GenerationRequest {
    fn from(params: GenerationParams) -> Self {
        Self::new(params)
    }
}

/// A remote image generator.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError`] on transport failure or a non-success
    /// response.
    async fn generate(&self, request: &GenerationRequest) -> Result<Payload, GeneratorError>;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}
