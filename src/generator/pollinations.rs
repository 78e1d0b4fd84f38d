//! generator::pollinations
//!
//! HTTP client for the Pollinations image endpoint.
//!
//! # Wire format
//!
//! ```text
//! GET {api_base}/prompt/{percent-encoded prompt}?width=W&height=H&model=M&seed=S[&nologo=true...]
//! Authorization: Bearer <token>      (only when a token is configured)
//! ```
//!
//! The response body is the image. Its `Content-Type` header is kept with
//! the payload; a missing header means `image/jpeg`.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pollen::generator::{GenerationRequest, ImageGenerator, PollinationsGenerator};
//!
//! let generator = PollinationsGenerator::new(
//!     "https://image.pollinations.ai",
//!     std::env::var("POLLINATIONS_API_TOKEN").ok(),
//!     Duration::from_secs(120),
//! )?;
//! let payload = generator.generate(&request).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};

use super::traits::{GenerationRequest, GeneratorError, ImageGenerator};
use crate::core::params::GenerationParams;
use crate::core::record::{Payload, DEFAULT_CONTENT_TYPE};

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://image.pollinations.ai";

/// Environment variable holding the API token.
pub const TOKEN_ENV_VAR: &str = "POLLINATIONS_API_TOKEN";

/// Default request timeout. Large models can take a while.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("pollen/", env!("CARGO_PKG_VERSION"));

/// Longest error body echoed into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Pollinations generator.
pub struct PollinationsGenerator {
    /// HTTP client for making requests
    client: Client,
    /// API base URL
    api_base: String,
    /// Optional bearer token
    token: Option<String>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for PollinationsGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollinationsGenerator")
            .field("api_base", &self.api_base)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl PollinationsGenerator {
    /// Create a generator.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::InvalidRequest`] if the base URL does not
    /// parse, or [`GeneratorError::NetworkError`] if the HTTP client cannot
    /// be built.
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GeneratorError> {
        let api_base = api_base.into();
        Url::parse(&api_base)
            .map_err(|e| GeneratorError::InvalidRequest(format!("bad API base '{}': {}", api_base, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            api_base,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// The API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// True if requests carry a bearer token.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Build the request URL for a set of parameters.
    pub fn request_url(&self, params: &GenerationParams) -> Result<Url, GeneratorError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| GeneratorError::InvalidRequest(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| {
                GeneratorError::InvalidRequest(format!("API base '{}' cannot be a base", self.api_base))
            })?
            .pop_if_empty()
            .push("prompt")
            .push(&params.prompt);
        url.query_pairs_mut().extend_pairs(params.query_pairs());
        Ok(url)
    }

    /// Map a non-success response to an error.
    async fn handle_error_response(response: Response, status: StatusCode) -> GeneratorError {
        let body = response.text().await.unwrap_or_default();
        let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
        if message.is_empty() {
            message = status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string();
        }

        match status {
            StatusCode::UNAUTHORIZED => GeneratorError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN => GeneratorError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::PAYMENT_REQUIRED => {
                GeneratorError::AuthFailed(format!("Model requires a token: {}", message))
            }
            StatusCode::TOO_MANY_REQUESTS => GeneratorError::RateLimited,
            _ if status.is_server_error() => GeneratorError::ApiError {
                status: status.as_u16(),
                message: format!("server error: {}", message),
            },
            _ => GeneratorError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl ImageGenerator for PollinationsGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Payload, GeneratorError> {
        let url = self.request_url(&request.params)?;
        tracing::debug!(url = %url, "requesting image");

        let mut builder = self
            .client
            .get(url)
            .header(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| GeneratorError::AuthFailed("token contains invalid characters".into()))?;
            builder = builder.header(AUTHORIZATION, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GeneratorError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error = Self::handle_error_response(response, status).await;
            tracing::debug!(status = status.as_u16(), error = %error, "generation failed");
            return Err(error);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GeneratorError::NetworkError(e.to_string()))?;
        if bytes.is_empty() {
            return Err(GeneratorError::InvalidResponse("empty body".into()));
        }

        tracing::debug!(bytes = bytes.len(), content_type = %content_type, "image received");
        Ok(Payload::new(bytes.to_vec(), content_type))
    }

    fn name(&self) -> &'static str {
        "pollinations"
    }
}
