//! generator::mock
//!
//! Mock generator implementation for deterministic testing.
//!
//! # Design
//!
//! Responses are queued and served in order; each can carry a delay so
//! tests can make one request complete after another. With an empty queue
//! the mock synthesizes a small payload that embeds a metadata block
//! describing the request. Every request is recorded.
//!
//! # Example
//!
//! ```
//! use pollen::core::codec;
//! use pollen::core::params::GenerationParams;
//! use pollen::generator::mock::MockGenerator;
//! use pollen::generator::{GenerationRequest, ImageGenerator};
//!
//! # tokio_test::block_on(async {
//! let generator = MockGenerator::new();
//! let request = GenerationRequest::new(GenerationParams::new("fox").with_seed(9));
//! let payload = generator.generate(&request).await.unwrap();
//!
//! let metadata = codec::decode(payload.bytes()).unwrap();
//! assert_eq!(metadata.get("seed"), Some(&serde_json::json!(9)));
//! assert_eq!(generator.requests().len(), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{GenerationRequest, GeneratorError, ImageGenerator};
use crate::core::codec::{START_MARKER, TERMINATORS};
use crate::core::params::GenerationParams;
use crate::core::record::Payload;

/// Mock generator for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MockGenerator {
    inner: Arc<Mutex<MockGeneratorInner>>,
}

#[derive(Debug, Default)]
struct MockGeneratorInner {
    /// Responses served in order.
    queue: VecDeque<MockResponse>,
    /// Recorded requests for verification.
    requests: Vec<GenerationRequest>,
}

/// One queued response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// What the call returns.
    pub result: Result<Payload, GeneratorError>,
    /// How long the call takes.
    pub delay: Duration,
}

impl MockGenerator {
    /// Create a mock that synthesizes payloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn respond_with(self, payload: Payload) -> Self {
        self.push(MockResponse {
            result: Ok(payload),
            delay: Duration::ZERO,
        });
        self
    }

    /// Queue a successful response that completes after `delay`.
    pub fn respond_after(self, delay: Duration, payload: Payload) -> Self {
        self.push(MockResponse {
            result: Ok(payload),
            delay,
        });
        self
    }

    /// Queue a failure.
    pub fn fail_with(self, error: GeneratorError) -> Self {
        self.push(MockResponse {
            result: Err(error),
            delay: Duration::ZERO,
        });
        self
    }

    /// Queue an arbitrary response.
    pub fn push(&self, response: MockResponse) {
        self.lock().queue.push_back(response);
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.lock().requests.clone()
    }

    /// Number of queued responses not yet served.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockGeneratorInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Build a small payload whose metadata block describes `params`.
///
/// The bytes are a JPEG SOI marker, the metadata block, and an EOI marker.
pub fn synthetic_payload(params: &GenerationParams) -> Payload {
    let metadata = serde_json::json!({
        "prompt": params.prompt,
        "width": params.width,
        "height": params.height,
        "seed": params.seed,
        "model": params.model.as_str(),
    });
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&START_MARKER);
    bytes.extend_from_slice(metadata.to_string().as_bytes());
    bytes.push(TERMINATORS[0]);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    Payload::jpeg(bytes)
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Payload, GeneratorError> {
        let queued = {
            let mut inner = self.lock();
            inner.requests.push(request.clone());
            inner.queue.pop_front()
        };

        match queued {
            Some(response) => {
                if !response.delay.is_zero() {
                    tokio::time::sleep(response.delay).await;
                }
                response.result
            }
            None => Ok(synthetic_payload(&request.params)),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
