//! HTTP behavior of the Pollinations client against a local mock server.

use std::time::Duration;

use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pollen::core::codec;
use pollen::core::params::{GenerationFlag, GenerationParams, Model};
use pollen::generator::mock::synthetic_payload;
use pollen::generator::{GenerationRequest, GeneratorError, ImageGenerator, PollinationsGenerator};

fn client(server: &MockServer, token: Option<&str>) -> PollinationsGenerator {
    PollinationsGenerator::new(server.uri(), token.map(str::to_string), Duration::from_secs(5))
        .expect("client")
}

fn request() -> GenerationRequest {
    GenerationRequest::new(
        GenerationParams::new("a fox")
            .with_size(512, 768)
            .with_seed(77)
            .with_model(Model::Turbo)
            .with_flag(GenerationFlag::NoLogo),
    )
}

async fn fails_with(status: u16, body: &str) -> GeneratorError {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    client(&server, None)
        .generate(&request())
        .await
        .expect_err("request should fail")
}

#[tokio::test]
async fn sends_parameters_and_token() {
    let server = MockServer::start().await;
    let body = synthetic_payload(&request().params);
    Mock::given(method("GET"))
        .and(path("/prompt/a%20fox"))
        .and(query_param("width", "512"))
        .and(query_param("height", "768"))
        .and(query_param("seed", "77"))
        .and(query_param("model", "turbo"))
        .and(query_param("nologo", "true"))
        .and(query_param_is_missing("private"))
        .and(query_param_is_missing("enhance"))
        .and(query_param_is_missing("safe"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.bytes().to_vec(), "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client(&server, Some("secret-token"))
        .generate(&request())
        .await
        .expect("generate");

    assert_eq!(payload.bytes(), body.bytes());
    assert_eq!(payload.content_type(), "image/jpeg");
    let metadata = codec::decode(payload.bytes()).expect("metadata");
    assert_eq!(metadata.get("seed"), Some(&serde_json::json!(77)));
}

#[tokio::test]
async fn anonymous_requests_carry_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/png"))
        .mount(&server)
        .await;

    let payload = client(&server, None).generate(&request()).await.expect("generate");
    assert_eq!(payload.content_type(), "image/png");
    assert_eq!(payload.extension(), "png");

    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn status_codes_map_to_errors() {
    assert!(matches!(fails_with(401, "").await, GeneratorError::AuthFailed(_)));
    assert!(matches!(fails_with(402, "needs token").await, GeneratorError::AuthFailed(_)));
    assert_eq!(fails_with(429, "slow down").await, GeneratorError::RateLimited);

    match fails_with(503, "overloaded").await {
        GeneratorError::ApiError { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("overloaded"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    match fails_with(400, "bad prompt").await {
        GeneratorError::ApiError { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad prompt");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn empty_body_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client(&server, None).generate(&request()).await.unwrap_err();
    assert!(matches!(err, GeneratorError::InvalidResponse(_)));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    // Nothing listens on a port freed right after binding it.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("bind")
        .port();
    let uri = format!("http://127.0.0.1:{}", port);

    let generator = PollinationsGenerator::new(uri, None, Duration::from_secs(2)).expect("client");
    let err = generator.generate(&request()).await.unwrap_err();
    assert!(matches!(err, GeneratorError::NetworkError(_)), "{:?}", err);
}

// =============================================================================
// Live API tests (behind feature flag)
// =============================================================================

#[cfg(feature = "live_api_tests")]
mod live_tests {
    use super::*;
    use pollen::generator::pollinations::{DEFAULT_API_BASE, TOKEN_ENV_VAR};

    #[tokio::test]
    async fn live_small_generation() {
        let token = std::env::var(TOKEN_ENV_VAR).ok();
        let generator =
            PollinationsGenerator::new(DEFAULT_API_BASE, token, Duration::from_secs(120))
                .expect("client");

        let request = GenerationRequest::new(
            GenerationParams::new("a single red square on white")
                .with_size(256, 256)
                .with_seed(1),
        );
        let payload = generator.generate(&request).await.expect("live generation");
        assert!(!payload.is_empty());
        assert!(payload.content_type().starts_with("image/"));
    }
}
